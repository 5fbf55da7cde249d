pub mod config;
pub mod logging_system;
pub mod router;
pub mod shutdown;

pub use config::{Config, ConfigError, LogFormat, LogLevel};
pub use logging_system::{LoggingError, LoggingSystem, setup_logging};
pub use router::RouteFeed;

use crate::adapter::{AdapterError, LogstashAdapter};
use crate::collector::{CollectorError, DockerCollector};
use crate::domain::ForwarderError;
use crate::enricher::SequenceGenerator;
use crate::sender::Route;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// A configured forwarder: one connected adapter per route and the Docker
/// collector that feeds them.
pub struct App {
    config: Config,
    adapters: Vec<LogstashAdapter>,
    collector: DockerCollector,
    sequence: Arc<SequenceGenerator>,
}

impl App {
    /// Parse routes, dial every one of them and connect to Docker. Any setup
    /// error aborts startup before a single record is read.
    pub async fn from_config(config: Config) -> Result<Self, ForwarderError> {
        let sequence = Arc::new(SequenceGenerator::new());
        let options = config.adapter_options();

        let mut adapters = Vec::with_capacity(config.routes.len());
        for uri in &config.routes {
            let route = Route::parse(uri).map_err(AdapterError::from)?;
            let adapter = LogstashAdapter::connect(route, sequence.clone(), options.clone()).await?;
            adapters.push(adapter);
        }

        let collector = DockerCollector::connect(config.collector_config())?;
        if !collector.can_connect().await {
            warn!("Docker daemon did not answer ping, collection may fail");
        }

        Ok(Self {
            config,
            adapters,
            collector,
            sequence,
        })
    }

    pub fn sequence(&self) -> &Arc<SequenceGenerator> {
        &self.sequence
    }

    /// Run until a signal arrives. A collector failure, or an adapter failing
    /// fatally under the `exit` write policy, cancels everything and is
    /// returned so the process exits non-zero.
    pub async fn run(self) -> Result<(), ForwarderError> {
        let Self {
            config,
            adapters,
            collector,
            sequence: _,
        } = self;

        let cancel = CancellationToken::new();
        let signal_handler = shutdown::spawn_signal_handler(cancel.clone());

        let (collector_tx, collector_rx) = mpsc::channel(config.feed_capacity);

        let mut tasks = JoinSet::new();
        let mut feeds = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            let (tx, rx) = mpsc::channel(config.feed_capacity);
            feeds.push(RouteFeed {
                route: adapter.route().to_string(),
                tx,
            });
            tasks.spawn(adapter.stream(rx));
        }

        let router = tokio::spawn(router::run(collector_rx, feeds));

        let collector_cancel = cancel.clone();
        let mut collector_task =
            tokio::spawn(async move { collector.run(collector_tx, collector_cancel).await });
        let mut collector_done = false;

        info!("logstash-forwarder running with {} route(s)", tasks.len());

        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok(Ok(()))) => {}
                    Some(Ok(Err(e))) => {
                        error!("{}", e);
                        cancel.cancel();
                        return Err(e.into());
                    }
                    Some(Err(e)) => error!("Adapter task failed: {}", e),
                },
                finished = &mut collector_task, if !collector_done => {
                    collector_done = true;
                    match finished.map_err(CollectorError::from).and_then(|result| result) {
                        // Cancelled: the adapters drain what is already queued.
                        Ok(()) => {}
                        // Every adapter is gone; their own results decide the outcome.
                        Err(CollectorError::FeedClosed) => {}
                        Err(e) => {
                            error!("Collector failed: {}", e);
                            cancel.cancel();
                            return Err(e.into());
                        }
                    }
                }
            }
        }

        cancel.cancel();
        signal_handler.abort();

        if let Err(e) = router.await {
            error!("Router task failed: {}", e);
        }
        if !collector_done {
            match collector_task.await {
                Ok(Ok(()) | Err(CollectorError::FeedClosed)) => {}
                Ok(Err(e)) => warn!("Collector stopped: {}", e),
                Err(e) => error!("Collector task failed: {}", e),
            }
        }

        info!("logstash-forwarder stopped");
        Ok(())
    }
}

/// Entry point of the binary.
pub async fn main() -> anyhow::Result<()> {
    let config = Config::from_args_and_file(std::env::args_os())?;

    setup_logging(config.log_level, config.log_format, &config.log_directives)?;

    info!("Starting logstash-forwarder v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: routes={:?}, write_failure_policy={:?}, retry_attempts={}, retry_strategy={:?}",
        config.routes,
        config.write_failure_policy,
        config.write_retry_attempts,
        config.write_retry_strategy
    );

    let app = App::from_config(config).await?;
    app.run().await?;
    Ok(())
}
