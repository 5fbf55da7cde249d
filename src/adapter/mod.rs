//! One Logstash adapter per route: enrich every record of the feed and write
//! it to the route's connection.

use crate::domain::{FeedItem, LogRecord};
use crate::enricher::{DEFAULT_TAG_CACHE_CAPACITY, MessageEnricher, SequenceGenerator, TagResolver};
use crate::reliability::RetryConfig;
use crate::sender::{
    LogConnection, Route, TransportError, TransportWriter, WriteError, WriteFailurePolicy,
    WriterStats, dial,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Adapter setup failed: {0}")]
    Setup(#[from] TransportError),
    #[error("logstash: could not write to {route}: {source}")]
    FatalWrite {
        route: String,
        #[source]
        source: WriteError,
    },
}

#[derive(Debug, Clone)]
pub struct AdapterOptions {
    pub tag_cache_capacity: usize,
    pub write_failure_policy: WriteFailurePolicy,
    pub retry: RetryConfig,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            tag_cache_capacity: DEFAULT_TAG_CACHE_CAPACITY,
            write_failure_policy: WriteFailurePolicy::Continue,
            retry: RetryConfig::disabled(),
        }
    }
}

pub struct LogstashAdapter {
    route: Route,
    enricher: MessageEnricher,
    writer: TransportWriter,
    policy: WriteFailurePolicy,
}

impl LogstashAdapter {
    /// Dial `route` and build an adapter on the new connection. Dial errors
    /// surface here, before any record is consumed.
    pub async fn connect(
        route: Route,
        sequence: Arc<SequenceGenerator>,
        options: AdapterOptions,
    ) -> Result<Self, AdapterError> {
        let connection = dial(&route).await?;
        Ok(Self::new(route, connection, sequence, options))
    }

    pub fn new(
        route: Route,
        connection: Box<dyn LogConnection>,
        sequence: Arc<SequenceGenerator>,
        options: AdapterOptions,
    ) -> Self {
        let tags = Arc::new(TagResolver::with_capacity(options.tag_cache_capacity));
        let writer = TransportWriter::new(connection).with_retry(options.retry);

        Self {
            route,
            enricher: MessageEnricher::new(tags, sequence),
            writer,
            policy: options.write_failure_policy,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn stats(&self) -> WriterStats {
        self.writer.stats().clone()
    }

    pub fn tag_resolver(&self) -> Arc<TagResolver> {
        self.enricher.tag_resolver().clone()
    }

    /// Handle one feed item. Only a write failure under
    /// [`WriteFailurePolicy::Exit`] is returned as an error.
    pub async fn process(&mut self, item: FeedItem) -> Result<(), AdapterError> {
        match item {
            FeedItem::Record(record) => self.forward(&record).await,
            FeedItem::ContainerRemoved { id } => {
                if self.enricher.tag_resolver().evict(&id) {
                    debug!("Evicted cached tags for container {}", id);
                }
                Ok(())
            }
        }
    }

    async fn forward(&mut self, record: &LogRecord) -> Result<(), AdapterError> {
        let payload = match self.enricher.enrich(record) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("logstash: {}", e);
                self.writer.stats().record_dropped_on_serialize();
                return Ok(());
            }
        };

        let Err(e) = self.writer.write(payload).await else {
            return Ok(());
        };

        match self.policy {
            WriteFailurePolicy::Continue => {
                warn!(
                    "logstash: could not write to {}, dropping record from container {}: {}",
                    self.route, record.container.id, e
                );
                self.writer.stats().record_dropped_on_write();
                Ok(())
            }
            WriteFailurePolicy::Exit => {
                error!("logstash: could not write to {}: {}", self.route, e);
                Err(AdapterError::FatalWrite {
                    route: self.route.to_string(),
                    source: e,
                })
            }
        }
    }

    /// Consume `feed` until the collector closes it.
    pub async fn stream(mut self, mut feed: mpsc::Receiver<FeedItem>) -> Result<(), AdapterError> {
        info!("Streaming to {}", self.route);

        while let Some(item) = feed.recv().await {
            self.process(item).await?;
        }

        let stats = self.writer.stats().snapshot();
        info!(
            "Feed closed for {} (written={}, dropped_on_write={}, dropped_on_serialize={})",
            self.route, stats.records_written, stats.dropped_on_write, stats.dropped_on_serialize
        );
        Ok(())
    }
}

impl std::fmt::Debug for LogstashAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogstashAdapter")
            .field("route", &self.route)
            .field("policy", &self.policy)
            .field("writer", &self.writer)
            .finish()
    }
}
