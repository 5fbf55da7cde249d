use super::CollectorError;
use super::lines::LineBuffer;
use super::registry::{TailGuard, TailRegistry};
use crate::domain::{ContainerIdentity, FeedItem, LogRecord};
use bollard::Docker;
use bollard::container::LogOutput;
use bollard::models::EventMessage;
use bollard::query_parameters::{
    EventsOptions, InspectContainerOptions, ListContainersOptions, LogsOptions,
};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Docker socket path; platform defaults when `None`.
    pub docker_socket: Option<String>,
    /// Docker `label` filter, e.g. `logging=logstash`.
    pub label_filter: Option<String>,
    /// Lines of history to replay per container (`"all"` or a count).
    pub tail: String,
    /// Container names (without `/`) or id prefixes that are never tailed.
    pub exclude_containers: Vec<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            docker_socket: None,
            label_filter: None,
            tail: "0".to_string(),
            exclude_containers: Vec::new(),
        }
    }
}

/// Feeds container log lines and removals from the Docker API.
pub struct DockerCollector {
    docker: Docker,
    config: CollectorConfig,
}

impl DockerCollector {
    pub fn connect(config: CollectorConfig) -> Result<Self, CollectorError> {
        let docker = match &config.docker_socket {
            Some(socket) => {
                Docker::connect_with_socket(socket, 120, bollard::API_DEFAULT_VERSION)?
            }
            None => Docker::connect_with_socket_defaults()?,
        };
        Ok(Self { docker, config })
    }

    pub async fn can_connect(&self) -> bool {
        self.docker.ping().await.is_ok()
    }

    /// Tail every matching running container, and containers started later,
    /// until `cancel` fires. Returns `Ok` only when cancelled; losing the
    /// Docker event stream or every receiver of `tx` is an error.
    pub async fn run(
        &self,
        tx: mpsc::Sender<FeedItem>,
        cancel: CancellationToken,
    ) -> Result<(), CollectorError> {
        // Subscribe before listing so a container started in between is not missed.
        let mut events = Box::pin(self.docker.events(Some(EventsOptions {
            filters: Some(HashMap::from([
                ("type".to_string(), vec!["container".to_string()]),
                (
                    "event".to_string(),
                    vec!["start".to_string(), "destroy".to_string()],
                ),
            ])),
            ..Default::default()
        })));

        let tailed = TailRegistry::new();
        for id in self.list_running().await? {
            self.start_tailing(&id, &tailed, &tx, &cancel).await;
        }
        info!("Tailing {} container(s)", tailed.len());

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Docker collector cancelled");
                    return Ok(());
                }
                _ = tx.closed() => {
                    return Err(CollectorError::FeedClosed);
                }
                event = events.next() => match event {
                    Some(Ok(event)) => self.handle_event(event, &tailed, &tx, &cancel).await?,
                    Some(Err(e)) => {
                        error!("Docker event stream error: {}", e);
                        return Err(e.into());
                    }
                    None => {
                        error!("Docker event stream ended");
                        return Err(CollectorError::EventStreamEnded);
                    }
                }
            }
        }
    }

    async fn list_running(&self) -> Result<Vec<String>, CollectorError> {
        let filters = self
            .config
            .label_filter
            .as_ref()
            .map(|label| HashMap::from([("label".to_string(), vec![label.clone()])]));

        let options = ListContainersOptions {
            all: false, // Only running containers
            filters,
            ..Default::default()
        };

        let containers = self.docker.list_containers(Some(options)).await?;

        Ok(containers
            .into_iter()
            .filter_map(|container| container.id)
            .collect())
    }

    async fn handle_event(
        &self,
        event: EventMessage,
        tailed: &TailRegistry,
        tx: &mpsc::Sender<FeedItem>,
        cancel: &CancellationToken,
    ) -> Result<(), CollectorError> {
        let Some(id) = event.actor.and_then(|actor| actor.id) else {
            return Ok(());
        };

        match event.action.as_deref() {
            Some("start") => {
                if self.matches_label_filter(&id).await {
                    self.start_tailing(&id, tailed, tx, cancel).await;
                }
            }
            Some("destroy") => {
                debug!("Container {} destroyed", id);
                tx.send(FeedItem::ContainerRemoved { id })
                    .await
                    .map_err(|_| CollectorError::FeedClosed)?;
            }
            _ => {}
        }

        Ok(())
    }

    async fn matches_label_filter(&self, id: &str) -> bool {
        let Some(label) = &self.config.label_filter else {
            return true;
        };

        let filters = HashMap::from([
            ("label".to_string(), vec![label.clone()]),
            ("id".to_string(), vec![id.to_string()]),
        ]);
        let options = ListContainersOptions {
            all: false,
            filters: Some(filters),
            ..Default::default()
        };

        match self.docker.list_containers(Some(options)).await {
            Ok(containers) => !containers.is_empty(),
            Err(e) => {
                warn!("Could not check labels of container {}: {}", id, e);
                false
            }
        }
    }

    async fn start_tailing(
        &self,
        id: &str,
        tailed: &TailRegistry,
        tx: &mpsc::Sender<FeedItem>,
        cancel: &CancellationToken,
    ) {
        // Held until the log stream ends; dropped early if the container is skipped.
        let Some(claim) = tailed.claim(id) else {
            debug!("Container {} is already tailed", id);
            return;
        };

        let identity = match self.inspect(id).await {
            Ok(identity) => identity,
            Err(e) => {
                warn!("Skipping container {}: {}", id, e);
                return;
            }
        };

        if is_excluded(&identity, &self.config.exclude_containers) {
            debug!("Container {} ({}) is excluded", identity.name, identity.id);
            return;
        }

        let docker = self.docker.clone();
        let tail = self.config.tail.clone();
        let tx = tx.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tail_container(docker, Arc::new(identity), tail, tx, cancel, claim).await;
        });
    }

    async fn inspect(&self, id: &str) -> Result<ContainerIdentity, CollectorError> {
        let response = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;

        let container_id = response
            .id
            .ok_or_else(|| CollectorError::MissingId(id.to_string()))?;
        let config = response.config.unwrap_or_default();

        Ok(ContainerIdentity {
            id: container_id,
            name: response.name.unwrap_or_default(),
            image: config.image.unwrap_or_default(),
            hostname: config.hostname.unwrap_or_default(),
            env: config.env.unwrap_or_default(),
        })
    }
}

impl std::fmt::Debug for DockerCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerCollector")
            .field("docker", &"Docker { ... }")
            .field("config", &self.config)
            .finish()
    }
}

pub(crate) fn is_excluded(identity: &ContainerIdentity, excluded: &[String]) -> bool {
    let name = identity.name.trim_start_matches('/');
    excluded
        .iter()
        .filter(|pattern| !pattern.is_empty())
        .any(|pattern| name == pattern || identity.id.starts_with(pattern.as_str()))
}

async fn tail_container(
    docker: Docker,
    identity: Arc<ContainerIdentity>,
    tail: String,
    tx: mpsc::Sender<FeedItem>,
    cancel: CancellationToken,
    claim: TailGuard,
) {
    info!(
        "Starting to tail logs for container: {} ({})",
        identity.name, identity.id
    );

    let options = LogsOptions {
        follow: true,
        stdout: true,
        stderr: true,
        tail,
        ..Default::default()
    };
    let mut stream = Box::pin(docker.logs(&identity.id, Some(options)));
    let mut stdout = LineBuffer::new();
    let mut stderr = LineBuffer::new();

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => break,
            chunk = stream.next() => chunk,
        };

        let (source, lines) = match chunk {
            Some(Ok(LogOutput::StdErr { message })) => ("stderr", stderr.push(&message)),
            Some(Ok(output)) => ("stdout", stdout.push(&output.into_bytes())),
            Some(Err(e)) => {
                error!("Error reading logs from container {}: {}", identity.name, e);
                break;
            }
            None => break,
        };

        for line in lines {
            let record = LogRecord::new(line, source, identity.clone());
            if tx.send(FeedItem::Record(record)).await.is_err() {
                return;
            }
        }
    }

    // The stream is over; a later `start` of this container must tail again.
    drop(claim);

    for (source, buffer) in [("stdout", &mut stdout), ("stderr", &mut stderr)] {
        if let Some(line) = buffer.take_remainder() {
            let record = LogRecord::new(line, source, identity.clone());
            if tx.send(FeedItem::Record(record)).await.is_err() {
                return;
            }
        }
    }

    info!("Stopped tailing logs for container: {}", identity.name);
}
