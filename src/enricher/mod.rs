//! Turns a raw container log line into a Logstash document.
//!
//! Lines that parse as a JSON object keep their own keys and receive the
//! container fields on top; everything else is wrapped in an
//! [`EnrichedMessage`] whose `message` is the line verbatim. In both cases the
//! injected fields win over payload keys of the same name.

pub mod env_fields;
pub mod sequence;
pub mod tags;

pub use env_fields::EnvFields;
pub use sequence::SequenceGenerator;
pub use tags::{DEFAULT_TAG_CACHE_CAPACITY, TagResolver, TagSet};

use crate::domain::{DockerInfo, EnrichedMessage, LogRecord, UNKNOWN_LOG_ID};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use thiserror::Error;

/// Keys the structured path writes into the payload.
pub const INJECTED_KEYS: [&str; 11] = [
    "docker",
    "tags",
    "stream",
    "docker_name",
    "docker_id",
    "docker_hostname",
    "docker_image",
    "logid",
    "type",
    "taskId",
    "sequence",
];

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("could not marshal JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Fields computed for one record, independent of the payload shape.
#[derive(Debug)]
struct Enrichment {
    docker: DockerInfo,
    tags: TagSet,
    logid: String,
    /// Whether the record takes a number from the global sequence.
    sequenced: bool,
    sequence: Option<String>,
    log_type: String,
    task_id: String,
}

impl Enrichment {
    fn into_message(self, record: &LogRecord) -> EnrichedMessage {
        EnrichedMessage {
            message: record.data.clone(),
            stream: record.source.clone(),
            docker_name: self.docker.name.clone(),
            docker_id: self.docker.id.clone(),
            docker_image: self.docker.image.clone(),
            docker_hostname: self.docker.hostname.clone(),
            docker: self.docker,
            tags: self.tags.to_vec(),
            logid: self.logid,
            sequence: self.sequence,
            log_type: self.log_type,
            task_id: self.task_id,
        }
    }

    fn merge_into(self, record: &LogRecord, payload: &mut Map<String, Value>) {
        payload.insert("docker_name".into(), self.docker.name.clone().into());
        payload.insert("docker_id".into(), self.docker.id.clone().into());
        payload.insert("docker_hostname".into(), self.docker.hostname.clone().into());
        payload.insert("docker_image".into(), self.docker.image.clone().into());
        payload.insert(
            "docker".into(),
            json!({
                "name": self.docker.name,
                "id": self.docker.id,
                "image": self.docker.image,
                "hostname": self.docker.hostname,
            }),
        );
        payload.insert("tags".into(), Value::from(self.tags.to_vec()));
        payload.insert("stream".into(), record.source.clone().into());
        payload.insert("logid".into(), self.logid.into());
        payload.insert("type".into(), self.log_type.into());
        payload.insert("taskId".into(), self.task_id.into());
        if let Some(sequence) = self.sequence {
            payload.insert("sequence".into(), sequence.into());
        }
    }
}

/// Enriches records for one adapter.
///
/// The tag cache belongs to the adapter; the sequence generator is shared by
/// the whole process.
#[derive(Debug, Clone)]
pub struct MessageEnricher {
    tags: Arc<TagResolver>,
    sequence: Arc<SequenceGenerator>,
}

impl MessageEnricher {
    pub fn new(tags: Arc<TagResolver>, sequence: Arc<SequenceGenerator>) -> Self {
        Self { tags, sequence }
    }

    pub fn tag_resolver(&self) -> &Arc<TagResolver> {
        &self.tags
    }

    pub fn sequence(&self) -> &Arc<SequenceGenerator> {
        &self.sequence
    }

    /// Serialize `record` as a single JSON document, without line terminator.
    ///
    /// The sequence number is drawn only after everything that can reject the
    /// record, so numbers are not burned on dropped records.
    pub fn enrich(&self, record: &LogRecord) -> Result<Vec<u8>, EnrichError> {
        let mut enrichment = self.enrichment_for(record);

        match serde_json::from_str::<Map<String, Value>>(&record.data) {
            Ok(mut payload) => {
                self.assign_sequence(&mut enrichment);
                enrichment.merge_into(record, &mut payload);
                Ok(serde_json::to_vec(&payload)?)
            }
            Err(_) => {
                self.assign_sequence(&mut enrichment);
                Ok(serde_json::to_vec(&enrichment.into_message(record))?)
            }
        }
    }

    fn assign_sequence(&self, enrichment: &mut Enrichment) {
        if !enrichment.sequenced {
            return;
        }
        let value = self.sequence.next();
        tracing::debug!(logid = %enrichment.logid, sequence = value, "Assigned log sequence");
        enrichment.sequence = Some(value.to_string());
    }

    fn enrichment_for(&self, record: &LogRecord) -> Enrichment {
        let container = &record.container;
        let tags = self.tags.resolve(&container.id, &container.env);
        let fields = EnvFields::scan(&container.env);

        Enrichment {
            docker: DockerInfo {
                name: container.name.clone(),
                id: container.id.clone(),
                image: container.image.clone(),
                hostname: container.hostname.clone(),
            },
            tags,
            sequenced: fields.logid.is_some(),
            logid: fields.logid.unwrap_or_else(|| UNKNOWN_LOG_ID.to_string()),
            sequence: None,
            log_type: fields.log_type,
            task_id: fields.task_id,
        }
    }
}
