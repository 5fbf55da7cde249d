use serde::{Deserialize, Serialize};

/// Placeholder `logid` for containers without a `LOGID` environment entry.
pub const UNKNOWN_LOG_ID: &str = "UNKNOWN";

/// Nested `docker` object of an outbound document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerInfo {
    pub name: String,
    pub id: String,
    pub image: String,
    pub hostname: String,
}

/// Outbound document for a line that was not itself a JSON object.
///
/// Downstream Logstash filters are keyed to these exact field names, so the
/// serde renames are part of the wire contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedMessage {
    pub message: String,
    pub stream: String,
    pub docker: DockerInfo,
    pub tags: Vec<String>,
    pub docker_name: String,
    pub docker_id: String,
    pub docker_image: String,
    pub docker_hostname: String,
    pub logid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
    #[serde(rename = "type")]
    pub log_type: String,
    #[serde(rename = "taskId")]
    pub task_id: String,
}
