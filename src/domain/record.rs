use std::sync::Arc;

/// Metadata of the container a log line came from.
///
/// Built once per container by the collector and shared by every record it
/// produces. Adapters only read it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerIdentity {
    pub id: String,
    /// Container name as Docker reports it, including the leading `/`.
    pub name: String,
    pub image: String,
    pub hostname: String,
    /// `KEY=VALUE` strings in the order Docker lists them.
    pub env: Vec<String>,
}

impl ContainerIdentity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_env<I, S>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.env = env.into_iter().map(Into::into).collect();
        self
    }
}

/// One log line emitted by a container.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// The raw line, without its trailing newline.
    pub data: String,
    /// Source stream, `stdout` or `stderr`.
    pub source: String,
    pub container: Arc<ContainerIdentity>,
}

impl LogRecord {
    pub fn new(
        data: impl Into<String>,
        source: impl Into<String>,
        container: Arc<ContainerIdentity>,
    ) -> Self {
        Self {
            data: data.into(),
            source: source.into(),
            container,
        }
    }
}

/// Element of an adapter feed.
///
/// Removal notifications travel on the same channel as records so that an
/// adapter never evicts a container's cached tags before it has processed
/// that container's last line.
#[derive(Debug, Clone)]
pub enum FeedItem {
    Record(LogRecord),
    ContainerRemoved { id: String },
}

impl From<LogRecord> for FeedItem {
    fn from(record: LogRecord) -> Self {
        FeedItem::Record(record)
    }
}
