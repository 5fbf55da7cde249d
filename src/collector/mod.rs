pub mod docker;
pub mod lines;
pub mod registry;

pub use docker::{CollectorConfig, DockerCollector};
pub use lines::LineBuffer;
pub use registry::{TailGuard, TailRegistry};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Docker API error: {0}")]
    Docker(#[from] bollard::errors::Error),
    #[error("Container {0} has no id")]
    MissingId(String),
    #[error("Docker event stream ended")]
    EventStreamEnded,
    #[error("Feed closed by all adapters")]
    FeedClosed,
    #[error("Collector task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
