use thiserror::Error;

/// Top-level error type for the forwarder process.
#[derive(Error, Debug)]
pub enum ForwarderError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::app::ConfigError),

    #[error("Collection error: {0}")]
    Collection(#[from] crate::collector::CollectorError),

    #[error("Adapter error: {0}")]
    Adapter(#[from] crate::adapter::AdapterError),

    #[error("Logging error: {0}")]
    Logging(#[from] crate::app::LoggingError),
}
