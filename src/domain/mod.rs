//! Domain layer for logstash-forwarder.
//!
//! Contains the canonical types shared across all modules:
//! - `LogRecord` / `ContainerIdentity`: what the collector hands to adapters
//! - `FeedItem`: one element of an adapter's feed
//! - `EnrichedMessage` / `DockerInfo`: the outbound Logstash document
//! - `ForwarderError`: Top-level error type

pub mod enriched;
pub mod error;
pub mod record;

pub use enriched::{DockerInfo, EnrichedMessage, UNKNOWN_LOG_ID};
pub use error::ForwarderError;
pub use record::{ContainerIdentity, FeedItem, LogRecord};
