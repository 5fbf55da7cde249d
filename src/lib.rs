#![warn(rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_lossless,            // Infallible casts are clear enough with `as`
    clippy::cast_possible_truncation, // Millisecond durations fit in u64
    clippy::cast_precision_loss,      // Jitter math only
    clippy::cast_sign_loss,           // Jitter factor is positive
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. CollectorError in collector module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod adapter;
pub mod app;
pub mod collector;
pub mod domain;
pub mod enricher;
pub mod reliability;
pub mod sender;

// Re-export main types for easy access
pub use adapter::{AdapterOptions, LogstashAdapter};
pub use app::{App, Config};
pub use domain::{ContainerIdentity, EnrichedMessage, FeedItem, LogRecord};
pub use enricher::{MessageEnricher, SequenceGenerator, TagResolver};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
