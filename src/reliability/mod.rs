pub mod retry;

pub use retry::{RetryConfig, RetryStrategy};
