use super::stats::WriterStats;
use super::transport::LogConnection;
use crate::reliability::RetryConfig;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("could not write after {attempts} attempt(s): {source}")]
    Io {
        attempts: u32,
        #[source]
        source: io::Error,
    },
}

/// What an adapter does with a record whose write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteFailurePolicy {
    /// Log the error, drop the record and keep consuming the feed.
    #[default]
    Continue,
    /// Stop the adapter and exit the process with a failure status.
    Exit,
}

/// Frames serialized documents as JSON lines and writes them to the route's
/// connection.
pub struct TransportWriter {
    connection: Box<dyn LogConnection>,
    retry: RetryConfig,
    stats: WriterStats,
}

impl TransportWriter {
    pub fn new(connection: Box<dyn LogConnection>) -> Self {
        Self {
            connection,
            retry: RetryConfig::disabled(),
            stats: WriterStats::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_stats(mut self, stats: WriterStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }

    /// Append `\n` to `payload` and write it in one call. Returns the number
    /// of bytes written, terminator included.
    pub async fn write(&mut self, mut payload: Vec<u8>) -> Result<usize, WriteError> {
        // json_lines codecs on stream transports frame on the newline
        payload.push(b'\n');

        let mut attempt = 0;
        loop {
            match self.connection.write(&payload).await {
                Ok(written) => {
                    self.stats.record_written(written);
                    return Ok(written);
                }
                Err(source) => {
                    self.stats.record_write_failure();

                    if attempt >= self.retry.max_attempts {
                        return Err(WriteError::Io {
                            attempts: attempt + 1,
                            source,
                        });
                    }

                    let delay = self.retry.calculate_delay(attempt);
                    warn!(
                        "logstash: write failed ({}), retry {}/{} in {:?}",
                        source,
                        attempt + 1,
                        self.retry.max_attempts,
                        delay
                    );
                    self.stats.record_retry();
                    tokio::time::sleep(delay).await;
                    // A failed stream stays failed; retries go over a fresh one.
                    if let Err(e) = self.connection.reconnect().await {
                        warn!("logstash: reconnect failed: {}", e);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

impl std::fmt::Debug for TransportWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportWriter")
            .field("connection", &"LogConnection { ... }")
            .field("retry", &self.retry)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
