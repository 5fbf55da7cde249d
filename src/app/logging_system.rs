use super::config::{LogFormat, LogLevel};
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid directive format '{input}'. Expected: 'target=level'")]
    InvalidDirectiveFormat { input: String },

    #[error("Invalid log level '{input}'")]
    InvalidLogLevel { input: String },

    #[error("Logging system initialization failed: {details}")]
    InitFailed {
        details: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Per-target level override, `target=level`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDirective {
    pub target: String,
    pub level: LogLevel,
}

impl LogDirective {
    pub fn new(target: impl Into<String>, level: LogLevel) -> Self {
        Self {
            target: target.into(),
            level,
        }
    }

    pub fn parse(input: &str) -> Result<Self, LoggingError> {
        let (target, level) = input
            .split_once('=')
            .filter(|(target, _)| !target.trim().is_empty())
            .ok_or_else(|| LoggingError::InvalidDirectiveFormat {
                input: input.to_string(),
            })?;

        let level = <LogLevel as clap::ValueEnum>::from_str(level.trim(), true).map_err(|_| {
            LoggingError::InvalidLogLevel {
                input: level.to_string(),
            }
        })?;

        Ok(Self::new(target.trim(), level))
    }

    pub fn to_filter_string(&self) -> String {
        format!("{}={}", self.target, self.level.as_str())
    }
}

pub struct LoggingSystem {
    directives: Arc<RwLock<Vec<LogDirective>>>,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self {
            directives: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn add_directive(&self, directive_str: &str) -> Result<(), LoggingError> {
        let directive = LogDirective::parse(directive_str)?;
        self.directives.write().push(directive);
        Ok(())
    }

    /// Quiet the chatty HTTP and Docker client crates.
    pub fn add_default_directives(&self) {
        let default_directives = [
            ("bollard", LogLevel::Warn),
            ("hyper", LogLevel::Warn),
            ("hyper_util", LogLevel::Warn),
            ("tokio_util", LogLevel::Warn),
        ];

        let mut directives = self.directives.write();
        for (target, level) in default_directives {
            directives.push(LogDirective::new(target, level));
        }
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        let directives = self.directives.read();

        let mut filter_parts = Vec::with_capacity(directives.len() + 1);
        filter_parts.push(default_level.as_str().to_string());
        filter_parts.extend(directives.iter().map(LogDirective::to_filter_string));

        filter_parts.join(",")
    }

    pub fn initialize_tracing(
        &self,
        default_level: LogLevel,
        format: LogFormat,
    ) -> Result<(), LoggingError> {
        let filter_string = self.build_filter_string(default_level);

        let env_filter =
            EnvFilter::try_new(&filter_string).map_err(|e| LoggingError::InitFailed {
                details: format!("Failed to create EnvFilter with '{filter_string}'"),
                source: Box::new(e),
            })?;

        let registry = tracing_subscriber::registry().with(env_filter);

        let result = match format {
            LogFormat::Compact => registry
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_level(true)
                        .with_ansi(true)
                        .compact(),
                )
                .try_init(),
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_current_span(false)
                        .flatten_event(true),
                )
                .try_init(),
        };

        result.map_err(|e| LoggingError::InitFailed {
            details: "Failed to set global tracing subscriber".to_string(),
            source: Box::new(e),
        })
    }

}

impl Default for LoggingSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the global subscriber once, with `directives` (`target=level`)
/// applied after the defaults. Later calls are no-ops that report whether the
/// first one succeeded.
pub fn setup_logging(
    level: LogLevel,
    format: LogFormat,
    directives: &[String],
) -> Result<(), LoggingError> {
    use std::sync::Once;
    use std::sync::atomic::{AtomicBool, Ordering};

    static INIT: Once = Once::new();
    static INIT_SUCCESS: AtomicBool = AtomicBool::new(false);

    INIT.call_once(|| {
        let logging_system = LoggingSystem::new();
        logging_system.add_default_directives();

        let configured = directives
            .iter()
            .try_for_each(|directive| logging_system.add_directive(directive));

        match configured.and_then(|()| logging_system.initialize_tracing(level, format)) {
            Ok(()) => INIT_SUCCESS.store(true, Ordering::SeqCst),
            Err(e) => eprintln!("Warning: {e}"),
        }
    });

    if INIT_SUCCESS.load(Ordering::SeqCst) {
        Ok(())
    } else {
        Err(LoggingError::InitFailed {
            details: "Logging system initialization failed".to_string(),
            source: Box::new(std::io::Error::other("Logging initialization error")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_directive_parse() {
        let directive = LogDirective::parse("bollard=WARN").unwrap();
        assert_eq!(directive, LogDirective::new("bollard", LogLevel::Warn));
        assert_eq!(directive.to_filter_string(), "bollard=warn");
    }

    #[test]
    fn test_directive_parse_errors() {
        assert!(matches!(
            LogDirective::parse("invalid"),
            Err(LoggingError::InvalidDirectiveFormat { .. })
        ));
        assert!(matches!(
            LogDirective::parse("=info"),
            Err(LoggingError::InvalidDirectiveFormat { .. })
        ));
        assert!(matches!(
            LogDirective::parse("hyper=loud"),
            Err(LoggingError::InvalidLogLevel { .. })
        ));
    }

    #[test]
    fn test_build_filter_string() {
        let logging_system = LoggingSystem::new();
        assert_eq!(logging_system.build_filter_string(LogLevel::Info), "info");

        logging_system.add_default_directives();
        logging_system.add_directive("logstash_forwarder=trace").unwrap();

        let filter = logging_system.build_filter_string(LogLevel::Debug);
        assert!(filter.starts_with("debug,"));
        assert!(filter.contains("bollard=warn"));
        assert!(filter.ends_with("logstash_forwarder=trace"));
        assert_eq!(filter.split(',').count(), 6);
    }

    #[test]
    fn test_concurrent_directive_modification() {
        let logging_system = Arc::new(LoggingSystem::new());

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let logging_system = logging_system.clone();
                thread::spawn(move || logging_system.add_directive(&format!("target{i}=info")))
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }

        let filter = logging_system.build_filter_string(LogLevel::Info);
        assert_eq!(filter.split(',').count(), 51);
        assert!(filter.contains("target49=info"));
    }

    #[test]
    fn test_setup_logging_is_idempotent() {
        let directives = vec!["logstash_forwarder::collector=debug".to_string()];
        let first = setup_logging(LogLevel::Info, LogFormat::Compact, &directives).is_ok();
        let second = setup_logging(LogLevel::Debug, LogFormat::Json, &[]).is_ok();
        assert_eq!(first, second);
    }
}
