use super::serde_helpers::{
    load_env_enum, load_env_list, load_env_path_opt, load_env_string, load_env_string_opt,
    load_env_var,
};
use super::{ConfigError, LogFormat, LogLevel};
use crate::adapter::AdapterOptions;
use crate::collector::CollectorConfig;
use crate::enricher::DEFAULT_TAG_CACHE_CAPACITY;
use crate::reliability::{RetryConfig, RetryStrategy};
use crate::sender::WriteFailurePolicy;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ROUTE: &str = "logstash://127.0.0.1:5000";

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Logstash route(s), e.g. logstash+tcp://logstash:5000 (UDP when no transport is given)
    #[arg(
        long = "route",
        env = "ROUTE",
        value_delimiter = ',',
        default_value = DEFAULT_ROUTE
    )]
    pub routes: Vec<String>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", default_value = "compact")]
    pub log_format: LogFormat,

    /// Per-target log levels on top of --log-level, e.g. logstash_forwarder::collector=debug
    #[arg(long = "log-directive", env = "LOG_DIRECTIVES", value_delimiter = ',')]
    pub log_directives: Vec<String>,

    /// What to do when a record cannot be written: drop it and continue, or exit
    #[arg(long, env = "WRITE_FAILURE_POLICY", default_value = "continue")]
    pub write_failure_policy: WriteFailurePolicy,

    /// Retries of a failed write before the failure policy applies (0 disables retry)
    #[arg(long, env = "WRITE_RETRY_ATTEMPTS", default_value = "0")]
    pub write_retry_attempts: u32,

    /// Backoff between write retries
    #[arg(long, env = "WRITE_RETRY_STRATEGY", default_value = "exponential")]
    pub write_retry_strategy: RetryStrategy,

    /// Base delay between write retries in milliseconds
    #[arg(long, env = "WRITE_RETRY_BASE_DELAY_MS", default_value = "100")]
    pub write_retry_base_delay_ms: u64,

    /// Maximum delay between write retries in milliseconds
    #[arg(long, env = "WRITE_RETRY_MAX_DELAY_MS", default_value = "5000")]
    pub write_retry_max_delay_ms: u64,

    /// Maximum number of containers whose tags are cached per route
    #[arg(long, env = "TAG_CACHE_CAPACITY", default_value = "10000")]
    pub tag_cache_capacity: usize,

    /// Capacity of each route's record feed
    #[arg(long, env = "FEED_CAPACITY", default_value = "1024")]
    pub feed_capacity: usize,

    /// Docker socket path (platform default if not provided)
    #[arg(long, env = "DOCKER_SOCKET")]
    pub docker_socket: Option<String>,

    /// Only forward containers matching this Docker label filter
    #[arg(long, env = "LABEL_FILTER")]
    pub label_filter: Option<String>,

    /// Lines of history to replay when a container is first tailed ("all" or a count)
    #[arg(long, env = "LOG_TAIL", default_value = "0")]
    pub tail: String,

    /// Container names or id prefixes that are never forwarded
    #[arg(long = "exclude-container", env = "EXCLUDE_CONTAINERS", value_delimiter = ',')]
    pub exclude_containers: Vec<String>,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub retry_config: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            routes: vec![DEFAULT_ROUTE.to_string()],
            log_level: LogLevel::Info,
            log_format: LogFormat::Compact,
            log_directives: Vec::new(),
            write_failure_policy: WriteFailurePolicy::Continue,
            write_retry_attempts: 0,
            write_retry_strategy: RetryStrategy::ExponentialBackoff,
            write_retry_base_delay_ms: 100,
            write_retry_max_delay_ms: 5000,
            tag_cache_capacity: DEFAULT_TAG_CACHE_CAPACITY,
            feed_capacity: 1024,
            docker_socket: None,
            label_filter: None,
            tail: "0".to_string(),
            exclude_containers: Vec::new(),
            config_file: None,
            retry_config: RetryConfig::default(),
        }
    }
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::parse_from(args);
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse CLI args (with their env fallbacks). When a config file is named,
    /// the file replaces the CLI settings, keeping the file path.
    pub fn from_args_and_file<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Self::from_args(args)?;

        match &config.config_file {
            Some(path) => {
                let mut from_file = Self::from_file(path)?;
                from_file.config_file = Some(path.clone());
                Ok(from_file)
            }
            None => Ok(config),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        load_env_list("ROUTE", &mut config.routes);
        load_env_enum("LOG_LEVEL", &mut config.log_level)?;
        load_env_enum("LOG_FORMAT", &mut config.log_format)?;
        load_env_list("LOG_DIRECTIVES", &mut config.log_directives);
        load_env_enum("WRITE_FAILURE_POLICY", &mut config.write_failure_policy)?;
        load_env_var("WRITE_RETRY_ATTEMPTS", &mut config.write_retry_attempts)?;
        load_env_enum("WRITE_RETRY_STRATEGY", &mut config.write_retry_strategy)?;
        load_env_var("WRITE_RETRY_BASE_DELAY_MS", &mut config.write_retry_base_delay_ms)?;
        load_env_var("WRITE_RETRY_MAX_DELAY_MS", &mut config.write_retry_max_delay_ms)?;
        load_env_var("TAG_CACHE_CAPACITY", &mut config.tag_cache_capacity)?;
        load_env_var("FEED_CAPACITY", &mut config.feed_capacity)?;
        load_env_string_opt("DOCKER_SOCKET", &mut config.docker_socket);
        load_env_string_opt("LABEL_FILTER", &mut config.label_filter);
        load_env_string("LOG_TAIL", &mut config.tail);
        load_env_list("EXCLUDE_CONTAINERS", &mut config.exclude_containers);
        load_env_path_opt("CONFIG_FILE", &mut config.config_file);

        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.routes = trimmed(&self.routes);
        self.log_directives = trimmed(&self.log_directives);

        self.retry_config = RetryConfig {
            max_attempts: self.write_retry_attempts,
            base_delay: Duration::from_millis(self.write_retry_base_delay_ms),
            max_delay: Duration::from_millis(self.write_retry_max_delay_ms),
            strategy: self.write_retry_strategy,
            ..RetryConfig::default()
        };

        Ok(())
    }

    pub fn adapter_options(&self) -> AdapterOptions {
        AdapterOptions {
            tag_cache_capacity: self.tag_cache_capacity,
            write_failure_policy: self.write_failure_policy,
            retry: self.retry_config.clone(),
        }
    }

    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            docker_socket: self.docker_socket.clone(),
            label_filter: self.label_filter.clone(),
            tail: self.tail.clone(),
            exclude_containers: self.exclude_containers.clone(),
        }
    }
}

fn trimmed(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}
