use logstash_forwarder::app::{Config, ConfigError, LogFormat, LogLevel};
use logstash_forwarder::reliability::RetryStrategy;
use logstash_forwarder::sender::WriteFailurePolicy;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio_test::{assert_err, assert_ok};

fn clean_all_env_vars() {
    let env_vars = [
        "ROUTE",
        "LOG_LEVEL",
        "LOG_FORMAT",
        "LOG_DIRECTIVES",
        "WRITE_FAILURE_POLICY",
        "WRITE_RETRY_ATTEMPTS",
        "WRITE_RETRY_STRATEGY",
        "WRITE_RETRY_BASE_DELAY_MS",
        "WRITE_RETRY_MAX_DELAY_MS",
        "TAG_CACHE_CAPACITY",
        "FEED_CAPACITY",
        "DOCKER_SOCKET",
        "LABEL_FILTER",
        "LOG_TAIL",
        "EXCLUDE_CONTAINERS",
        "CONFIG_FILE",
    ];

    unsafe {
        for var in &env_vars {
            env::remove_var(var);
        }
    }
}

fn write_config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_defaults_from_empty_command_line() {
    clean_all_env_vars();

    let config = assert_ok!(Config::from_args(["logstash-forwarder"]));

    assert_eq!(config.routes, vec!["logstash://127.0.0.1:5000"]);
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.log_format, LogFormat::Compact);
    assert_eq!(config.write_failure_policy, WriteFailurePolicy::Continue);
    assert!(!config.retry_config.is_enabled());
    assert_eq!(config.retry_config.strategy, RetryStrategy::ExponentialBackoff);
    assert!(config.log_directives.is_empty());
    assert_eq!(config.tag_cache_capacity, 10_000);
    assert_eq!(config.tail, "0");
    assert!(config.exclude_containers.is_empty());
}

#[test]
#[serial]
fn test_command_line_arguments() {
    clean_all_env_vars();

    let config = Config::from_args([
        "logstash-forwarder",
        "--route",
        "logstash+tcp://logstash:5000,logstash://backup:5001",
        "--write-failure-policy",
        "exit",
        "--write-retry-attempts",
        "3",
        "--write-retry-base-delay-ms",
        "50",
        "--write-retry-strategy",
        "linear",
        "--log-directive",
        "logstash_forwarder::collector=debug,bollard=info",
        "--exclude-container",
        "logstash-forwarder",
        "--log-format",
        "json",
    ])
    .unwrap();

    assert_eq!(
        config.routes,
        vec!["logstash+tcp://logstash:5000", "logstash://backup:5001"]
    );
    assert_eq!(config.write_failure_policy, WriteFailurePolicy::Exit);
    assert_eq!(config.log_format, LogFormat::Json);
    assert_eq!(config.retry_config.max_attempts, 3);
    assert_eq!(config.retry_config.base_delay, Duration::from_millis(50));
    assert_eq!(config.retry_config.strategy, RetryStrategy::LinearBackoff);
    assert_eq!(
        config.log_directives,
        vec!["logstash_forwarder::collector=debug", "bollard=info"]
    );
    assert_eq!(config.exclude_containers, vec!["logstash-forwarder"]);

    let options = config.adapter_options();
    assert_eq!(options.write_failure_policy, WriteFailurePolicy::Exit);
    assert_eq!(options.retry.max_attempts, 3);
}

#[test]
#[serial]
fn test_environment_fallback() {
    clean_all_env_vars();
    unsafe {
        env::set_var("ROUTE", "logstash+tcp://10.1.2.3:5044");
        env::set_var("WRITE_FAILURE_POLICY", "EXIT");
        env::set_var("LOG_LEVEL", "debug");
        env::set_var("LABEL_FILTER", "logging=logstash");
        env::set_var("EXCLUDE_CONTAINERS", " forwarder , ,4f2a ");
        env::set_var("WRITE_RETRY_STRATEGY", "Fixed");
        env::set_var("LOG_DIRECTIVES", "hyper=error");
    }

    let config = Config::from_env().unwrap();
    clean_all_env_vars();

    assert_eq!(config.routes, vec!["logstash+tcp://10.1.2.3:5044"]);
    assert_eq!(config.write_failure_policy, WriteFailurePolicy::Exit);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(
        config.collector_config().label_filter.as_deref(),
        Some("logging=logstash")
    );
    assert_eq!(config.exclude_containers, vec!["forwarder", "4f2a"]);
    assert_eq!(config.retry_config.strategy, RetryStrategy::FixedDelay);
    assert_eq!(config.log_directives, vec!["hyper=error"]);
}

#[test]
#[serial]
fn test_invalid_environment_value() {
    clean_all_env_vars();
    unsafe {
        env::set_var("TAG_CACHE_CAPACITY", "lots");
    }

    let result = Config::from_env();
    clean_all_env_vars();

    assert!(matches!(result, Err(ConfigError::EnvError(_))));
}

#[test]
#[serial]
fn test_invalid_route_is_rejected_at_startup() {
    clean_all_env_vars();
    unsafe {
        env::set_var("ROUTE", "logstash+quic://logstash:5000");
    }

    let result = Config::from_env();
    clean_all_env_vars();

    assert!(matches!(result, Err(ConfigError::InvalidRoute(_))));
}

#[test]
fn test_toml_file() {
    let file = write_config_file(
        r#"
routes = ["logstash+tcp://logstash:5000"]
log_level = "warn"
write_failure_policy = "exit"
write_retry_attempts = 2
tag_cache_capacity = 64
tail = "all"
exclude_containers = ["forwarder"]
write_retry_strategy = "fixed"
log_directives = ["logstash_forwarder=trace"]
"#,
    );

    let config = assert_ok!(Config::from_file(file.path()));

    assert_eq!(config.routes, vec!["logstash+tcp://logstash:5000"]);
    assert_eq!(config.log_level, LogLevel::Warn);
    assert_eq!(config.write_failure_policy, WriteFailurePolicy::Exit);
    assert_eq!(config.retry_config.max_attempts, 2);
    assert_eq!(config.adapter_options().tag_cache_capacity, 64);
    assert_eq!(config.collector_config().tail, "all");
    assert_eq!(config.feed_capacity, 1024);
    assert_eq!(config.retry_config.strategy, RetryStrategy::FixedDelay);
    assert_eq!(config.log_directives, vec!["logstash_forwarder=trace"]);
}

#[test]
#[serial]
fn test_config_file_replaces_command_line() {
    clean_all_env_vars();
    let file = write_config_file("routes = [\"logstash://from-file:5000\"]\n");
    let path = file.path().to_str().unwrap().to_string();

    let config = Config::from_args_and_file([
        "logstash-forwarder",
        "--route",
        "logstash://from-cli:5000",
        "--config-file",
        path.as_str(),
    ])
    .unwrap();

    assert_eq!(config.routes, vec!["logstash://from-file:5000"]);
    assert_eq!(config.config_file.as_deref(), Some(file.path()));
}

#[test]
fn test_validation_errors() {
    let cases = [
        "routes = []\n",
        "tag_cache_capacity = 0\n",
        "feed_capacity = 0\n",
        "tail = \"forever\"\n",
        "log_directives = [\"no-level-given\"]\n",
        "log_directives = [\"bollard=loud\"]\n",
        "write_retry_attempts = 1\nwrite_retry_base_delay_ms = 10000\nwrite_retry_max_delay_ms = 10\n",
    ];

    for content in cases {
        let result = Config::from_toml(content);
        assert!(
            matches!(result, Err(ConfigError::InvalidConfig(_))),
            "expected validation error for {content:?}"
        );
    }
}

#[test]
fn test_missing_and_malformed_files() {
    assert!(matches!(
        Config::from_file("/nonexistent/logstash-forwarder.toml"),
        Err(ConfigError::FileError(_))
    ));
    let err = assert_err!(Config::from_toml("routes = ["));
    assert!(matches!(err, ConfigError::ParseError(_)));
}
