use super::{Config, ConfigError};
use crate::app::logging_system::LogDirective;
use crate::sender::Route;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.routes.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "At least one route must be configured".to_string(),
            ));
        }

        for route in &self.routes {
            Route::parse(route).map_err(|e| ConfigError::InvalidRoute(e.to_string()))?;
        }

        for directive in &self.log_directives {
            LogDirective::parse(directive).map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;
        }

        if self.tag_cache_capacity == 0 {
            return Err(ConfigError::InvalidConfig(
                "Tag cache capacity must be greater than 0".to_string(),
            ));
        }

        if self.feed_capacity == 0 {
            return Err(ConfigError::InvalidConfig(
                "Feed capacity must be greater than 0".to_string(),
            ));
        }

        if self.write_retry_attempts > 0
            && self.write_retry_base_delay_ms > self.write_retry_max_delay_ms
        {
            return Err(ConfigError::InvalidConfig(format!(
                "Retry base delay ({}ms) must not exceed max delay ({}ms)",
                self.write_retry_base_delay_ms, self.write_retry_max_delay_ms
            )));
        }

        if self.tail != "all" && self.tail.parse::<u64>().is_err() {
            return Err(ConfigError::InvalidConfig(format!(
                "Tail must be 'all' or a line count, got '{}'",
                self.tail
            )));
        }

        Ok(())
    }
}
