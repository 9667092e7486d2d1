use super::{Config, ConfigError};
use url::Url;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.influxdb_url).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Invalid database URL '{}': {}",
                self.influxdb_url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "Database URL must be http or https: {}",
                self.influxdb_url
            )));
        }

        for (name, value) in [
            ("INFLUXDB_ORG", &self.influxdb_org),
            ("INFLUXDB_BUCKET", &self.influxdb_bucket),
            ("INFLUXDB_TOKEN", &self.influxdb_token),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(format!("{name} must be set")));
            }
        }

        if self.replay_log_path.file_name().is_none() {
            return Err(ConfigError::InvalidConfig(format!(
                "Replay log path must name a file: {}",
                self.replay_log_path.display()
            )));
        }

        if self.replay_interval_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Replay interval must be greater than 0".to_string(),
            ));
        }

        if self.batch_max_entries == 0 {
            return Err(ConfigError::InvalidConfig(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if self.max_line_length < 2 {
            return Err(ConfigError::InvalidConfig(
                "Max line length must be at least 2 bytes".to_string(),
            ));
        }

        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Timeouts must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout_secs > self.request_timeout_secs {
            return Err(ConfigError::InvalidConfig(format!(
                "Connect timeout ({}s) must not exceed request timeout ({}s)",
                self.connect_timeout_secs, self.request_timeout_secs
            )));
        }

        Ok(())
    }
}
