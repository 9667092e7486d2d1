use super::serde_helpers::{load_env_path, load_env_path_opt, load_env_string, load_env_var};
use super::{ConfigError, LogFormat, LogLevel};
use crate::pipeline::{DEFAULT_REPLAY_LOG_PATH, PipelineConfig};
use crate::reliability::{BatchConfig, ReplayBackoff};
use crate::sender::{ClientConfig, ShutdownPolicy};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Base URL of the time-series database
    #[arg(long, env = "INFLUXDB_URL", default_value = "http://localhost:8086")]
    pub influxdb_url: String,

    /// Organization the bucket belongs to
    #[arg(long, env = "INFLUXDB_ORG", default_value = "")]
    pub influxdb_org: String,

    /// Destination bucket
    #[arg(long, env = "INFLUXDB_BUCKET", default_value = "")]
    pub influxdb_bucket: String,

    /// API token sent as `Authorization: Token ..`
    #[arg(long, env = "INFLUXDB_TOKEN", default_value = "", hide_env_values = true)]
    pub influxdb_token: String,

    /// Replay log location; `<path>.tmp` is used as its staging file
    #[arg(long, env = "REPLAY_LOG_PATH", default_value = DEFAULT_REPLAY_LOG_PATH)]
    pub replay_log_path: PathBuf,

    /// Seconds between replay passes
    #[arg(long, env = "REPLAY_INTERVAL_SECS", default_value = "60")]
    pub replay_interval_secs: u64,

    /// Maximum entries per replay batch
    #[arg(long, env = "BATCH_MAX_ENTRIES", default_value = "5000")]
    pub batch_max_entries: usize,

    /// Longest replay entry in bytes, newline included
    #[arg(long, env = "MAX_LINE_LENGTH", default_value = "2048")]
    pub max_line_length: usize,

    /// Connect timeout in seconds
    #[arg(long, env = "CONNECT_TIMEOUT_SECS", default_value = "10")]
    pub connect_timeout_secs: u64,

    /// Total request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "20")]
    pub request_timeout_secs: u64,

    /// What happens to queued records at shutdown (abandon or spill)
    #[arg(long, env = "SHUTDOWN_POLICY", default_value = "abandon")]
    pub shutdown_policy: String,

    /// Delay strategy between replay passes (fixed or exponential)
    #[arg(long, env = "REPLAY_BACKOFF", default_value = "fixed")]
    pub replay_backoff: String,

    /// Upper bound for the exponential replay delay, in seconds
    #[arg(long, env = "REPLAY_MAX_DELAY_SECS", default_value = "900")]
    pub replay_max_delay_secs: u64,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", default_value = "compact")]
    pub log_format: LogFormat,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub replay_interval: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub connect_timeout: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub request_timeout: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub shutdown: ShutdownPolicy,

    #[serde(skip)]
    #[arg(skip)]
    pub backoff: ReplayBackoff,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            influxdb_url: "http://localhost:8086".to_string(),
            influxdb_org: String::new(),
            influxdb_bucket: String::new(),
            influxdb_token: String::new(),
            replay_log_path: PathBuf::from(DEFAULT_REPLAY_LOG_PATH),
            replay_interval_secs: 60,
            batch_max_entries: 5000,
            max_line_length: 2048,
            connect_timeout_secs: 10,
            request_timeout_secs: 20,
            shutdown_policy: "abandon".to_string(),
            replay_backoff: "fixed".to_string(),
            replay_max_delay_secs: 900,
            log_level: LogLevel::Info,
            log_format: LogFormat::Compact,
            config_file: None,
            replay_interval: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(20),
            shutdown: ShutdownPolicy::Abandon,
            backoff: ReplayBackoff::Fixed,
        }
    }
}

impl Config {
    /// Parse command-line arguments with env fallbacks. Not validated:
    /// a `config_file` may still supply the required settings.
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::parse_from(args);
        config.post_process()?;
        Ok(config)
    }

    /// Build from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        load_env_string("INFLUXDB_URL", &mut config.influxdb_url);
        load_env_string("INFLUXDB_ORG", &mut config.influxdb_org);
        load_env_string("INFLUXDB_BUCKET", &mut config.influxdb_bucket);
        load_env_string("INFLUXDB_TOKEN", &mut config.influxdb_token);
        load_env_path("REPLAY_LOG_PATH", &mut config.replay_log_path);
        load_env_var("REPLAY_INTERVAL_SECS", &mut config.replay_interval_secs)?;
        load_env_var("BATCH_MAX_ENTRIES", &mut config.batch_max_entries)?;
        load_env_var("MAX_LINE_LENGTH", &mut config.max_line_length)?;
        load_env_var("CONNECT_TIMEOUT_SECS", &mut config.connect_timeout_secs)?;
        load_env_var("REQUEST_TIMEOUT_SECS", &mut config.request_timeout_secs)?;
        load_env_string("SHUTDOWN_POLICY", &mut config.shutdown_policy);
        load_env_string("REPLAY_BACKOFF", &mut config.replay_backoff);
        load_env_var("REPLAY_MAX_DELAY_SECS", &mut config.replay_max_delay_secs)?;
        load_env_var("LOG_LEVEL", &mut config.log_level)?;
        load_env_var("LOG_FORMAT", &mut config.log_format)?;
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

    /// Derive durations and parse the policy strings.
    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.replay_interval = Duration::from_secs(self.replay_interval_secs);
        self.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        self.request_timeout = Duration::from_secs(self.request_timeout_secs);

        self.shutdown = self
            .shutdown_policy
            .parse::<ShutdownPolicy>()
            .map_err(ConfigError::InvalidConfig)?;

        self.backoff = match self
            .replay_backoff
            .parse::<ReplayBackoff>()
            .map_err(ConfigError::InvalidConfig)?
        {
            ReplayBackoff::Exponential { jitter, .. } => ReplayBackoff::Exponential {
                max_delay: Duration::from_secs(self.replay_max_delay_secs),
                jitter,
            },
            fixed => fixed,
        };

        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.influxdb_url.clone(),
            org: self.influxdb_org.clone(),
            bucket: self.influxdb_bucket.clone(),
            token: self.influxdb_token.clone(),
            timeout: self.request_timeout,
            connection_timeout: self.connect_timeout,
            ..ClientConfig::default()
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            replay_log_path: self.replay_log_path.clone(),
            batch: BatchConfig {
                interval: self.replay_interval,
                max_entries: self.batch_max_entries,
                max_line_length: self.max_line_length,
                backoff: self.backoff,
            },
            shutdown_policy: self.shutdown,
        }
    }
}
