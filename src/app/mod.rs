pub mod config;
pub mod initialization;
pub mod logging_system;
pub mod service;
pub mod shutdown;

pub use config::{Config, ConfigError, LogFormat, LogLevel};
pub use initialization::InitializationError;
pub use logging_system::{LoggingSystem, setup_logging_safe};
pub use service::{ServiceError, ServiceManager};
pub use shutdown::SignalHandler;

use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct App {
    service_manager: ServiceManager,
}

impl App {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::from_args(args)?;
        Self::from_config(config)
    }

    /// A `config_file` replaces the remaining settings wholesale. Whichever
    /// source wins is validated here.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let config = match &config.config_file {
            Some(path) => {
                eprintln!("Loading configuration from file: {}", path.display());
                Config::from_file(path)?
            }
            None => {
                config.validate()?;
                config
            }
        };

        Ok(Self {
            service_manager: ServiceManager::new(config),
        })
    }

    pub fn config(&self) -> &Config {
        self.service_manager.config()
    }

    /// Forward stdin until EOF or a termination signal, then shut down.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let config = self.service_manager.config().clone();
        info!("Starting telemetry-forwarder v{}", crate::VERSION);
        info!(
            "Configuration: url={}, bucket={}, replay_log={}, shutdown_policy={}",
            config.influxdb_url,
            config.influxdb_bucket,
            config.replay_log_path.display(),
            config.shutdown
        );

        self.service_manager.start().await?;

        let signals = SignalHandler::install(CancellationToken::new());
        let stdin = BufReader::new(tokio::io::stdin());
        self.service_manager.forward(stdin, signals.token()).await?;

        let snapshot = self.service_manager.shutdown().await?;
        info!("Final statistics: {}", serde_json::to_string(&snapshot)?);
        Ok(())
    }
}

pub async fn main() -> anyhow::Result<()> {
    let app = App::from_args(std::env::args_os())?;

    let config = app.config();
    if let Err(e) = setup_logging_safe(config.log_level, config.log_format) {
        eprintln!("Warning: {e}");
    }

    app.run().await
}
