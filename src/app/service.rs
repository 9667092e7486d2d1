use super::config::{Config, ConfigError};
use crate::collector::{LineCounts, forward_lines};
use crate::domain::ForwarderError;
use crate::pipeline::Pipeline;
use crate::sender::{ClientError, InfluxClient, StatsSnapshot};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Sender error: {0}")]
    SenderError(#[from] ClientError),
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] ForwarderError),
    #[error("Input error: {0}")]
    InputError(#[from] std::io::Error),
    #[error("Service not initialized")]
    NotInitialized,
    #[error("Service already running")]
    AlreadyRunning,
    #[error("Shutdown timeout")]
    ShutdownTimeout,
}

/// Owns the pipeline for the lifetime of the process.
pub struct ServiceManager {
    config: Config,
    pipeline: Option<Arc<Pipeline>>,
    start_time: Instant,
}

impl ServiceManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            pipeline: None,
            start_time: Instant::now(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pipeline(&self) -> Option<&Arc<Pipeline>> {
        self.pipeline.as_ref()
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub async fn start(&mut self) -> Result<Arc<Pipeline>, ServiceError> {
        if self.pipeline.is_some() {
            return Err(ServiceError::AlreadyRunning);
        }

        let client = InfluxClient::new(self.config.client_config())?;
        info!("Writing to {}", client.write_url());

        let client = Arc::new(client);
        let pipeline = Arc::new(
            Pipeline::start(self.config.pipeline_config(), client.clone(), client).await?,
        );

        self.start_time = Instant::now();
        self.pipeline = Some(pipeline.clone());
        Ok(pipeline)
    }

    /// Forward lines from `reader` until it closes or `cancel` fires.
    pub async fn forward<R>(
        &self,
        reader: R,
        cancel: &CancellationToken,
    ) -> Result<LineCounts, ServiceError>
    where
        R: AsyncBufRead + Unpin,
    {
        let pipeline = self.pipeline.as_ref().ok_or(ServiceError::NotInitialized)?;
        let counts = forward_lines(reader, pipeline, cancel).await?;
        info!(
            "Input finished: {} accepted, {} rejected, {} blank",
            counts.accepted, counts.rejected, counts.skipped
        );
        Ok(counts)
    }

    /// Stop the pipeline, allowing in-flight requests to reach their
    /// timeout before giving up.
    pub async fn shutdown(&mut self) -> Result<StatsSnapshot, ServiceError> {
        let pipeline = self.pipeline.take().ok_or(ServiceError::NotInitialized)?;
        let grace = self.config.request_timeout + Duration::from_secs(5);

        match tokio::time::timeout(grace, pipeline.shutdown()).await {
            Ok(snapshot) => Ok(snapshot),
            Err(_) => {
                error!("Pipeline did not stop within {:?}", grace);
                Err(ServiceError::ShutdownTimeout)
            }
        }
    }
}
