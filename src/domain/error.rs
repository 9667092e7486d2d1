use thiserror::Error;

/// Top-level error type for the telemetry pipeline.
#[derive(Error, Debug)]
pub enum ForwarderError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Encoding error: {0}")]
    Encoding(#[from] crate::encoder::EncodingError),

    #[error("Transport error: {0}")]
    Transport(#[from] crate::sender::ClientError),

    #[error("Replay log error: {0}")]
    Replay(#[from] crate::reliability::ReplayError),
}
