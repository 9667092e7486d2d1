pub mod client;
pub mod dispatch;
pub mod stats;
pub mod transmission;
pub mod transport;

pub use client::{ClientConfig, ClientError, ConnectionStats, InfluxClient, build_write_url};
pub use dispatch::{DispatchWorker, ShutdownPolicy};
pub use stats::{PipelineStats, StatsSnapshot};
pub use transmission::{CONTENT_TYPE_LINE_PROTOCOL, TransmissionError};
pub use transport::{BatchTransport, RecordTransport};

#[cfg(test)]
pub use transport::{MockBatchTransport, MockRecordTransport};
