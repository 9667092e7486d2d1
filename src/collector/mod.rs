//! Producers that feed the pipeline.

pub mod publisher;
pub mod stdin;

pub use publisher::{ChannelReading, DEFAULT_SOURCE, GpsFix, SensorPublisher, build_point};
pub use stdin::{LineCounts, forward_lines};
