//! Durable overflow storage and its replay.
//!
//! Records the dispatch worker could not deliver land in the [`ReplayLog`];
//! the [`BatchProcessor`] periodically drains it in gzip batches.

pub mod backoff;
pub mod batch;
pub mod compression;
pub mod replay;

pub use backoff::{DEFAULT_MAX_REPLAY_DELAY, ReplayBackoff};
pub use batch::{
    BatchConfig, BatchProcessor, DEFAULT_MAX_BATCH_ENTRIES, DEFAULT_MAX_LINE_LENGTH,
    DEFAULT_REPLAY_INTERVAL,
};
pub use compression::{gunzip, gzip};
pub use replay::{ReplayError, ReplayLog, ReplayReport};
