//! Domain layer for telemetry-forwarder.
//!
//! Contains the canonical types shared across all modules:
//! - `MetricPoint`: A structured measurement before encoding
//! - `FieldValue`: Typed field payload (double/integer/string/boolean)
//! - `EncodedRecord`: One immutable wire-format line
//! - `ForwarderError`: Top-level error type

pub mod error;
pub mod point;
pub mod record;

pub use error::ForwarderError;
pub use point::{FieldValue, MetricPoint};
pub use record::EncodedRecord;
