// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
#![allow(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::doc_markdown
)]

pub mod app;
pub mod buffer;
pub mod collector;
pub mod domain;
pub mod encoder;
pub mod pipeline;
pub mod reliability;
pub mod sender;

pub use app::{App, Config};
pub use domain::{EncodedRecord, FieldValue, ForwarderError, MetricPoint};
pub use pipeline::{Pipeline, PipelineConfig};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
