//! Line-protocol encoder.
//!
//! Turns a measurement into one validated wire-format line:
//! `measurement[,tag=value]* field=value[,field=value]* timestamp\n`.

pub mod builder;
pub mod error;
pub mod validation;

pub use builder::{DEFAULT_CAPACITY, LineBuilder, MAX_CAPACITY, current_timestamp};
pub use error::{BuilderState, EncodingError};
pub use validation::{
    escape_string_value, escape_tag_value, is_valid_field_key, is_valid_measurement_name,
    is_valid_tag_key,
};
