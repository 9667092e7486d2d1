use thiserror::Error;

/// Position of a [`super::LineBuilder`] in its build sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    Empty,
    MeasurementSet,
    TagsAdded,
    FieldsAdded,
    Finalized,
}

impl BuilderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuilderState::Empty => "empty",
            BuilderState::MeasurementSet => "measurement set",
            BuilderState::TagsAdded => "tags added",
            BuilderState::FieldsAdded => "fields added",
            BuilderState::Finalized => "finalized",
        }
    }
}

impl std::fmt::Display for BuilderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    #[error("Invalid measurement name: '{0}'")]
    InvalidMeasurement(String),

    #[error("Invalid tag key: '{0}'")]
    InvalidTagKey(String),

    #[error("Invalid value for tag '{0}'")]
    InvalidTagValue(String),

    #[error("Invalid field key: '{0}'")]
    InvalidFieldKey(String),

    #[error("Invalid value for field '{0}'")]
    InvalidFieldValue(String),

    #[error("Non-finite value {value} for field '{key}'")]
    NonFiniteValue { key: String, value: f64 },

    #[error("Duplicate key: '{0}'")]
    DuplicateKey(String),

    #[error("Cannot {operation} in state '{state}'")]
    InvalidState {
        operation: &'static str,
        state: BuilderState,
    },

    #[error("At least one field is required")]
    NoFields,

    #[error("Buffer full: {requested} bytes requested, limit is {max} bytes")]
    BufferFull { requested: usize, max: usize },

    #[error("Empty line")]
    EmptyLine,

    #[error("Input contains more than one line")]
    MultiLine,
}

impl EncodingError {
    /// True when the builder ran into its capacity limit rather than
    /// rejecting the content itself.
    pub fn is_capacity_error(&self) -> bool {
        matches!(self, EncodingError::BufferFull { .. })
    }

    pub fn is_state_violation(&self) -> bool {
        matches!(self, EncodingError::InvalidState { .. })
    }
}
