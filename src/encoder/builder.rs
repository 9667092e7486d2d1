use super::error::{BuilderState, EncodingError};
use super::validation::{
    escape_string_value, escape_tag_value, is_valid_field_key, is_valid_measurement_name,
    is_valid_string_value, is_valid_tag_key, is_valid_tag_value,
};
use crate::domain::{EncodedRecord, FieldValue};

pub const DEFAULT_CAPACITY: usize = 1024;
pub const MIN_CAPACITY: usize = 64;
pub const MAX_CAPACITY: usize = 1024 * 1024;

/// Incremental writer for one line-protocol record.
///
/// Calls must follow `set_measurement -> add_tag* -> add_field+ ->
/// finalize`; anything out of order is an [`EncodingError::InvalidState`].
/// The buffer doubles as it grows and never exceeds [`MAX_CAPACITY`].
#[derive(Debug)]
pub struct LineBuilder {
    buffer: String,
    capacity: usize,
    state: BuilderState,
    tag_keys: Vec<String>,
    field_keys: Vec<String>,
    timestamp: Option<i64>,
}

impl Default for LineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuilder {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(initial_capacity: usize) -> Self {
        let capacity = initial_capacity.clamp(MIN_CAPACITY, MAX_CAPACITY);
        Self {
            buffer: String::with_capacity(capacity),
            capacity,
            state: BuilderState::Empty,
            tag_keys: Vec::new(),
            field_keys: Vec::new(),
            timestamp: None,
        }
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// Current logical capacity of the line buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Read-only view of what has been written so far.
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Clear all content; the allocated capacity is kept for reuse.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = BuilderState::Empty;
        self.tag_keys.clear();
        self.field_keys.clear();
        self.timestamp = None;
    }

    pub fn set_measurement(&mut self, name: &str) -> Result<&mut Self, EncodingError> {
        self.require_not_finalized("set measurement")?;
        if !is_valid_measurement_name(name) {
            return Err(EncodingError::InvalidMeasurement(name.to_string()));
        }

        self.reset();
        self.append(name)?;
        self.state = BuilderState::MeasurementSet;
        Ok(self)
    }

    pub fn add_tag(&mut self, key: &str, value: &str) -> Result<&mut Self, EncodingError> {
        match self.state {
            BuilderState::MeasurementSet | BuilderState::TagsAdded => {}
            state => {
                return Err(EncodingError::InvalidState {
                    operation: "add tag",
                    state,
                });
            }
        }
        if !is_valid_tag_key(key) {
            return Err(EncodingError::InvalidTagKey(key.to_string()));
        }
        if !is_valid_tag_value(value) {
            return Err(EncodingError::InvalidTagValue(key.to_string()));
        }
        if self.tag_keys.iter().any(|k| k == key) {
            return Err(EncodingError::DuplicateKey(key.to_string()));
        }

        let segment = format!(",{key}={}", escape_tag_value(value));
        self.append(&segment)?;
        self.tag_keys.push(key.to_string());
        self.state = BuilderState::TagsAdded;
        Ok(self)
    }

    pub fn add_field_double(&mut self, key: &str, value: f64) -> Result<&mut Self, EncodingError> {
        self.check_field("add field", key)?;
        if !value.is_finite() {
            return Err(EncodingError::NonFiniteValue {
                key: key.to_string(),
                value,
            });
        }
        self.push_field(key, &format!("{value:.6}"))
    }

    pub fn add_field_integer(&mut self, key: &str, value: i64) -> Result<&mut Self, EncodingError> {
        self.check_field("add field", key)?;
        self.push_field(key, &format!("{value}i"))
    }

    pub fn add_field_string(&mut self, key: &str, value: &str) -> Result<&mut Self, EncodingError> {
        self.check_field("add field", key)?;
        if !is_valid_string_value(value) {
            return Err(EncodingError::InvalidFieldValue(key.to_string()));
        }
        self.push_field(key, &format!("\"{}\"", escape_string_value(value)))
    }

    pub fn add_field_bool(&mut self, key: &str, value: bool) -> Result<&mut Self, EncodingError> {
        self.check_field("add field", key)?;
        self.push_field(key, if value { "true" } else { "false" })
    }

    pub fn add_field(&mut self, key: &str, value: &FieldValue) -> Result<&mut Self, EncodingError> {
        match value {
            FieldValue::Double(v) => self.add_field_double(key, *v),
            FieldValue::Integer(v) => self.add_field_integer(key, *v),
            FieldValue::String(v) => self.add_field_string(key, v),
            FieldValue::Boolean(v) => self.add_field_bool(key, *v),
        }
    }

    /// Seconds since the Unix epoch; rendered when the line is finalized.
    pub fn set_timestamp(&mut self, timestamp: i64) -> Result<&mut Self, EncodingError> {
        match self.state {
            BuilderState::Empty | BuilderState::Finalized => Err(EncodingError::InvalidState {
                operation: "set timestamp",
                state: self.state,
            }),
            _ => {
                self.timestamp = Some(timestamp);
                Ok(self)
            }
        }
    }

    /// Close the line and hand it out. Without an explicit timestamp the
    /// current time is used. The builder refuses further writes until
    /// [`LineBuilder::reset`] is called.
    pub fn finalize(&mut self) -> Result<EncodedRecord, EncodingError> {
        match self.state {
            BuilderState::FieldsAdded => {}
            BuilderState::MeasurementSet | BuilderState::TagsAdded => {
                return Err(EncodingError::NoFields);
            }
            state => {
                return Err(EncodingError::InvalidState {
                    operation: "finalize",
                    state,
                });
            }
        }

        let timestamp = self.timestamp.unwrap_or_else(current_timestamp);
        self.append(&format!(" {timestamp}\n"))?;
        self.state = BuilderState::Finalized;

        Ok(EncodedRecord::from_encoded(self.buffer.clone()))
    }

    fn require_not_finalized(&self, operation: &'static str) -> Result<(), EncodingError> {
        if self.state == BuilderState::Finalized {
            return Err(EncodingError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn check_field(&self, operation: &'static str, key: &str) -> Result<(), EncodingError> {
        match self.state {
            BuilderState::MeasurementSet | BuilderState::TagsAdded | BuilderState::FieldsAdded => {}
            state => return Err(EncodingError::InvalidState { operation, state }),
        }
        if !is_valid_field_key(key) {
            return Err(EncodingError::InvalidFieldKey(key.to_string()));
        }
        if self.field_keys.iter().any(|k| k == key) {
            return Err(EncodingError::DuplicateKey(key.to_string()));
        }
        Ok(())
    }

    fn push_field(&mut self, key: &str, rendered: &str) -> Result<&mut Self, EncodingError> {
        let separator = if self.state == BuilderState::FieldsAdded {
            ','
        } else {
            ' '
        };

        let mut segment = String::with_capacity(key.len() + rendered.len() + 2);
        segment.push(separator);
        segment.push_str(key);
        segment.push('=');
        segment.push_str(rendered);

        self.append(&segment)?;
        self.field_keys.push(key.to_string());
        self.state = BuilderState::FieldsAdded;
        Ok(self)
    }

    fn append(&mut self, segment: &str) -> Result<(), EncodingError> {
        self.ensure_capacity(segment.len())?;
        self.buffer.push_str(segment);
        Ok(())
    }

    fn ensure_capacity(&mut self, additional: usize) -> Result<(), EncodingError> {
        let required = self.buffer.len().saturating_add(additional);
        if required <= self.capacity {
            return Ok(());
        }
        if required > MAX_CAPACITY {
            return Err(EncodingError::BufferFull {
                requested: required,
                max: MAX_CAPACITY,
            });
        }

        let mut new_capacity = self.capacity;
        while new_capacity < required {
            new_capacity = new_capacity.saturating_mul(2);
        }
        let new_capacity = new_capacity.min(MAX_CAPACITY);

        self.buffer.reserve(new_capacity - self.buffer.len());
        self.capacity = new_capacity;
        Ok(())
    }
}

pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
