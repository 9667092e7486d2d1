use super::record::EncodedRecord;
use crate::encoder::{EncodingError, LineBuilder};

/// Typed payload of a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Double(f64),
    Integer(i64),
    String(String),
    Boolean(bool),
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Double(value as f64)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value as i64)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Integer(value as i64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

/// A structured measurement prior to encoding.
///
/// Tags and fields keep insertion order; re-adding an existing key replaces
/// its value in place. Validation happens in [`MetricPoint::encode`], which
/// drives a [`LineBuilder`] through its state machine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricPoint {
    pub measurement: String,
    pub tags: Vec<(String, String)>,
    pub fields: Vec<(String, FieldValue)>,
    /// Seconds since the Unix epoch. `None` means "now" at encode time.
    pub timestamp: Option<i64>,
}

impl MetricPoint {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            ..Self::default()
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.tags.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => self.tags.push((key, value)),
        }
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => self.fields.push((key, value)),
        }
        self
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Encode this point into a single wire-format line.
    pub fn encode(&self) -> Result<EncodedRecord, EncodingError> {
        let mut builder = LineBuilder::new();
        self.encode_with(&mut builder)
    }

    /// Encode using a caller-owned builder so its buffer can be reused.
    pub fn encode_with(&self, builder: &mut LineBuilder) -> Result<EncodedRecord, EncodingError> {
        builder.reset();
        builder.set_measurement(&self.measurement)?;

        for (key, value) in &self.tags {
            builder.add_tag(key, value)?;
        }

        for (key, value) in &self.fields {
            builder.add_field(key, value)?;
        }

        if let Some(ts) = self.timestamp {
            builder.set_timestamp(ts)?;
        }

        builder.finalize()
    }
}
