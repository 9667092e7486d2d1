use crate::encoder::EncodingError;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// One immutable wire-format line, always terminated by a single `\n`.
///
/// Cloning is cheap; the line is shared, never copied.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EncodedRecord {
    line: Arc<str>,
}

impl EncodedRecord {
    /// Wrap a line the encoder already finalized.
    pub(crate) fn from_encoded(line: String) -> Self {
        debug_assert!(line.ends_with('\n'));
        Self { line: line.into() }
    }

    /// Accept an already-encoded line from an external producer.
    ///
    /// A missing trailing newline is added; empty input and input holding
    /// more than one line are rejected.
    pub fn from_line(line: &str) -> Result<Self, EncodingError> {
        let body = line.strip_suffix('\n').unwrap_or(line);
        let body = body.strip_suffix('\r').unwrap_or(body);

        if body.trim().is_empty() {
            return Err(EncodingError::EmptyLine);
        }
        if body.contains(['\n', '\r']) {
            return Err(EncodingError::MultiLine);
        }

        let mut owned = String::with_capacity(body.len() + 1);
        owned.push_str(body);
        owned.push('\n');
        Ok(Self { line: owned.into() })
    }

    pub fn as_str(&self) -> &str {
        &self.line
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.line.as_bytes()
    }

    /// The line without its trailing newline.
    pub fn trimmed(&self) -> &str {
        self.line.strip_suffix('\n').unwrap_or(&self.line)
    }

    pub fn len(&self) -> usize {
        self.line.len()
    }

    pub fn is_empty(&self) -> bool {
        self.line.is_empty()
    }

    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.line.as_bytes())
    }
}

impl fmt::Debug for EncodedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EncodedRecord").field(&self.trimmed()).finish()
    }
}

impl fmt::Display for EncodedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.trimmed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_line_appends_newline() {
        let record = EncodedRecord::from_line("m a=1i 1").unwrap();
        assert_eq!(record.as_str(), "m a=1i 1\n");
        assert_eq!(record.trimmed(), "m a=1i 1");
    }

    #[test]
    fn test_from_line_keeps_single_newline() {
        let record = EncodedRecord::from_line("m a=1i 1\n").unwrap();
        assert_eq!(record.as_str(), "m a=1i 1\n");

        let record = EncodedRecord::from_line("m a=1i 1\r\n").unwrap();
        assert_eq!(record.as_str(), "m a=1i 1\n");
    }

    #[test]
    fn test_from_line_rejects_empty_and_multiline() {
        assert!(matches!(
            EncodedRecord::from_line(""),
            Err(EncodingError::EmptyLine)
        ));
        assert!(matches!(
            EncodedRecord::from_line("   \n"),
            Err(EncodingError::EmptyLine)
        ));
        assert!(matches!(
            EncodedRecord::from_line("m a=1i 1\nm a=2i 2\n"),
            Err(EncodingError::MultiLine)
        ));
    }
}
