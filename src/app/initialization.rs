use super::config::LogLevel;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InitializationError {
    #[error("Invalid log level '{input}'")]
    InvalidLogLevel { input: String },

    #[error("Invalid directive format '{input}'. Expected: 'target=level'")]
    InvalidDirectiveFormat { input: String },

    #[error("Empty target in directive '{input}'")]
    EmptyTarget { input: String },

    #[error("Logging system initialization failed: {details}")]
    LoggingInitFailed {
        details: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl InitializationError {
    /// A bad directive can be skipped or downgraded; a failed subscriber
    /// install cannot.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, InitializationError::LoggingInitFailed { .. })
    }
}

/// One `target=level` entry of an `EnvFilter` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDirective {
    pub target: String,
    pub level: LogLevel,
}

impl LogDirective {
    pub fn new(target: impl Into<String>, level: LogLevel) -> Self {
        Self {
            target: target.into(),
            level,
        }
    }

    pub fn parse(directive: &str) -> Result<Self, InitializationError> {
        let Some((target, level)) = directive.split_once('=') else {
            return Err(InitializationError::InvalidDirectiveFormat {
                input: directive.to_string(),
            });
        };
        if level.contains('=') {
            return Err(InitializationError::InvalidDirectiveFormat {
                input: directive.to_string(),
            });
        }

        let target = target.trim();
        if target.is_empty() {
            return Err(InitializationError::EmptyTarget {
                input: directive.to_string(),
            });
        }

        let level = LogLevel::from_str(level.trim()).map_err(|_| {
            InitializationError::InvalidLogLevel {
                input: level.trim().to_string(),
            }
        })?;

        Ok(LogDirective::new(target, level))
    }

    pub fn to_filter_string(&self) -> String {
        format!("{}={}", self.target, self.level.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_parsing_valid_cases() {
        let valid_cases = [
            ("hyper=warn", "hyper", LogLevel::Warn),
            ("reqwest = error", "reqwest", LogLevel::Error),
            ("telemetry_forwarder=DEBUG", "telemetry_forwarder", LogLevel::Debug),
        ];

        for (input, target, level) in valid_cases {
            let directive = LogDirective::parse(input).unwrap();
            assert_eq!(directive.target, target);
            assert_eq!(directive.level, level);
        }
    }

    #[test]
    fn test_directive_parsing_invalid_cases() {
        let invalid_cases = [
            ("", "empty string"),
            ("hyper", "missing level"),
            ("=warn", "empty target"),
            ("hyper=", "empty level"),
            ("hyper=loud", "invalid level"),
            ("hyper=warn=extra", "too many parts"),
        ];

        for (input, description) in invalid_cases {
            assert!(
                LogDirective::parse(input).is_err(),
                "Should fail for {description}: {input}"
            );
        }
    }

    #[test]
    fn test_to_filter_string() {
        assert_eq!(
            LogDirective::new("h2", LogLevel::Warn).to_filter_string(),
            "h2=warn"
        );
    }

    #[test]
    fn test_recoverability() {
        assert!(
            InitializationError::EmptyTarget {
                input: "=warn".to_string()
            }
            .is_recoverable()
        );
        assert!(
            !InitializationError::LoggingInitFailed {
                details: "test".to_string(),
                source: Box::new(std::io::Error::other("test")),
            }
            .is_recoverable()
        );
    }
}
