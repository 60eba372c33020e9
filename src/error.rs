//! Error type for scheduler edits.
//!
//! Every rejected edit surfaces as a [`SchedulerError`]. Mutating
//! operations validate before they touch state, so an `Err` always means
//! the editor is unchanged.

use thiserror::Error;

use crate::validation::ValidationError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// The single user-facing error type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulerError {
    /// A message name is empty or already used by another message.
    #[error("message name '{0}' is empty or already in use")]
    DuplicateName(String),

    /// A message ID is not a hexadecimal value.
    #[error("invalid message ID '{0}': expected hexadecimal (optional 0x prefix)")]
    InvalidMessageId(String),

    /// A message ID is already assigned to another message.
    #[error("message ID '{0}' is already assigned")]
    DuplicateMessageId(String),

    /// A size or count lies outside its allowed range.
    #[error("{what} {value} is out of range ({min}..={max})")]
    OutOfRange {
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// No message at the given index.
    #[error("no message at index {0}")]
    UnknownMessage(usize),

    /// No sub-message at the given index of a message.
    #[error("message {message} has no sub-message {sub_message}")]
    UnknownSubMessage { message: usize, sub_message: usize },

    /// A rate string could not be parsed or is not positive.
    #[error("invalid rate '{0}'")]
    InvalidRate(String),

    /// A placement option string could not be parsed.
    #[error("invalid placement option '{0}'")]
    InvalidOption(String),

    /// The background worker terminated without returning a result.
    #[error("background worker failed: {0}")]
    Worker(String),

    /// The editor was edited after a background run started from it.
    #[error("messages changed while the background auto-fill was running")]
    Diverged,

    /// One or more validation checks failed.
    #[error("{} validation error(s), first: {}", .0.len(), first_message(.0))]
    Validation(Vec<ValidationError>),
}

fn first_message(errors: &[ValidationError]) -> &str {
    errors.first().map(|e| e.message.as_str()).unwrap_or("")
}

impl From<Vec<ValidationError>> for SchedulerError {
    fn from(errors: Vec<ValidationError>) -> Self {
        SchedulerError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn test_display_messages() {
        let e = SchedulerError::InvalidMessageId("0xZZ".into());
        assert!(e.to_string().contains("0xZZ"));

        let e = SchedulerError::OutOfRange {
            what: "size",
            value: 0,
            min: 1,
            max: 10,
        };
        assert_eq!(e.to_string(), "size 0 is out of range (1..=10)");
    }

    #[test]
    fn test_from_validation_errors() {
        let errors = vec![ValidationError::new(
            ValidationErrorKind::DuplicateName,
            "Duplicate message name: Message_1",
        )];
        let e: SchedulerError = errors.into();
        assert!(e.to_string().starts_with("1 validation error(s)"));
        assert!(e.to_string().contains("Message_1"));
    }
}
