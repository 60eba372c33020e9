//! Integrity checks for stored message sets.
//!
//! Checks the structure of messages loaded from storage before they are
//! edited. Detects:
//! - Duplicate message names
//! - Message IDs that are not hexadecimal, or that repeat
//! - Variable sizes of zero or larger than the message capacity
//! - Variables listed twice in one packet
//! - Message indices that point outside the message list
//! - A message count that differs from the configuration
//!
//! Over-subscription is not an error: a message may hold more than its
//! capacity and reports a negative remaining value.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};
use crate::models::{Message, Variable};

/// Validation result.
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two messages share the same name.
    DuplicateName,
    /// A message ID is not hexadecimal.
    InvalidMessageId,
    /// Two (sub-)messages share the same ID.
    DuplicateMessageId,
    /// A variable size is zero or exceeds the message capacity.
    SizeOutOfRange,
    /// A packet lists the same variable twice.
    DuplicateAssignment,
    /// A variable records a message index outside the message list.
    InvalidMessageIndex,
    /// The number of messages differs from the configuration.
    MessageCountMismatch,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Parses a message ID.
///
/// An empty ID means "none" and yields `Ok(None)`. Otherwise the ID must be
/// hexadecimal with an optional `0x`/`0X` prefix.
///
/// # Example
///
/// ```
/// use u_slot::validation::parse_message_id;
///
/// assert_eq!(parse_message_id("0x1F").unwrap(), Some(31));
/// assert_eq!(parse_message_id("a0").unwrap(), Some(160));
/// assert_eq!(parse_message_id("").unwrap(), None);
/// assert!(parse_message_id("0x").is_err());
/// ```
pub fn parse_message_id(id: &str) -> Result<Option<u32>> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SchedulerError::InvalidMessageId(id.to_string()));
    }
    u32::from_str_radix(digits, 16)
        .map(Some)
        .map_err(|_| SchedulerError::InvalidMessageId(id.to_string()))
}

/// Validates a message set against its configuration.
///
/// Checks:
/// 1. Message count matches the configuration
/// 2. No duplicate message names
/// 3. Every non-empty ID is hexadecimal
/// 4. No two (sub-)messages share an ID
/// 5. Variable sizes are non-zero and within the capacity
/// 6. No packet lists a variable twice
/// 7. Recorded message indices exist
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_messages(messages: &[Message], config: &SchedulerConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if messages.len() != config.total_messages as usize {
        errors.push(ValidationError::new(
            ValidationErrorKind::MessageCountMismatch,
            format!(
                "Expected {} messages, found {}",
                config.total_messages,
                messages.len()
            ),
        ));
    }

    let mut names = HashSet::new();
    for m in messages {
        if !names.insert(m.name()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateName,
                format!("Duplicate message name: {}", m.name()),
            ));
        }
    }

    check_ids(messages, &mut errors);

    for m in messages {
        let mut seen = HashSet::new();
        for var in &m.variables {
            check_variable(m, var, messages.len(), &mut errors);
            if !seen.insert(var.name.as_str()) {
                errors.push(duplicate_assignment(m.name(), &var.name));
            }
        }
        for sub in m.sub_messages() {
            let mut seen_in_packet: HashSet<&str> = seen.clone();
            for var in &sub.variables {
                check_variable(m, var, messages.len(), &mut errors);
                if !seen_in_packet.insert(var.name.as_str()) {
                    errors.push(duplicate_assignment(sub.name(), &var.name));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_ids(messages: &[Message], errors: &mut Vec<ValidationError>) {
    // parsed ID -> first owner name
    let mut owners: HashMap<u32, &str> = HashMap::new();

    let ids = messages.iter().flat_map(|m| {
        std::iter::once((m.name(), m.id()))
            .chain(m.sub_messages().iter().skip(1).map(|s| (s.name(), s.id())))
    });

    for (owner, id) in ids {
        match parse_message_id(id) {
            Ok(None) => {}
            Ok(Some(value)) => {
                if let Some(first) = owners.get(&value) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::DuplicateMessageId,
                        format!("Message ID '{id}' of '{owner}' is already used by '{first}'"),
                    ));
                } else {
                    owners.insert(value, owner);
                }
            }
            Err(_) => errors.push(ValidationError::new(
                ValidationErrorKind::InvalidMessageId,
                format!("Message '{owner}' has a non-hexadecimal ID '{id}'"),
            )),
        }
    }
}

fn check_variable(
    message: &Message,
    var: &Variable,
    message_count: usize,
    errors: &mut Vec<ValidationError>,
) {
    if var.size == 0 || var.size > message.capacity {
        errors.push(ValidationError::new(
            ValidationErrorKind::SizeOutOfRange,
            format!(
                "Variable '{}' in '{}' has size {} (capacity {})",
                var.name,
                message.name(),
                var.size,
                message.capacity
            ),
        ));
    }

    // Sub-message placements record sub-message indices instead
    for &index in &var.message_indices {
        let limit = message_count.max(message.sub_message_count());
        if index >= limit {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidMessageIndex,
                format!(
                    "Variable '{}' references unknown message index {}",
                    var.name, index
                ),
            ));
        }
    }
}

fn duplicate_assignment(owner: &str, variable: &str) -> ValidationError {
    ValidationError::new(
        ValidationErrorKind::DuplicateAssignment,
        format!("Variable '{variable}' is listed twice in '{owner}'"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerKind;

    fn config(n: u32) -> SchedulerConfig {
        SchedulerConfig::new(SchedulerKind::Telemetry, n, n * 10, n)
    }

    fn sample_messages() -> Vec<Message> {
        let mut a = Message::new("Message_1", "0x10", 10);
        a.insert_variable(Variable::telemetry("x", "int", 4, 1.0), None);
        let mut b = Message::new("Message_2", "0x11", 10);
        b.add_sub_message("0x12");
        b.sub_message_mut(1)
            .unwrap()
            .insert_variable(Variable::telemetry("y", "int", 2, 0.5), None);
        vec![a, b]
    }

    #[test]
    fn test_valid_messages() {
        assert!(validate_messages(&sample_messages(), &config(2)).is_ok());
    }

    #[test]
    fn test_oversubscription_is_not_an_error() {
        let mut messages = sample_messages();
        messages[0].insert_variable(Variable::telemetry("z", "int", 8, 1.0), None);
        assert!(validate_messages(&messages, &config(2)).is_ok());
    }

    #[test]
    fn test_message_count_mismatch() {
        let errors = validate_messages(&sample_messages(), &config(3)).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::MessageCountMismatch));
    }

    #[test]
    fn test_duplicate_name() {
        let mut messages = sample_messages();
        messages[1].rename("Message_1");
        let errors = validate_messages(&messages, &config(2)).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateName));
    }

    #[test]
    fn test_invalid_and_duplicate_ids() {
        let mut messages = sample_messages();
        messages[0].set_id("0xZZ");
        messages[1].set_sub_message_id(1, "0X11");
        let errors = validate_messages(&messages, &config(2)).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidMessageId));
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateMessageId
                && e.message.contains("Message_2.1")));
    }

    #[test]
    fn test_default_sub_message_id_not_a_duplicate() {
        // Sub-message 0 mirrors the parent ID
        let messages = sample_messages();
        assert_eq!(messages[0].sub_message(0).unwrap().id(), "0x10");
        assert!(validate_messages(&messages, &config(2)).is_ok());
    }

    #[test]
    fn test_size_out_of_range() {
        let mut messages = sample_messages();
        messages[0].insert_variable(Variable::telemetry("big", "int", 11, 1.0), None);
        messages[1].insert_variable(Variable::telemetry("empty", "int", 0, 1.0), None);
        let errors = validate_messages(&messages, &config(2)).unwrap_err();
        let count = errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::SizeOutOfRange)
            .count();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_duplicate_in_packet() {
        let mut messages = sample_messages();
        messages[1].insert_variable(Variable::telemetry("y", "int", 2, 0.5), None);
        let errors = validate_messages(&messages, &config(2)).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateAssignment));
    }

    #[test]
    fn test_invalid_message_index() {
        let mut messages = sample_messages();
        let mut var = Variable::telemetry("w", "int", 1, 1.0);
        var.add_message_indices(&[5]);
        messages[0].insert_variable(var, None);
        let errors = validate_messages(&messages, &config(2)).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidMessageIndex));
    }

    #[test]
    fn test_multiple_errors() {
        let mut messages = sample_messages();
        messages[1].rename("Message_1");
        messages[0].set_id("nothex");
        let errors = validate_messages(&messages, &config(2)).unwrap_err();
        assert!(errors.len() >= 2);
        let e: SchedulerError = errors.into();
        assert!(matches!(e, SchedulerError::Validation(_)));
    }

    #[test]
    fn test_parse_message_id() {
        assert_eq!(parse_message_id(" 0x0A ").unwrap(), Some(10));
        assert_eq!(parse_message_id("FF").unwrap(), Some(255));
        assert!(parse_message_id("0xG").is_err());
        assert!(parse_message_id("-1").is_err());
        assert!(parse_message_id("1_0").is_err());
    }
}
