//! Message (time slot) model.
//!
//! A message is a fixed-capacity container sent once per cycle. Each
//! message owns a list of sub-messages; sub-message `i` is sent on every
//! `n`-th cycle and carries the parent's variables plus its own. The
//! default sub-message 0 always exists and shares the parent's ID.
//!
//! Remaining bytes are stored, not derived: [`crate::budget::recompute`]
//! refreshes them after every change to the variable lists.

use serde::{Deserialize, Serialize};

use super::Variable;

/// A top-level message or time slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    name: String,
    id: String,
    /// Capacity in bytes (or time units for time slots).
    pub capacity: u32,
    pub(crate) bytes_remaining: i64,
    /// Variables sent in every sub-message of this message.
    pub variables: Vec<Variable>,
    pub(crate) sub_messages: Vec<SubMessage>,
}

/// A subdivision of a message, sent on a subset of cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubMessage {
    name: String,
    id: String,
    pub(crate) bytes_remaining: i64,
    /// Variables sent only with this sub-message.
    pub variables: Vec<Variable>,
}

impl Message {
    /// Creates an empty message with its default sub-message.
    pub fn new(name: impl Into<String>, id: impl Into<String>, capacity: u32) -> Self {
        let mut message = Self {
            name: name.into(),
            id: id.into(),
            capacity,
            bytes_remaining: i64::from(capacity),
            variables: Vec::new(),
            sub_messages: Vec::new(),
        };
        let id = message.id.clone();
        message.add_sub_message(id);
        message
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the message; sub-message names become `<name>.<index>`.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        for (index, sub) in self.sub_messages.iter_mut().enumerate() {
            sub.name = format!("{}.{}", self.name, index);
        }
    }

    /// Adds the default sub-message if a stored message lacks it, and
    /// re-mirrors the parent ID onto it.
    pub(crate) fn ensure_default_sub_message(&mut self) {
        if self.sub_messages.is_empty() {
            let id = self.id.clone();
            self.add_sub_message(id);
        } else {
            self.sub_messages[0].id = self.id.clone();
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sets the message ID. The default sub-message takes the same ID.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
        if let Some(default) = self.sub_messages.first_mut() {
            default.id = self.id.clone();
        }
    }

    /// Sets a sub-message ID. Setting the default sub-message's ID also
    /// sets the parent's.
    ///
    /// Returns `false` if the sub-message does not exist.
    pub fn set_sub_message_id(&mut self, index: usize, id: impl Into<String>) -> bool {
        if index == 0 {
            self.set_id(id);
            return !self.sub_messages.is_empty();
        }
        match self.sub_messages.get_mut(index) {
            Some(sub) => {
                sub.id = id.into();
                true
            }
            None => false,
        }
    }

    /// Remaining bytes of the message: the smallest value across the
    /// message itself and its sub-message packets. Negative when
    /// over-subscribed.
    pub fn bytes_remaining(&self) -> i64 {
        self.sub_messages
            .iter()
            .map(|s| s.bytes_remaining)
            .fold(self.bytes_remaining, i64::min)
    }

    /// Remaining bytes counting only the parent's own variables.
    pub fn own_bytes_remaining(&self) -> i64 {
        self.bytes_remaining
    }

    pub fn sub_messages(&self) -> &[SubMessage] {
        &self.sub_messages
    }

    pub fn sub_message(&self, index: usize) -> Option<&SubMessage> {
        self.sub_messages.get(index)
    }

    pub fn sub_message_mut(&mut self, index: usize) -> Option<&mut SubMessage> {
        self.sub_messages.get_mut(index)
    }

    pub fn sub_message_count(&self) -> usize {
        self.sub_messages.len()
    }

    /// Appends a sub-message named `<message>.<index>`.
    pub fn add_sub_message(&mut self, id: impl Into<String>) {
        let name = format!("{}.{}", self.name, self.sub_messages.len());
        self.sub_messages.push(SubMessage {
            name,
            id: id.into(),
            bytes_remaining: self.bytes_remaining,
            variables: Vec::new(),
        });
    }

    /// Removes the sub-message at `index`, if present.
    pub fn remove_sub_message(&mut self, index: usize) -> Option<SubMessage> {
        if index < self.sub_messages.len() {
            Some(self.sub_messages.remove(index))
        } else {
            None
        }
    }

    /// Whether the parent's own list holds a variable with this name.
    pub fn contains_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v.name == name)
    }

    /// Finds a variable in the parent or, failing that, in a sub-message.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .or_else(|| self.sub_messages.iter().find_map(|s| s.variable(name)))
    }

    /// Inserts a variable at `position`, or appends when `None`.
    pub fn insert_variable(&mut self, variable: Variable, position: Option<usize>) {
        let position = position
            .unwrap_or(self.variables.len())
            .min(self.variables.len());
        self.variables.insert(position, variable);
    }

    /// Removes a variable from the parent or, if absent there, from every
    /// sub-message holding it. Returns the first removed instance.
    pub fn remove_variable(&mut self, name: &str) -> Option<Variable> {
        if let Some(pos) = self.variables.iter().position(|v| v.name == name) {
            return Some(self.variables.remove(pos));
        }
        let mut removed = None;
        for sub in &mut self.sub_messages {
            if let Some(var) = sub.remove_variable(name) {
                removed.get_or_insert(var);
            }
        }
        removed
    }

    /// Parent variables followed by sub-message variables, each name once.
    pub fn all_variables(&self) -> Vec<&Variable> {
        let mut all: Vec<&Variable> = self.variables.iter().collect();
        for sub in &self.sub_messages {
            for var in &sub.variables {
                if !all.iter().any(|v| v.name == var.name) {
                    all.push(var);
                }
            }
        }
        all
    }

    /// The full packet of a sub-message: parent variables, then its own.
    pub fn packet(&self, sub_index: usize) -> Option<Vec<&Variable>> {
        let sub = self.sub_messages.get(sub_index)?;
        Some(self.variables.iter().chain(sub.variables.iter()).collect())
    }

    /// Whether any sub-message holds variables.
    pub fn has_sub_message_variables(&self) -> bool {
        self.sub_messages.iter().any(|s| !s.variables.is_empty())
    }

    /// Number of variables in the parent's own list.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }
}

impl SubMessage {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Remaining bytes of the full packet (parent + own variables).
    pub fn bytes_remaining(&self) -> i64 {
        self.bytes_remaining
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn contains_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v.name == name)
    }

    pub fn insert_variable(&mut self, variable: Variable, position: Option<usize>) {
        let position = position
            .unwrap_or(self.variables.len())
            .min(self.variables.len());
        self.variables.insert(position, variable);
    }

    pub fn remove_variable(&mut self, name: &str) -> Option<Variable> {
        let pos = self.variables.iter().position(|v| v.name == name)?;
        Some(self.variables.remove(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, size: u32) -> Variable {
        Variable::telemetry(name, "int", size, 1.0)
    }

    #[test]
    fn test_new_message_has_default_sub_message() {
        let m = Message::new("Message_1", "0x100", 32);
        assert_eq!(m.sub_message_count(), 1);
        let sub = m.sub_message(0).unwrap();
        assert_eq!(sub.name(), "Message_1.0");
        assert_eq!(sub.id(), "0x100");
        assert_eq!(m.bytes_remaining(), 32);
    }

    #[test]
    fn test_rename_updates_sub_messages() {
        let mut m = Message::new("Message_1", "", 32);
        m.add_sub_message("");
        m.rename("HK");
        assert_eq!(m.name(), "HK");
        assert_eq!(m.sub_message(0).unwrap().name(), "HK.0");
        assert_eq!(m.sub_message(1).unwrap().name(), "HK.1");
    }

    #[test]
    fn test_rename_rebuilds_foreign_sub_message_names() {
        let mut m = Message::new("Message_1", "", 32);
        m.add_sub_message("");
        m.sub_messages[1].name = "Legacy.1".to_string();
        m.rename("Legacy_HK");
        assert_eq!(m.sub_message(0).unwrap().name(), "Legacy_HK.0");
        assert_eq!(m.sub_message(1).unwrap().name(), "Legacy_HK.1");
    }

    #[test]
    fn test_ensure_default_sub_message() {
        let mut m = Message::new("Message_1", "0x7", 32);
        m.sub_messages.clear();
        m.ensure_default_sub_message();
        assert_eq!(m.sub_message_count(), 1);
        assert_eq!(m.sub_message(0).unwrap().name(), "Message_1.0");
        assert_eq!(m.sub_message(0).unwrap().id(), "0x7");

        m.sub_messages[0].id = "0x8".to_string();
        m.ensure_default_sub_message();
        assert_eq!(m.sub_message(0).unwrap().id(), "0x7");
    }

    #[test]
    fn test_default_sub_message_id_mirrors_parent() {
        let mut m = Message::new("Message_1", "", 32);
        m.add_sub_message("0x2");
        m.set_id("0x10");
        assert_eq!(m.sub_message(0).unwrap().id(), "0x10");

        assert!(m.set_sub_message_id(0, "0x11"));
        assert_eq!(m.id(), "0x11");

        assert!(m.set_sub_message_id(1, "0x3"));
        assert_eq!(m.id(), "0x11");
        assert!(!m.set_sub_message_id(5, "0x4"));
    }

    #[test]
    fn test_variable_lookup_falls_back_to_sub_messages() {
        let mut m = Message::new("Message_1", "", 32);
        m.add_sub_message("");
        m.insert_variable(var("a", 4), None);
        m.sub_message_mut(1).unwrap().insert_variable(var("b", 2), None);

        assert!(m.contains_variable("a"));
        assert!(!m.contains_variable("b"));
        assert_eq!(m.variable("b").unwrap().size, 2);
        assert!(m.variable("c").is_none());
    }

    #[test]
    fn test_remove_variable_from_all_sub_messages() {
        let mut m = Message::new("Message_1", "", 32);
        m.add_sub_message("");
        m.sub_message_mut(0).unwrap().insert_variable(var("b", 2), None);
        m.sub_message_mut(1).unwrap().insert_variable(var("b", 2), None);

        let removed = m.remove_variable("b").unwrap();
        assert_eq!(removed.name, "b");
        assert!(!m.has_sub_message_variables());
        assert!(m.remove_variable("b").is_none());
    }

    #[test]
    fn test_all_variables_deduplicates() {
        let mut m = Message::new("Message_1", "", 32);
        m.add_sub_message("");
        m.insert_variable(var("a", 4), None);
        m.sub_message_mut(0).unwrap().insert_variable(var("b", 2), None);
        m.sub_message_mut(1).unwrap().insert_variable(var("b", 2), None);

        let names: Vec<_> = m.all_variables().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_packet_includes_parent_variables() {
        let mut m = Message::new("Message_1", "", 32);
        m.insert_variable(var("a", 4), None);
        m.sub_message_mut(0).unwrap().insert_variable(var("b", 2), None);

        let names: Vec<_> = m.packet(0).unwrap().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(m.packet(3).is_none());
    }

    #[test]
    fn test_insert_position_clamped() {
        let mut m = Message::new("Message_1", "", 32);
        m.insert_variable(var("a", 1), None);
        m.insert_variable(var("b", 1), Some(0));
        m.insert_variable(var("c", 1), Some(99));
        let names: Vec<_> = m.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_remove_sub_message_out_of_range() {
        let mut m = Message::new("Message_1", "", 32);
        assert!(m.remove_sub_message(1).is_none());
        assert!(m.remove_sub_message(0).is_some());
        assert_eq!(m.sub_message_count(), 0);
    }
}
