//! Data stream model.
//!
//! A data stream groups the messages of one rate column with the variables
//! that were assigned to them. It is the unit a caller stores and reloads.

use serde::{Deserialize, Serialize};

use super::{Message, Variable};

/// Messages and assigned variables of one rate column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataStream {
    /// Rate column name. Empty for application time slots.
    pub rate_name: String,
    pub messages: Vec<Message>,
    /// Variables placed in the messages, with their message indices.
    pub variables: Vec<Variable>,
}

impl DataStream {
    /// Creates an empty stream for a rate column.
    pub fn new(rate_name: impl Into<String>) -> Self {
        Self {
            rate_name: rate_name.into(),
            ..Self::default()
        }
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_variables(mut self, variables: Vec<Variable>) -> Self {
        self.variables = variables;
        self
    }

    /// Finds a stored variable by name.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }
}
