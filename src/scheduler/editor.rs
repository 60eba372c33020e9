//! Scheduler editor: the messages of one rate column and the edits on them.
//!
//! The editor owns its messages. Every edit validates its arguments first
//! and then recomputes the affected budgets, so after any call
//!
//! ```text
//! remaining = capacity - packed_size(assigned variables)
//! ```
//!
//! holds for every message and sub-message.
//!
//! Edits are held in memory until the caller stores them. [`commit`]
//! marks the current state as stored, [`is_changed`] compares against it,
//! and [`revert`] discards everything since.
//!
//! [`commit`]: SchedulerEditor::commit
//! [`is_changed`]: SchedulerEditor::is_changed
//! [`revert`]: SchedulerEditor::revert

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info, warn};

use super::options::{enumerate_options, PlacementOption, Target};
use crate::budget::{self, Insertion, PackingPolicy};
use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};
use crate::models::{DataStream, Message, SubMessage, Variable};
use crate::validation::{parse_message_id, validate_messages};

/// Editable message set for one rate column or time-slot table.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use u_slot::budget::{ReferenceOrder, TelemetryPolicy};
/// use u_slot::config::{SchedulerConfig, SchedulerKind};
/// use u_slot::models::Variable;
/// use u_slot::scheduler::SchedulerEditor;
///
/// // 4 messages of 16 bytes, 1 second cycle
/// let config = SchedulerConfig::new(SchedulerKind::Telemetry, 4, 64, 4);
/// let policy = Arc::new(TelemetryPolicy::new(ReferenceOrder::new(["a", "b"])));
/// let mut editor = SchedulerEditor::new(config, policy).unwrap();
///
/// let options = editor.message_availability(2.0);
/// editor.assign(vec![Variable::telemetry("a", "int32", 4, 2.0)], &options[0]).unwrap();
///
/// assert_eq!(editor.message(0).unwrap().bytes_remaining(), 12);
/// assert_eq!(editor.message(2).unwrap().bytes_remaining(), 12);
/// assert_eq!(editor.total_bytes_remaining(), 56);
/// ```
#[derive(Debug, Clone)]
pub struct SchedulerEditor {
    config: SchedulerConfig,
    policy: Arc<dyn PackingPolicy>,
    messages: Vec<Message>,
    committed: Vec<Message>,
}

impl SchedulerEditor {
    /// Creates an editor with empty, generated messages.
    pub fn new(config: SchedulerConfig, policy: Arc<dyn PackingPolicy>) -> Result<Self> {
        config.validate()?;
        let messages = fresh_messages(&config);
        let mut editor = Self {
            config,
            policy,
            messages,
            committed: Vec::new(),
        };
        editor.commit();
        Ok(editor)
    }

    /// Creates an editor from stored messages.
    ///
    /// Stored messages are used only when their count matches the
    /// configured message count; otherwise the editor starts empty. Used
    /// messages are resized to the configured message size, given their
    /// default sub-message if missing, and validated.
    pub fn with_stored(
        config: SchedulerConfig,
        policy: Arc<dyn PackingPolicy>,
        stored: Vec<Message>,
    ) -> Result<Self> {
        config.validate()?;
        let messages = if stored.len() == config.total_messages as usize {
            let capacity = config.empty_message_size();
            let mut messages = stored;
            for message in &mut messages {
                message.capacity = capacity;
                message.ensure_default_sub_message();
            }
            validate_messages(&messages, &config)?;
            messages
        } else {
            warn!(
                "stored message count {} does not match {}; starting with empty messages",
                stored.len(),
                config.total_messages
            );
            fresh_messages(&config)
        };
        let mut editor = Self {
            config,
            policy,
            messages,
            committed: Vec::new(),
        };
        editor.recompute_all();
        editor.commit();
        Ok(editor)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn policy(&self) -> &dyn PackingPolicy {
        self.policy.as_ref()
    }

    /// Seconds per cycle.
    pub fn period(&self) -> f32 {
        self.config.period()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    /// Message or sub-message at a target.
    pub fn target_remaining(&self, target: Target) -> Option<i64> {
        match target {
            Target::Message(i) => self.messages.get(i).map(Message::bytes_remaining),
            Target::SubMessage { parent, index } => self
                .messages
                .get(parent)
                .and_then(|m| m.sub_message(index))
                .map(SubMessage::bytes_remaining),
        }
    }

    /// Placement options for a variable at `rate` Hz.
    pub fn message_availability(&self, rate: f32) -> Vec<PlacementOption> {
        enumerate_options(&self.messages, self.period(), rate)
    }

    /// Display form of an option.
    pub fn option_label(&self, option: &PlacementOption) -> String {
        option.label(&self.messages)
    }

    /// Parses an option from its display form.
    pub fn parse_option(&self, label: &str) -> Result<PlacementOption> {
        PlacementOption::parse(label, &self.messages)
    }

    /// Whether a rate is slower than once per cycle.
    pub fn is_sub_rate(&self, rate: f32) -> bool {
        rate < 1.0 / self.period()
    }

    /// Adds a variable to one message or sub-message, at the position the
    /// policy picks. Returns `false` if the target already holds it.
    pub fn add_variable(&mut self, variable: Variable, target: Target) -> Result<bool> {
        self.check_target(target)?;
        let policy = Arc::clone(&self.policy);

        let (message_index, list) = match target {
            Target::Message(i) => (i, &mut self.messages[i].variables),
            Target::SubMessage { parent, index } => (
                parent,
                &mut self.messages[parent].sub_messages[index].variables,
            ),
        };

        let added = match policy.insert_position(&variable, list) {
            Insertion::At(pos) => {
                debug!("adding '{}' to {:?} at {}", variable.name, target, pos);
                list.insert(pos, variable);
                true
            }
            Insertion::Duplicate => false,
        };

        budget::recompute(&mut self.messages[message_index], policy.as_ref());
        Ok(added)
    }

    /// Places variables in every message of an option and records the
    /// option's indices on each variable. Returns the names placed.
    pub fn assign(
        &mut self,
        variables: Vec<Variable>,
        option: &PlacementOption,
    ) -> Result<Vec<String>> {
        let targets = option.targets();
        if targets.is_empty() {
            return Err(SchedulerError::InvalidOption(format!("{option:?}")));
        }
        for &target in &targets {
            self.check_target(target)?;
        }

        let mut names = Vec::with_capacity(variables.len());
        for mut variable in variables {
            variable.add_message_indices(option.indices());
            for &target in &targets {
                self.add_variable(variable.clone(), target)?;
            }
            names.push(variable.name);
        }

        info!(
            "assigned {} {} to {}",
            names.len(),
            self.config.kind.item_noun(),
            self.option_label(option)
        );
        Ok(names)
    }

    /// Removes the named variables shown in message `row`.
    ///
    /// Removing a link member removes every member of that link found in
    /// the row. Variables slower than once per cycle are removed from the
    /// row only; faster ones from every message they were placed in.
    /// Returns the names removed.
    pub fn remove_variables(&mut self, names: &[&str], row: usize) -> Result<Vec<String>> {
        let message = self
            .messages
            .get(row)
            .ok_or(SchedulerError::UnknownMessage(row))?;

        let mut selected: Vec<Variable> = Vec::new();
        for name in names {
            let Some(variable) = message.variable(name) else {
                continue;
            };
            if selected.iter().any(|v| v.name == variable.name) {
                continue;
            }
            if variable.link.is_some() {
                for member in message.all_variables() {
                    if member.shares_link(variable)
                        && !selected.iter().any(|v| v.name == member.name)
                    {
                        selected.push(member.clone());
                    }
                }
            } else {
                selected.push(variable.clone());
            }
        }

        let removed = self.remove_from_messages(&selected, row);
        self.recompute_all();
        Ok(removed)
    }

    fn remove_from_messages(&mut self, variables: &[Variable], row: usize) -> Vec<String> {
        let mut removed = Vec::with_capacity(variables.len());
        for variable in variables {
            if self.is_sub_rate(variable.rate) {
                if let Some(message) = self.messages.get_mut(row) {
                    message.remove_variable(&variable.name);
                }
            } else {
                for &index in &variable.message_indices {
                    if let Some(message) = self.messages.get_mut(index) {
                        message.remove_variable(&variable.name);
                    }
                }
                // Placed without recorded indices
                if let Some(message) = self.messages.get_mut(row) {
                    message.remove_variable(&variable.name);
                }
            }
            debug!("removed '{}'", variable.name);
            removed.push(variable.name.clone());
        }
        removed
    }

    /// Removes every variable, or only those at `rate_filter` Hz. Returns
    /// the names removed.
    pub fn clear_variables(&mut self, rate_filter: Option<f32>) -> Vec<String> {
        let mut all_removed: Vec<String> = Vec::new();
        for row in 0..self.messages.len() {
            let matching: Vec<Variable> = self.messages[row]
                .all_variables()
                .into_iter()
                .filter(|v| rate_filter.map_or(true, |rate| v.rate == rate))
                .cloned()
                .collect();
            for name in self.remove_from_messages(&matching, row) {
                if !all_removed.contains(&name) {
                    all_removed.push(name);
                }
            }
        }
        self.recompute_all();
        info!(
            "cleared {} {}",
            all_removed.len(),
            self.config.kind.item_noun()
        );
        all_removed
    }

    /// Adds a sub-message to message `index`.
    ///
    /// Variables already in the message's sub-messages are de-assigned
    /// first, since the sub-message stride changes. Returns their names.
    pub fn add_sub_message(&mut self, index: usize) -> Result<Vec<String>> {
        let policy = Arc::clone(&self.policy);
        let message = self
            .messages
            .get_mut(index)
            .ok_or(SchedulerError::UnknownMessage(index))?;

        let released = release_sub_message_variables(message);
        message.add_sub_message("");
        budget::recompute(message, policy.as_ref());
        debug!(
            "'{}' now has {} sub-messages",
            message.name(),
            message.sub_message_count()
        );
        Ok(released)
    }

    /// Deletes the last sub-message of message `index`. The default
    /// sub-message is never deleted.
    ///
    /// Variables in the message's sub-messages are de-assigned first.
    /// Returns their names.
    pub fn delete_sub_message(&mut self, index: usize) -> Result<Vec<String>> {
        let policy = Arc::clone(&self.policy);
        let message = self
            .messages
            .get_mut(index)
            .ok_or(SchedulerError::UnknownMessage(index))?;

        let count = message.sub_message_count();
        if count <= 1 {
            return Ok(Vec::new());
        }

        let released = release_sub_message_variables(message);
        message.remove_sub_message(count - 1);
        budget::recompute(message, policy.as_ref());
        Ok(released)
    }

    /// Renames message `index`. Names must be non-empty and unique.
    pub fn rename_message(&mut self, index: usize, name: &str) -> Result<()> {
        let name = name.trim();
        if index >= self.messages.len() {
            return Err(SchedulerError::UnknownMessage(index));
        }
        let taken = self
            .messages
            .iter()
            .enumerate()
            .any(|(i, m)| i != index && m.name() == name);
        if name.is_empty() || taken {
            return Err(SchedulerError::DuplicateName(name.to_string()));
        }
        self.messages[index].rename(name);
        Ok(())
    }

    /// Sets the ID of a message (`sub_message: None`) or sub-message.
    ///
    /// The ID must be hexadecimal and unused by any other (sub-)message.
    /// An empty ID clears it.
    pub fn set_message_id(
        &mut self,
        index: usize,
        sub_message: Option<usize>,
        id: &str,
    ) -> Result<()> {
        let id = id.trim();
        let message = self
            .messages
            .get(index)
            .ok_or(SchedulerError::UnknownMessage(index))?;
        // Sub-message 0 shares the parent's ID
        let sub_message = sub_message.filter(|&s| s != 0);
        if let Some(sub) = sub_message {
            if sub >= message.sub_message_count() {
                return Err(SchedulerError::UnknownSubMessage {
                    message: index,
                    sub_message: sub,
                });
            }
        }

        if let Some(value) = parse_message_id(id)? {
            let in_use = self.ids_in_use(index, sub_message);
            if in_use.contains(&value) {
                return Err(SchedulerError::DuplicateMessageId(id.to_string()));
            }
        }

        let message = &mut self.messages[index];
        match sub_message {
            None => message.set_id(id),
            Some(sub) => {
                message.set_sub_message_id(sub, id);
            }
        }
        Ok(())
    }

    fn ids_in_use(&self, skip_message: usize, skip_sub: Option<usize>) -> HashSet<u32> {
        let mut ids = HashSet::new();
        for (i, message) in self.messages.iter().enumerate() {
            if !(i == skip_message && skip_sub.is_none()) {
                if let Ok(Some(value)) = parse_message_id(message.id()) {
                    ids.insert(value);
                }
            }
            for (s, sub) in message.sub_messages().iter().enumerate().skip(1) {
                if i == skip_message && skip_sub == Some(s) {
                    continue;
                }
                if let Ok(Some(value)) = parse_message_id(sub.id()) {
                    ids.insert(value);
                }
            }
        }
        ids
    }

    /// Unused budget: the part of the total that does not divide evenly
    /// among the messages, plus every message's remaining bytes.
    pub fn total_bytes_remaining(&self) -> i64 {
        i64::from(self.config.indivisible_bytes())
            + self
                .messages
                .iter()
                .map(Message::bytes_remaining)
                .sum::<i64>()
    }

    /// Smallest remaining value among an option's targets.
    pub fn smallest_remaining(&self, option: &PlacementOption) -> Option<i64> {
        option
            .targets()
            .into_iter()
            .filter_map(|t| self.target_remaining(t))
            .min()
    }

    /// Whether every target of an option can take `count` more variables
    /// under the configured slot limit.
    pub fn has_free_slots(&self, option: &PlacementOption, count: usize) -> bool {
        let Some(limit) = self.config.slot_limit else {
            return true;
        };
        option.targets().into_iter().all(|target| {
            let used = match target {
                Target::Message(i) => self.messages.get(i).map(Message::variable_count),
                Target::SubMessage { parent, index } => self
                    .messages
                    .get(parent)
                    .and_then(|m| m.sub_message(index))
                    .map(|s| s.variables.len()),
            };
            used.is_some_and(|used| used + count <= limit)
        })
    }

    /// Names of every variable placed in any message.
    pub fn assigned_names(&self) -> HashSet<String> {
        self.messages
            .iter()
            .flat_map(|m| m.all_variables())
            .map(|v| v.name.clone())
            .collect()
    }

    /// Every placed variable, each name once.
    pub fn assigned_variables(&self) -> Vec<&Variable> {
        let mut seen = HashSet::new();
        self.messages
            .iter()
            .flat_map(|m| m.all_variables())
            .filter(|v| seen.insert(v.name.as_str()))
            .collect()
    }

    /// Refreshes the budgets of every message.
    pub fn recompute_all(&mut self) {
        for message in &mut self.messages {
            budget::recompute(message, self.policy.as_ref());
        }
    }

    /// Marks the current state as stored.
    pub fn commit(&mut self) {
        self.committed = self.messages.clone();
    }

    /// Discards all edits since the last commit.
    pub fn revert(&mut self) {
        self.messages = self.committed.clone();
    }

    /// Whether the messages differ from the last commit.
    pub fn is_changed(&self) -> bool {
        if self.committed.len() != self.messages.len() {
            return true;
        }
        self.messages
            .iter()
            .zip(&self.committed)
            .any(|(current, committed)| {
                message_changed(current, committed)
                    || current
                        .sub_messages()
                        .iter()
                        .zip(committed.sub_messages())
                        .any(|(c, s)| sub_message_changed(c, s))
            })
    }

    /// Snapshot of the messages and placed variables for storage.
    pub fn to_stream(&self, rate_name: impl Into<String>) -> DataStream {
        DataStream::new(rate_name)
            .with_messages(self.messages.clone())
            .with_variables(self.assigned_variables().into_iter().cloned().collect())
    }

    /// Replaces the messages with those of another editor that started
    /// from `base`, e.g. one returned by a background auto-fill.
    ///
    /// Fails without change if this editor's messages no longer equal
    /// `base`, since adopting would discard the edits made since.
    pub fn adopt_messages(&mut self, other: SchedulerEditor, base: &[Message]) -> Result<()> {
        if self.messages != base {
            return Err(SchedulerError::Diverged);
        }
        if other.messages.len() != self.messages.len() {
            return Err(SchedulerError::OutOfRange {
                what: "message count",
                value: other.messages.len() as i64,
                min: self.messages.len() as i64,
                max: self.messages.len() as i64,
            });
        }
        self.messages = other.messages;
        self.recompute_all();
        Ok(())
    }

    fn check_target(&self, target: Target) -> Result<()> {
        match target {
            Target::Message(i) => {
                if i >= self.messages.len() {
                    return Err(SchedulerError::UnknownMessage(i));
                }
            }
            Target::SubMessage { parent, index } => {
                let message = self
                    .messages
                    .get(parent)
                    .ok_or(SchedulerError::UnknownMessage(parent))?;
                if index >= message.sub_message_count() {
                    return Err(SchedulerError::UnknownSubMessage {
                        message: parent,
                        sub_message: index,
                    });
                }
            }
        }
        Ok(())
    }
}

fn fresh_messages(config: &SchedulerConfig) -> Vec<Message> {
    let size = config.empty_message_size();
    (1..=config.total_messages)
        .map(|i| Message::new(format!("{}_{}", config.kind.message_prefix(), i), "", size))
        .collect()
}

fn release_sub_message_variables(message: &mut Message) -> Vec<String> {
    let mut released: Vec<String> = Vec::new();
    for index in 0..message.sub_message_count() {
        if let Some(sub) = message.sub_message_mut(index) {
            for var in sub.variables.drain(..) {
                if !released.contains(&var.name) {
                    released.push(var.name);
                }
            }
        }
    }
    if !released.is_empty() {
        debug!(
            "released {} sub-message variables of '{}'",
            released.len(),
            message.name()
        );
    }
    released
}

fn message_changed(current: &Message, committed: &Message) -> bool {
    current.bytes_remaining() != committed.bytes_remaining()
        || current.name() != committed.name()
        || current.id() != committed.id()
        || current.sub_message_count() != committed.sub_message_count()
        || variables_changed(&current.variables, &committed.variables)
}

fn sub_message_changed(current: &SubMessage, committed: &SubMessage) -> bool {
    current.bytes_remaining() != committed.bytes_remaining()
        || current.name() != committed.name()
        || current.id() != committed.id()
        || variables_changed(&current.variables, &committed.variables)
}

fn variables_changed(current: &[Variable], committed: &[Variable]) -> bool {
    current.len() != committed.len()
        || current.iter().zip(committed).any(|(c, s)| {
            c.size != s.size || c.name != s.name || c.rate != s.rate
        })
}
