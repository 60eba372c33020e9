//! Byte-budget bookkeeping.
//!
//! Every message and sub-message stores its remaining capacity. After any
//! change to a variable list the owner calls [`recompute`], which sets
//!
//! ```text
//! remaining = capacity - packed_size(assigned variables)
//! ```
//!
//! for the message's own list and for each sub-message packet (parent
//! variables plus the sub-message's own).
//!
//! Capacity is a soft constraint: over-subscription is allowed and shows
//! up as a negative remaining value. [`can_fit`] and [`availability`] are
//! advisory only.
//!
//! How a list of variables is sized and where a new variable is inserted
//! depends on what is being scheduled; [`PackingPolicy`] is that seam.

use std::collections::HashMap;
use std::fmt::Debug;

use crate::models::{AssociationKind, Message, Variable};

/// Where a new variable goes in an existing list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// Insert at this position.
    At(usize),
    /// The variable is already in the list; do not add it.
    Duplicate,
}

/// Canonical order of all variable names.
///
/// Assigned variables are kept in this order inside each message. Names
/// not in the order sort after all known names.
#[derive(Debug, Clone, Default)]
pub struct ReferenceOrder {
    ranks: HashMap<String, usize>,
}

impl ReferenceOrder {
    /// Builds the order from names in sequence. Repeated names keep their
    /// first position.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ranks = HashMap::new();
        for (rank, name) in names.into_iter().enumerate() {
            ranks.entry(name.into()).or_insert(rank);
        }
        Self { ranks }
    }

    /// Rank of a name; `None` if unknown.
    pub fn rank(&self, name: &str) -> Option<usize> {
        self.ranks.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Position of `variable` within `existing` by rank.
    pub fn insertion(&self, variable: &Variable, existing: &[Variable]) -> Insertion {
        if existing.iter().any(|v| v.name == variable.name) {
            return Insertion::Duplicate;
        }
        let Some(rank) = self.rank(&variable.name) else {
            return Insertion::At(existing.len());
        };
        let pos = existing
            .iter()
            .position(|v| self.rank(&v.name).map_or(true, |r| r > rank))
            .unwrap_or(existing.len());
        Insertion::At(pos)
    }
}

/// Sizing and ordering rules for one kind of scheduler.
pub trait PackingPolicy: Send + Sync + Debug {
    /// Policy name (e.g., "telemetry").
    fn name(&self) -> &'static str;

    /// Total size the variables occupy in one message.
    fn packed_size(&self, variables: &[&Variable]) -> u32;

    /// Canonical variable order used for insertion.
    fn order(&self) -> &ReferenceOrder;

    /// Where `variable` goes in `existing`.
    fn insert_position(&self, variable: &Variable, existing: &[Variable]) -> Insertion {
        self.order().insertion(variable, existing)
    }
}

/// Telemetry sizing: consecutive bit-packed members of the same group
/// share one storage unit.
#[derive(Debug, Clone, Default)]
pub struct TelemetryPolicy {
    order: ReferenceOrder,
}

impl TelemetryPolicy {
    pub fn new(order: ReferenceOrder) -> Self {
        Self { order }
    }
}

impl PackingPolicy for TelemetryPolicy {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    fn packed_size(&self, variables: &[&Variable]) -> u32 {
        let mut total = 0u32;
        let mut index = 0;
        while index < variables.len() {
            let var = variables[index];
            total = total.saturating_add(var.size);
            index += 1;

            let packed = matches!(
                &var.association,
                Some(a) if a.kind == AssociationKind::BitPacked
            );
            if packed {
                while index < variables.len() && variables[index].shares_association(var) {
                    index += 1;
                }
            }
        }
        total
    }

    fn order(&self) -> &ReferenceOrder {
        &self.order
    }
}

/// Application sizing: run times add up.
#[derive(Debug, Clone, Default)]
pub struct ApplicationPolicy {
    order: ReferenceOrder,
}

impl ApplicationPolicy {
    pub fn new(order: ReferenceOrder) -> Self {
        Self { order }
    }
}

impl PackingPolicy for ApplicationPolicy {
    fn name(&self) -> &'static str {
        "application"
    }

    fn packed_size(&self, variables: &[&Variable]) -> u32 {
        variables
            .iter()
            .fold(0u32, |acc, v| acc.saturating_add(v.size))
    }

    fn order(&self) -> &ReferenceOrder {
        &self.order
    }
}

/// Refreshes the remaining capacity of a message and its sub-messages.
pub fn recompute(message: &mut Message, policy: &dyn PackingPolicy) {
    let capacity = i64::from(message.capacity);

    let own: Vec<&Variable> = message.variables.iter().collect();
    let own_remaining = capacity - i64::from(policy.packed_size(&own));

    let sub_remaining: Vec<i64> = (0..message.sub_message_count())
        .map(|i| {
            let packet = message.packet(i).unwrap_or_default();
            capacity - i64::from(policy.packed_size(&packet))
        })
        .collect();

    message.bytes_remaining = own_remaining;
    for (sub, remaining) in message.sub_messages.iter_mut().zip(sub_remaining) {
        sub.bytes_remaining = remaining;
    }
}

/// Whether `size` more bytes fit in the message. Advisory only.
pub fn can_fit(message: &Message, size: u32) -> bool {
    message.bytes_remaining() - i64::from(size) >= 0
}

/// Projected state of a message if `size` more bytes were added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Availability {
    /// Remaining bytes after the addition; negative when over-subscribed.
    pub remaining_after: i64,
    pub fits: bool,
}

/// Projects adding `size` bytes to the message.
pub fn availability(message: &Message, size: u32) -> Availability {
    let remaining_after = message.bytes_remaining() - i64::from(size);
    Availability {
        remaining_after,
        fits: remaining_after >= 0,
    }
}
