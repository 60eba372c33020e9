//! Allocation usage indicators.
//!
//! Computes summary figures for the messages of an editor.
//!
//! # Indicators
//!
//! | Indicator | Definition |
//! |-----------|-----------|
//! | Utilization | (capacity - remaining) / capacity, per message |
//! | Oversubscribed | Messages with negative remaining bytes |
//! | Total remaining | Indivisible bytes + sum of remaining bytes |
//! | Assigned | Distinct variables placed in any message |

use super::editor::SchedulerEditor;

/// Usage of a single message.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageUsage {
    pub name: String,
    pub capacity: u32,
    /// Remaining bytes; negative when over-subscribed.
    pub remaining: i64,
    /// Used fraction of the capacity. Above 1.0 when over-subscribed.
    pub utilization: f64,
    pub sub_messages: usize,
}

impl MessageUsage {
    pub fn is_oversubscribed(&self) -> bool {
        self.remaining < 0
    }
}

/// Usage summary of an editor.
#[derive(Debug, Clone)]
pub struct ScheduleUsage {
    pub messages: Vec<MessageUsage>,
    /// Indices of over-subscribed messages.
    pub oversubscribed: Vec<usize>,
    pub total_remaining: i64,
    pub assigned_count: usize,
    /// Mean utilization over all messages (0.0 when there are none).
    pub avg_utilization: f64,
}

impl ScheduleUsage {
    /// Computes the usage of every message in the editor.
    pub fn calculate(editor: &SchedulerEditor) -> Self {
        let messages: Vec<MessageUsage> = editor
            .messages()
            .iter()
            .map(|m| {
                let remaining = m.bytes_remaining();
                let utilization = if m.capacity == 0 {
                    0.0
                } else {
                    (i64::from(m.capacity) - remaining) as f64 / f64::from(m.capacity)
                };
                MessageUsage {
                    name: m.name().to_string(),
                    capacity: m.capacity,
                    remaining,
                    utilization,
                    sub_messages: m.sub_message_count(),
                }
            })
            .collect();

        let oversubscribed = messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_oversubscribed())
            .map(|(i, _)| i)
            .collect();

        let avg_utilization = if messages.is_empty() {
            0.0
        } else {
            messages.iter().map(|m| m.utilization).sum::<f64>() / messages.len() as f64
        };

        Self {
            messages,
            oversubscribed,
            total_remaining: editor.total_bytes_remaining(),
            assigned_count: editor.assigned_names().len(),
            avg_utilization,
        }
    }

    /// Whether no message is over-subscribed.
    pub fn within_budget(&self) -> bool {
        self.oversubscribed.is_empty()
    }
}
