//! Scheduler configuration.
//!
//! A [`SchedulerConfig`] fixes the shape of one editor: how many messages
//! (time slots) a cycle has, how fast they are sent, and the total budget
//! shared among them. Build it from telemetry rate information or from
//! application parameters.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::models::{RateInformation, RateParameters};

/// What the editor schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerKind {
    /// Telemetry variables into messages.
    Telemetry,
    /// Applications into time slots.
    Application,
}

impl SchedulerKind {
    /// Name prefix of generated messages.
    pub fn message_prefix(&self) -> &'static str {
        match self {
            SchedulerKind::Telemetry => "Message",
            SchedulerKind::Application => "Time Slot",
        }
    }

    /// Plural noun used in log and report text.
    pub fn item_noun(&self) -> &'static str {
        match self {
            SchedulerKind::Telemetry => "variables",
            SchedulerKind::Application => "applications",
        }
    }
}

/// Application scheduler parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationParameters {
    /// Maximum applications per time slot.
    pub slots_per_message: u32,
    pub max_msgs_per_second: u32,
    pub max_msgs_per_cycle: u32,
}

impl Default for ApplicationParameters {
    fn default() -> Self {
        Self {
            slots_per_message: 1,
            max_msgs_per_second: 10,
            max_msgs_per_cycle: 10,
        }
    }
}

/// Shape of one scheduler editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub kind: SchedulerKind,
    /// Messages (time slots) per cycle.
    pub total_messages: u32,
    /// Budget shared by all messages, in bytes (telemetry) or milliseconds
    /// per cycle (applications).
    pub total_bytes: u32,
    pub msgs_per_second: u32,
    /// Maximum variables per message, if limited.
    pub slot_limit: Option<usize>,
}

impl SchedulerConfig {
    /// Creates a configuration from raw values.
    pub fn new(
        kind: SchedulerKind,
        total_messages: u32,
        total_bytes: u32,
        msgs_per_second: u32,
    ) -> Self {
        Self {
            kind,
            total_messages,
            total_bytes,
            msgs_per_second,
            slot_limit: None,
        }
    }

    /// Configuration for one telemetry data stream.
    pub fn telemetry(info: &RateInformation, params: &RateParameters) -> Self {
        Self::new(
            SchedulerKind::Telemetry,
            info.max_msgs_per_cycle,
            info.max_bytes_per_sec,
            params.max_msgs_per_second,
        )
    }

    /// Configuration for the application scheduler. The budget is the cycle
    /// length in milliseconds.
    pub fn application(params: &ApplicationParameters) -> Self {
        let cycle_ms = if params.max_msgs_per_second == 0 {
            0
        } else {
            (params.max_msgs_per_cycle as f32 / params.max_msgs_per_second as f32 * 1000.0) as u32
        };
        Self::new(
            SchedulerKind::Application,
            params.max_msgs_per_cycle,
            cycle_ms,
            params.max_msgs_per_second,
        )
        .with_slot_limit(params.slots_per_message as usize)
    }

    /// Limits the number of variables per message.
    pub fn with_slot_limit(mut self, limit: usize) -> Self {
        self.slot_limit = Some(limit);
        self
    }

    /// Seconds per cycle.
    pub fn period(&self) -> f32 {
        self.total_messages as f32 / self.msgs_per_second as f32
    }

    /// Capacity of a single empty message.
    pub fn empty_message_size(&self) -> u32 {
        self.total_bytes / self.msgs_per_second.max(1)
    }

    /// Budget that cannot be divided evenly among the messages.
    pub fn indivisible_bytes(&self) -> u32 {
        match self.total_messages {
            0 => self.total_bytes,
            n => self.total_bytes - self.total_bytes / n * n,
        }
    }

    /// Rejects configurations that cannot form a cycle.
    pub fn validate(&self) -> Result<()> {
        if self.total_messages == 0 {
            return Err(SchedulerError::OutOfRange {
                what: "total messages",
                value: 0,
                min: 1,
                max: i64::from(u32::MAX),
            });
        }
        if self.msgs_per_second == 0 {
            return Err(SchedulerError::OutOfRange {
                what: "messages per second",
                value: 0,
                min: 1,
                max: i64::from(u32::MAX),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_config() {
        let info = RateInformation::new("Rate 1")
            .with_max_msgs_per_cycle(4)
            .with_max_bytes_per_sec(400);
        let params = RateParameters::new(1, 2);
        let config = SchedulerConfig::telemetry(&info, &params);

        assert_eq!(config.kind, SchedulerKind::Telemetry);
        assert_eq!(config.total_messages, 4);
        assert!((config.period() - 2.0).abs() < 1e-6);
        assert_eq!(config.empty_message_size(), 200);
        assert_eq!(config.slot_limit, None);
    }

    #[test]
    fn test_application_config() {
        let config = SchedulerConfig::application(&ApplicationParameters::default());
        assert_eq!(config.kind, SchedulerKind::Application);
        assert_eq!(config.total_messages, 10);
        assert_eq!(config.total_bytes, 1000);
        assert_eq!(config.empty_message_size(), 100);
        assert_eq!(config.slot_limit, Some(1));
        assert!((config.period() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_indivisible_bytes() {
        let config = SchedulerConfig::new(SchedulerKind::Telemetry, 3, 100, 3);
        assert_eq!(config.indivisible_bytes(), 1);
    }

    #[test]
    fn test_validate() {
        assert!(SchedulerConfig::new(SchedulerKind::Telemetry, 4, 100, 4)
            .validate()
            .is_ok());
        assert!(SchedulerConfig::new(SchedulerKind::Telemetry, 0, 100, 4)
            .validate()
            .is_err());
        assert!(SchedulerConfig::new(SchedulerKind::Telemetry, 4, 100, 0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_message_prefix() {
        assert_eq!(SchedulerKind::Telemetry.message_prefix(), "Message");
        assert_eq!(SchedulerKind::Application.message_prefix(), "Time Slot");
    }
}
