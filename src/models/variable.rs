//! Variable model.
//!
//! A variable is the unit placed into messages: a telemetry parameter
//! (sized in bytes) or an application (sized by its run time). Both share
//! the same bookkeeping: a rate, a size, an optional link group, and the
//! indices of the messages that currently hold it.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// An item that can be assigned to a message or time slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Full variable path (telemetry) or application name.
    pub name: String,
    /// Service rate in Hz.
    pub rate: f32,
    /// Size in bytes (telemetry) or run time (applications).
    pub size: u32,
    /// Link group this variable belongs to. Link members are placed and
    /// removed together.
    pub link: Option<String>,
    /// Variables that must be placed together with this one.
    pub association: Option<Association>,
    /// Indices of the messages this variable has been placed in.
    pub message_indices: Vec<usize>,
    /// Telemetry or application payload.
    pub kind: VariableKind,
}

/// Telemetry or application specifics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariableKind {
    /// Telemetry parameter with its primitive data type.
    Telemetry { data_type: String },
    /// Scheduled application.
    Application(ApplicationData),
}

/// Scheduling attributes of an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationData {
    pub priority: i32,
    pub message_rate: i32,
    pub wake_up_message: String,
    pub hk_send_rate: i32,
    pub hk_wake_up_message: String,
    pub sch_group: String,
}

/// Membership in a group of variables that share placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    /// Group identifier, shared by all members.
    pub group: String,
    pub kind: AssociationKind,
}

/// How associated variables contribute to a message's size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssociationKind {
    /// Bit-wise members packed into the same storage unit; the group
    /// occupies the size of a single member.
    BitPacked,
    /// Members of a string; every member occupies its own size.
    StringMembers,
}

impl Variable {
    /// Creates a telemetry variable.
    pub fn telemetry(
        name: impl Into<String>,
        data_type: impl Into<String>,
        size: u32,
        rate: f32,
    ) -> Self {
        Self {
            name: name.into(),
            rate,
            size,
            link: None,
            association: None,
            message_indices: Vec::new(),
            kind: VariableKind::Telemetry {
                data_type: data_type.into(),
            },
        }
    }

    /// Creates an application entry. `run_time` plays the role of size.
    pub fn application(name: impl Into<String>, rate: f32, run_time: u32) -> Self {
        Self {
            name: name.into(),
            rate,
            size: run_time,
            link: None,
            association: None,
            message_indices: Vec::new(),
            kind: VariableKind::Application(ApplicationData::default()),
        }
    }

    /// Sets the link group.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Marks the variable as a bit-packed member of `group`.
    pub fn with_bit_pack(mut self, group: impl Into<String>) -> Self {
        self.association = Some(Association {
            group: group.into(),
            kind: AssociationKind::BitPacked,
        });
        self
    }

    /// Marks the variable as a member of the string `group`.
    pub fn with_string_member(mut self, group: impl Into<String>) -> Self {
        self.association = Some(Association {
            group: group.into(),
            kind: AssociationKind::StringMembers,
        });
        self
    }

    /// Sets the application attributes. Ignored for telemetry variables.
    pub fn with_application_data(mut self, data: ApplicationData) -> Self {
        if let VariableKind::Application(ref mut app) = self.kind {
            *app = data;
        }
        self
    }

    /// Whether this is an application entry.
    pub fn is_application(&self) -> bool {
        matches!(self.kind, VariableKind::Application(_))
    }

    /// Telemetry data type, if this is a telemetry variable.
    pub fn data_type(&self) -> Option<&str> {
        match &self.kind {
            VariableKind::Telemetry { data_type } => Some(data_type),
            VariableKind::Application(_) => None,
        }
    }

    /// Whether both variables are members of the same link.
    pub fn shares_link(&self, other: &Variable) -> bool {
        matches!((&self.link, &other.link), (Some(a), Some(b)) if a == b)
    }

    /// Whether both variables belong to the same association group.
    pub fn shares_association(&self, other: &Variable) -> bool {
        matches!(
            (&self.association, &other.association),
            (Some(a), Some(b)) if a.group == b.group && a.kind == b.kind
        )
    }

    /// Records the message indices, skipping ones already present.
    pub fn add_message_indices(&mut self, indices: &[usize]) {
        for &index in indices {
            if !self.message_indices.contains(&index) {
                self.message_indices.push(index);
            }
        }
    }

    /// Largest-first ordering used by greedy placement.
    pub fn cmp_largest_first(&self, other: &Variable) -> Ordering {
        other.size.cmp(&self.size)
    }
}

/// Sorts variables largest-first, keeping the input order among equals.
pub fn sort_largest_first(variables: &mut [Variable]) {
    variables.sort_by(Variable::cmp_largest_first);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_builder() {
        let v = Variable::telemetry("sc.eps.voltage", "float", 4, 1.0).with_link("power");
        assert_eq!(v.name, "sc.eps.voltage");
        assert_eq!(v.size, 4);
        assert_eq!(v.data_type(), Some("float"));
        assert_eq!(v.link.as_deref(), Some("power"));
        assert!(!v.is_application());
    }

    #[test]
    fn test_application_data() {
        let v = Variable::application("HK", 2.0, 15).with_application_data(ApplicationData {
            priority: 3,
            sch_group: "core".into(),
            ..Default::default()
        });
        assert!(v.is_application());
        assert_eq!(v.data_type(), None);
        match v.kind {
            VariableKind::Application(app) => {
                assert_eq!(app.priority, 3);
                assert_eq!(app.sch_group, "core");
            }
            _ => panic!("expected application"),
        }
    }

    #[test]
    fn test_message_indices_deduplicated() {
        let mut v = Variable::telemetry("a", "int8", 1, 1.0);
        v.add_message_indices(&[0, 2]);
        v.add_message_indices(&[2, 4]);
        assert_eq!(v.message_indices, vec![0, 2, 4]);
    }

    #[test]
    fn test_sort_largest_first_is_stable() {
        let mut vars = vec![
            Variable::telemetry("a", "int8", 1, 1.0),
            Variable::telemetry("b", "int32", 4, 1.0),
            Variable::telemetry("c", "int8", 1, 1.0),
            Variable::telemetry("d", "double", 8, 1.0),
        ];
        sort_largest_first(&mut vars);
        let names: Vec<_> = vars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn test_shared_groups() {
        let a = Variable::telemetry("a:1", "uint8", 1, 1.0).with_bit_pack("flags");
        let b = Variable::telemetry("b:3", "uint8", 1, 1.0).with_bit_pack("flags");
        let c = Variable::telemetry("c", "char", 1, 1.0).with_string_member("flags");
        assert!(a.shares_association(&b));
        assert!(!a.shares_association(&c));
        assert!(!a.shares_link(&b));
    }
}
