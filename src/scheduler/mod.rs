//! Message scheduling: placement options, editing, and auto-fill.
//!
//! # Algorithm
//!
//! A variable at rate `R` must appear in `round(R * period)` messages per
//! cycle, spread evenly. [`enumerate_options`] lists the message sets that
//! achieve this; [`SchedulerEditor`] places variables into one of them and
//! keeps every byte budget current. [`AutoFill`] assigns a whole candidate
//! list greedily, largest variable first into the option with the most
//! room, and [`spawn_auto_fill`] runs it on a worker thread.
//!
//! # Usage
//!
//! [`ScheduleUsage`] summarizes utilization and over-subscription.

mod autofill;
mod background;
mod editor;
mod options;
mod usage;

pub use autofill::{message_with_room, AutoFill, AutoFillReport, HaltFlag};
pub use background::{spawn_auto_fill, AutoFillOutcome, AutoFillTask};
pub use editor::SchedulerEditor;
pub use options::{enumerate_options, PlacementOption, Target};
pub use usage::{MessageUsage, ScheduleUsage};
