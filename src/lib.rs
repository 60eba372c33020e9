//! Message and time-slot allocation for telemetry and application scheduling.
//!
//! Assigns telemetry variables to fixed-size messages (and the
//! sub-messages sent on alternate cycles), or applications to fixed-length
//! time slots, while tracking each message's remaining byte (or time)
//! budget. The crate holds no UI and no persistence; models derive
//! `serde` so callers can store them however they like.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Variable`, `Message`, `SubMessage`,
//!   `DataStream`, `RateInformation`, `RateParameters`
//! - **`config`**: Editor shape (`SchedulerConfig`) for telemetry streams
//!   and the application scheduler
//! - **`budget`**: Remaining-capacity bookkeeping and the `PackingPolicy`
//!   seam between telemetry and application sizing
//! - **`scheduler`**: Placement options, `SchedulerEditor`, greedy
//!   auto-fill (inline or on a worker thread), usage indicators
//! - **`validation`**: Integrity checks for stored message sets
//! - **`error`**: `SchedulerError`, the single error type
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use u_slot::budget::{ReferenceOrder, TelemetryPolicy};
//! use u_slot::config::SchedulerConfig;
//! use u_slot::models::{RateInformation, RateParameters, Variable};
//! use u_slot::scheduler::SchedulerEditor;
//!
//! let params = RateParameters::new(4, 4);
//! let info = RateInformation::new("Rate 1")
//!     .with_max_msgs_per_cycle(4)
//!     .with_max_bytes_per_sec(512);
//!
//! let order = ReferenceOrder::new(["/sc/temp", "/sc/volts"]);
//! let mut editor = SchedulerEditor::new(
//!     SchedulerConfig::telemetry(&info, &params),
//!     Arc::new(TelemetryPolicy::new(order)),
//! )?;
//!
//! let options = editor.message_availability(2.0);
//! let label = editor.option_label(&options[1]);
//! assert_eq!(label, "Message_2, Message_4");
//!
//! let option = editor.parse_option(&label)?;
//! editor.assign(vec![Variable::telemetry("/sc/volts", "float", 4, 2.0)], &option)?;
//! assert_eq!(editor.message(1).unwrap().bytes_remaining(), 124);
//! # Ok::<(), u_slot::error::SchedulerError>(())
//! ```

pub mod budget;
pub mod config;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod validation;

pub use error::{Result, SchedulerError};
