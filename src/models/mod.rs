//! Message allocation domain models.
//!
//! Provides the data types for fixed-capacity messages and the variables
//! placed into them. The same types serve telemetry scheduling (variables
//! into messages, sized in bytes) and application scheduling (applications
//! into time slots, sized by run time).
//!
//! # Domain Mappings
//!
//! | u-slot | Telemetry | Application scheduler |
//! |--------|-----------|-----------------------|
//! | Variable | Telemetry parameter | Application |
//! | Message | Telemetry message | Time slot |
//! | SubMessage | Message sent every n-th cycle | (unused) |
//! | DataStream | Rate column / downlink stream | Schedule table |

mod message;
mod rate;
mod stream;
mod variable;

pub use message::{Message, SubMessage};
pub use rate::{calculate_sample_rates, format_rate, parse_rate, RateInformation, RateParameters};
pub use stream::DataStream;
pub use variable::{
    sort_largest_first, ApplicationData, Association, AssociationKind, Variable, VariableKind,
};
