//! Rate-based placement options.
//!
//! # Algorithm
//!
//! With `N` messages per cycle and a period of `P` seconds:
//!
//! 1. Rates of at least one sample per cycle need `r = round(rate * P)`
//!    messages per cycle. The `N` messages split into `N / r` options;
//!    option `k` holds messages `k, k + N/r, k + 2N/r, ...`, spreading the
//!    samples evenly over the cycle. If `r` does not divide `N` there is no
//!    even spread and no option is returned.
//! 2. Slower rates need one sample every `s = round(1 / (rate * P))`
//!    cycles. Every message with more than one sub-message and a
//!    sub-message count divisible by `s` yields `s` options; option `i`
//!    holds sub-messages `i, i + s, i + 2s, ...` of that message.

use crate::error::{Result, SchedulerError};
use crate::models::Message;

/// A legal placement for one variable at a given rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOption {
    /// Every listed message (zero-based) receives the variable.
    Messages(Vec<usize>),
    /// Every listed sub-message (zero-based) of `parent` receives it.
    SubMessages { parent: usize, indices: Vec<usize> },
}

/// A single message or sub-message receiving a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Message(usize),
    SubMessage { parent: usize, index: usize },
}

impl PlacementOption {
    /// Message or sub-message indices of this option.
    pub fn indices(&self) -> &[usize] {
        match self {
            PlacementOption::Messages(indices) => indices,
            PlacementOption::SubMessages { indices, .. } => indices,
        }
    }

    /// Parent message index for sub-message options.
    pub fn parent(&self) -> Option<usize> {
        match self {
            PlacementOption::Messages(_) => None,
            PlacementOption::SubMessages { parent, .. } => Some(*parent),
        }
    }

    /// Individual targets of this option.
    pub fn targets(&self) -> Vec<Target> {
        match self {
            PlacementOption::Messages(indices) => {
                indices.iter().map(|&i| Target::Message(i)).collect()
            }
            PlacementOption::SubMessages { parent, indices } => indices
                .iter()
                .map(|&index| Target::SubMessage {
                    parent: *parent,
                    index,
                })
                .collect(),
        }
    }

    /// Display form: `"Message_1, Message_3"` or `"Message_2 sub-msgs 1, 3"`
    /// (sub-message numbers are one-based).
    pub fn label(&self, messages: &[Message]) -> String {
        let name = |i: usize| messages.get(i).map(|m| m.name()).unwrap_or("?");
        match self {
            PlacementOption::Messages(indices) => indices
                .iter()
                .map(|&i| name(i))
                .collect::<Vec<_>>()
                .join(", "),
            PlacementOption::SubMessages { parent, indices } => {
                let plural = if indices.len() == 1 { "" } else { "s" };
                let numbers = indices
                    .iter()
                    .map(|i| (i + 1).to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} sub-msg{} {}", name(*parent), plural, numbers)
            }
        }
    }

    /// Parses the display form back into an option.
    pub fn parse(label: &str, messages: &[Message]) -> Result<Self> {
        let invalid = || SchedulerError::InvalidOption(label.to_string());
        let index_of = |name: &str| messages.iter().position(|m| m.name() == name);

        let sub_split = label
            .split_once(" sub-msgs ")
            .or_else(|| label.split_once(" sub-msg "));

        match sub_split {
            Some((parent_name, numbers)) => {
                let parent = index_of(parent_name).ok_or_else(invalid)?;
                let indices = numbers
                    .split(", ")
                    .map(|n| match n.trim().parse::<usize>() {
                        Ok(n) if n >= 1 => Ok(n - 1),
                        _ => Err(invalid()),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(PlacementOption::SubMessages { parent, indices })
            }
            None => {
                let indices = label
                    .split(", ")
                    .map(|name| index_of(name).ok_or_else(invalid))
                    .collect::<Result<Vec<_>>>()?;
                Ok(PlacementOption::Messages(indices))
            }
        }
    }
}

/// Enumerates the placement options for `rate` (Hz).
///
/// Returns an empty list for non-positive rates, a non-positive period,
/// or a per-cycle count that does not divide the message count.
///
/// # Example
///
/// ```
/// use u_slot::models::Message;
/// use u_slot::scheduler::{enumerate_options, PlacementOption};
///
/// let messages: Vec<Message> = (1..=4)
///     .map(|i| Message::new(format!("Message_{i}"), "", 64))
///     .collect();
///
/// // 1 second period, 2 Hz: two samples per cycle, half a cycle apart.
/// let options = enumerate_options(&messages, 1.0, 2.0);
/// assert_eq!(options, vec![
///     PlacementOption::Messages(vec![0, 2]),
///     PlacementOption::Messages(vec![1, 3]),
/// ]);
///
/// // 3 Hz does not divide 4 messages evenly.
/// assert!(enumerate_options(&messages, 1.0, 3.0).is_empty());
/// ```
pub fn enumerate_options(messages: &[Message], period: f32, rate: f32) -> Vec<PlacementOption> {
    if !(rate.is_finite() && rate > 0.0 && period.is_finite() && period > 0.0) {
        return Vec::new();
    }

    if rate < 1.0 / period {
        sub_message_options(messages, period, rate)
    } else {
        message_options(messages.len(), (rate * period).round() as usize)
    }
}

fn message_options(total: usize, per_cycle: usize) -> Vec<PlacementOption> {
    if per_cycle == 0 || per_cycle > total || total % per_cycle != 0 {
        return Vec::new();
    }

    let num_options = total / per_cycle;
    (0..num_options)
        .map(|first| {
            PlacementOption::Messages(
                (0..per_cycle)
                    .map(|step| first + step * num_options)
                    .collect(),
            )
        })
        .collect()
}

fn sub_message_options(messages: &[Message], period: f32, rate: f32) -> Vec<PlacementOption> {
    let stride = (1.0 / rate / period).round() as usize;
    if stride == 0 {
        return Vec::new();
    }

    let mut options = Vec::new();
    for (parent, message) in messages.iter().enumerate() {
        let count = message.sub_message_count();
        if count <= 1 || count % stride != 0 {
            continue;
        }
        for first in 0..stride {
            options.push(PlacementOption::SubMessages {
                parent,
                indices: (first..count).step_by(stride).collect(),
            });
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(n: usize) -> Vec<Message> {
        (1..=n)
            .map(|i| Message::new(format!("Message_{i}"), "", 32))
            .collect()
    }

    #[test]
    fn test_once_per_cycle_gives_one_option_per_message() {
        let msgs = messages(4);
        let options = enumerate_options(&msgs, 1.0, 1.0);
        assert_eq!(options.len(), 4);
        assert_eq!(options[3], PlacementOption::Messages(vec![3]));
    }

    #[test]
    fn test_every_message() {
        let msgs = messages(4);
        let options = enumerate_options(&msgs, 1.0, 4.0);
        assert_eq!(options, vec![PlacementOption::Messages(vec![0, 1, 2, 3])]);
    }

    #[test]
    fn test_options_evenly_divide_message_count() {
        let msgs = messages(12);
        for rate in 1..=12 {
            let options = enumerate_options(&msgs, 1.0, rate as f32);
            if 12 % rate == 0 {
                assert_eq!(options.len(), 12 / rate);
                assert!(options.iter().all(|o| o.indices().len() == rate));
            } else {
                assert!(options.is_empty(), "rate {rate} should have no options");
            }
        }
    }

    #[test]
    fn test_rate_faster_than_message_count() {
        let msgs = messages(2);
        assert!(enumerate_options(&msgs, 1.0, 4.0).is_empty());
    }

    #[test]
    fn test_invalid_rate_or_period() {
        let msgs = messages(2);
        assert!(enumerate_options(&msgs, 1.0, 0.0).is_empty());
        assert!(enumerate_options(&msgs, 1.0, -1.0).is_empty());
        assert!(enumerate_options(&msgs, 0.0, 1.0).is_empty());
        assert!(enumerate_options(&msgs, 1.0, f32::NAN).is_empty());
    }

    #[test]
    fn test_sub_message_options() {
        let mut msgs = messages(2);
        for _ in 0..3 {
            msgs[1].add_sub_message("");
        }
        // 4 sub-messages; one sample every 2 cycles
        let options = enumerate_options(&msgs, 1.0, 0.5);
        assert_eq!(
            options,
            vec![
                PlacementOption::SubMessages {
                    parent: 1,
                    indices: vec![0, 2]
                },
                PlacementOption::SubMessages {
                    parent: 1,
                    indices: vec![1, 3]
                },
            ]
        );

        // one sample every 3 cycles: 4 is not divisible by 3
        assert!(enumerate_options(&msgs, 1.0, 1.0 / 3.0).is_empty());
    }

    #[test]
    fn test_messages_without_sub_messages_have_no_sub_options() {
        let msgs = messages(3);
        assert!(enumerate_options(&msgs, 1.0, 0.5).is_empty());
    }

    #[test]
    fn test_labels() {
        let mut msgs = messages(4);
        msgs[1].add_sub_message("");
        msgs[1].add_sub_message("");
        msgs[1].add_sub_message("");

        let opt = PlacementOption::Messages(vec![0, 2]);
        assert_eq!(opt.label(&msgs), "Message_1, Message_3");

        let opt = PlacementOption::SubMessages {
            parent: 1,
            indices: vec![0, 2],
        };
        assert_eq!(opt.label(&msgs), "Message_2 sub-msgs 1, 3");

        let opt = PlacementOption::SubMessages {
            parent: 1,
            indices: vec![3],
        };
        assert_eq!(opt.label(&msgs), "Message_2 sub-msg 4");
    }

    #[test]
    fn test_parse_labels() {
        let msgs = messages(4);
        assert_eq!(
            PlacementOption::parse("Message_2, Message_4", &msgs).unwrap(),
            PlacementOption::Messages(vec![1, 3])
        );
        assert_eq!(
            PlacementOption::parse("Message_3 sub-msgs 2, 4", &msgs).unwrap(),
            PlacementOption::SubMessages {
                parent: 2,
                indices: vec![1, 3]
            }
        );
        assert_eq!(
            PlacementOption::parse("Message_1 sub-msg 1", &msgs).unwrap(),
            PlacementOption::SubMessages {
                parent: 0,
                indices: vec![0]
            }
        );
        assert!(PlacementOption::parse("Message_9", &msgs).is_err());
        assert!(PlacementOption::parse("Message_1 sub-msg 0", &msgs).is_err());
    }

    #[test]
    fn test_targets() {
        let opt = PlacementOption::SubMessages {
            parent: 1,
            indices: vec![0, 2],
        };
        assert_eq!(opt.parent(), Some(1));
        assert_eq!(
            opt.targets(),
            vec![
                Target::SubMessage {
                    parent: 1,
                    index: 0
                },
                Target::SubMessage {
                    parent: 1,
                    index: 2
                },
            ]
        );
    }
}
