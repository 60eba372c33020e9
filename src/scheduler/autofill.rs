//! Greedy auto-fill.
//!
//! # Algorithm
//!
//! For each rate, in the order given:
//!
//! 1. Take the candidates at that rate that are not yet placed and sort
//!    them largest-first (stable).
//! 2. Pop the lead variable. A linked lead pulls in every other member of
//!    its link; an associated lead pulls in its associates. The group is
//!    sized by the editor's packing policy, so bit-packed members occupy
//!    one storage unit whether or not they are also linked.
//! 3. Among the rate's placement options that still have free slots, pick
//!    the one whose smallest remaining value is largest (the first one on
//!    ties). If the group does not fit there, it is left unplaced.
//!
//! The halt flag is checked between groups.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use super::editor::SchedulerEditor;
use super::options::PlacementOption;
use crate::budget::PackingPolicy;
use crate::models::{sort_largest_first, Variable};

/// Shared cancellation flag for a running auto-fill.
#[derive(Debug, Clone, Default)]
pub struct HaltFlag(Arc<AtomicBool>);

impl HaltFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the auto-fill to stop before its next group.
    pub fn halt(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_halted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Outcome of one auto-fill run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutoFillReport {
    /// Names placed, in placement order.
    pub assigned: Vec<String>,
    /// Names that had no option or no room.
    pub unplaced: Vec<String>,
    /// Whether the run stopped early.
    pub halted: bool,
}

impl AutoFillReport {
    /// Number of candidates left without a message.
    pub fn unassigned_count(&self) -> usize {
        self.unplaced.len()
    }

    pub fn is_complete(&self) -> bool {
        !self.halted && self.unplaced.is_empty()
    }
}

/// Greedy auto-fill runner.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use u_slot::budget::TelemetryPolicy;
/// use u_slot::config::{SchedulerConfig, SchedulerKind};
/// use u_slot::models::Variable;
/// use u_slot::scheduler::{AutoFill, SchedulerEditor};
///
/// let config = SchedulerConfig::new(SchedulerKind::Telemetry, 2, 32, 2);
/// let mut editor = SchedulerEditor::new(config, Arc::new(TelemetryPolicy::default())).unwrap();
///
/// let candidates = vec![
///     Variable::telemetry("a", "int32", 4, 1.0),
///     Variable::telemetry("b", "int64", 8, 1.0),
/// ];
/// let report = AutoFill::new().run(&mut editor, &[1.0], &candidates);
///
/// // "b" is larger, so it is placed first
/// assert_eq!(report.assigned, vec!["b", "a"]);
/// assert_eq!(editor.message(0).unwrap().bytes_remaining(), 8);
/// assert_eq!(editor.message(1).unwrap().bytes_remaining(), 12);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AutoFill {
    halt: HaltFlag,
}

impl AutoFill {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a shared halt flag.
    pub fn with_halt(mut self, halt: HaltFlag) -> Self {
        self.halt = halt;
        self
    }

    pub fn halt_flag(&self) -> &HaltFlag {
        &self.halt
    }

    /// Places the unplaced `candidates` at each of `rates`.
    pub fn run(
        &self,
        editor: &mut SchedulerEditor,
        rates: &[f32],
        candidates: &[Variable],
    ) -> AutoFillReport {
        let mut report = AutoFillReport::default();

        for &rate in rates {
            let placed = editor.assigned_names();
            let mut pending: Vec<Variable> = candidates
                .iter()
                .filter(|v| v.rate == rate && !placed.contains(&v.name))
                .cloned()
                .collect();
            if pending.is_empty() {
                continue;
            }
            sort_largest_first(&mut pending);

            let options = editor.message_availability(rate);
            debug!(
                "auto-fill rate {}: {} pending, {} options",
                rate,
                pending.len(),
                options.len()
            );

            while !pending.is_empty() {
                if self.halt.is_halted() {
                    report.halted = true;
                    info!("auto-fill halted");
                    return report;
                }

                let (group, size) = take_group(&mut pending, editor.policy());
                let names: Vec<String> = group.iter().map(|v| v.name.clone()).collect();

                match message_with_room(editor, &options, group.len(), size) {
                    Some(option) => match editor.assign(group, &option) {
                        Ok(assigned) => report.assigned.extend(assigned),
                        Err(e) => {
                            warn!("auto-fill could not place {:?}: {}", names, e);
                            report.unplaced.extend(names);
                        }
                    },
                    None => report.unplaced.extend(names),
                }
            }
        }

        if !report.unplaced.is_empty() {
            warn!(
                "auto-fill left {} {} unassigned",
                report.unplaced.len(),
                editor.config().kind.item_noun()
            );
        }
        info!("auto-fill assigned {}", report.assigned.len());
        report
    }
}

/// Removes the first pending variable and the members that must travel
/// with it. Returns the group and the size the policy gives it.
fn take_group(pending: &mut Vec<Variable>, policy: &dyn PackingPolicy) -> (Vec<Variable>, u32) {
    let lead = pending.remove(0);

    let mut group = if lead.link.is_some() {
        drain_matching(pending, |v| v.shares_link(&lead))
    } else if lead.association.is_some() {
        drain_matching(pending, |v| v.shares_association(&lead))
    } else {
        Vec::new()
    };
    group.insert(0, lead);

    let members: Vec<&Variable> = group.iter().collect();
    let size = policy.packed_size(&members);
    (group, size)
}

fn drain_matching<F>(pending: &mut Vec<Variable>, matches: F) -> Vec<Variable>
where
    F: Fn(&Variable) -> bool,
{
    let mut taken = Vec::new();
    let mut index = 0;
    while index < pending.len() {
        if matches(&pending[index]) {
            taken.push(pending.remove(index));
        } else {
            index += 1;
        }
    }
    taken
}

/// The option with the most room for `count` variables of total `size`,
/// if the group fits there.
pub fn message_with_room(
    editor: &SchedulerEditor,
    options: &[PlacementOption],
    count: usize,
    size: u32,
) -> Option<PlacementOption> {
    let mut best: Option<(&PlacementOption, i64)> = None;
    for option in options {
        if !editor.has_free_slots(option, count) {
            continue;
        }
        let Some(room) = editor.smallest_remaining(option) else {
            continue;
        };
        if best.map_or(true, |(_, most)| room > most) {
            best = Some((option, room));
        }
    }

    match best {
        Some((option, room)) if i64::from(size) <= room => Some(option.clone()),
        _ => None,
    }
}
