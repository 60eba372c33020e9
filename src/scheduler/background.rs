//! Auto-fill on a worker thread.
//!
//! The editor that owns the messages is never shared. The worker runs on a
//! clone and sends it back through a channel; the owner adopts it with
//! [`AutoFillOutcome::apply_to`]. A halted run is discarded, and a result
//! is refused if the owner's messages changed after the run started.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use log::{debug, warn};

use super::autofill::{AutoFill, AutoFillReport, HaltFlag};
use super::editor::SchedulerEditor;
use crate::error::{Result, SchedulerError};
use crate::models::{Message, Variable};

/// Result of a background auto-fill.
#[derive(Debug)]
pub struct AutoFillOutcome {
    /// The worker's copy of the editor after the run.
    pub editor: SchedulerEditor,
    pub report: AutoFillReport,
    /// The owner's messages when the run started.
    base: Vec<Message>,
}

impl AutoFillOutcome {
    /// Adopts the worker's messages into `editor`. Returns `false` and
    /// leaves `editor` untouched when the run was halted.
    ///
    /// Returns [`SchedulerError::Diverged`] and leaves `editor` untouched
    /// if it was edited after the run started.
    pub fn apply_to(self, editor: &mut SchedulerEditor) -> Result<bool> {
        if self.report.halted {
            debug!("discarding halted auto-fill result");
            return Ok(false);
        }
        if let Err(e) = editor.adopt_messages(self.editor, &self.base) {
            warn!("auto-fill result refused: {}", e);
            return Err(e);
        }
        Ok(true)
    }
}

/// Handle to a running background auto-fill.
#[derive(Debug)]
pub struct AutoFillTask {
    halt: HaltFlag,
    receiver: Receiver<AutoFillOutcome>,
    handle: Option<JoinHandle<()>>,
}

impl AutoFillTask {
    /// Asks the worker to stop before its next group.
    pub fn halt(&self) {
        self.halt.halt();
    }

    /// The outcome, if the worker has finished.
    pub fn try_result(&self) -> Result<Option<AutoFillOutcome>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Ok(Some(outcome)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(worker_gone()),
        }
    }

    /// Blocks until the worker finishes.
    pub fn wait(mut self) -> Result<AutoFillOutcome> {
        let outcome = self.receiver.recv().map_err(|_| worker_gone());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("auto-fill worker panicked");
            }
        }
        outcome
    }
}

fn worker_gone() -> SchedulerError {
    SchedulerError::Worker("auto-fill worker exited without a result".to_string())
}

/// Starts an auto-fill of `candidates` at `rates` on a clone of `editor`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use u_slot::budget::TelemetryPolicy;
/// use u_slot::config::{SchedulerConfig, SchedulerKind};
/// use u_slot::models::Variable;
/// use u_slot::scheduler::{spawn_auto_fill, SchedulerEditor};
///
/// let config = SchedulerConfig::new(SchedulerKind::Telemetry, 2, 32, 2);
/// let mut editor = SchedulerEditor::new(config, Arc::new(TelemetryPolicy::default())).unwrap();
///
/// let task = spawn_auto_fill(&editor, vec![1.0], vec![Variable::telemetry("a", "int32", 4, 1.0)]).unwrap();
/// let outcome = task.wait().unwrap();
/// assert!(outcome.apply_to(&mut editor).unwrap());
/// assert!(editor.assigned_names().contains("a"));
/// ```
pub fn spawn_auto_fill(
    editor: &SchedulerEditor,
    rates: Vec<f32>,
    candidates: Vec<Variable>,
) -> Result<AutoFillTask> {
    let halt = HaltFlag::new();
    let runner = AutoFill::new().with_halt(halt.clone());
    let mut worker = editor.clone();
    let base = editor.messages().to_vec();
    let (tx, rx) = mpsc::channel();

    let handle = thread::Builder::new()
        .name("auto-fill".to_string())
        .spawn(move || {
            let report = runner.run(&mut worker, &rates, &candidates);
            if tx
                .send(AutoFillOutcome {
                    editor: worker,
                    report,
                    base,
                })
                .is_err()
            {
                debug!("auto-fill result dropped; task handle gone");
            }
        })
        .map_err(|e| SchedulerError::Worker(e.to_string()))?;

    Ok(AutoFillTask {
        halt,
        receiver: rx,
        handle: Some(handle),
    })
}
