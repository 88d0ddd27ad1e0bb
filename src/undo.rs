//! Undo support for the most recently executed plan.
//!
//! Only a single undo generation is retained: recording a new batch replaces
//! the previous one wholesale, and a successful (or partial) undo clears the
//! log. The log lives in memory only; nothing survives a restart except the
//! rule store.

use crate::executor::{
    EventSink, ExecutedMove, ExecutionReport, MoveEvent, MoveOutcome, SkipReason, move_file,
};
use crate::organizer::OrganizeError;
use crate::planner::PlannedMove;
use chrono::{DateTime, Local};
use std::fs;

/// The moves of one executed plan, eligible for reversal.
#[derive(Debug, Clone)]
pub struct UndoBatch {
    /// When the batch was executed.
    pub timestamp: DateTime<Local>,
    /// Moves in execution order; undo replays them in reverse.
    pub moves: Vec<ExecutedMove>,
}

/// Holds at most one batch of reversible moves.
#[derive(Debug, Default)]
pub struct UndoLog {
    batch: Option<UndoBatch>,
}

impl UndoLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the log's content with a new batch.
    ///
    /// An empty batch clears the log, so a run that moved nothing leaves
    /// nothing to undo.
    pub fn record(&mut self, moves: Vec<ExecutedMove>) {
        self.batch = if moves.is_empty() {
            None
        } else {
            Some(UndoBatch {
                timestamp: Local::now(),
                moves,
            })
        };
    }

    /// Returns true if there is a batch to undo.
    pub fn has_batch(&self) -> bool {
        self.batch.is_some()
    }

    /// Timestamp of the recorded batch, if any.
    pub fn recorded_at(&self) -> Option<DateTime<Local>> {
        self.batch.as_ref().map(|b| b.timestamp)
    }

    /// Reverses the recorded batch, moving each file back in reverse order.
    ///
    /// Skip handling mirrors the executor: a file missing from its recorded
    /// destination, or an occupied original location, is recorded as skipped
    /// and the rest of the batch continues. The log is cleared afterwards
    /// even when some files were skipped.
    ///
    /// # Errors
    ///
    /// Returns [`OrganizeError::NothingToUndo`] when no batch is recorded;
    /// calling undo twice in a row without an intervening execution is
    /// rejected, not silently repeated.
    pub fn undo(&mut self, sink: &mut dyn EventSink) -> Result<ExecutionReport, OrganizeError> {
        let batch = self.batch.take().ok_or(OrganizeError::NothingToUndo)?;

        let mut report = ExecutionReport::default();
        for mv in batch.moves.into_iter().rev() {
            match Self::restore(&mv) {
                Ok(()) => {
                    sink.emit(&MoveEvent::now(
                        &mv.destination,
                        &mv.source,
                        &mv.rule_name,
                        MoveOutcome::Restored,
                    ));
                    report.executed.push(ExecutedMove {
                        source: mv.destination,
                        destination: mv.source,
                        rule_name: mv.rule_name,
                    });
                }
                Err(reason) => {
                    sink.emit(&MoveEvent::now(
                        &mv.destination,
                        &mv.source,
                        &mv.rule_name,
                        MoveOutcome::Skipped(reason.clone()),
                    ));
                    report.skipped.push((
                        PlannedMove {
                            source: mv.destination,
                            destination: mv.source,
                            rule_name: mv.rule_name,
                        },
                        reason,
                    ));
                }
            }
        }

        Ok(report)
    }

    /// Moves one file back from its destination to its original path.
    fn restore(mv: &ExecutedMove) -> Result<(), SkipReason> {
        if !mv.destination.exists() {
            return Err(SkipReason::SourceVanished);
        }
        if mv.source.exists() {
            return Err(SkipReason::Collision);
        }

        // The original parent may have been emptied or removed since.
        if let Some(parent) = mv.source.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| SkipReason::Io(e.to_string()))?;
        }

        move_file(&mv.destination, &mv.source)
    }
}
