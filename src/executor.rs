//! Plan execution: performing (or simulating) the moves of a plan.
//!
//! Execution is partial-failure tolerant: every per-file problem is turned
//! into a skip entry in the [`ExecutionReport`] and the rest of the plan
//! continues. A name collision at the destination is always a skip, never an
//! overwrite and never an automatic rename.

use crate::planner::PlannedMove;
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Why a planned move was not performed.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// A file with the same name already exists at the destination.
    Collision,
    /// The filesystem denied access to the source or destination.
    PermissionDenied,
    /// The source file disappeared between planning and execution.
    SourceVanished,
    /// Any other I/O failure, with the underlying error message.
    Io(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collision => write!(f, "destination already exists"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::SourceVanished => write!(f, "source file no longer exists"),
            Self::Io(msg) => write!(f, "{}", msg),
        }
    }
}

impl SkipReason {
    fn from_io(error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::NotFound => Self::SourceVanished,
            _ => Self::Io(error.to_string()),
        }
    }
}

/// The realized effect of one planned move.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedMove {
    /// Where the file was before the move.
    pub source: PathBuf,
    /// Where the file is now.
    pub destination: PathBuf,
    /// Name of the rule that produced the move.
    pub rule_name: String,
}

/// Outcome of executing or undoing a plan.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// Moves that were performed (or, in a dry run, would have been).
    pub executed: Vec<ExecutedMove>,
    /// Moves that were skipped, with the reason for each.
    pub skipped: Vec<(PlannedMove, SkipReason)>,
    /// True if the run stopped early because of a cancellation request.
    pub cancelled: bool,
}

impl ExecutionReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && !self.cancelled
    }
}

/// What happened to one file, for the logging collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// The file was moved.
    Moved,
    /// Dry run: the file would have been moved.
    WouldMove,
    /// The file was moved back to its original location by an undo.
    Restored,
    /// The move was skipped.
    Skipped(SkipReason),
}

/// One structured event per executed or skipped move.
#[derive(Debug, Clone)]
pub struct MoveEvent {
    pub timestamp: DateTime<Local>,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub rule_name: String,
    pub outcome: MoveOutcome,
}

impl MoveEvent {
    pub(crate) fn now(
        source: &Path,
        destination: &Path,
        rule_name: &str,
        outcome: MoveOutcome,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            rule_name: rule_name.to_string(),
            outcome,
        }
    }
}

/// Receiver for move events. Append-only: the core never reads events back.
pub trait EventSink {
    fn emit(&mut self, event: &MoveEvent);
}

/// Sink that discards every event.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &MoveEvent) {}
}

/// Cooperative cancellation flag, checked between file-level steps.
///
/// Cancelling leaves the filesystem in whatever partial state the completed
/// moves produced; only an explicit undo reverses them.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Executes plans against the filesystem.
pub struct Executor;

impl Executor {
    /// Runs a plan, either for real or as a dry run.
    ///
    /// In a dry run nothing on disk is touched; each move is validated
    /// against the filesystem and against destinations claimed earlier in
    /// the same plan, and the report's `executed` list describes what would
    /// happen.
    ///
    /// In a real run the destination directory is created when absent and
    /// the file is renamed into place, falling back to copy-and-delete for
    /// cross-device moves. Failures never abort the remaining plan.
    pub fn execute<I>(
        plan: I,
        dry_run: bool,
        sink: &mut dyn EventSink,
        cancel: &CancelToken,
    ) -> ExecutionReport
    where
        I: IntoIterator<Item = PlannedMove>,
    {
        let mut report = ExecutionReport::default();
        // Destinations consumed by earlier moves in this plan, so two
        // sources proposing the same destination collide even in a dry run.
        let mut claimed: HashSet<PathBuf> = HashSet::new();

        for planned in plan {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let result = if dry_run {
                Self::validate_move(&planned, &claimed)
            } else {
                Self::perform_move(&planned)
            };

            match result {
                Ok(()) => {
                    claimed.insert(planned.destination.clone());
                    let outcome = if dry_run {
                        MoveOutcome::WouldMove
                    } else {
                        MoveOutcome::Moved
                    };
                    sink.emit(&MoveEvent::now(
                        &planned.source,
                        &planned.destination,
                        &planned.rule_name,
                        outcome,
                    ));
                    report.executed.push(ExecutedMove {
                        source: planned.source,
                        destination: planned.destination,
                        rule_name: planned.rule_name,
                    });
                }
                Err(reason) => {
                    sink.emit(&MoveEvent::now(
                        &planned.source,
                        &planned.destination,
                        &planned.rule_name,
                        MoveOutcome::Skipped(reason.clone()),
                    ));
                    report.skipped.push((planned, reason));
                }
            }
        }

        report
    }

    /// Dry-run validation of a single move.
    fn validate_move(planned: &PlannedMove, claimed: &HashSet<PathBuf>) -> Result<(), SkipReason> {
        if !planned.source.exists() {
            return Err(SkipReason::SourceVanished);
        }
        if planned.destination.exists() || claimed.contains(&planned.destination) {
            return Err(SkipReason::Collision);
        }
        Ok(())
    }

    /// Performs a single move on disk.
    fn perform_move(planned: &PlannedMove) -> Result<(), SkipReason> {
        if !planned.source.exists() {
            return Err(SkipReason::SourceVanished);
        }
        if planned.destination.exists() {
            return Err(SkipReason::Collision);
        }

        if let Some(parent) = planned.destination.parent() {
            fs::create_dir_all(parent).map_err(|e| SkipReason::from_io(&e))?;
        }

        move_file(&planned.source, &planned.destination)
    }
}

/// Moves a file, falling back to copy-and-delete when the rename crosses a
/// filesystem boundary.
pub(crate) fn move_file(source: &Path, destination: &Path) -> Result<(), SkipReason> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(source, destination).map_err(|e| SkipReason::from_io(&e))?;
            fs::remove_file(source).map_err(|e| SkipReason::from_io(&e))?;
            Ok(())
        }
        Err(e) => Err(SkipReason::from_io(&e)),
    }
}
