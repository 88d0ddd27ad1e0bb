//! The organize cycle: plan, preview, execute, undo.
//!
//! [`Organizer`] owns the pieces a cycle needs (rules, undo log, latest
//! statistics) and is passed into callers explicitly rather than living in a
//! process-wide singleton, so each piece stays testable in isolation.
//!
//! A cycle runs on one logical thread of control. Overlapping organize/undo
//! operations are rejected through a single in-flight flag rather than any
//! finer locking; there is no shared mutable resource beyond the organizer
//! itself.

use crate::config::CompiledFilters;
use crate::executor::{CancelToken, EventSink, ExecutionReport, Executor};
use crate::planner::{PlanBuilder, PlannedMove};
use crate::rules::RuleSet;
use crate::stats::StatSnapshot;
use crate::undo::UndoLog;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Errors surfaced to the caller as rejected operations.
///
/// Per-file problems during execution or undo are never errors; they end up
/// as skip entries in the [`ExecutionReport`].
#[derive(Debug)]
pub enum OrganizeError {
    /// The organize root does not exist or is not a directory.
    InvalidRoot(PathBuf),
    /// No rules were provided, so there is nothing to classify against.
    NoRules,
    /// Undo was requested but no executed batch is recorded.
    NothingToUndo,
    /// An organize or undo cycle is already in flight.
    OperationInProgress,
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRoot(path) => {
                write!(f, "Invalid directory: {}", path.display())
            }
            Self::NoRules => write!(f, "No organization rules provided"),
            Self::NothingToUndo => write!(f, "Nothing to undo"),
            Self::OperationInProgress => {
                write!(f, "Another organize or undo operation is already running")
            }
        }
    }
}

impl std::error::Error for OrganizeError {}

/// Result type for organize cycle operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Parameters of one organize cycle.
#[derive(Debug, Clone)]
pub struct CycleOptions {
    pub root: PathBuf,
    pub recursive: bool,
    pub dry_run: bool,
}

impl CycleOptions {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            recursive: false,
            dry_run: false,
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Drives the organize cycle over injected rules, undo log and statistics.
pub struct Organizer {
    rules: RuleSet,
    filters: CompiledFilters,
    undo_log: UndoLog,
    last_stats: StatSnapshot,
    in_flight: AtomicBool,
}

impl Organizer {
    pub fn new(rules: RuleSet) -> Self {
        Self::with_filters(rules, CompiledFilters::default())
    }

    /// Creates an organizer whose plans respect the given ignore filters.
    pub fn with_filters(rules: RuleSet, filters: CompiledFilters) -> Self {
        Self {
            rules,
            filters,
            undo_log: UndoLog::new(),
            last_stats: StatSnapshot::default(),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Statistics of the most recent run or preview.
    pub fn last_stats(&self) -> &StatSnapshot {
        &self.last_stats
    }

    /// Returns true if an executed batch is available for undo.
    pub fn can_undo(&self) -> bool {
        self.undo_log.has_batch()
    }

    /// Builds a plan without executing it.
    ///
    /// The plan reflects the filesystem at the time of the call and is
    /// advisory only; execution re-validates each move.
    pub fn preview(&self, root: &Path, recursive: bool) -> OrganizeResult<Vec<PlannedMove>> {
        self.check_inputs(root)?;
        Ok(PlanBuilder::new(root, &self.rules)
            .recursive(recursive)
            .filters(&self.filters)
            .build())
    }

    /// Runs one organize cycle: plan, then execute (or validate, for a dry
    /// run).
    ///
    /// On a non-dry run the undo log is replaced with the executed moves and
    /// the statistics snapshot is rebuilt from the same list. A dry run
    /// updates statistics only.
    ///
    /// # Errors
    ///
    /// Rejected up front with [`OrganizeError::OperationInProgress`] when a
    /// cycle is already in flight, or [`OrganizeError::InvalidRoot`] /
    /// [`OrganizeError::NoRules`] when validation fails. Per-file failures
    /// are reported, not raised.
    pub fn organize(
        &mut self,
        options: &CycleOptions,
        sink: &mut dyn EventSink,
        cancel: &CancelToken,
    ) -> OrganizeResult<ExecutionReport> {
        let _guard = FlightGuard::acquire(&self.in_flight)?;
        self.check_inputs(&options.root)?;

        let plan = PlanBuilder::new(&options.root, &self.rules)
            .recursive(options.recursive)
            .filters(&self.filters)
            .build();

        let report = Executor::execute(plan, options.dry_run, sink, cancel);

        self.last_stats = StatSnapshot::from_executed(&report.executed);
        if !options.dry_run {
            self.undo_log.record(report.executed.clone());
        }

        Ok(report)
    }

    /// Reverses the most recently executed batch.
    ///
    /// # Errors
    ///
    /// [`OrganizeError::NothingToUndo`] when no batch is recorded, or
    /// [`OrganizeError::OperationInProgress`] when a cycle is in flight.
    pub fn undo(&mut self, sink: &mut dyn EventSink) -> OrganizeResult<ExecutionReport> {
        let _guard = FlightGuard::acquire(&self.in_flight)?;
        self.undo_log.undo(sink)
    }

    fn check_inputs(&self, root: &Path) -> OrganizeResult<()> {
        if !root.is_dir() {
            return Err(OrganizeError::InvalidRoot(root.to_path_buf()));
        }
        if self.rules.is_empty() {
            return Err(OrganizeError::NoRules);
        }
        Ok(())
    }
}

/// Holds the in-flight flag for the duration of one operation.
///
/// Released on drop so every exit path, including errors, clears the flag.
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> OrganizeResult<Self> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(OrganizeError::OperationInProgress);
        }
        Ok(Self(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
