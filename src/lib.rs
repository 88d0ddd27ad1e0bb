//! ordna - rule-based file organization with preview, undo and scheduling
//!
//! This library moves files into destination folders according to ordered,
//! extension-based rules. A run is split into explicit stages: the rule set
//! classifies files, the planner turns a directory tree into a sequence of
//! proposed moves, and the executor performs (or merely validates) them,
//! recording the result for a single-generation undo and per-rule
//! statistics.

pub mod cli;
pub mod config;
pub mod executor;
pub mod organizer;
pub mod output;
pub mod planner;
pub mod rules;
pub mod schedule;
pub mod stats;
pub mod undo;

pub use config::{CompiledFilters, ConfigError, Settings};
pub use executor::{
    CancelToken, EventSink, ExecutedMove, ExecutionReport, Executor, MoveEvent, MoveOutcome,
    NullSink, SkipReason,
};
pub use organizer::{CycleOptions, OrganizeError, OrganizeResult, Organizer};
pub use planner::{PlanBuilder, PlannedMove};
pub use rules::{Rule, RuleError, RuleSet};
pub use schedule::{CycleStatus, ScheduleConfig, Scheduler};
pub use stats::StatSnapshot;
pub use undo::UndoLog;

pub use cli::{Cli, run_cli};
