//! Periodic organize cycles on a background thread.
//!
//! The scheduler ticks once per second and fires an organize cycle whenever
//! the configured interval has elapsed. If a cycle is already running when a
//! tick fires, the trigger is dropped rather than queued, so scheduled runs
//! never overlap a foreground operation's filesystem mutation.

use crate::executor::{CancelToken, EventSink, NullSink};
use crate::organizer::{CycleOptions, OrganizeError, Organizer};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Fixed configuration of scheduled runs.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub root: PathBuf,
    pub recursive: bool,
    pub interval: Duration,
}

/// How one scheduled cycle ended, reported for logging only.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleStatus {
    /// The cycle ran; counts of moved and skipped files.
    Completed { moved: usize, skipped: usize },
    /// The trigger was dropped because an operation was in flight.
    Dropped,
    /// The cycle was rejected or could not start.
    Failed(String),
}

impl std::fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed { moved, skipped } => {
                write!(f, "organized {} file(s), {} skipped", moved, skipped)
            }
            Self::Dropped => write!(f, "skipped: another operation was running"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Background timer that triggers organize cycles.
pub struct Scheduler {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Starts the scheduler thread.
    ///
    /// `on_cycle` receives the outcome of every fired trigger; move-level
    /// detail goes to the event sink as in a foreground run.
    pub fn start<F>(
        organizer: Arc<Mutex<Organizer>>,
        config: ScheduleConfig,
        mut sink: Box<dyn EventSink + Send>,
        on_cycle: F,
    ) -> Self
    where
        F: Fn(CycleStatus) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let handle = thread::spawn(move || {
            let mut last_run = Instant::now();
            while thread_running.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_secs(1));
                if last_run.elapsed() < config.interval {
                    continue;
                }
                last_run = Instant::now();
                on_cycle(Self::run_cycle(&organizer, &config, sink.as_mut()));
            }
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Fires one cycle, dropping the trigger when the organizer is busy.
    fn run_cycle(
        organizer: &Mutex<Organizer>,
        config: &ScheduleConfig,
        sink: &mut dyn EventSink,
    ) -> CycleStatus {
        // A foreground operation holds the lock for its whole duration, so
        // try_lock failing means a cycle is in flight.
        let Ok(mut organizer) = organizer.try_lock() else {
            return CycleStatus::Dropped;
        };

        let options = CycleOptions::new(config.root.clone()).recursive(config.recursive);
        match organizer.organize(&options, sink, &CancelToken::new()) {
            Ok(report) => CycleStatus::Completed {
                moved: report.executed.len(),
                skipped: report.skipped.len(),
            },
            Err(OrganizeError::OperationInProgress) => CycleStatus::Dropped,
            Err(e) => CycleStatus::Failed(e.to_string()),
        }
    }

    /// Stops the timer and joins the thread.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Convenience for callers that do not care about per-move events.
pub fn silent_sink() -> Box<dyn EventSink + Send> {
    Box::new(NullSink)
}
