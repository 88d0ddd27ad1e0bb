//! Console output and the console event sink.
//!
//! Centralizes styling so the CLI prints consistently: colored status
//! messages, a progress bar over plan execution, and a summary table of the
//! statistics snapshot. [`ConsoleSink`] adapts the executor's move events to
//! the terminal.

use crate::executor::{EventSink, MoveEvent, MoveOutcome};
use crate::planner::PlannedMove;
use crate::stats::StatSnapshot;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Styled console messages.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar sized to the plan.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Prints a plan as a preview table without mutating anything.
    pub fn preview_table(plan: &[PlannedMove]) {
        if plan.is_empty() {
            Self::plain("Nothing to organize: no files match the rules.");
            return;
        }

        Self::header("PREVIEW");
        for mv in plan {
            println!(
                " {} {} {} {}",
                mv.source.display(),
                "→".cyan(),
                mv.destination.display(),
                format!("[{}]", mv.rule_name).dimmed()
            );
        }
        println!(
            "\n{} planned move{}",
            plan.len().to_string().bold(),
            if plan.len() == 1 { "" } else { "s" }
        );
    }

    /// Prints the per-rule summary of a run.
    pub fn summary_table(stats: &StatSnapshot) {
        Self::header("SUMMARY");

        if stats.is_empty() {
            Self::plain("No files were moved.");
            return;
        }

        let max_rule_len = stats
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max(4); // at least "Rule" width

        println!(
            "{:<width$} | {}",
            "Rule".bold(),
            "Files".bold(),
            width = max_rule_len
        );
        println!("{}", "-".repeat(max_rule_len + 10));

        for (rule, count) in stats.iter() {
            let file_word = if count == 1 { "file" } else { "files" };
            println!(
                "{:<width$} | {} {}",
                rule,
                count.to_string().green(),
                file_word,
                width = max_rule_len
            );
        }

        println!("{}", "-".repeat(max_rule_len + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            stats.total().to_string().green().bold(),
            if stats.total() == 1 { "file" } else { "files" },
            width = max_rule_len
        );
    }
}

/// Event sink that prints one line per move and drives an optional progress
/// bar.
pub struct ConsoleSink {
    bar: Option<ProgressBar>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self { bar: None }
    }

    /// Attaches a progress bar that advances once per event.
    pub fn with_progress(bar: ProgressBar) -> Self {
        Self { bar: Some(bar) }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    fn line(&self, message: String) {
        // Printing through the bar keeps it from being overdrawn.
        match &self.bar {
            Some(bar) => bar.println(message),
            None => println!("{}", message),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for ConsoleSink {
    fn emit(&mut self, event: &MoveEvent) {
        let message = match &event.outcome {
            MoveOutcome::Moved => format!(
                " {} {} → {}",
                "✓".green(),
                event.source.display(),
                event.destination.display()
            ),
            MoveOutcome::WouldMove => format!(
                " {} {} → {}",
                "·".yellow(),
                event.source.display(),
                event.destination.display()
            ),
            MoveOutcome::Restored => format!(
                " {} {} restored to {}",
                "↩".green(),
                event.source.display(),
                event.destination.display()
            ),
            MoveOutcome::Skipped(reason) => format!(
                " {} {} skipped: {}",
                "✗".red(),
                event.source.display(),
                reason
            ),
        };
        self.line(message);

        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }
}
