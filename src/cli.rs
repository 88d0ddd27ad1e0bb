//! Command-line interface.
//!
//! The CLI plays the role of the application shell: it loads settings and
//! rules, wires them into an [`Organizer`], and renders reports. All of the
//! organize/undo semantics live in the library modules; nothing here touches
//! the filesystem directly except through them.

use crate::config::Settings;
use crate::executor::{CancelToken, ExecutionReport};
use crate::organizer::{CycleOptions, Organizer};
use crate::output::{ConsoleSink, OutputFormatter};
use crate::rules::{Rule, RuleSet};
use crate::schedule::{ScheduleConfig, Scheduler};
use crate::stats::StatSnapshot;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "ordna",
    version,
    about = "Organize files into folders using extension-based rules"
)]
pub struct Cli {
    /// Path to the settings file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the rules file, overriding the settings.
    #[arg(long, global = true)]
    pub rules: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Move files according to the rules.
    Organize {
        /// Directory to organize; falls back to the configured root.
        path: Option<PathBuf>,

        /// Also organize files in subdirectories.
        #[arg(short, long)]
        recursive: bool,

        /// Show what would happen without moving anything.
        #[arg(long)]
        dry_run: bool,

        /// Ask whether to keep or revert the changes afterwards.
        #[arg(short, long)]
        interactive: bool,
    },

    /// Show the plan for a directory without executing it.
    Preview {
        /// Directory to preview; falls back to the configured root.
        path: Option<PathBuf>,

        /// Also consider files in subdirectories.
        #[arg(short, long)]
        recursive: bool,
    },

    /// Run organize cycles periodically until interrupted.
    Watch {
        /// Directory to organize; falls back to the configured root.
        path: Option<PathBuf>,

        /// Also organize files in subdirectories.
        #[arg(short, long)]
        recursive: bool,

        /// Seconds between cycles, overriding the settings.
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Manage the rule set.
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
}

#[derive(Subcommand)]
pub enum RulesCommand {
    /// List the configured rules in order.
    List,

    /// Add a rule.
    Add {
        /// Unique rule name.
        name: String,

        /// Comma-separated extensions, e.g. "jpg,png".
        #[arg(short, long, value_delimiter = ',')]
        extensions: Vec<String>,

        /// Destination folder, relative to the organize root.
        #[arg(short, long)]
        destination: PathBuf,
    },

    /// Remove a rule by name.
    Remove { name: String },

    /// Export the rules as JSON for another installation.
    Export { file: PathBuf },

    /// Import rules from JSON, replacing the current set.
    Import { file: PathBuf },
}

/// Runs the parsed CLI command.
pub fn run_cli(cli: Cli) -> Result<(), String> {
    let settings =
        Settings::load(cli.config.as_deref()).map_err(|e| format!("Error loading settings: {}", e))?;
    let rules_path = resolve_rules_path(&cli, &settings);

    match cli.command {
        Command::Organize {
            path,
            recursive,
            dry_run,
            interactive,
        } => {
            let root = resolve_root(path, &settings)?;
            let recursive = recursive || settings.organize.recursive;
            run_organize(&root, recursive, dry_run, interactive, &rules_path, &settings)
        }
        Command::Preview { path, recursive } => {
            let root = resolve_root(path, &settings)?;
            let recursive = recursive || settings.organize.recursive;
            run_preview(&root, recursive, &rules_path, &settings)
        }
        Command::Watch {
            path,
            recursive,
            interval,
        } => {
            let root = resolve_root(path, &settings)?;
            let recursive = recursive || settings.organize.recursive;
            let interval = Duration::from_secs(interval.unwrap_or(settings.schedule.interval_secs));
            run_watch(&root, recursive, interval, &rules_path, &settings)
        }
        Command::Rules { command } => run_rules(command, &rules_path),
    }
}

/// Rules file: explicit flag, then settings, then the config home.
fn resolve_rules_path(cli: &Cli, settings: &Settings) -> PathBuf {
    if let Some(path) = &cli.rules {
        return path.clone();
    }
    if let Some(path) = &settings.organize.rules_file {
        return path.clone();
    }
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home)
            .join(".config")
            .join("ordna")
            .join("rules.toml"),
        Err(_) => PathBuf::from("rules.toml"),
    }
}

fn resolve_root(path: Option<PathBuf>, settings: &Settings) -> Result<PathBuf, String> {
    path.or_else(|| settings.organize.root.clone())
        .ok_or_else(|| "No directory given and no root configured in settings".to_string())
}

fn build_organizer(rules_path: &Path, settings: &Settings) -> Result<Organizer, String> {
    let rules = RuleSet::load(rules_path).map_err(|e| format!("Error loading rules: {}", e))?;
    let filters = settings
        .compile_ignores()
        .map_err(|e| format!("Error compiling ignore rules: {}", e))?;
    Ok(Organizer::with_filters(rules, filters))
}

fn run_organize(
    root: &Path,
    recursive: bool,
    dry_run: bool,
    interactive: bool,
    rules_path: &Path,
    settings: &Settings,
) -> Result<(), String> {
    let mut organizer = build_organizer(rules_path, settings)?;

    if dry_run {
        OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", root.display()));
    } else {
        OutputFormatter::info(&format!("Organizing contents of: {}", root.display()));
    }

    // Advisory count for the progress bar; execution re-validates anyway.
    let planned = organizer
        .preview(root, recursive)
        .map_err(|e| e.to_string())?
        .len();

    let mut sink = if planned > 0 && !dry_run {
        ConsoleSink::with_progress(OutputFormatter::create_progress_bar(planned as u64))
    } else {
        ConsoleSink::new()
    };

    let options = CycleOptions::new(root).recursive(recursive).dry_run(dry_run);
    let report = organizer
        .organize(&options, &mut sink, &CancelToken::new())
        .map_err(|e| e.to_string())?;
    sink.finish();

    report_outcome(&report, dry_run);
    OutputFormatter::summary_table(organizer.last_stats());

    if dry_run {
        OutputFormatter::success("Dry run complete. No files were modified.");
    } else if interactive && !report.executed.is_empty() && ask_keep_changes() == Keep::Revert {
        let mut sink = ConsoleSink::new();
        let undo_report = organizer.undo(&mut sink).map_err(|e| e.to_string())?;
        report_outcome(&undo_report, false);
        OutputFormatter::success("Changes reverted.");
    }

    Ok(())
}

fn report_outcome(report: &ExecutionReport, dry_run: bool) {
    if report.cancelled {
        OutputFormatter::warning("Run was cancelled before completing.");
    }

    if !report.skipped.is_empty() {
        OutputFormatter::warning(&format!("{} file(s) skipped:", report.skipped.len()));
        for (mv, reason) in &report.skipped {
            OutputFormatter::plain(&format!("  - {}: {}", mv.source.display(), reason));
        }
    }

    if !dry_run && report.skipped.is_empty() && !report.executed.is_empty() {
        OutputFormatter::success("Organization complete!");
    }
}

#[derive(PartialEq)]
enum Keep {
    Changes,
    Revert,
}

fn ask_keep_changes() -> Keep {
    print!("Keep changes? [Y/n] ");
    let _ = io::stdout().flush();

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return Keep::Changes;
    }
    match answer.trim().to_lowercase().as_str() {
        "n" | "no" => Keep::Revert,
        _ => Keep::Changes,
    }
}

fn run_preview(
    root: &Path,
    recursive: bool,
    rules_path: &Path,
    settings: &Settings,
) -> Result<(), String> {
    let organizer = build_organizer(rules_path, settings)?;
    let plan = organizer
        .preview(root, recursive)
        .map_err(|e| e.to_string())?;
    OutputFormatter::preview_table(&plan);
    if !plan.is_empty() {
        OutputFormatter::summary_table(&StatSnapshot::from_plan(&plan));
    }
    Ok(())
}

fn run_watch(
    root: &Path,
    recursive: bool,
    interval: Duration,
    rules_path: &Path,
    settings: &Settings,
) -> Result<(), String> {
    use std::sync::{Arc, Mutex};

    let organizer = Arc::new(Mutex::new(build_organizer(rules_path, settings)?));

    OutputFormatter::info(&format!(
        "Watching {} every {}s. Press Ctrl+C to stop.",
        root.display(),
        interval.as_secs()
    ));

    let _scheduler = Scheduler::start(
        organizer,
        ScheduleConfig {
            root: root.to_path_buf(),
            recursive,
            interval,
        },
        Box::new(ConsoleSink::new()),
        |status| OutputFormatter::plain(&format!("Scheduled run: {}", status)),
    );

    // The scheduler thread does the work; park until the process is killed.
    loop {
        std::thread::sleep(Duration::from_secs(60));
    }
}

fn run_rules(command: RulesCommand, rules_path: &Path) -> Result<(), String> {
    match command {
        RulesCommand::List => {
            let rules = RuleSet::load(rules_path).map_err(|e| e.to_string())?;
            if rules.is_empty() {
                OutputFormatter::plain("No rules configured.");
                return Ok(());
            }
            for rule in rules.iter() {
                OutputFormatter::plain(&format!(
                    "{}: {} → {}",
                    rule.name,
                    rule.extensions.join(", "),
                    rule.destination.display()
                ));
            }
            Ok(())
        }
        RulesCommand::Add {
            name,
            extensions,
            destination,
        } => {
            let mut rules = RuleSet::load(rules_path).map_err(|e| e.to_string())?;
            rules
                .push(Rule::new(&name, extensions.iter(), destination))
                .map_err(|e| e.to_string())?;
            rules.save(rules_path).map_err(|e| e.to_string())?;
            OutputFormatter::success(&format!("Added rule '{}'.", name));
            Ok(())
        }
        RulesCommand::Remove { name } => {
            let mut rules = RuleSet::load(rules_path).map_err(|e| e.to_string())?;
            if !rules.remove(&name) {
                return Err(format!("No rule named '{}'", name));
            }
            rules.save(rules_path).map_err(|e| e.to_string())?;
            OutputFormatter::success(&format!("Removed rule '{}'.", name));
            Ok(())
        }
        RulesCommand::Export { file } => {
            let rules = RuleSet::load(rules_path).map_err(|e| e.to_string())?;
            rules.export_json(&file).map_err(|e| e.to_string())?;
            OutputFormatter::success(&format!(
                "Exported {} rule(s) to {}.",
                rules.len(),
                file.display()
            ));
            Ok(())
        }
        RulesCommand::Import { file } => {
            let imported = RuleSet::import_json(&file).map_err(|e| e.to_string())?;
            imported.save(rules_path).map_err(|e| e.to_string())?;
            OutputFormatter::success(&format!(
                "Imported {} rule(s) from {}.",
                imported.len(),
                file.display()
            ));
            Ok(())
        }
    }
}
