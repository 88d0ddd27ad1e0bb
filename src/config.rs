//! Application settings and ignore filters.
//!
//! Settings are stored in TOML and discovered the usual way: an explicit
//! path, then `.ordna.toml` in the current directory, then
//! `~/.config/ordna/config.toml`, then built-in defaults.
//!
//! # Configuration File Format
//!
//! ```toml
//! [organize]
//! root = "/home/user/Downloads"
//! recursive = true
//! rules_file = "/home/user/.config/ordna/rules.toml"
//!
//! [schedule]
//! interval_secs = 3600
//!
//! [ignore]
//! include_hidden = false
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.tmp", "*.part"]
//! ```

use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that can occur while loading or compiling settings.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Settings file not found at the explicitly given path.
    NotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    Invalid(String),
    /// An ignore glob pattern failed to compile.
    InvalidPattern(String),
    /// IO error while reading the settings file.
    Io(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => {
                write!(f, "Settings file not found: {}", path.display())
            }
            Self::Invalid(msg) => write!(f, "Invalid settings: {}", msg),
            Self::InvalidPattern(pattern) => {
                write!(f, "Invalid ignore pattern '{}'", pattern)
            }
            Self::Io(msg) => write!(f, "IO error reading settings: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Top-level application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub organize: OrganizeSettings,
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub ignore: IgnoreRules,
}

/// Defaults for the organize cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizeSettings {
    /// Directory organized when the CLI gets no path argument.
    pub root: Option<PathBuf>,
    /// Whether to descend into subdirectories.
    #[serde(default)]
    pub recursive: bool,
    /// Where the rule set is persisted. Defaults to `rules.toml` next to
    /// the settings file's directory when unset.
    pub rules_file: Option<PathBuf>,
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// Seconds between scheduled organize cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    3600
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

/// Files that never enter a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoreRules {
    /// Whether hidden files (leading dot) are considered. Defaults to false.
    #[serde(default)]
    pub include_hidden: bool,

    /// Exact filenames to ignore (e.g. ".DS_Store", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns to ignore (e.g. "*.tmp", "*.part").
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            include_hidden: false,
            filenames: Vec::new(),
            patterns: Vec::new(),
        }
    }
}

impl Settings {
    /// Loads settings, with fallback to defaults.
    ///
    /// Resolution order: the explicit `path` if given, `.ordna.toml` in the
    /// current directory, `~/.config/ordna/config.toml`, then defaults.
    ///
    /// # Errors
    ///
    /// Only an explicitly provided file that is missing or unreadable is an
    /// error; absent fallback locations silently yield defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }

        let local = PathBuf::from(".ordna.toml");
        if local.exists() {
            return Self::load_from_file(&local);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("ordna")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Compiles the ignore rules into matchers.
    pub fn compile_ignores(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.ignore)
    }
}

/// Pre-compiled ignore matchers, built once per run.
#[derive(Debug, Default)]
pub struct CompiledFilters {
    include_hidden: bool,
    filenames: HashSet<String>,
    patterns: Vec<Pattern>,
}

impl CompiledFilters {
    /// Compiles ignore rules, validating every glob pattern.
    pub fn new(rules: &IgnoreRules) -> Result<Self, ConfigError> {
        let patterns = rules
            .patterns
            .iter()
            .map(|p| Pattern::new(p).map_err(|_| ConfigError::InvalidPattern(p.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            include_hidden: rules.include_hidden,
            filenames: rules.filenames.iter().cloned().collect(),
            patterns,
        })
    }

    /// Returns true if a file may enter the plan.
    ///
    /// Checks, in order: hidden-file toggle, exact filename, glob patterns
    /// against the file name.
    pub fn should_include(&self, path: &Path) -> bool {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if !self.include_hidden && file_name.starts_with('.') {
            return false;
        }

        if self.filenames.contains(file_name.as_ref()) {
            return false;
        }

        !self.patterns.iter().any(|p| p.matches(&file_name))
    }

    /// Returns true if a traversal may descend into the directory.
    ///
    /// Only the hidden toggle applies to directories; extension-shaped
    /// patterns are meant for files.
    pub fn should_descend(&self, dir: &Path) -> bool {
        if self.include_hidden {
            return true;
        }
        dir.file_name()
            .map(|n| !n.to_string_lossy().starts_with('.'))
            .unwrap_or(true)
    }
}
