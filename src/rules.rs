//! Organization rules: mapping file extensions to destination folders.
//!
//! A [`Rule`] names a set of extensions and the folder files with those
//! extensions should be moved into. A [`RuleSet`] is an ordered collection of
//! rules with unique names; classification scans the set in order and the
//! first matching rule wins, so overlapping extension sets are resolved
//! deterministically.
//!
//! Rules persist in a TOML file between runs and can be exchanged between
//! installations as JSON via [`RuleSet::export_json`] / [`RuleSet::import_json`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that can occur while building, loading or saving rules.
#[derive(Debug)]
pub enum RuleError {
    /// A rule name appears more than once in the set.
    DuplicateName(String),
    /// A rule was given an empty name.
    EmptyName,
    /// A rule has no extensions after normalization.
    NoExtensions(String),
    /// Failed to read a rules file.
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to write a rules file.
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A rules file could not be parsed.
    ParseFailed { path: PathBuf, reason: String },
}

impl std::fmt::Display for RuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateName(name) => write!(f, "Duplicate rule name: {}", name),
            Self::EmptyName => write!(f, "Rule names must not be empty"),
            Self::NoExtensions(name) => {
                write!(f, "Rule '{}' has no extensions", name)
            }
            Self::ReadFailed { path, source } => {
                write!(f, "Failed to read rules file {}: {}", path.display(), source)
            }
            Self::WriteFailed { path, source } => {
                write!(
                    f,
                    "Failed to write rules file {}: {}",
                    path.display(),
                    source
                )
            }
            Self::ParseFailed { path, reason } => {
                write!(f, "Invalid rules file {}: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for RuleError {}

/// A single organization rule.
///
/// Extensions are normalized on construction: lowercased, prefixed with a
/// dot when the dot is missing, and deduplicated while preserving order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Display name, unique within a [`RuleSet`].
    pub name: String,
    /// Normalized extensions, e.g. `[".jpg", ".png"]`.
    pub extensions: Vec<String>,
    /// Destination folder. Resolved against the organize root when relative.
    pub destination: PathBuf,
}

impl Rule {
    /// Creates a rule, normalizing the given extensions.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordna::rules::Rule;
    ///
    /// let rule = Rule::new("Images", ["JPG", ".png", "jpg"], "Images");
    /// assert_eq!(rule.extensions, vec![".jpg", ".png"]);
    /// ```
    pub fn new<I, S, P>(name: &str, extensions: I, destination: P) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        P: Into<PathBuf>,
    {
        let mut seen = HashSet::new();
        let mut normalized = Vec::new();
        for ext in extensions {
            let ext = Self::normalize_extension(ext.as_ref());
            if !ext.is_empty() && seen.insert(ext.clone()) {
                normalized.push(ext);
            }
        }

        Self {
            name: name.to_string(),
            extensions: normalized,
            destination: destination.into(),
        }
    }

    /// Lowercases an extension and ensures a single leading dot.
    fn normalize_extension(raw: &str) -> String {
        let trimmed = raw.trim().trim_start_matches('.');
        if trimmed.is_empty() {
            return String::new();
        }
        format!(".{}", trimmed.to_lowercase())
    }

    /// Returns true if this rule covers the given normalized extension.
    pub fn matches(&self, extension: &str) -> bool {
        self.extensions.iter().any(|e| e == extension)
    }

    /// Re-normalizes a rule that was deserialized from disk.
    fn renormalized(self) -> Self {
        Self::new(&self.name, self.extensions.iter(), self.destination)
    }
}

/// Ordered collection of rules with unique names.
///
/// Order is significant: [`RuleSet::classify`] returns the first rule whose
/// extension set contains the file's extension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

/// On-disk representation of a rule set (TOML table of `[[rules]]`).
#[derive(Serialize, Deserialize)]
struct RulesFile {
    #[serde(default)]
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Creates an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a rule set from rules, validating names and extensions.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate or empty names, or a rule whose
    /// extension list is empty after normalization.
    pub fn from_rules<I: IntoIterator<Item = Rule>>(rules: I) -> Result<Self, RuleError> {
        let mut set = Self::new();
        for rule in rules {
            set.push(rule)?;
        }
        Ok(set)
    }

    /// Appends a rule, keeping names unique.
    pub fn push(&mut self, rule: Rule) -> Result<(), RuleError> {
        if rule.name.trim().is_empty() {
            return Err(RuleError::EmptyName);
        }
        if rule.extensions.is_empty() {
            return Err(RuleError::NoExtensions(rule.name));
        }
        if self.rules.iter().any(|r| r.name == rule.name) {
            return Err(RuleError::DuplicateName(rule.name));
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Removes the rule with the given name. Returns true if one was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.name != name);
        self.rules.len() != before
    }

    /// Returns the first rule matching the file's extension, if any.
    ///
    /// The comparison is case-insensitive; files without an extension never
    /// match. Absence of a match is a normal outcome, not an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordna::rules::{Rule, RuleSet};
    /// use std::path::Path;
    ///
    /// let rules = RuleSet::from_rules([Rule::new("Images", ["jpg"], "Images")]).unwrap();
    /// assert!(rules.classify(Path::new("photo.JPG")).is_some());
    /// assert!(rules.classify(Path::new("notes.txt")).is_none());
    /// ```
    pub fn classify(&self, path: &Path) -> Option<&Rule> {
        let ext = path.extension()?.to_str()?;
        let normalized = format!(".{}", ext.to_lowercase());
        self.rules.iter().find(|rule| rule.matches(&normalized))
    }

    /// Iterates over the rules in order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Loads a rule set from a TOML file.
    ///
    /// A missing file yields an empty set so a fresh installation starts
    /// without an error. Extensions are re-normalized on load.
    pub fn load(path: &Path) -> Result<Self, RuleError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path).map_err(|e| RuleError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: RulesFile = toml::from_str(&content).map_err(|e| RuleError::ParseFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_rules(file.rules.into_iter().map(Rule::renormalized))
    }

    /// Saves the rule set to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), RuleError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| RuleError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let file = RulesFile {
            rules: self.rules.clone(),
        };
        let content = toml::to_string_pretty(&file).map_err(|e| RuleError::ParseFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        fs::write(path, content).map_err(|e| RuleError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Exports the rule set as portable JSON for transfer between
    /// installations.
    pub fn export_json(&self, path: &Path) -> Result<(), RuleError> {
        let json =
            serde_json::to_string_pretty(&self.rules).map_err(|e| RuleError::ParseFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        fs::write(path, json).map_err(|e| RuleError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Imports a rule set from JSON, replacing nothing until it validates.
    pub fn import_json(path: &Path) -> Result<Self, RuleError> {
        let content = fs::read_to_string(path).map_err(|e| RuleError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let rules: Vec<Rule> =
            serde_json::from_str(&content).map_err(|e| RuleError::ParseFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Self::from_rules(rules.into_iter().map(Rule::renormalized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn image_rules() -> RuleSet {
        RuleSet::from_rules([
            Rule::new("Images", [".jpg", ".png"], "Images"),
            Rule::new("Documents", [".txt", ".pdf"], "Documents"),
        ])
        .expect("valid rules")
    }

    #[test]
    fn test_extension_normalization() {
        let rule = Rule::new("Mixed", ["JPG", ".PNG", "png", " .gif "], "Mixed");
        assert_eq!(rule.extensions, vec![".jpg", ".png", ".gif"]);
    }

    #[test]
    fn test_classify_first_match_wins_on_overlap() {
        let rules = RuleSet::from_rules([
            Rule::new("Photos", [".jpg"], "Photos"),
            Rule::new("Pictures", [".jpg", ".png"], "Pictures"),
        ])
        .unwrap();

        let rule = rules.classify(Path::new("cat.jpg")).unwrap();
        assert_eq!(rule.name, "Photos");
        let rule = rules.classify(Path::new("cat.png")).unwrap();
        assert_eq!(rule.name, "Pictures");
    }

    #[test]
    fn test_classify_case_insensitive() {
        let rules = image_rules();
        assert_eq!(rules.classify(Path::new("a.JPG")).unwrap().name, "Images");
        assert_eq!(rules.classify(Path::new("a.Png")).unwrap().name, "Images");
    }

    #[test]
    fn test_classify_no_match_and_no_extension() {
        let rules = image_rules();
        assert!(rules.classify(Path::new("archive.zip")).is_none());
        assert!(rules.classify(Path::new("Makefile")).is_none());
        assert!(rules.classify(Path::new(".gitignore")).is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let result = RuleSet::from_rules([
            Rule::new("Images", [".jpg"], "Images"),
            Rule::new("Images", [".png"], "Pictures"),
        ]);
        assert!(matches!(result, Err(RuleError::DuplicateName(_))));
    }

    #[test]
    fn test_rule_without_extensions_rejected() {
        let result = RuleSet::from_rules([Rule::new("Empty", Vec::<String>::new(), "Empty")]);
        assert!(matches!(result, Err(RuleError::NoExtensions(_))));
    }

    #[test]
    fn test_remove_rule() {
        let mut rules = image_rules();
        assert!(rules.remove("Images"));
        assert!(!rules.remove("Images"));
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_load_missing_file_yields_empty_set() {
        let temp = TempDir::new().unwrap();
        let rules = RuleSet::load(&temp.path().join("rules.toml")).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rules.toml");

        let rules = image_rules();
        rules.save(&path).unwrap();
        let loaded = RuleSet::load(&path).unwrap();
        assert_eq!(loaded, rules);
    }

    #[test]
    fn test_json_export_import_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rules.json");

        let rules = image_rules();
        rules.export_json(&path).unwrap();
        let imported = RuleSet::import_json(&path).unwrap();
        assert_eq!(imported, rules);
    }

    #[test]
    fn test_import_renormalizes_extensions() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rules.json");
        fs::write(
            &path,
            r#"[{"name": "Images", "extensions": ["JPG", "png"], "destination": "Images"}]"#,
        )
        .unwrap();

        let imported = RuleSet::import_json(&path).unwrap();
        let rule = imported.iter().next().unwrap();
        assert_eq!(rule.extensions, vec![".jpg", ".png"]);
    }

    #[test]
    fn test_import_invalid_json_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rules.json");
        fs::write(&path, "not json").unwrap();
        assert!(RuleSet::import_json(&path).is_err());
    }
}
