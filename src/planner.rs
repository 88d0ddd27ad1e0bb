//! Plan construction: walking a directory and classifying its files.
//!
//! A plan is an ordered sequence of [`PlannedMove`]s produced by applying a
//! [`RuleSet`](crate::rules::RuleSet) to the current contents of a root
//! directory. Plans are advisory: they reflect the filesystem at the moment
//! of traversal and may be stale by execution time, which is why the
//! executor re-validates every move.

use crate::config::CompiledFilters;
use crate::rules::RuleSet;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// A proposed move of one file, derived from the first matching rule.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedMove {
    /// Current location of the file.
    pub source: PathBuf,
    /// Where the file would be moved to (directory plus file name).
    pub destination: PathBuf,
    /// Name of the rule that produced this move.
    pub rule_name: String,
}

/// Builds move plans for a root directory.
///
/// The builder itself does no I/O; each call to [`PlanBuilder::iter`] starts
/// a fresh, lazy traversal, and [`PlanBuilder::build`] collects one into a
/// `Vec`.
///
/// # Examples
///
/// ```no_run
/// use ordna::planner::PlanBuilder;
/// use ordna::rules::{Rule, RuleSet};
/// use std::path::Path;
///
/// let rules = RuleSet::from_rules([Rule::new("Images", ["jpg"], "Images")]).unwrap();
/// let plan = PlanBuilder::new(Path::new("/home/user/Downloads"), &rules)
///     .recursive(true)
///     .build();
/// for mv in &plan {
///     println!("{} -> {}", mv.source.display(), mv.destination.display());
/// }
/// ```
pub struct PlanBuilder<'a> {
    root: PathBuf,
    rules: &'a RuleSet,
    recursive: bool,
    filters: Option<&'a CompiledFilters>,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(root: &Path, rules: &'a RuleSet) -> Self {
        Self {
            root: root.to_path_buf(),
            rules,
            recursive: false,
            filters: None,
        }
    }

    /// Enables descending into subdirectories.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Applies ignore filters so excluded files never enter the plan.
    pub fn filters(mut self, filters: &'a CompiledFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Starts a lazy traversal of the root.
    ///
    /// Directories that cannot be read are skipped rather than failing the
    /// whole plan. Symbolic links that lead back into an already-visited
    /// directory are skipped, so traversal terminates on cyclic link
    /// structures.
    pub fn iter(&self) -> PlanIter<'a> {
        PlanIter {
            root: self.root.clone(),
            rules: self.rules,
            recursive: self.recursive,
            filters: self.filters,
            pending: vec![self.root.clone()],
            current: None,
            visited: HashSet::new(),
        }
    }

    /// Collects a full plan into a `Vec`.
    pub fn build(&self) -> Vec<PlannedMove> {
        self.iter().collect()
    }
}

/// Lazy iterator over the planned moves of one traversal.
pub struct PlanIter<'a> {
    root: PathBuf,
    rules: &'a RuleSet,
    recursive: bool,
    filters: Option<&'a CompiledFilters>,
    /// Directories not yet opened, depth-first.
    pending: Vec<PathBuf>,
    current: Option<fs::ReadDir>,
    /// Canonical paths of directories already opened in this traversal.
    visited: HashSet<PathBuf>,
}

impl PlanIter<'_> {
    /// Classifies one file, returning a move unless the file matches no rule
    /// or already sits at its destination.
    fn plan_for_file(&self, path: &Path) -> Option<PlannedMove> {
        if let Some(filters) = self.filters
            && !filters.should_include(path)
        {
            return None;
        }

        let rule = self.rules.classify(path)?;
        let dest_dir = if rule.destination.is_absolute() {
            rule.destination.clone()
        } else {
            self.root.join(&rule.destination)
        };

        // A file already in its destination folder needs no move.
        if path.parent() == Some(dest_dir.as_path()) {
            return None;
        }

        let file_name = path.file_name()?;
        Some(PlannedMove {
            source: path.to_path_buf(),
            destination: dest_dir.join(file_name),
            rule_name: rule.name.clone(),
        })
    }

    /// Opens the next pending directory, skipping any already visited.
    fn open_next_dir(&mut self) -> bool {
        while let Some(dir) = self.pending.pop() {
            // Canonicalize to detect symlink cycles: a link back to an
            // ancestor resolves to a path we have already opened.
            let canonical = match fs::canonicalize(&dir) {
                Ok(c) => c,
                Err(_) => continue,
            };
            if !self.visited.insert(canonical) {
                continue;
            }
            match fs::read_dir(&dir) {
                Ok(entries) => {
                    self.current = Some(entries);
                    return true;
                }
                Err(_) => continue,
            }
        }
        false
    }
}

impl Iterator for PlanIter<'_> {
    type Item = PlannedMove;

    fn next(&mut self) -> Option<PlannedMove> {
        loop {
            let Some(entries) = self.current.as_mut() else {
                if !self.open_next_dir() {
                    return None;
                }
                continue;
            };

            let Some(entry) = entries.next() else {
                self.current = None;
                continue;
            };
            let Ok(entry) = entry else { continue };

            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() || (file_type.is_symlink() && path.is_dir()) {
                if self.recursive
                    && self
                        .filters
                        .map(|f| f.should_descend(&path))
                        .unwrap_or(true)
                {
                    self.pending.push(path);
                }
                continue;
            }

            if let Some(planned) = self.plan_for_file(&path) {
                return Some(planned);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rule;
    use std::fs;
    use tempfile::TempDir;

    fn image_rules() -> RuleSet {
        RuleSet::from_rules([Rule::new("Images", [".jpg", ".png"], "Images")]).unwrap()
    }

    #[test]
    fn test_plan_skips_unmatched_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.jpg"), "a").unwrap();
        fs::write(temp.path().join("b.txt"), "b").unwrap();
        fs::write(temp.path().join("c.png"), "c").unwrap();

        let rules = image_rules();
        let mut plan = PlanBuilder::new(temp.path(), &rules).build();
        plan.sort_by(|a, b| a.source.cmp(&b.source));

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].source, temp.path().join("a.jpg"));
        assert_eq!(plan[0].destination, temp.path().join("Images").join("a.jpg"));
        assert_eq!(plan[0].rule_name, "Images");
        assert_eq!(plan[1].source, temp.path().join("c.png"));
    }

    #[test]
    fn test_non_recursive_ignores_subdirectories() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("sub").join("deep.jpg"), "x").unwrap();
        fs::write(temp.path().join("top.jpg"), "x").unwrap();

        let rules = image_rules();
        let plan = PlanBuilder::new(temp.path(), &rules).build();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].source, temp.path().join("top.jpg"));
    }

    #[test]
    fn test_recursive_finds_nested_files() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a").join("b")).unwrap();
        fs::write(temp.path().join("a").join("b").join("deep.png"), "x").unwrap();

        let rules = image_rules();
        let plan = PlanBuilder::new(temp.path(), &rules).recursive(true).build();

        assert_eq!(plan.len(), 1);
        assert_eq!(
            plan[0].destination,
            temp.path().join("Images").join("deep.png")
        );
    }

    #[test]
    fn test_file_already_at_destination_is_omitted() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("Images")).unwrap();
        fs::write(temp.path().join("Images").join("done.jpg"), "x").unwrap();

        let rules = image_rules();
        let plan = PlanBuilder::new(temp.path(), &rules).recursive(true).build();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_plan_is_restartable() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.jpg"), "x").unwrap();

        let rules = image_rules();
        let builder = PlanBuilder::new(temp.path(), &rules);
        assert_eq!(builder.build().len(), 1);
        // A second traversal reflects the filesystem again.
        assert_eq!(builder.build().len(), 1);
    }

    #[test]
    fn test_absolute_rule_destination_used_verbatim() {
        let temp = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::write(temp.path().join("a.jpg"), "x").unwrap();

        let rules =
            RuleSet::from_rules([Rule::new("Images", [".jpg"], dest.path().to_path_buf())])
                .unwrap();
        let plan = PlanBuilder::new(temp.path(), &rules).build();

        assert_eq!(plan[0].destination, dest.path().join("a.jpg"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_terminates() {
        let temp = TempDir::new().unwrap();
        let sub = temp.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("pic.jpg"), "x").unwrap();
        // Link pointing back at the root creates a cycle.
        std::os::unix::fs::symlink(temp.path(), sub.join("loop")).unwrap();

        let rules = image_rules();
        let plan = PlanBuilder::new(temp.path(), &rules).recursive(true).build();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].source, sub.join("pic.jpg"));
    }
}
