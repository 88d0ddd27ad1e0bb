/// Integration tests for ordna
///
/// These tests simulate real-world usage scenarios, exercising the complete
/// organize cycle end to end: classification, planning, execution, undo and
/// statistics.
///
/// Test categories:
/// 1. Basic organization workflows
/// 2. Dry-run verification
/// 3. Undo semantics (single generation by design)
/// 4. Collision and failure handling
/// 5. Rules persistence and exchange
/// 6. Ignore filters and recursion
use ordna::config::{CompiledFilters, IgnoreRules};
use ordna::executor::{CancelToken, NullSink, SkipReason};
use ordna::organizer::{CycleOptions, OrganizeError, Organizer};
use ordna::rules::{Rule, RuleSet};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// A temporary directory with helpers for building file trees.
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        TestFixture {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn create_file(&self, name: &str, content: &str) {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write file");
    }

    /// All file paths under the root, relative, sorted. Used to assert that
    /// an operation touched nothing.
    fn snapshot(&self) -> BTreeSet<PathBuf> {
        let mut files = BTreeSet::new();
        collect_files(self.path(), self.path(), &mut files);
        files
    }
}

fn collect_files(root: &Path, dir: &Path, out: &mut BTreeSet<PathBuf>) {
    for entry in fs::read_dir(dir).expect("Failed to read directory").flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out);
        } else {
            out.insert(path.strip_prefix(root).unwrap().to_path_buf());
        }
    }
}

fn image_rules() -> RuleSet {
    RuleSet::from_rules([Rule::new("Images", [".jpg", ".png"], "Images")])
        .expect("valid rules")
}

fn organize(
    organizer: &mut Organizer,
    root: &Path,
    recursive: bool,
    dry_run: bool,
) -> ordna::ExecutionReport {
    organizer
        .organize(
            &CycleOptions::new(root).recursive(recursive).dry_run(dry_run),
            &mut NullSink,
            &CancelToken::new(),
        )
        .expect("organize cycle failed")
}

// ============================================================================
// Basic organization workflows
// ============================================================================

#[test]
fn test_example_scenario_organize_stats_and_undo() {
    // Root contains a.jpg, b.txt, c.png; "Images" maps {.jpg, .png} -> Images/.
    let fixture = TestFixture::new();
    fixture.create_file("a.jpg", "a");
    fixture.create_file("b.txt", "b");
    fixture.create_file("c.png", "c");

    let mut organizer = Organizer::new(image_rules());

    let plan = organizer.preview(fixture.path(), false).unwrap();
    let mut planned_sources: Vec<_> = plan.iter().map(|m| m.source.clone()).collect();
    planned_sources.sort();
    assert_eq!(
        planned_sources,
        vec![fixture.path().join("a.jpg"), fixture.path().join("c.png")]
    );

    let report = organize(&mut organizer, fixture.path(), false, false);
    assert_eq!(report.executed.len(), 2);
    assert!(report.skipped.is_empty());

    // Images/ holds the matched files, b.txt stays put.
    assert!(fixture.path().join("Images").join("a.jpg").exists());
    assert!(fixture.path().join("Images").join("c.png").exists());
    assert!(fixture.path().join("b.txt").exists());
    assert!(!fixture.path().join("a.jpg").exists());
    assert!(!fixture.path().join("c.png").exists());

    assert_eq!(organizer.last_stats().count("Images"), 2);

    // Undo restores both files and empties Images/.
    let undo_report = organizer.undo(&mut NullSink).unwrap();
    assert_eq!(undo_report.executed.len(), 2);
    assert!(fixture.path().join("a.jpg").exists());
    assert!(fixture.path().join("c.png").exists());
    assert_eq!(
        fs::read_dir(fixture.path().join("Images")).unwrap().count(),
        0
    );
}

#[test]
fn test_multiple_rules_route_to_their_destinations() {
    let fixture = TestFixture::new();
    fixture.create_file("song.mp3", "x");
    fixture.create_file("report.pdf", "x");
    fixture.create_file("photo.jpg", "x");

    let rules = RuleSet::from_rules([
        Rule::new("Audio", [".mp3"], "Audio"),
        Rule::new("Documents", [".pdf"], "Documents"),
        Rule::new("Images", [".jpg"], "Images"),
    ])
    .unwrap();

    let mut organizer = Organizer::new(rules);
    organize(&mut organizer, fixture.path(), false, false);

    assert!(fixture.path().join("Audio").join("song.mp3").exists());
    assert!(fixture.path().join("Documents").join("report.pdf").exists());
    assert!(fixture.path().join("Images").join("photo.jpg").exists());
}

#[test]
fn test_first_matching_rule_wins_on_overlap() {
    let fixture = TestFixture::new();
    fixture.create_file("photo.jpg", "x");

    let rules = RuleSet::from_rules([
        Rule::new("Photos", [".jpg"], "Photos"),
        Rule::new("Everything", [".jpg", ".png"], "Everything"),
    ])
    .unwrap();

    let mut organizer = Organizer::new(rules);
    organize(&mut organizer, fixture.path(), false, false);

    assert!(fixture.path().join("Photos").join("photo.jpg").exists());
    assert!(!fixture.path().join("Everything").exists());
}

#[test]
fn test_recursive_organize_collects_nested_files() {
    let fixture = TestFixture::new();
    fixture.create_file("nested/deep/pic.png", "x");
    fixture.create_file("top.jpg", "x");

    let mut organizer = Organizer::new(image_rules());
    let report = organize(&mut organizer, fixture.path(), true, false);

    assert_eq!(report.executed.len(), 2);
    assert!(fixture.path().join("Images").join("pic.png").exists());
    assert!(fixture.path().join("Images").join("top.jpg").exists());
}

#[test]
fn test_organize_twice_is_idempotent() {
    let fixture = TestFixture::new();
    fixture.create_file("a.jpg", "x");

    let mut organizer = Organizer::new(image_rules());
    organize(&mut organizer, fixture.path(), true, false);

    // Everything already sits at its destination: empty plan, no moves.
    let plan = organizer.preview(fixture.path(), true).unwrap();
    assert!(plan.is_empty());

    let report = organize(&mut organizer, fixture.path(), true, false);
    assert!(report.executed.is_empty());
    assert!(report.skipped.is_empty());
}

// ============================================================================
// Dry-run verification
// ============================================================================

#[test]
fn test_dry_run_never_mutates_the_filesystem() {
    let fixture = TestFixture::new();
    fixture.create_file("a.jpg", "a");
    fixture.create_file("b.txt", "b");
    fixture.create_file("sub/c.png", "c");

    let before = fixture.snapshot();

    let mut organizer = Organizer::new(image_rules());
    let report = organize(&mut organizer, fixture.path(), true, true);

    assert_eq!(report.executed.len(), 2);
    assert_eq!(fixture.snapshot(), before);
    // Statistics still reflect what would have happened.
    assert_eq!(organizer.last_stats().count("Images"), 2);
}

#[test]
fn test_dry_run_reports_collisions_without_touching_files() {
    let fixture = TestFixture::new();
    fixture.create_file("a.jpg", "new");
    fixture.create_file("Images/a.jpg", "old");

    let before = fixture.snapshot();

    let mut organizer = Organizer::new(image_rules());
    let report = organize(&mut organizer, fixture.path(), false, true);

    assert!(report.executed.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].1, SkipReason::Collision);
    assert_eq!(fixture.snapshot(), before);
}

// ============================================================================
// Undo semantics
// ============================================================================

#[test]
fn test_undo_is_left_inverse_of_clean_execution() {
    let fixture = TestFixture::new();
    fixture.create_file("a.jpg", "a");
    fixture.create_file("b.png", "b");
    fixture.create_file("keep.txt", "k");

    let before = fixture.snapshot();

    let mut organizer = Organizer::new(image_rules());
    let report = organize(&mut organizer, fixture.path(), false, false);
    assert!(report.is_clean());

    organizer.undo(&mut NullSink).unwrap();
    assert_eq!(fixture.snapshot(), before);
}

#[test]
fn test_undo_is_single_generation_by_design() {
    // Only the most recent batch is reversible. This is a deliberate
    // simplification, not a bug: there is no multi-level undo.
    let fixture = TestFixture::new();
    fixture.create_file("a.jpg", "x");

    let mut organizer = Organizer::new(image_rules());
    organize(&mut organizer, fixture.path(), false, false);

    organizer.undo(&mut NullSink).unwrap();
    let second = organizer.undo(&mut NullSink);
    assert!(matches!(second, Err(OrganizeError::NothingToUndo)));
}

#[test]
fn test_new_execution_replaces_undo_generation() {
    let fixture = TestFixture::new();
    fixture.create_file("first.jpg", "1");

    let mut organizer = Organizer::new(image_rules());
    organize(&mut organizer, fixture.path(), false, false);

    fixture.create_file("second.jpg", "2");
    organize(&mut organizer, fixture.path(), false, false);

    // Undo only reverses the second batch.
    organizer.undo(&mut NullSink).unwrap();
    assert!(fixture.path().join("second.jpg").exists());
    assert!(fixture.path().join("Images").join("first.jpg").exists());
}

// ============================================================================
// Collision and failure handling
// ============================================================================

#[test]
fn test_collision_skips_and_preserves_both_files() {
    let fixture = TestFixture::new();
    fixture.create_file("a.jpg", "incoming");
    fixture.create_file("Images/a.jpg", "resident");

    let mut organizer = Organizer::new(image_rules());
    let report = organize(&mut organizer, fixture.path(), false, false);

    assert!(report.executed.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].1, SkipReason::Collision);
    assert_eq!(
        fs::read_to_string(fixture.path().join("a.jpg")).unwrap(),
        "incoming"
    );
    assert_eq!(
        fs::read_to_string(fixture.path().join("Images").join("a.jpg")).unwrap(),
        "resident"
    );
    // Nothing was executed, so there is nothing to undo.
    assert!(!organizer.can_undo());
}

#[test]
fn test_partial_failure_does_not_abort_the_run() {
    let fixture = TestFixture::new();
    fixture.create_file("blocked.jpg", "x");
    fixture.create_file("Images/blocked.jpg", "resident");
    fixture.create_file("fine.png", "x");

    let mut organizer = Organizer::new(image_rules());
    let report = organize(&mut organizer, fixture.path(), false, false);

    assert_eq!(report.executed.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert!(fixture.path().join("Images").join("fine.png").exists());
    // The undo generation covers only what actually moved.
    organizer.undo(&mut NullSink).unwrap();
    assert!(fixture.path().join("fine.png").exists());
}

#[test]
fn test_cancelled_run_keeps_partial_state_until_explicit_undo() {
    let fixture = TestFixture::new();
    fixture.create_file("a.jpg", "x");

    let cancel = CancelToken::new();
    cancel.cancel();

    let mut organizer = Organizer::new(image_rules());
    let report = organizer
        .organize(
            &CycleOptions::new(fixture.path()),
            &mut NullSink,
            &cancel,
        )
        .unwrap();

    assert!(report.cancelled);
    assert!(report.executed.is_empty());
    assert!(fixture.path().join("a.jpg").exists());
}

// ============================================================================
// Rules persistence and exchange
// ============================================================================

#[test]
fn test_rules_round_trip_through_toml_then_organize() {
    let fixture = TestFixture::new();
    fixture.create_file("a.jpg", "x");
    let rules_path = fixture.path().join("rules.toml");

    image_rules().save(&rules_path).unwrap();
    let loaded = RuleSet::load(&rules_path).unwrap();

    let mut organizer = Organizer::new(loaded);
    let report = organize(&mut organizer, fixture.path(), false, false);
    assert_eq!(report.executed.len(), 1);
}

#[test]
fn test_rules_export_import_between_installations() {
    let fixture = TestFixture::new();
    let export_path = fixture.path().join("rules.json");

    let rules = RuleSet::from_rules([
        Rule::new("Images", [".jpg", ".png"], "Images"),
        Rule::new("Music", [".mp3", ".flac"], PathBuf::from("Media/Music")),
    ])
    .unwrap();

    rules.export_json(&export_path).unwrap();
    let imported = RuleSet::import_json(&export_path).unwrap();
    assert_eq!(imported, rules);
}

// ============================================================================
// Ignore filters and recursion details
// ============================================================================

#[test]
fn test_ignored_files_never_enter_a_plan() {
    let fixture = TestFixture::new();
    fixture.create_file(".hidden.jpg", "x");
    fixture.create_file("junk.jpg.tmp", "x");
    fixture.create_file("real.jpg", "x");

    let rules = RuleSet::from_rules([Rule::new(
        "Images",
        [".jpg", ".tmp"],
        "Images",
    )])
    .unwrap();
    let filters = CompiledFilters::new(&IgnoreRules {
        include_hidden: false,
        filenames: Vec::new(),
        patterns: vec!["*.tmp".to_string()],
    })
    .unwrap();

    let mut organizer = Organizer::with_filters(rules, filters);
    let report = organize(&mut organizer, fixture.path(), false, false);

    assert_eq!(report.executed.len(), 1);
    assert!(fixture.path().join("Images").join("real.jpg").exists());
    assert!(fixture.path().join(".hidden.jpg").exists());
    assert!(fixture.path().join("junk.jpg.tmp").exists());
}

#[test]
fn test_unmatched_files_are_left_untouched_everywhere() {
    let fixture = TestFixture::new();
    fixture.create_file("notes.txt", "x");
    fixture.create_file("sub/readme.md", "x");

    let before = fixture.snapshot();
    let mut organizer = Organizer::new(image_rules());
    let report = organize(&mut organizer, fixture.path(), true, false);

    assert!(report.executed.is_empty());
    assert_eq!(fixture.snapshot(), before);
}

#[cfg(unix)]
#[test]
fn test_symlink_cycle_does_not_hang_a_recursive_run() {
    let fixture = TestFixture::new();
    fixture.create_file("sub/pic.jpg", "x");
    std::os::unix::fs::symlink(fixture.path(), fixture.path().join("sub").join("loop"))
        .unwrap();

    let mut organizer = Organizer::new(image_rules());
    let report = organize(&mut organizer, fixture.path(), true, false);

    assert_eq!(report.executed.len(), 1);
    assert!(fixture.path().join("Images").join("pic.jpg").exists());
}
