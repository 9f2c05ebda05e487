use chrono::{TimeZone, Utc};
use clap::Parser;
use filetidy::{
    ActionKind, Cli, ClassifyMode, Config, DuplicateAction, DuplicateMethod, FatalError, LocalFs,
    OutcomeStatus, RunReport, TransferKind, dedupe_directory, organize_directory, run_cli,
};
/// Integration tests for filetidy
///
/// These tests build real directory trees in temporary folders and drive the
/// public API end to end.
///
/// Test categories:
/// 1. Organizing by type and by date
/// 2. Collisions and data safety
/// 3. Duplicate detection and resolution
/// 4. Dry-run equivalence
/// 5. Filtering and configuration
/// 6. Fatal errors
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// A temporary directory with helpers for building and inspecting a tree.
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        TestFixture { temp_dir }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a file (and its parent folders) with content.
    fn create_file(&self, rel_path: &str, content: &[u8]) {
        let file_path = self.path().join(rel_path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        let mut file = File::create(&file_path).expect("Failed to create file");
        file.write_all(content)
            .expect("Failed to write file content");
    }

    fn create_text_file(&self, rel_path: &str, content: &str) {
        self.create_file(rel_path, content.as_bytes());
    }

    /// Create a file whose modification time is the given UTC instant.
    fn create_file_modified_at(&self, rel_path: &str, content: &str, (y, m, d): (i32, u32, u32)) {
        self.create_text_file(rel_path, content);
        let when: SystemTime = Utc
            .with_ymd_and_hms(y, m, d, 12, 0, 0)
            .unwrap()
            .into();
        File::options()
            .write(true)
            .open(self.path().join(rel_path))
            .and_then(|f| f.set_modified(when))
            .expect("Failed to set modification time");
    }

    fn assert_file_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(
            path.exists() && path.is_file(),
            "File should exist: {}",
            path.display()
        );
    }

    fn assert_file_not_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(!path.exists(), "File should not exist: {}", path.display());
    }

    fn read(&self, rel_path: &str) -> String {
        fs::read_to_string(self.path().join(rel_path)).expect("Failed to read file")
    }

    /// All files in the tree, as root-relative paths, sorted.
    fn list_files_recursive(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        Self::walk_dir(self.path(), &mut files);
        let mut relative: Vec<_> = files
            .into_iter()
            .map(|p| p.strip_prefix(self.path()).unwrap().to_path_buf())
            .collect();
        relative.sort();
        relative
    }

    fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) {
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() {
                    files.push(path);
                } else if path.is_dir() {
                    Self::walk_dir(&path, files);
                }
            }
        }
    }

    /// The set of distinct file contents in the tree.
    fn distinct_contents(&self) -> BTreeSet<Vec<u8>> {
        self.list_files_recursive()
            .iter()
            .map(|rel| fs::read(self.path().join(rel)).unwrap())
            .collect()
    }
}

/// (kind, source, destination) for every outcome that took effect, relative to `root`.
fn action_set(report: &RunReport, root: &Path) -> Vec<(ActionKind, PathBuf, Option<PathBuf>)> {
    report
        .outcomes
        .iter()
        .filter(|o| o.took_effect())
        .map(|o| {
            (
                o.action.kind(),
                o.action.source().strip_prefix(root).unwrap().to_path_buf(),
                o.destination
                    .as_ref()
                    .map(|d| d.strip_prefix(root).unwrap().to_path_buf()),
            )
        })
        .collect()
}

fn dedupe_config(method: DuplicateMethod, action: DuplicateAction) -> Config {
    let mut config = Config::default();
    config.dedupe.method = method;
    config.dedupe.action = action;
    config
}

// ============================================================================
// Test Suite 1: Organizing
// ============================================================================

#[test]
fn test_organize_empty_directory() {
    let fixture = TestFixture::new();

    let report =
        organize_directory(fixture.path(), ClassifyMode::Type, &Config::default(), false, &LocalFs)
            .expect("Should succeed on empty directory");

    assert_eq!(report.scanned, 0);
    assert!(report.outcomes.is_empty());
    assert!(fixture.list_files_recursive().is_empty());
}

#[test]
fn test_organize_by_type() {
    let fixture = TestFixture::new();
    fixture.create_text_file("photo.jpg", "jpeg");
    fixture.create_text_file("Scan.PNG", "png");
    fixture.create_text_file("Makefile", "all:");
    fixture.create_text_file("nested/deep/song.mp3", "mp3");

    let report =
        organize_directory(fixture.path(), ClassifyMode::Type, &Config::default(), false, &LocalFs)
            .unwrap();

    assert_eq!(report.applied(), 4);
    assert!(report.failures().is_empty());
    fixture.assert_file_exists("jpg/photo.jpg");
    fixture.assert_file_exists("png/Scan.PNG");
    fixture.assert_file_exists("no_extension/Makefile");
    fixture.assert_file_exists("mp3/song.mp3");
    fixture.assert_file_not_exists("photo.jpg");
    fixture.assert_file_not_exists("nested/deep/song.mp3");

    let counts = report.bucket_counts();
    assert_eq!(counts.get("jpg"), Some(&1));
    assert_eq!(counts.get("no_extension"), Some(&1));
}

#[test]
fn test_organize_by_type_is_idempotent() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "a");
    fixture.create_text_file("b.pdf", "b");
    fixture.create_text_file("c", "c");

    let first =
        organize_directory(fixture.path(), ClassifyMode::Type, &Config::default(), false, &LocalFs)
            .unwrap();
    assert_eq!(first.applied(), 3);
    let after_first = fixture.list_files_recursive();

    let second =
        organize_directory(fixture.path(), ClassifyMode::Type, &Config::default(), false, &LocalFs)
            .unwrap();

    assert_eq!(second.applied(), 0);
    assert_eq!(second.count(ActionKind::Move), 0);
    assert_eq!(second.unchanged(), 3);
    assert_eq!(fixture.list_files_recursive(), after_first);
}

#[test]
fn test_organize_by_date() {
    let fixture = TestFixture::new();
    fixture.create_file_modified_at("report.pdf", "report", (2024, 3, 5));
    fixture.create_file_modified_at("notes.txt", "notes", (2024, 3, 28));
    fixture.create_file_modified_at("old.txt", "old", (2023, 11, 1));

    let report =
        organize_directory(fixture.path(), ClassifyMode::Date, &Config::default(), false, &LocalFs)
            .unwrap();

    assert_eq!(report.applied(), 3);
    fixture.assert_file_exists("2024-03/report.pdf");
    fixture.assert_file_exists("2024-03/notes.txt");
    fixture.assert_file_exists("2023-11/old.txt");
}

#[test]
fn test_organize_with_copy_keeps_originals() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "a");

    let mut config = Config::default();
    config.organize.action = TransferKind::Copy;
    let report =
        organize_directory(fixture.path(), ClassifyMode::Type, &config, false, &LocalFs).unwrap();

    assert_eq!(report.count(ActionKind::Copy), 1);
    fixture.assert_file_exists("a.txt");
    fixture.assert_file_exists("txt/a.txt");
}

#[test]
fn test_organize_with_copy_is_idempotent() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.jpg", "pixels");

    let mut config = Config::default();
    config.organize.action = TransferKind::Copy;
    let first =
        organize_directory(fixture.path(), ClassifyMode::Type, &config, false, &LocalFs).unwrap();
    assert_eq!(first.applied(), 1);

    for _ in 0..2 {
        let again =
            organize_directory(fixture.path(), ClassifyMode::Type, &config, false, &LocalFs)
                .unwrap();
        assert_eq!(again.applied(), 0);
        assert_eq!(again.unchanged(), 2);
    }
    assert_eq!(
        fixture.list_files_recursive(),
        vec![PathBuf::from("a.jpg"), PathBuf::from("jpg/a.jpg")]
    );

    // Changed content is a different file and gets its own name.
    fixture.create_text_file("a.jpg", "retouched pixels");
    let changed =
        organize_directory(fixture.path(), ClassifyMode::Type, &config, false, &LocalFs).unwrap();
    assert_eq!(changed.collisions_resolved(), 1);
    assert_eq!(fixture.read("jpg/a.jpg"), "pixels");
    assert_eq!(fixture.read("jpg/a_1.jpg"), "retouched pixels");
}

// ============================================================================
// Test Suite 2: Collisions and data safety
// ============================================================================

#[test]
fn test_date_collision_gets_numeric_suffix() {
    let fixture = TestFixture::new();
    fixture.create_file_modified_at("2024-03/report.pdf", "already filed", (2024, 3, 1));
    fixture.create_file_modified_at("report.pdf", "unrelated report", (2024, 3, 20));

    let report =
        organize_directory(fixture.path(), ClassifyMode::Date, &Config::default(), false, &LocalFs)
            .unwrap();

    assert_eq!(report.collisions_resolved(), 1);
    assert_eq!(fixture.read("2024-03/report.pdf"), "already filed");
    assert_eq!(fixture.read("2024-03/report_1.pdf"), "unrelated report");
    fixture.assert_file_not_exists("report.pdf");
}

#[test]
fn test_same_name_from_many_folders_never_overwrites() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a/readme.md", "one");
    fixture.create_text_file("b/readme.md", "two");
    fixture.create_text_file("c/readme.md", "three");
    let before = fixture.distinct_contents();

    let report =
        organize_directory(fixture.path(), ClassifyMode::Type, &Config::default(), false, &LocalFs)
            .unwrap();

    assert_eq!(report.applied(), 3);
    assert_eq!(fixture.read("md/readme.md"), "one");
    assert_eq!(fixture.read("md/readme_1.md"), "two");
    assert_eq!(fixture.read("md/readme_2.md"), "three");
    assert!(before.is_subset(&fixture.distinct_contents()));
}

// ============================================================================
// Test Suite 3: Duplicates
// ============================================================================

#[test]
fn test_dedupe_checksum_delete_scenario() {
    let fixture = TestFixture::new();
    let bytes = [42u8; 100];
    fixture.create_file("a.jpg", &bytes);
    fixture.create_file("b.jpg", &bytes);
    fixture.create_file("c.png", &[9u8; 50]);

    let config = dedupe_config(DuplicateMethod::Checksum, DuplicateAction::Delete);
    let report = dedupe_directory(fixture.path(), &config, false, &LocalFs, None).unwrap();

    assert_eq!(report.duplicate_groups, 1);
    assert_eq!(report.duplicates_found, 1);
    assert_eq!(report.wasted_bytes, 100);
    assert_eq!(report.count(ActionKind::Delete), 1);
    fixture.assert_file_exists("a.jpg");
    fixture.assert_file_not_exists("b.jpg");
    fixture.assert_file_exists("c.png");
}

#[test]
fn test_dedupe_name_size_ignores_content() {
    let fixture = TestFixture::new();
    fixture.create_text_file("one/data.csv", "1,2,3");
    fixture.create_text_file("two/data.csv", "4,5,6");
    fixture.create_text_file("three/data.csv", "7,8,9,10");

    let config = dedupe_config(DuplicateMethod::NameSize, DuplicateAction::Delete);
    let report = dedupe_directory(fixture.path(), &config, false, &LocalFs, None).unwrap();

    // "one" sorts before "two"; "three" differs in size.
    assert_eq!(report.duplicates_found, 1);
    fixture.assert_file_exists("one/data.csv");
    fixture.assert_file_not_exists("two/data.csv");
    fixture.assert_file_exists("three/data.csv");
}

#[test]
fn test_dedupe_move_to_quarantine_with_collisions() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.jpg", "same pixels");
    fixture.create_text_file("x/a.jpg", "same pixels");
    fixture.create_text_file("y/a.jpg", "same pixels");

    let config = dedupe_config(DuplicateMethod::Checksum, DuplicateAction::Move);
    let report = dedupe_directory(fixture.path(), &config, false, &LocalFs, None).unwrap();

    assert_eq!(report.count(ActionKind::Move), 2);
    fixture.assert_file_exists("a.jpg");
    fixture.assert_file_exists("Duplicates/a.jpg");
    fixture.assert_file_exists("Duplicates/a_1.jpg");
    fixture.assert_file_not_exists("x/a.jpg");
    fixture.assert_file_not_exists("y/a.jpg");

    // The quarantine folder is not rescanned, so a second pass finds nothing.
    let again = dedupe_directory(fixture.path(), &config, false, &LocalFs, None).unwrap();
    assert_eq!(again.duplicate_groups, 0);
    assert!(again.outcomes.is_empty());
}

#[test]
fn test_dedupe_copy_leaves_duplicates_in_place() {
    let fixture = TestFixture::new();
    fixture.create_text_file("k.txt", "twin");
    fixture.create_text_file("sub/k.txt", "twin");

    let config = dedupe_config(DuplicateMethod::Checksum, DuplicateAction::Copy);
    let report = dedupe_directory(fixture.path(), &config, false, &LocalFs, None).unwrap();

    assert_eq!(report.count(ActionKind::Copy), 1);
    fixture.assert_file_exists("k.txt");
    fixture.assert_file_exists("sub/k.txt");
    fixture.assert_file_exists("Duplicates/k.txt");
}

#[test]
fn test_dedupe_keeper_is_stable_across_runs() {
    let keepers: Vec<_> = (0..3)
        .map(|_| {
            let fixture = TestFixture::new();
            fixture.create_text_file("b/file.bin", "payload");
            fixture.create_text_file("a/file.bin", "payload");
            fixture.create_text_file("c/file.bin", "payload");

            let config = dedupe_config(DuplicateMethod::Checksum, DuplicateAction::Delete);
            dedupe_directory(fixture.path(), &config, true, &LocalFs, None).unwrap();

            let report = dedupe_directory(fixture.path(), &config, false, &LocalFs, None).unwrap();
            assert_eq!(report.duplicates_found, 2);
            fixture.list_files_recursive()
        })
        .collect();

    for remaining in &keepers {
        assert_eq!(remaining, &vec![PathBuf::from("a/file.bin")]);
    }
}

#[test]
fn test_organize_leaves_quarantine_alone() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.jpg", "same pixels");
    fixture.create_text_file("x/a.jpg", "same pixels");

    let config = dedupe_config(DuplicateMethod::Checksum, DuplicateAction::Move);
    dedupe_directory(fixture.path(), &config, false, &LocalFs, None).unwrap();
    fixture.assert_file_exists("Duplicates/a.jpg");

    let report =
        organize_directory(fixture.path(), ClassifyMode::Type, &config, false, &LocalFs).unwrap();

    assert_eq!(report.admitted, 1);
    fixture.assert_file_exists("jpg/a.jpg");
    fixture.assert_file_exists("Duplicates/a.jpg");
    fixture.assert_file_not_exists("jpg/a_1.jpg");
}

#[test]
fn test_dedupe_no_duplicates() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "alpha");
    fixture.create_text_file("b.txt", "beta");

    let report =
        dedupe_directory(fixture.path(), &Config::default(), false, &LocalFs, None).unwrap();

    assert_eq!(report.duplicate_groups, 0);
    assert!(report.outcomes.is_empty());
    assert_eq!(fixture.list_files_recursive().len(), 2);
}

// ============================================================================
// Test Suite 4: Dry run
// ============================================================================

fn build_mixed_tree(fixture: &TestFixture) {
    fixture.create_text_file("inbox/report.pdf", "q1");
    fixture.create_text_file("archive/report.pdf", "q2");
    fixture.create_text_file("pdf/report.pdf", "filed");
    fixture.create_text_file("song.mp3", "tune");
    fixture.create_text_file("copy/song.mp3", "tune");
}

#[test]
fn test_dry_run_organize_matches_real_run() {
    let dry = TestFixture::new();
    let real = TestFixture::new();
    build_mixed_tree(&dry);
    build_mixed_tree(&real);
    let untouched = dry.list_files_recursive();

    let simulated =
        organize_directory(dry.path(), ClassifyMode::Type, &Config::default(), true, &LocalFs)
            .unwrap();
    let applied =
        organize_directory(real.path(), ClassifyMode::Type, &Config::default(), false, &LocalFs)
            .unwrap();

    assert_eq!(dry.list_files_recursive(), untouched);
    assert_eq!(simulated.applied(), 0);
    assert!(simulated
        .outcomes
        .iter()
        .all(|o| !matches!(o.status, OutcomeStatus::Applied)));
    assert_eq!(
        action_set(&simulated, dry.path()),
        action_set(&applied, real.path())
    );
    assert_eq!(simulated.simulated(), applied.applied());
}

#[test]
fn test_dry_run_dedupe_matches_real_run() {
    let dry = TestFixture::new();
    let real = TestFixture::new();
    build_mixed_tree(&dry);
    build_mixed_tree(&real);
    let untouched = dry.list_files_recursive();
    let config = dedupe_config(DuplicateMethod::NameSize, DuplicateAction::Move);

    let simulated = dedupe_directory(dry.path(), &config, true, &LocalFs, None).unwrap();
    let applied = dedupe_directory(real.path(), &config, false, &LocalFs, None).unwrap();

    assert_eq!(dry.list_files_recursive(), untouched);
    assert_eq!(
        action_set(&simulated, dry.path()),
        action_set(&applied, real.path())
    );
    assert_eq!(applied.count(ActionKind::Move), 2);
}

fn run_organize_then_dedupe(root: &Path, action: &str, dry_run: bool) -> Vec<RunReport> {
    let root = root.to_string_lossy().to_string();
    let mut args = vec![
        "filetidy",
        "--organize",
        root.as_str(),
        "--by",
        "type",
        "--dedupe",
        root.as_str(),
        "--action",
        action,
        "--json",
    ];
    if dry_run {
        args.push("--dry-run");
    }
    run_cli(&Cli::parse_from(args)).expect("run should complete")
}

#[test]
fn test_dry_run_organize_then_dedupe_matches_real_run() {
    let build = |fixture: &TestFixture| {
        fixture.create_text_file("one/pic.jpg", "same");
        fixture.create_text_file("two/pic.jpg", "same");
        fixture.create_text_file("notes.txt", "n");
        fixture.create_text_file("three/notes.txt", "n");
    };

    for action in ["delete", "move"] {
        let dry = TestFixture::new();
        let real = TestFixture::new();
        build(&dry);
        build(&real);
        let untouched = dry.list_files_recursive();

        let simulated = run_organize_then_dedupe(dry.path(), action, true);
        let applied = run_organize_then_dedupe(real.path(), action, false);

        assert_eq!(dry.list_files_recursive(), untouched);
        assert_eq!(simulated.len(), 2);
        assert_eq!(applied.len(), 2);
        for (s, a) in simulated.iter().zip(&applied) {
            assert_eq!(action_set(s, dry.path()), action_set(a, real.path()));
        }

        let dedupe_sources: Vec<_> = action_set(&simulated[1], dry.path())
            .into_iter()
            .map(|(_, source, _)| source)
            .collect();
        assert_eq!(
            dedupe_sources,
            vec![PathBuf::from("jpg/pic_1.jpg"), PathBuf::from("txt/notes_1.txt")]
        );
    }
}

// ============================================================================
// Test Suite 5: Filtering and configuration
// ============================================================================

#[test]
fn test_skip_hidden_files() {
    let fixture = TestFixture::new();
    fixture.create_text_file(".env", "SECRET=1");
    fixture.create_text_file("visible.txt", "hello");

    let mut config = Config::default();
    config.filters.skip_hidden = true;
    let report =
        organize_directory(fixture.path(), ClassifyMode::Type, &config, false, &LocalFs).unwrap();

    assert_eq!(report.scanned, 2);
    assert_eq!(report.admitted, 1);
    fixture.assert_file_exists(".env");
    fixture.assert_file_exists("txt/visible.txt");
}

#[test]
fn test_hidden_files_organized_without_skip_hidden() {
    let fixture = TestFixture::new();
    fixture.create_text_file(".env", "SECRET=1");

    organize_directory(fixture.path(), ClassifyMode::Type, &Config::default(), false, &LocalFs)
        .unwrap();

    fixture.assert_file_exists("no_extension/.env");
}

#[test]
fn test_run_cli_with_config_file_exclusions() {
    let fixture = TestFixture::new();
    let config_dir = TempDir::new().unwrap();
    let config_path = config_dir.path().join("filetidy.toml");
    fs::write(
        &config_path,
        r#"
[filters.exclude]
extensions = ["tmp"]
filenames = ["Thumbs.db"]

[organize]
no_extension_bucket = "misc"
"#,
    )
    .unwrap();

    fixture.create_text_file("scratch.tmp", "t");
    fixture.create_text_file("Thumbs.db", "x");
    fixture.create_text_file("LICENSE", "mit");
    fixture.create_text_file("a.txt", "a");

    let root = fixture.path().to_string_lossy().to_string();
    let config_arg = config_path.to_string_lossy().to_string();
    let cli = Cli::parse_from([
        "filetidy",
        "--organize",
        root.as_str(),
        "--by",
        "type",
        "--config",
        config_arg.as_str(),
        "--json",
    ]);
    let reports = run_cli(&cli).expect("run should complete");

    assert_eq!(reports.len(), 1);
    fixture.assert_file_exists("scratch.tmp");
    fixture.assert_file_exists("Thumbs.db");
    fixture.assert_file_exists("misc/LICENSE");
    fixture.assert_file_exists("txt/a.txt");
}

#[test]
fn test_run_cli_organize_then_dedupe() {
    let fixture = TestFixture::new();
    fixture.create_text_file("one/pic.jpg", "same");
    fixture.create_text_file("two/pic.jpg", "same");

    let root = fixture.path().to_string_lossy().to_string();
    let cli = Cli::parse_from([
        "filetidy",
        "--organize",
        root.as_str(),
        "--by",
        "type",
        "--dedupe",
        root.as_str(),
        "--json",
    ]);
    let reports = run_cli(&cli).unwrap();

    assert_eq!(reports.len(), 2);
    // Organizing renamed the second copy; dedupe then removed it by content.
    assert_eq!(fixture.list_files_recursive(), vec![PathBuf::from("jpg/pic.jpg")]);
}

// ============================================================================
// Test Suite 6: Fatal errors
// ============================================================================

#[test]
fn test_missing_root_is_fatal() {
    let result = organize_directory(
        Path::new("/non/existent/path"),
        ClassifyMode::Type,
        &Config::default(),
        false,
        &LocalFs,
    );
    assert!(matches!(result, Err(FatalError::RootMissing { .. })));
}

#[test]
fn test_run_cli_fails_before_any_action_when_one_root_is_missing() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "a");

    let root = fixture.path().to_string_lossy().to_string();
    let cli = Cli::parse_from([
        "filetidy",
        "--organize",
        root.as_str(),
        "--by",
        "type",
        "--dedupe",
        "/non/existent/path",
        "--json",
    ]);

    assert!(run_cli(&cli).is_err());
    fixture.assert_file_exists("a.txt");
    fixture.assert_file_not_exists("txt/a.txt");
}

#[test]
fn test_invalid_config_is_fatal() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "a");

    let config: Config = toml::from_str("[filters.exclude]\nregex = [\"(unclosed\"]\n").unwrap();
    let result = organize_directory(fixture.path(), ClassifyMode::Type, &config, false, &LocalFs);

    assert!(matches!(result, Err(FatalError::Config(_))));
    fixture.assert_file_exists("a.txt");
}
