//! End-to-end incremental build behaviour over real directories.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use docdelta_core::indexer::languages::PythonExtractor;
use docdelta_core::{
    default_registry, BuildConfig, BuildOutcome, BuildPipeline, CancellationToken, DocDeltaError,
    ExtractError, IncrementalBuilder, JsonSnapshotStore, LanguageExtractor, MemorySnapshotStore,
    SnapshotStore, SqliteSnapshotStore, Symbol, SymbolKey, SymbolKind, SymbolStatus,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Python extractor that records every source text it is asked to parse.
#[derive(Default)]
struct CountingPython {
    seen: Mutex<Vec<String>>,
}

impl LanguageExtractor for CountingPython {
    fn language_name(&self) -> &str {
        "python"
    }

    fn file_extensions(&self) -> &[&str] {
        &["py"]
    }

    fn extract(&self, source: &str) -> Result<Vec<Symbol>, ExtractError> {
        self.seen.lock().push(source.to_string());
        PythonExtractor.extract(source)
    }
}

/// Claims `.py` under another language name and reports one fixed symbol.
struct RuleFiles;

impl LanguageExtractor for RuleFiles {
    fn language_name(&self) -> &str {
        "starlark"
    }

    fn file_extensions(&self) -> &[&str] {
        &["py"]
    }

    fn extract(&self, _source: &str) -> Result<Vec<Symbol>, ExtractError> {
        Ok(vec![Symbol::new(SymbolKind::Function, "rule", 1)])
    }
}

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn memory_builder() -> IncrementalBuilder<MemorySnapshotStore> {
    let config = BuildConfig {
        workers: 2,
        ..BuildConfig::default()
    };
    IncrementalBuilder::with_config(config, MemorySnapshotStore::new())
}

fn build<S: SnapshotStore>(builder: &IncrementalBuilder<S>, root: &Path) -> BuildOutcome {
    builder.build(root, &CancellationToken::new()).unwrap()
}

fn all_keys(snapshots: &[&docdelta_core::BuildSnapshot]) -> BTreeSet<SymbolKey> {
    snapshots
        .iter()
        .flat_map(|snap| {
            snap.files
                .values()
                .flat_map(|f| f.symbols.iter().map(move |s| s.key(&f.path)))
        })
        .collect()
}

fn names(partition: &std::collections::BTreeMap<SymbolKey, Symbol>) -> BTreeSet<String> {
    partition.values().map(|s| s.name.clone()).collect()
}

fn mixed_tree(root: &Path) {
    write(
        root,
        "app/models.py",
        "class User:\n    \"\"\"A user.\"\"\"\n\n    def save(self, force: bool = False) -> None:\n        pass\n",
    );
    write(
        root,
        "web/Handler.java",
        "/** Handles requests. */\npublic class Handler {\n    public void handle(String path) {\n    }\n}\n",
    );
    write(
        root,
        "lib/util.ts",
        "/** Adds. */\nexport function add(a: number, b: number): number {\n  return a + b;\n}\n",
    );
    write(root, "README.md", "# readme\n");
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn test_first_run_adds_everything() {
    let dir = tempfile::tempdir().unwrap();
    mixed_tree(dir.path());
    let outcome = build(&memory_builder(), dir.path());

    let cs = &outcome.change_set;
    assert_eq!(cs.changed_files.len(), 3);
    assert_eq!(outcome.stats.files_skipped_unsupported, 1);
    assert_eq!(cs.added.len(), outcome.snapshot.symbol_count());
    assert_eq!(
        names(&cs.added),
        BTreeSet::from(
            ["User", "save", "Handler", "handle", "add"].map(String::from)
        )
    );
    assert!(cs.modified.is_empty() && cs.deprecated.is_empty() && cs.unchanged.is_empty());
}

#[test]
fn test_rebuild_of_unchanged_tree_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    mixed_tree(dir.path());
    let builder = memory_builder();
    let first = build(&builder, dir.path());
    let second = build(&builder, dir.path());

    let cs = &second.change_set;
    assert!(cs.changed_files.is_empty());
    assert_eq!(cs.unchanged_files.len(), 3);
    assert_eq!(cs.unchanged.len(), first.snapshot.symbol_count());
    assert!(cs.is_noop());
    assert_eq!(second.stats.files_reused, 3);
    assert_eq!(second.snapshot.files, first.snapshot.files);
}

#[test]
fn test_single_byte_change_marks_file_changed() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.py", "def f(x):\n    return x\n");
    write(dir.path(), "b.py", "def g():\n    pass\n");
    let builder = memory_builder();
    let first = build(&builder, dir.path());

    write(dir.path(), "a.py", "def f(x):\n    return y\n");
    let second = build(&builder, dir.path());
    assert_ne!(
        first.snapshot.get("a.py").unwrap().content_hash,
        second.snapshot.get("a.py").unwrap().content_hash
    );
    assert_eq!(
        second.change_set.changed_files,
        BTreeSet::from(["a.py".to_string()])
    );
    // Body-only edit: the symbol itself is unchanged.
    assert_eq!(names(&second.change_set.unchanged), BTreeSet::from(["f", "g"].map(String::from)));
}

#[test]
fn test_every_key_lands_in_one_partition() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "m.py",
        "def keep():\n    pass\n\ndef edit(a):\n    \"\"\"Old.\"\"\"\n\ndef drop():\n    pass\n",
    );
    write(dir.path(), "gone.py", "class Gone:\n    pass\n");
    let builder = memory_builder();
    let first = build(&builder, dir.path());

    write(
        dir.path(),
        "m.py",
        "def keep():\n    pass\n\ndef edit(a, b):\n    \"\"\"New.\"\"\"\n\ndef fresh():\n    pass\n",
    );
    fs::remove_file(dir.path().join("gone.py")).unwrap();
    let second = build(&builder, dir.path());

    let keys: BTreeSet<SymbolKey> = [&first.snapshot, &second.snapshot]
        .iter()
        .flat_map(|snap| {
            snap.files
                .values()
                .flat_map(|f| f.symbols.iter().map(move |s| s.key(&f.path)))
        })
        .collect();
    for key in &keys {
        assert!(second.change_set.status_of(key).is_some(), "{key} unclassified");
    }
    let cs = &second.change_set;
    assert_eq!(names(&cs.unchanged), BTreeSet::from(["keep".to_string()]));
    assert_eq!(names(&cs.modified), BTreeSet::from(["edit".to_string()]));
    assert_eq!(names(&cs.added), BTreeSet::from(["fresh".to_string()]));
    assert_eq!(
        names(&cs.deprecated),
        BTreeSet::from(["drop", "Gone"].map(String::from))
    );
    assert_eq!(cs.removed_files, BTreeSet::from(["gone.py".to_string()]));
}

#[test]
fn test_same_member_names_under_different_owners() {
    let dir = tempfile::tempdir().unwrap();
    let python = "class A:\n    class Config:\n        def f(self):\n            pass\n\n\nclass B:\n    class Config:\n        def f(self):\n            pass\n";
    let rust = "pub struct Point;\n\nimpl fmt::Display for Point {\n    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {\n        Ok(())\n    }\n}\n\nimpl fmt::Debug for Point {\n    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {\n        Ok(())\n    }\n}\n";
    write(dir.path(), "m.py", python);
    write(dir.path(), "p.rs", rust);
    let builder = memory_builder();
    let first = build(&builder, dir.path());

    assert_eq!(first.change_set.added.len(), 9);
    assert_eq!(first.change_set.added.len(), first.snapshot.symbol_count());
    assert!(first.warnings.is_empty(), "{:?}", first.warnings);

    write(dir.path(), "m.py", &python.replace("class B:\n    class Config:\n        def f(self):", "class B:\n    class Config:\n        def f(self, strict):"));
    write(dir.path(), "p.rs", &rust.replace("impl fmt::Debug for Point {\n    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {\n        Ok(())\n    }\n}\n", ""));
    let second = build(&builder, dir.path());

    let cs = &second.change_set;
    for key in all_keys(&[&first.snapshot, &second.snapshot]) {
        assert!(cs.status_of(&key).is_some(), "{key} unclassified");
    }
    let modified: Vec<(&str, Option<&str>)> = cs
        .modified
        .values()
        .map(|s| (s.name.as_str(), s.parent.as_deref()))
        .collect();
    assert_eq!(modified, vec![("f", Some("B.Config"))]);
    let deprecated: Vec<(&str, Option<&str>)> = cs
        .deprecated
        .values()
        .map(|s| (s.name.as_str(), s.parent.as_deref()))
        .collect();
    assert_eq!(deprecated, vec![("fmt", Some("Point as Debug"))]);
    assert_eq!(cs.unchanged.len(), 7);
    assert!(second.warnings.is_empty());
}

#[test]
fn test_switching_extractor_for_an_extension_reclassifies_symbols() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src, "a.py", "def f(x):\n    return x\n");
    let state = dir.path().join("state");
    let first = build(
        &IncrementalBuilder::with_config(BuildConfig::default(), JsonSnapshotStore::new(&state, true)),
        &src,
    );

    let config = BuildConfig::default();
    let mut registry = default_registry(&config);
    registry.register_extractor(Arc::new(RuleFiles));
    let switched = IncrementalBuilder::new(
        BuildPipeline::new(registry, config),
        JsonSnapshotStore::new(&state, true),
    );
    let second = build(&switched, &src);

    assert_eq!(second.stats.files_extracted, 1);
    assert_eq!(second.stats.files_reused, 0);
    let cs = &second.change_set;
    for key in all_keys(&[&first.snapshot, &second.snapshot]) {
        assert!(cs.status_of(&key).is_some(), "{key} unclassified");
    }
    assert_eq!(names(&cs.deprecated), BTreeSet::from(["f".to_string()]));
    assert_eq!(names(&cs.added), BTreeSet::from(["rule".to_string()]));
    assert!(cs.unchanged.is_empty());
}

#[test]
fn test_deleting_a_file_deprecates_its_symbols() {
    let dir = tempfile::tempdir().unwrap();
    mixed_tree(dir.path());
    let builder = memory_builder();
    build(&builder, dir.path());

    fs::remove_file(dir.path().join("web/Handler.java")).unwrap();
    let outcome = build(&builder, dir.path());
    assert_eq!(
        names(&outcome.change_set.deprecated),
        BTreeSet::from(["Handler", "handle"].map(String::from))
    );
    assert!(outcome.snapshot.get("web/Handler.java").is_none());
}

#[test]
fn test_deprecation_marker_overrides_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "api.py",
        "@deprecated(\"use v2\")\ndef v1():\n    \"\"\"Old entry point.\"\"\"\n\ndef v2():\n    \"\"\"New entry point.\"\"\"\n",
    );
    let builder = memory_builder();
    build(&builder, dir.path());
    let outcome = build(&builder, dir.path());

    let cs = &outcome.change_set;
    assert_eq!(names(&cs.deprecated), BTreeSet::from(["v1".to_string()]));
    assert_eq!(names(&cs.unchanged), BTreeSet::from(["v2".to_string()]));
    let v1 = outcome.snapshot.get("api.py").unwrap().symbols[0].key("api.py");
    assert_eq!(cs.status_of(&v1), Some(SymbolStatus::Deprecated));
}

#[test]
fn test_unchanged_file_is_not_reextracted() {
    let dir = tempfile::tempdir().unwrap();
    let c_source = "def untouched():\n    \"\"\"Stable.\"\"\"\n";
    write(dir.path(), "a.py", "def foo(x):\n    \"\"\"desc\"\"\"\n");
    write(dir.path(), "c.py", c_source);

    let counting = Arc::new(CountingPython::default());
    let config = BuildConfig {
        workers: 2,
        ..BuildConfig::default()
    };
    let mut registry = default_registry(&config);
    registry.register_extractor(counting.clone());
    let builder = IncrementalBuilder::new(
        BuildPipeline::new(registry, config),
        MemorySnapshotStore::new(),
    );
    build(&builder, dir.path());
    counting.seen.lock().clear();

    write(dir.path(), "a.py", "def foo(x, y):\n    \"\"\"desc\"\"\"\n");
    write(dir.path(), "b.py", "class Bar:\n    pass\n");
    let outcome = build(&builder, dir.path());

    let cs = &outcome.change_set;
    assert_eq!(names(&cs.modified), BTreeSet::from(["foo".to_string()]));
    assert_eq!(names(&cs.added), BTreeSet::from(["Bar".to_string()]));
    assert!(cs.changed_files.contains("b.py"));
    assert_eq!(names(&cs.unchanged), BTreeSet::from(["untouched".to_string()]));
    assert!(cs.unchanged_files.contains("c.py"));

    let seen = counting.seen.lock();
    assert_eq!(seen.len(), 2);
    assert!(!seen.iter().any(|s| s == c_source));
}

#[test]
fn test_malformed_files_do_not_abort_the_build() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ok.py", "def fine():\n    pass\n");
    write(dir.path(), "broken.py", "def broken(:\n    pass\n");
    write(dir.path(), "Broken.java", "public class Broken {\n    void f() {\n");
    let outcome = build(&memory_builder(), dir.path());

    for path in ["broken.py", "Broken.java"] {
        let file = outcome.snapshot.get(path).unwrap();
        assert!(!file.parse_ok, "{path} should fail");
        assert!(file.symbols.is_empty());
        assert!(outcome.change_set.extraction_errors.contains(path));
    }
    assert!(outcome.snapshot.get("ok.py").unwrap().parse_ok);
    assert_eq!(outcome.stats.extraction_errors, 2);
    assert_eq!(outcome.warnings.len(), 2);
}

#[test]
fn test_missing_root_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = memory_builder()
        .build(&dir.path().join("absent"), &CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, DocDeltaError::Config(_)));
}

// ---------------------------------------------------------------------------
// Persistent stores
// ---------------------------------------------------------------------------

#[test]
fn test_sqlite_store_carries_state_across_builders() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    mixed_tree(&src);
    let db = dir.path().join("state/docdelta.db");

    let config = BuildConfig {
        strict_snapshots: true,
        ..BuildConfig::default()
    };
    let first = IncrementalBuilder::with_config(
        config.clone(),
        SqliteSnapshotStore::from_config(&db, &config).unwrap(),
    );
    build(&first, &src);

    write(&src, "lib/util.ts", "/** Adds more. */\nexport function add(a: number, b: number): number {\n  return a + b;\n}\n");
    let second = IncrementalBuilder::with_config(
        BuildConfig::default(),
        SqliteSnapshotStore::new(&db, true).unwrap(),
    );
    let outcome = build(&second, &src);
    assert_eq!(names(&outcome.change_set.modified), BTreeSet::from(["add".to_string()]));
    assert_eq!(outcome.stats.files_reused, 2);
}

#[test]
fn test_json_store_carries_state_and_skips_save_on_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    mixed_tree(&src);
    let state = dir.path().join("state");
    let builder = IncrementalBuilder::with_config(
        BuildConfig::default(),
        JsonSnapshotStore::new(&state, true),
    );
    let first = build(&builder, &src);

    write(&src, "app/extra.py", "def extra():\n    pass\n");
    let token = CancellationToken::new();
    token.cancel();
    assert!(matches!(
        builder.build(&src, &token),
        Err(DocDeltaError::Cancelled)
    ));

    let stored = builder
        .store()
        .load_previous(&first.snapshot.root)
        .unwrap();
    assert_eq!(stored.files, first.snapshot.files);

    let outcome = build(&builder, &src);
    assert_eq!(names(&outcome.change_set.added), BTreeSet::from(["extra".to_string()]));
}
