//! Integration tests for a full scan over directories and archives.
//!
//! These tests build a small search path on disk and verify:
//! - Resources from directories and jars land in one index
//! - Duplicates across origins are kept
//! - Unresolvable locators are skipped without failing the scan
//! - Custom locator types take precedence over built-ins
//! - Container paths through deployed archives are rewritten
//!
//! Run with: `cargo test --test resource_scan_integration`

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use resource_scanner::resolver::{DirectoryResult, ResolveContext};
use resource_scanner::vfs::SystemDirectory;
use resource_scanner::{
    CustomLocatorType, Locator, LocatorResolver, ResourcePattern, ResourceScanner, ResourceStore,
    ResourceUtil, ResourceWalker, VfsError, VirtualDirectory,
};

// ============================================================================
// Helper Functions
// ============================================================================

fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
}

/// The walker scenario: a classes directory plus one jar.
///
/// `walker/directory/file3` exists in both.
fn walker_fixture() -> TempDir {
    let temp = TempDir::new().unwrap();
    let classes = temp.path().join("classes");
    fs::create_dir_all(classes.join("walker/directory")).unwrap();
    fs::write(classes.join("walker/file1"), b"file1").unwrap();
    fs::write(classes.join("walker/directory/file2.txt"), b"file2").unwrap();
    fs::write(classes.join("walker/directory/file3"), b"file3 from dir").unwrap();

    write_jar(
        &temp.path().join("walker.jar"),
        &[
            ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n"),
            ("walker/directory/file3", b"file3 from jar"),
            ("walker/directory/fileInJar", b"in jar"),
            ("walker/fromJar.txt", b"from jar"),
        ],
    );
    temp
}

fn walker_for(temp: &TempDir) -> ResourceWalker {
    ResourceWalker::builder()
        .with_search_path([temp.path().join("classes"), temp.path().join("walker.jar")])
        .build()
}

fn set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Walker Scenario
// ============================================================================

#[test]
fn test_walker_scenario_queries() {
    let temp = walker_fixture();
    let scanner = ResourceScanner::scan(&walker_for(&temp)).unwrap();

    let pattern = ResourcePattern::new("walker/directory.*").unwrap();
    assert_eq!(
        scanner.matching(&pattern),
        set(&[
            "walker/directory/file2.txt",
            "walker/directory/file3",
            "walker/directory/fileInJar",
        ])
    );

    assert!(scanner.exists("walker/file1"));
    assert!(scanner.exists("walker/fromJar.txt"));
    assert!(scanner.is_unique("walker/directory/file2.txt"));
    assert!(!scanner.is_unique("walker/directory/file3"));
}

#[test]
fn test_walker_scenario_locations() {
    let temp = walker_fixture();
    let scanner = ResourceScanner::scan(&walker_for(&temp)).unwrap();

    let locations = scanner.locations("walker/directory/file3").unwrap();
    assert_eq!(locations.len(), 2);
    assert!(locations
        .iter()
        .any(|l| l.starts_with("jar:file:") && l.ends_with("walker.jar!/META-INF/MANIFEST.MF")));
    assert!(locations
        .iter()
        .any(|l| l.starts_with("file:") && l.ends_with("/classes/")));
}

#[test]
fn test_summary_reflects_scan() {
    let temp = walker_fixture();
    let scanner = ResourceScanner::scan(&walker_for(&temp)).unwrap();
    let summary = scanner.summary();

    assert_eq!(summary.locators_found, 2);
    assert_eq!(summary.locators_scanned, 2);
    assert_eq!(summary.locators_failed, 0);
    assert_eq!(summary.keys, 5);
    assert_eq!(summary.values, 6);
}

#[test]
fn test_no_phantom_entries() {
    let temp = walker_fixture();
    let walker = walker_for(&temp);
    let store = walker.scan().unwrap();

    let mut opened = 0;
    for key in store.keys() {
        for origin in store.get(&key).unwrap() {
            let locator = Locator::parse(&origin).unwrap();
            let mut dir = walker
                .resolver()
                .resolve(&locator)
                .unwrap()
                .into_directory()
                .unwrap();
            let mut content = Vec::new();
            dir.open(&key).unwrap().read_to_end(&mut content).unwrap();
            opened += 1;
        }
    }
    assert_eq!(opened, 6);
}

// ============================================================================
// Failure Handling
// ============================================================================

#[test]
fn test_unresolvable_locator_is_skipped() {
    let temp = walker_fixture();
    let walker = walker_for(&temp);
    let mut locators = walker.candidate_locators();
    locators.insert(0, Locator::new("gopher", "//nowhere/"));

    let store = ResourceStore::new();
    let summary = walker.scan_locators(&locators, &store).unwrap();

    assert_eq!(summary.locators_failed, 1);
    assert_eq!(summary.locators_scanned, 2);
    assert!(store.contains("walker/file1"));
    assert!(store.contains("walker/directory/fileInJar"));
}

#[test]
fn test_corrupt_archive_is_skipped() {
    let temp = walker_fixture();
    let broken = temp.path().join("broken.jar");
    fs::write(&broken, b"not a zip at all").unwrap();

    let walker = ResourceWalker::builder()
        .with_search_path([temp.path().join("classes"), broken.clone()])
        .build();
    let mut locators = walker.candidate_locators();
    locators.push(Locator::from_path(&broken));

    let store = ResourceStore::new();
    let summary = walker.scan_locators(&locators, &store).unwrap();

    assert_eq!(summary.locators_failed, 1);
    assert!(store.contains("walker/file1"));
}

#[test]
fn test_ambiguous_container_path() {
    let temp = TempDir::new().unwrap();
    let resolver = LocatorResolver::new();
    let path = format!(
        "{}/missing.ear/web.war/WEB-INF/classes",
        temp.path().to_string_lossy().replace('\\', "/")
    );

    let err = resolver
        .resolve(&Locator::new("vfszip", path.clone()))
        .unwrap_err();
    match err {
        VfsError::AmbiguousArchivePath { path: reported } => assert_eq!(reported, path),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_nested_container_path_is_scanned() {
    let temp = TempDir::new().unwrap();
    let war_path = temp.path().join("web.war");
    write_jar(
        &war_path,
        &[("WEB-INF/classes/app.properties", b"app"), ("index.html", b"<html/>")],
    );
    let war = fs::read(&war_path).unwrap();
    let ear = temp.path().join("app.ear");
    write_jar(&ear, &[("web.war", war.as_slice())]);

    let walker = ResourceWalker::builder().build();
    let locator = Locator::new(
        "vfszip",
        format!(
            "{}/web.war/WEB-INF/classes/",
            ear.to_string_lossy().replace('\\', "/")
        ),
    );

    let store = ResourceStore::new();
    let summary = walker.scan_locators(&[locator], &store).unwrap();
    assert_eq!(summary.locators_scanned, 1);
    assert_eq!(store.keys(), vec!["app.properties".to_string()]);
}

// ============================================================================
// Extension Points
// ============================================================================

#[test]
fn test_custom_locator_type_overrides_builtin() {
    let temp = walker_fixture();
    let resolver = Arc::new(LocatorResolver::new());
    resolver.register(Arc::new(CustomLocatorType::new(
        "hide-directories",
        |l: &Locator| l.is_file_scheme() && l.path().ends_with('/'),
        |_: &Locator, _: &ResolveContext<'_>| -> DirectoryResult {
            Ok(Some(Box::new(SystemDirectory::new(None)?)))
        },
    )));

    let walker = ResourceWalker::builder()
        .with_search_path([temp.path().join("classes"), temp.path().join("walker.jar")])
        .with_resolver(resolver)
        .build();
    let scanner = ResourceScanner::scan(&walker).unwrap();

    assert!(!scanner.exists("walker/file1"));
    assert!(scanner.exists("walker/directory/fileInJar"));
    assert!(scanner.is_unique("walker/directory/file3"));
}

#[test]
fn test_resource_util_reads_indexed_resource() {
    let temp = walker_fixture();
    let scanner = Arc::new(ResourceScanner::scan(&walker_for(&temp)).unwrap());
    let util = ResourceUtil::with_scanner(scanner);

    assert!(util.is_supported("classpath:walker/fromJar.txt", None));
    assert!(util.resource_exists("classpath:walker/fromJar.txt", None));

    let mut content = String::new();
    util.get_stream("classpath:walker/fromJar.txt", None)
        .unwrap()
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "from jar");
}
