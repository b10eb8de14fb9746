/*!
# Package Driver Integration Tests

Builds whole packages from overlay and upstream directories on disk.
*/

use std::fs;
use std::path::Path;

use goverlay_core::pipeline::augment_package_from;
use goverlay_core::{
    augment_package, FileOutcome, MemoryFs, OverlayConfig, OverlayError, PackageLayout, SourceFs,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write_files(dir: &Path, files: &[(&str, &str)]) -> anyhow::Result<()> {
    for (name, contents) in files {
        fs::write(dir.join(name), contents)?;
    }
    Ok(())
}

fn copying_config() -> OverlayConfig {
    OverlayConfig {
        link_unmodified: false,
        workers: 2,
        ..OverlayConfig::default()
    }
}

#[test]
fn test_package_overlay_replaces_upstream_symbols() -> anyhow::Result<()> {
    let overlay = TempDir::new()?;
    let upstream = TempDir::new()?;
    let output = TempDir::new()?;

    write_files(
        overlay.path(),
        &[("mutex_overlay.go", "package sync\n\nfunc (m *Mutex) Lock() {}\n")],
    )?;
    write_files(
        upstream.path(),
        &[
            ("mutex.go", "package sync\n\ntype Mutex struct{}\n\nfunc (m *Mutex) Lock() { panic(0) }\n"),
            ("once.go", "package sync\n\ntype Once struct{}\n"),
            ("notes.txt", "not go"),
        ],
    )?;

    let layout = PackageLayout::new(upstream.path(), output.path()).with_overlay(overlay.path());
    let summary = augment_package(&layout, &copying_config())?;

    assert!(summary.success());
    assert_eq!(summary.reports.len(), 3);
    assert_eq!(summary.symbols_collected, 1);
    assert_eq!(summary.rewritten(), 1);
    assert_eq!(summary.copied(), 2);

    let names: Vec<(String, bool)> = summary
        .reports
        .iter()
        .map(|r| (r.path.display().to_string(), r.overlay))
        .collect();
    assert_eq!(
        names,
        vec![
            ("mutex_overlay.go".to_string(), true),
            ("mutex.go".to_string(), false),
            ("once.go".to_string(), false),
        ]
    );

    assert_eq!(
        fs::read_to_string(output.path().join("mutex.go"))?,
        "package sync\n\ntype Mutex struct{}\n\n// func Mutex.Lock — goverlay replacement at goverlay__mutex_overlay.go:3:1\n"
    );
    assert_eq!(
        fs::read_to_string(output.path().join("once.go"))?,
        "package sync\n\ntype Once struct{}\n"
    );
    assert!(output.path().join("goverlay__mutex_overlay.go").exists());
    assert!(!output.path().join("notes.txt").exists());
    Ok(())
}

#[test]
fn test_package_overlay_file_sharing_an_upstream_name() -> anyhow::Result<()> {
    let overlay = TempDir::new()?;
    let upstream = TempDir::new()?;
    let output = TempDir::new()?;

    write_files(
        overlay.path(),
        &[("strings.go", "package strings\n\nfunc Index(s, sep string) int { return -1 }\n")],
    )?;
    write_files(
        upstream.path(),
        &[("strings.go", "package strings\n\nfunc Index(s, sep string) int { return 0 }\n\nfunc Cut() {}\n")],
    )?;

    let layout = PackageLayout::new(upstream.path(), output.path()).with_overlay(overlay.path());
    let summary = augment_package(&layout, &copying_config())?;

    assert!(summary.success(), "{:?}", summary.reports);
    assert_eq!(summary.reports.len(), 2);
    assert_eq!(summary.copied(), 1);
    assert_eq!(summary.rewritten(), 1);
    assert_eq!(
        fs::read_to_string(output.path().join("goverlay__strings.go"))?,
        "package strings\n\nfunc Index(s, sep string) int { return -1 }\n"
    );
    assert_eq!(
        fs::read_to_string(output.path().join("strings.go"))?,
        "package strings\n\n// func Index — goverlay replacement at goverlay__strings.go:3:1\n\nfunc Cut() {}\n"
    );
    Ok(())
}

#[test]
fn test_package_redirects_imports_in_overlay_and_upstream() -> anyhow::Result<()> {
    let overlay = TempDir::new()?;
    let upstream = TempDir::new()?;
    let output = TempDir::new()?;

    write_files(
        overlay.path(),
        &[("o.go", "package io\n\nimport \"sync\"\n\nvar mu sync.Mutex\n")],
    )?;
    write_files(
        upstream.path(),
        &[("pipe.go", "package io\n\nimport (\n\t\"errors\"\n\t\"sync\"\n)\n\nvar mu sync.Mutex\n\nvar ErrClosed = errors.New(\"closed\")\n")],
    )?;

    let mut config = copying_config();
    config.marker = "jsgo".to_string();
    let layout = PackageLayout::new(upstream.path(), output.path()).with_overlay(overlay.path());
    let summary = augment_package(&layout, &config)?;

    assert!(summary.success());
    assert_eq!(summary.rewritten(), 2);
    assert_eq!(
        fs::read_to_string(output.path().join("jsgo__o.go"))?,
        "package io\n\nimport sync \"goverlay/nosync\"\n\nvar mu sync.Mutex\n"
    );
    assert_eq!(
        fs::read_to_string(output.path().join("pipe.go"))?,
        "package io\n\nimport (\n\t\"errors\"\n\tsync \"goverlay/nosync\"\n)\n\n\
         // var mu <abbreviated> — jsgo replacement at jsgo__o.go:5:5\n\n\
         var ErrClosed = errors.New(\"closed\")\n"
    );
    Ok(())
}

#[test]
fn test_package_reports_failures_per_file() -> anyhow::Result<()> {
    let upstream = TempDir::new()?;
    let output = TempDir::new()?;

    write_files(
        upstream.path(),
        &[
            ("a.go", "package x\n\nfunc A() {}\n"),
            ("b.go", "package x\n\nfunc (\n"),
            ("c.go", "package x\n\nfunc C() {}\n"),
        ],
    )?;
    fs::write(output.path().join("c.go"), "existing")?;

    let layout = PackageLayout::new(upstream.path(), output.path());
    let summary = augment_package(&layout, &copying_config())?;

    assert!(!summary.success());
    assert_eq!(summary.reports.len(), 3);
    assert_eq!(summary.copied(), 1);

    let failures: Vec<&str> = summary
        .failures()
        .map(|r| match &r.result {
            Err(OverlayError::Parse { .. }) => "parse",
            Err(OverlayError::DestinationExists { .. }) => "exists",
            _ => "other",
        })
        .collect();
    assert_eq!(failures, vec!["parse", "exists"]);
    assert!(!output.path().join("b.go").exists());
    assert_eq!(fs::read_to_string(output.path().join("c.go"))?, "existing");
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_package_links_unmodified_files() -> anyhow::Result<()> {
    let upstream = TempDir::new()?;
    let output = TempDir::new()?;
    write_files(upstream.path(), &[("a.go", "package x\n")])?;

    let layout = PackageLayout::new(upstream.path(), output.path().join("nested"));
    let summary = augment_package(&layout, &OverlayConfig::default())?;

    assert_eq!(summary.linked(), 1);
    let written = output.path().join("nested").join("a.go");
    assert!(fs::symlink_metadata(&written)?.file_type().is_symlink());
    assert_eq!(fs::read_to_string(written)?, "package x\n");
    Ok(())
}

#[test]
fn test_package_from_memory_sources() -> anyhow::Result<()> {
    let output = TempDir::new()?;
    let overlay: MemoryFs = [("z_overlay.go", "package x\n\nconst Limit = 8\n")].into_iter().collect();
    let upstream: MemoryFs = [
        ("limits.go", "package x\n\nconst (\n\tLimit = 4\n\tDepth = 2\n)\n"),
        ("README", "ignored"),
    ]
    .into_iter()
    .collect();

    let summary = augment_package_from(
        &upstream,
        Some(&overlay as &dyn SourceFs),
        output.path(),
        &OverlayConfig::default(),
    )?;

    assert!(summary.success());
    assert_eq!(summary.reports.len(), 2);
    assert_eq!(summary.linked(), 0);
    assert_eq!(
        fs::read_to_string(output.path().join("limits.go"))?,
        "package x\n\n// const Limit <abbreviated> — goverlay replacement at goverlay__z_overlay.go:3:7\nconst (\n\tDepth = 2\n)\n"
    );
    Ok(())
}

#[test]
fn test_missing_upstream_directory() {
    let output = TempDir::new().unwrap();
    let layout = PackageLayout::new(output.path().join("missing"), output.path().join("out"));

    let err = augment_package(&layout, &OverlayConfig::default()).unwrap_err();
    assert!(matches!(err, OverlayError::Io { .. }));
    assert!(!output.path().join("out").exists());
}

#[test]
fn test_parallel_workers_report_every_file() -> anyhow::Result<()> {
    let output = TempDir::new()?;
    let upstream: MemoryFs = (0..9)
        .map(|i| (format!("f{i}.go"), format!("package x\n\nfunc F{i}() {{}}\n")))
        .collect();

    let config = OverlayConfig {
        workers: 4,
        ..OverlayConfig::default()
    };
    let summary = augment_package_from(&upstream, None, output.path(), &config)?;

    assert_eq!(summary.reports.len(), 9);
    assert!(summary
        .reports
        .iter()
        .all(|r| matches!(r.result, Ok(FileOutcome::Copied))));
    Ok(())
}
