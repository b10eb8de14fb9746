// Package-level driver: collect overlay symbols, then prune upstream files in parallel.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;

use tracing::{debug, info};

use super::{DirFs, FileOutcome, FileProcessor, SourceFs};
use crate::error::{OverlayError, Result};
use crate::transform::{ImportRedirector, SymbolCollector, SymbolPruner, SymbolTable, Transform};
use crate::OverlayConfig;

/// Directories making up one package build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    pub overlay_dir: Option<PathBuf>,
    pub upstream_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl PackageLayout {
    pub fn new(upstream_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            overlay_dir: None,
            upstream_dir: upstream_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn with_overlay(mut self, overlay_dir: impl Into<PathBuf>) -> Self {
        self.overlay_dir = Some(overlay_dir.into());
        self
    }
}

/// Result of processing one file of a package
#[derive(Debug)]
pub struct FileReport {
    /// File name relative to its source directory
    pub path: PathBuf,
    /// Whether the file came from the overlay directory
    pub overlay: bool,
    pub result: Result<FileOutcome>,
}

/// Per-file results of one package build
#[derive(Debug, Default)]
pub struct PackageSummary {
    pub reports: Vec<FileReport>,
    /// Number of distinct symbols supplied by overlay files
    pub symbols_collected: usize,
}

impl PackageSummary {
    fn count(&self, outcome: FileOutcome) -> usize {
        self.reports
            .iter()
            .filter(|report| matches!(report.result, Ok(o) if o == outcome))
            .count()
    }

    pub fn rewritten(&self) -> usize {
        self.count(FileOutcome::Rewritten)
    }

    pub fn linked(&self) -> usize {
        self.count(FileOutcome::Linked)
    }

    pub fn copied(&self) -> usize {
        self.count(FileOutcome::Copied)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
        self.reports.iter().filter(|report| report.result.is_err())
    }

    pub fn success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Build one package from the directories in `layout`
pub fn augment_package(layout: &PackageLayout, config: &OverlayConfig) -> Result<PackageSummary> {
    if !layout.upstream_dir.is_dir() {
        return Err(OverlayError::io(
            &layout.upstream_dir,
            io::Error::new(io::ErrorKind::NotFound, "upstream directory does not exist"),
        ));
    }
    fs::create_dir_all(&layout.output_dir)
        .map_err(|e| OverlayError::io(&layout.output_dir, e))?;

    let upstream = DirFs::new(&layout.upstream_dir);
    let overlay = layout.overlay_dir.as_ref().map(DirFs::new);

    augment_package_from(
        &upstream,
        overlay.as_ref().map(|fs| fs as &dyn SourceFs),
        &layout.output_dir,
        config,
    )
}

/// Build one package from arbitrary sources into an existing output directory.
///
/// Overlay files are processed first, in name order, and their symbols are
/// merged into one table. Each is written as `<marker>__<name>`. Upstream files are then pruned against that table
/// on up to `config.workers` threads at a time.
pub fn augment_package_from(
    upstream: &dyn SourceFs,
    overlay: Option<&dyn SourceFs>,
    output_dir: &Path,
    config: &OverlayConfig,
) -> Result<PackageSummary> {
    let mut redirector = ImportRedirector::new(config.redirects.clone());
    let mut summary = PackageSummary::default();

    let table = match overlay {
        Some(overlay) => {
            let (table, reports) = collect_overlay(overlay, output_dir, config, &mut redirector)?;
            summary.reports.extend(reports);
            table
        }
        None => SymbolTable::new(),
    };
    summary.symbols_collected = table.len();

    let files = upstream.list(&config.extension)?;
    let table = &table;
    let redirector = &redirector;

    for chunk in files.chunks(config.workers.max(1)) {
        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(chunk.len());
            for path in chunk {
                let mut transform = redirector
                    .clone()
                    .then(SymbolPruner::new(table).with_marker(&config.marker));
                let handle = scope.spawn(move || {
                    FileProcessor::new(upstream)?
                        .link_unmodified(config.link_unmodified)
                        .process(path, &output_dir.join(path), &mut transform)
                });
                handles.push((path, handle));
            }

            for (path, handle) in handles {
                let result = handle.join().unwrap_or_else(|_| {
                    Err(OverlayError::WorkerPanicked { path: path.clone() })
                });
                summary.reports.push(FileReport {
                    path: path.clone(),
                    overlay: false,
                    result,
                });
            }
        });
    }

    for report in summary.failures() {
        if let Err(e) = &report.result {
            debug!(path = %report.path.display(), error = %e, "file failed");
        }
    }
    info!(
        output = %output_dir.display(),
        files = summary.reports.len(),
        symbols = summary.symbols_collected,
        rewritten = summary.rewritten(),
        linked = summary.linked(),
        copied = summary.copied(),
        failed = summary.failures().count(),
        "package augmented"
    );

    Ok(summary)
}

/// Output name of an overlay file, `<marker>__<name>`, kept apart from upstream names
pub fn overlay_output_name(marker: &str, path: &Path) -> PathBuf {
    let name = path.file_name().unwrap_or(path.as_os_str()).to_string_lossy();
    path.with_file_name(format!("{marker}__{name}"))
}

fn collect_overlay(
    overlay: &dyn SourceFs,
    output_dir: &Path,
    config: &OverlayConfig,
    redirector: &mut ImportRedirector,
) -> Result<(SymbolTable, Vec<FileReport>)> {
    let files = overlay.list(&config.extension)?;
    let mut processor = FileProcessor::new(overlay)?.link_unmodified(config.link_unmodified);
    let mut collector = SymbolCollector::new();
    let mut reports = Vec::with_capacity(files.len());

    for path in files {
        let mut chain = (&mut collector).then(&mut *redirector);
        let write_path = output_dir.join(overlay_output_name(&config.marker, &path));
        let result = processor.process(&path, &write_path, &mut chain);
        reports.push(FileReport {
            path,
            overlay: true,
            result,
        });
    }

    Ok((collector.into_table(), reports))
}
