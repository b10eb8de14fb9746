//! # goverlay Core
//!
//! Overlay and symbol-pruning engine used when recompiling the Go standard
//! library for an alternate runtime target:
//! - Syntax tree for Go source files (loader and printer)
//! - Transform chains applied to one file at a time
//! - Import redirection, overlay symbol collection and upstream symbol pruning
//! - Per-file and per-package pipeline drivers
//!
//! Upstream files are kept byte-identical unless an overlay file supplies a
//! replacement for one of their top-level declarations.

#![warn(clippy::all)]

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

pub mod error;
pub mod pipeline;
pub mod syntax;
pub mod transform;

// Re-export commonly used types
pub use error::{OverlayError, Result};
pub use pipeline::{
    augment_package, process_file, DirFs, FileOutcome, FileProcessor, FileReport, MemoryFs,
    PackageLayout, PackageSummary, SourceFs,
};
pub use syntax::{Decl, Position, SourceFile, Span, ToSource};
pub use transform::{
    Chain, Identity, ImportRedirector, SymbolCollector, SymbolKey, SymbolPruner, SymbolTable,
    Transform,
};

/// goverlay version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Toolchain name written into placeholder comments unless configured otherwise.
pub const DEFAULT_MARKER: &str = "goverlay";

/// Import path of the cooperative-scheduling replacement for `sync`.
pub const NOSYNC_IMPORT_PATH: &str = "goverlay/nosync";

/// Initialize tracing for goverlay components
pub fn init_tracing() {
    init_tracing_with("goverlay_core=info");
}

/// Initialize tracing with an extra filter directive, e.g. `goverlay_core=debug`
pub fn init_tracing_with(directive: &str) {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = directive.parse() {
        filter = filter.add_directive(directive);
    }
    // A subscriber may already be installed by the embedding application.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlayConfig {
    /// Toolchain name embedded in placeholder comments
    pub marker: String,
    /// Import paths to rewrite, old path to new path
    pub redirects: BTreeMap<String, String>,
    /// Extension of source files picked up from package directories
    pub extension: String,
    /// Number of files processed concurrently within one package
    pub workers: usize,
    /// Symlink unmodified files instead of copying them when the source is on disk
    pub link_unmodified: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        let mut redirects = BTreeMap::new();
        redirects.insert("sync".to_string(), NOSYNC_IMPORT_PATH.to_string());

        Self {
            marker: DEFAULT_MARKER.to_string(),
            redirects,
            extension: "go".to_string(),
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            link_unmodified: true,
        }
    }
}

impl OverlayConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| OverlayError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&content).map_err(|e| match e {
            OverlayError::Config { message, .. } => OverlayError::Config {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse a configuration from JSON text.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content).map_err(|e| OverlayError::Config {
            path: Default::default(),
            message: e.to_string(),
        })?;
        Ok(config.normalized())
    }

    fn normalized(mut self) -> Self {
        self.workers = self.workers.max(1);
        self
    }
}
