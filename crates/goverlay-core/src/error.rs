use std::path::PathBuf;

use thiserror::Error;

use crate::syntax::Position;

/// Errors raised while loading, transforming or writing a single file.
///
/// Every error is scoped to one file; the caller decides whether the rest of
/// the package is still worth processing.
#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("Parse error: {file}:{line}:{column}: {message}")]
    Parse {
        file: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Unsupported syntax node '{kind}' at {position}")]
    UnsupportedNode { kind: String, position: Position },

    #[error("Destination already exists: {}", path.display())]
    DestinationExists { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load Go grammar: {0}")]
    Language(String),

    #[error("Worker thread panicked while processing {}", path.display())]
    WorkerPanicked { path: PathBuf },

    #[error("Configuration error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl OverlayError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error at a position
    pub fn parse(position: &Position, message: impl Into<String>) -> Self {
        Self::Parse {
            file: position.file.clone(),
            line: position.line,
            column: position.column,
            message: message.into(),
        }
    }

    /// Whether the error was caused by malformed source text
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::UnsupportedNode { .. })
    }
}

/// Result type for goverlay operations
pub type Result<T> = std::result::Result<T, OverlayError>;
