/*!
# Pipeline

Drives one file through load, transform and write.

A file whose transform chain reports no change is never printed again: it is
linked to its on-disk source when possible and byte-copied otherwise, so the
output always equals the input exactly. Changed files are printed from the
tree and written with create-only semantics.
*/

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{OverlayError, Result};
use crate::syntax::{GoParser, SourceFile, ToSource};
use crate::transform::Transform;

pub mod package;


pub use package::{
    augment_package, augment_package_from, overlay_output_name, FileReport, PackageLayout,
    PackageSummary,
};

/// Buffer size for writing output files
pub const IO_BUF_SIZE: usize = 10 * 1024;

/// Read-only source of package files
pub trait SourceFs: Send + Sync {
    /// Read a whole file
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Location of the file on the real filesystem, if it has one
    fn real_path(&self, _path: &Path) -> Option<PathBuf> {
        None
    }

    /// Names of the files with the given extension, sorted
    fn list(&self, extension: &str) -> Result<Vec<PathBuf>>;
}

/// Files of one directory on disk
#[derive(Debug, Clone)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SourceFs for DirFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(self.root.join(path))
    }

    fn real_path(&self, path: &Path) -> Option<PathBuf> {
        Some(self.root.join(path))
    }

    fn list(&self, extension: &str) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.root).map_err(|e| OverlayError::io(&self.root, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| OverlayError::io(&self.root, e))?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
                names.push(PathBuf::from(entry.file_name()));
            }
        }
        names.sort();
        Ok(names)
    }
}

/// In-memory file set, e.g. sources embedded in a binary
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), contents.into());
    }
}

impl<P: Into<PathBuf>, C: Into<Vec<u8>>> FromIterator<(P, C)> for MemoryFs {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        Self {
            files: iter
                .into_iter()
                .map(|(path, contents)| (path.into(), contents.into()))
                .collect(),
        }
    }
}

impl SourceFs for MemoryFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
        })
    }

    fn list(&self, extension: &str) -> Result<Vec<PathBuf>> {
        Ok(self
            .files
            .keys()
            .filter(|path| path.extension().is_some_and(|ext| ext == extension))
            .cloned()
            .collect())
    }
}

/// How a file reached the output directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Printed from the transformed tree
    Rewritten,
    /// Unchanged, symlinked to the source
    Linked,
    /// Unchanged, bytes copied
    Copied,
}

/// Loads, transforms and writes files from one [`SourceFs`]
pub struct FileProcessor<'fs> {
    fs: &'fs dyn SourceFs,
    parser: GoParser,
    link_unmodified: bool,
}

impl<'fs> FileProcessor<'fs> {
    pub fn new(fs: &'fs dyn SourceFs) -> Result<Self> {
        Ok(Self {
            fs,
            parser: GoParser::new()?,
            link_unmodified: true,
        })
    }

    /// Whether unchanged files on disk are symlinked rather than copied
    pub fn link_unmodified(mut self, link: bool) -> Self {
        self.link_unmodified = link;
        self
    }

    /// Read and parse `path`, naming the file `name` in positions
    pub fn load(&mut self, path: &Path, name: &str) -> Result<SourceFile> {
        let bytes = self.fs.read(path).map_err(|e| OverlayError::io(path, e))?;
        let source = String::from_utf8(bytes).map_err(|_| OverlayError::Parse {
            file: name.to_string(),
            line: 1,
            column: 1,
            message: "source is not valid UTF-8".to_string(),
        })?;
        self.parser.parse(name, source)
    }

    /// Run `transform` over the file at `load` and write the result to `write`
    pub fn process(
        &mut self,
        load: &Path,
        write: &Path,
        transform: &mut dyn Transform,
    ) -> Result<FileOutcome> {
        let name = write
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| write.display().to_string());
        let mut file = self.load(load, &name)?;

        if transform.apply(&mut file) {
            let output = file.to_source();
            write_new(write, output.as_bytes())?;
            debug!(path = %write.display(), transform = transform.name(), "rewrote file");
            return Ok(FileOutcome::Rewritten);
        }

        if self.link_unmodified {
            if let Some(real) = self.fs.real_path(load) {
                match link(&real, write) {
                    Ok(()) => {
                        debug!(path = %write.display(), "linked unmodified file");
                        return Ok(FileOutcome::Linked);
                    }
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                        return Err(OverlayError::DestinationExists {
                            path: write.to_path_buf(),
                        });
                    }
                    Err(e) => {
                        warn!(path = %write.display(), error = %e, "link failed, copying instead");
                    }
                }
            }
        }

        write_new(write, file.source().as_bytes())?;
        debug!(path = %write.display(), "copied unmodified file");
        Ok(FileOutcome::Copied)
    }
}

/// Process one file with a fresh parser
pub fn process_file(
    fs: &dyn SourceFs,
    load: &Path,
    write: &Path,
    transform: &mut dyn Transform,
) -> Result<FileOutcome> {
    FileProcessor::new(fs)?.process(load, write, transform)
}

/// Create `path`, which must not exist yet, and write `contents` to it.
/// A partially written file is removed again.
fn write_new(path: &Path, contents: &[u8]) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| create_error(path, e))?;

    let mut writer = BufWriter::with_capacity(IO_BUF_SIZE, file);
    if let Err(e) = writer.write_all(contents).and_then(|()| writer.flush()) {
        drop(writer);
        let _ = fs::remove_file(path);
        return Err(OverlayError::io(path, e));
    }
    Ok(())
}

fn create_error(path: &Path, error: io::Error) -> OverlayError {
    if error.kind() == io::ErrorKind::AlreadyExists {
        OverlayError::DestinationExists {
            path: path.to_path_buf(),
        }
    } else {
        OverlayError::io(path, error)
    }
}

fn link(source: &Path, destination: &Path) -> io::Result<()> {
    let source = fs::canonicalize(source)?;

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(source, destination)
    }

    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_file(source, destination)
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = (source, destination);
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "symbolic links are not supported on this platform",
        ))
    }
}
