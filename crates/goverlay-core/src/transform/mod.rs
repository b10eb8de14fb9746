/*!
# Transforms

In-place transformations of a [`SourceFile`], composed into chains that the
pipeline runs once per file.

## Architecture

- `Transform`: trait for a step that mutates a file and reports whether it changed anything
- `Chain`: runs two transforms in order, changed if either changed
- `Identity`: neutral element, never changes anything
- `ImportRedirector`: rewrites selected import paths
- `SymbolCollector` / `SymbolPruner`: gather overlay symbols, prune their upstream counterparts

## Example Usage

```rust,no_run
use goverlay_core::transform::{ImportRedirector, SymbolCollector, SymbolPruner, Transform};
use goverlay_core::SourceFile;

let mut overlay = SourceFile::parse("overlay.go", "package x\n\nfunc F() {}\n")?;
let mut collector = SymbolCollector::new();
collector.apply(&mut overlay);
let table = collector.into_table();

let mut upstream = SourceFile::parse("x.go", "package x\n\nimport \"sync\"\n\nfunc F() {}\n")?;
let mut chain = ImportRedirector::nosync().then(SymbolPruner::new(&table));
assert!(chain.apply(&mut upstream));
# Ok::<(), goverlay_core::OverlayError>(())
```
*/

use crate::syntax::SourceFile;

pub mod imports;
pub mod pruner;
pub mod symbols;


// Re-export main types
pub use imports::ImportRedirector;
pub use pruner::SymbolPruner;
pub use symbols::{Keyed, SymbolCollector, SymbolKey, SymbolTable};

/// A step that mutates a source file in place.
///
/// `apply` returns true if the file was modified. Unmodified files are copied
/// by the pipeline instead of being printed again.
pub trait Transform {
    /// Human-readable name for this transform
    fn name(&self) -> &'static str;

    /// Apply the transform, returning whether anything changed
    fn apply(&mut self, file: &mut SourceFile) -> bool;

    /// Run `next` after this transform
    fn then<T: Transform>(self, next: T) -> Chain<Self, T>
    where
        Self: Sized,
    {
        Chain {
            first: self,
            second: next,
        }
    }
}

impl<T: Transform + ?Sized> Transform for &mut T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn apply(&mut self, file: &mut SourceFile) -> bool {
        (**self).apply(file)
    }
}

impl<T: Transform + ?Sized> Transform for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn apply(&mut self, file: &mut SourceFile) -> bool {
        (**self).apply(file)
    }
}

/// Two transforms applied in sequence.
///
/// Both always run; the result is the logical OR of their results.
#[derive(Debug, Clone)]
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<A, B> Chain<A, B> {
    /// Take the chained transforms back, e.g. to read a collector's table
    pub fn into_parts(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: Transform, B: Transform> Transform for Chain<A, B> {
    fn name(&self) -> &'static str {
        "chain"
    }

    fn apply(&mut self, file: &mut SourceFile) -> bool {
        let first = self.first.apply(file);
        let second = self.second.apply(file);
        first || second
    }
}

/// Transform that leaves the file untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Transform for Identity {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn apply(&mut self, _file: &mut SourceFile) -> bool {
        false
    }
}
