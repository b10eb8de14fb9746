// Import path redirection.

use std::collections::BTreeMap;

use tracing::debug;

use super::Transform;
use crate::syntax::{Ident, SourceFile};
use crate::NOSYNC_IMPORT_PATH;

/// Rewrites import paths according to a fixed mapping.
///
/// A redirected import that had no alias gets one named after the original
/// package, so references like `sync.Mutex` keep resolving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRedirector {
    redirects: BTreeMap<String, String>,
}

impl ImportRedirector {
    pub fn new(redirects: BTreeMap<String, String>) -> Self {
        Self { redirects }
    }

    /// `sync` to the cooperative replacement package
    pub fn nosync() -> Self {
        Self::single("sync", NOSYNC_IMPORT_PATH)
    }

    pub fn single(from: impl Into<String>, to: impl Into<String>) -> Self {
        let mut redirects = BTreeMap::new();
        redirects.insert(from.into(), to.into());
        Self { redirects }
    }

    pub fn redirects(&self) -> &BTreeMap<String, String> {
        &self.redirects
    }

    /// Rewrite matching imports, returning whether any changed
    pub fn redirect(&self, file: &mut SourceFile) -> bool {
        if self.redirects.is_empty() {
            return false;
        }

        let mut changed = false;
        for spec in file.import_specs_mut() {
            let Some(target) = self.redirects.get(&spec.path.value) else {
                continue;
            };
            if *target == spec.path.value {
                continue;
            }

            if spec.name.is_none() {
                let package = package_name(&spec.path.value).to_string();
                spec.name = Some(Ident::inserted(spec.path.span.start, package));
            }
            debug!(from = %spec.path.value, to = %target, "redirecting import");
            spec.path.value = target.clone();
            changed = true;
        }
        changed
    }
}

/// Conventional package name of an import path: the last element, skipping a
/// major-version suffix (`math/rand/v2`) and a gopkg.in version (`yaml.v3`).
fn package_name(path: &str) -> &str {
    let mut elements = path.rsplit('/');
    let last = elements.next().unwrap_or(path);
    let name = match elements.next() {
        Some(parent) if is_major_version(last) => parent,
        _ => last,
    };
    match name.rsplit_once('.') {
        Some((base, version)) if !base.is_empty() && is_major_version(version) => base,
        _ => name,
    }
}

fn is_major_version(element: &str) -> bool {
    element
        .strip_prefix('v')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

impl Default for ImportRedirector {
    fn default() -> Self {
        Self::nosync()
    }
}

impl Transform for ImportRedirector {
    fn name(&self) -> &'static str {
        "import-redirector"
    }

    fn apply(&mut self, file: &mut SourceFile) -> bool {
        self.redirect(file)
    }
}
