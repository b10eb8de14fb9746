// Package-level symbol keys and the collector that gathers them from overlay files.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use super::Transform;
use crate::syntax::{Decl, FuncDecl, Ident, Position, SourceFile, TypeSpec};

/// Package-qualified name of a top-level symbol: `pkg.Name` or `pkg.Recv.Method`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolKey(String);

impl SymbolKey {
    pub fn new(package: &str, name: &str) -> Self {
        Self(format!("{package}.{name}"))
    }

    pub fn method(package: &str, receiver: &str, name: &str) -> Self {
        Self(format!("{package}.{receiver}.{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SymbolKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl Borrow<str> for SymbolKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Anything that declares a package-level symbol
pub trait Keyed {
    fn symbol_key(&self, package: &str) -> SymbolKey;
}

impl Keyed for FuncDecl {
    fn symbol_key(&self, package: &str) -> SymbolKey {
        match &self.receiver {
            Some(receiver) => SymbolKey::method(package, &receiver.type_name, &self.name.name),
            None => SymbolKey::new(package, &self.name.name),
        }
    }
}

impl Keyed for TypeSpec {
    fn symbol_key(&self, package: &str) -> SymbolKey {
        SymbolKey::new(package, &self.name.name)
    }
}

impl Keyed for Ident {
    fn symbol_key(&self, package: &str) -> SymbolKey {
        SymbolKey::new(package, &self.name)
    }
}

/// Symbols supplied by overlay files, with the position of each replacement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    entries: HashMap<SymbolKey, Position>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a symbol, overwriting any previous entry for the same key
    pub fn insert(&mut self, key: SymbolKey, position: Position) {
        self.entries.insert(key, position);
    }

    pub fn get(&self, key: &str) -> Option<&Position> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Merge another table into this one
    pub fn extend(&mut self, other: SymbolTable) {
        self.entries.extend(other.entries);
    }

    /// All keys in sorted order
    pub fn keys(&self) -> Vec<&SymbolKey> {
        let mut keys: Vec<&SymbolKey> = self.entries.keys().collect();
        keys.sort();
        keys
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SymbolKey, &Position)> {
        self.entries.iter()
    }
}

impl FromIterator<(SymbolKey, Position)> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = (SymbolKey, Position)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Collects the top-level symbols of overlay files into a [`SymbolTable`].
///
/// Functions are positioned at their `func` keyword, types and values at
/// their name. Blank identifiers declare nothing and are skipped.
#[derive(Debug, Default)]
pub struct SymbolCollector {
    table: SymbolTable,
}

impl SymbolCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(&mut self, file: &SourceFile) {
        let package = file.package_name();
        for decl in &file.decls {
            match decl {
                Decl::Func(func) => {
                    self.table
                        .insert(func.symbol_key(package), file.position(func.span.start));
                }
                Decl::Type(group) => {
                    for spec in &group.specs {
                        self.table
                            .insert(spec.symbol_key(package), file.position(spec.name.span.start));
                    }
                }
                Decl::Value(group) => {
                    for name in group.specs.iter().flat_map(|spec| &spec.names) {
                        if name.is_blank() {
                            continue;
                        }
                        self.table
                            .insert(name.symbol_key(package), file.position(name.span.start));
                    }
                }
                Decl::Import(_) | Decl::Removed(_) => {}
            }
        }
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn into_table(self) -> SymbolTable {
        self.table
    }
}

impl Transform for SymbolCollector {
    fn name(&self) -> &'static str {
        "symbol-collector"
    }

    fn apply(&mut self, file: &mut SourceFile) -> bool {
        self.collect(file);
        false
    }
}
