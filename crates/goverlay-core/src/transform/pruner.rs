// Removes upstream declarations that an overlay file replaces, leaving a
// placeholder comment where each one used to be.

use tracing::debug;

use super::symbols::{Keyed, SymbolTable};
use super::Transform;
use crate::syntax::{Comment, Decl, Keyword, Position, SourceFile};
use crate::DEFAULT_MARKER;

/// Prunes the symbols of a [`SymbolTable`] from upstream files
#[derive(Debug, Clone, Copy)]
pub struct SymbolPruner<'t> {
    table: &'t SymbolTable,
    marker: &'t str,
}

impl<'t> SymbolPruner<'t> {
    pub fn new(table: &'t SymbolTable) -> Self {
        Self {
            table,
            marker: DEFAULT_MARKER,
        }
    }

    /// Toolchain name written into placeholder comments
    pub fn with_marker(mut self, marker: &'t str) -> Self {
        self.marker = marker;
        self
    }

    /// Prune every declaration whose key is in the table.
    ///
    /// Returns true if anything was removed or blanked.
    pub fn prune(&self, file: &mut SourceFile) -> bool {
        if self.table.is_empty() {
            return false;
        }

        let package = file.package_name().to_string();
        let mut placeholders = Vec::new();

        for index in 0..file.decls.len() {
            let emptied = match &mut file.decls[index] {
                Decl::Func(func) => {
                    let key = func.symbol_key(&package);
                    let Some(position) = self.table.get(key.as_str()) else {
                        continue;
                    };
                    debug!(symbol = %key, replacement = %position, "pruning function");
                    placeholders.push(Comment::placeholder(
                        func.span.start,
                        self.placeholder(Keyword::Func, &func.qualified_name(), position),
                    ));
                    true
                }
                Decl::Type(group) => {
                    let anchor = group.span.start;
                    group.specs.retain(|spec| {
                        let key = spec.symbol_key(&package);
                        let Some(position) = self.table.get(key.as_str()) else {
                            return true;
                        };
                        debug!(symbol = %key, replacement = %position, "pruning type");
                        placeholders.push(Comment::placeholder(
                            anchor,
                            self.placeholder(Keyword::Type, &spec.name.name, position),
                        ));
                        false
                    });
                    group.was_emptied()
                }
                Decl::Value(group) => {
                    let anchor = group.span.start;
                    let keyword = group.keyword;
                    group.specs.retain_mut(|spec| {
                        let mut remaining = 0;
                        for name in &mut spec.names {
                            if name.is_blank() {
                                remaining += 1;
                                continue;
                            }
                            let key = name.symbol_key(&package);
                            let Some(position) = self.table.get(key.as_str()) else {
                                remaining += 1;
                                continue;
                            };
                            debug!(symbol = %key, replacement = %position, "pruning {}", keyword);
                            placeholders.push(Comment::placeholder(
                                anchor,
                                self.placeholder(keyword, &name.name, position),
                            ));
                            name.blank_out();
                        }
                        remaining > 0
                    });
                    group.was_emptied()
                }
                Decl::Import(_) | Decl::Removed(_) => false,
            };

            if emptied {
                file.remove_decl(index);
            }
        }

        let changed = !placeholders.is_empty();
        file.comments.extend(placeholders);
        changed
    }

    fn placeholder(&self, keyword: Keyword, name: &str, position: &Position) -> String {
        let abbreviated = if keyword == Keyword::Func {
            ""
        } else {
            " <abbreviated>"
        };
        format!(
            "// {keyword} {name}{abbreviated} — {} replacement at {position}",
            self.marker
        )
    }
}

impl Transform for SymbolPruner<'_> {
    fn name(&self) -> &'static str {
        "symbol-pruner"
    }

    fn apply(&mut self, file: &mut SourceFile) -> bool {
        self.prune(file)
    }
}
