//! Syntax tree for Go source files.
//!
//! The tree models only what the overlay engine needs: the package clause,
//! the top-level declarations in source order and the top-level comments.
//! Everything below a declaration (bodies, field lists, initializers) stays
//! as original source text addressed by byte spans, so an untouched
//! declaration is always printed back exactly as it was read.

use std::fmt;

mod normalize;
pub mod parser;
pub mod printer;

#[cfg(test)]
mod tests;

pub use parser::GoParser;
pub use printer::ToSource;

/// Half-open byte range `[start, end)` into a file's source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Empty span marking an insertion point
    pub fn at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

/// Human-readable source location. Line and column are 1-based, the column
/// counts bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Declaration keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Import,
    Const,
    Var,
    Type,
    Func,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Import => "import",
            Keyword::Const => "const",
            Keyword::Var => "var",
            Keyword::Type => "type",
            Keyword::Func => "func",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier with the span it occupies in the source.
///
/// An identifier with an empty span did not exist in the source; the printer
/// inserts it at the span's offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    /// A synthesized identifier inserted in front of `offset`
    pub fn inserted(offset: usize, name: impl Into<String>) -> Self {
        Self::new(name, Span::at(offset))
    }

    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }

    /// Rename to the blank identifier, keeping the positional slot
    pub fn blank_out(&mut self) {
        self.name = "_".to_string();
    }
}

/// Text replacement applied over original source when printing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub span: Span,
    pub text: String,
}

/// A member spec of a declaration group (`import`, `type`, `var`, `const`)
pub trait Spec {
    /// Span of the spec in the original source
    fn span(&self) -> Span;

    /// Index of the spec within its group as originally parsed
    fn slot(&self) -> usize;

    /// Edits to apply over the spec's original text
    fn patches(&self, source: &str, out: &mut Vec<Patch>);
}

fn rename_patch(ident: &Ident, source: &str, out: &mut Vec<Patch>) {
    if ident.span.is_empty() {
        out.push(Patch {
            span: ident.span,
            text: format!("{} ", ident.name),
        });
    } else if source[ident.span.start..ident.span.end] != ident.name {
        out.push(Patch {
            span: ident.span,
            text: ident.name.clone(),
        });
    }
}

/// Import path literal. `value` is the unquoted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPath {
    pub value: String,
    pub span: Span,
}

/// `name "path"` inside an import declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub name: Option<Ident>,
    pub path: ImportPath,
    pub span: Span,
    pub slot: usize,
}

impl Spec for ImportSpec {
    fn span(&self) -> Span {
        self.span
    }

    fn slot(&self) -> usize {
        self.slot
    }

    fn patches(&self, source: &str, out: &mut Vec<Patch>) {
        if let Some(name) = &self.name {
            rename_patch(name, source, out);
        }
        let original = unquote(&source[self.path.span.start..self.path.span.end]);
        if original != self.path.value {
            out.push(Patch {
                span: self.path.span,
                text: format!("\"{}\"", self.path.value),
            });
        }
    }
}

/// One `Name Type` or `Name = Type` entry of a type declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub name: Ident,
    pub alias: bool,
    pub span: Span,
    pub slot: usize,
}

impl Spec for TypeSpec {
    fn span(&self) -> Span {
        self.span
    }

    fn slot(&self) -> usize {
        self.slot
    }

    fn patches(&self, source: &str, out: &mut Vec<Patch>) {
        rename_patch(&self.name, source, out);
    }
}

/// One `a, b T = x, y` binding of a var or const declaration. Names are bound
/// to initializers by position, so a name is blanked rather than removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSpec {
    pub names: Vec<Ident>,
    pub span: Span,
    pub slot: usize,
}

impl Spec for ValueSpec {
    fn span(&self) -> Span {
        self.span
    }

    fn slot(&self) -> usize {
        self.slot
    }

    fn patches(&self, source: &str, out: &mut Vec<Patch>) {
        for name in &self.names {
            rename_patch(name, source, out);
        }
    }
}

/// Declaration holding one spec or a parenthesised group of specs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenDecl<S> {
    pub keyword: Keyword,
    pub span: Span,
    /// Offset just past the opening parenthesis of a grouped declaration
    pub open: Option<usize>,
    pub specs: Vec<S>,
    layout: Vec<Span>,
}

impl<S: Spec> GenDecl<S> {
    pub fn new(keyword: Keyword, span: Span, open: Option<usize>, specs: Vec<S>) -> Self {
        let layout = specs.iter().map(Spec::span).collect();
        Self {
            keyword,
            span,
            open,
            specs,
            layout,
        }
    }

    pub fn is_grouped(&self) -> bool {
        self.open.is_some()
    }

    /// Spans of every spec the declaration was parsed with, removed ones included
    pub fn layout(&self) -> &[Span] {
        &self.layout
    }

    /// True when specs were parsed but none survive
    pub fn was_emptied(&self) -> bool {
        self.specs.is_empty() && !self.layout.is_empty()
    }
}

/// Method receiver, reduced to its base type name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receiver {
    pub type_name: String,
    pub pointer: bool,
}

/// Function or method declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub name: Ident,
    pub receiver: Option<Receiver>,
    pub body: Option<Span>,
    pub span: Span,
}

impl FuncDecl {
    /// `Name` for functions, `Recv.Name` for methods
    pub fn qualified_name(&self) -> String {
        match &self.receiver {
            Some(receiver) => format!("{}.{}", receiver.type_name, self.name.name),
            None => self.name.name.clone(),
        }
    }
}

/// Top-level declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    Import(GenDecl<ImportSpec>),
    Func(FuncDecl),
    Type(GenDecl<TypeSpec>),
    /// `var` or `const`, see [`GenDecl::keyword`]
    Value(GenDecl<ValueSpec>),
    /// Tombstone left where a declaration was deleted
    Removed(Span),
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::Import(group) => group.span,
            Decl::Func(func) => func.span,
            Decl::Type(group) => group.span,
            Decl::Value(group) => group.span,
            Decl::Removed(span) => *span,
        }
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, Decl::Removed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Line,
    Block,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub text: String,
    pub span: Span,
    pub kind: CommentKind,
}

impl Comment {
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        let text = text.into();
        let kind = if text.starts_with("/*") {
            CommentKind::Block
        } else {
            CommentKind::Line
        };
        Self { text, span, kind }
    }

    /// Generated line comment attached at `offset`
    pub fn placeholder(offset: usize, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            span: Span::at(offset),
            kind: CommentKind::Placeholder,
        }
    }

    /// Whether the comment runs to the end of its line
    pub fn ends_line(&self) -> bool {
        matches!(self.kind, CommentKind::Line | CommentKind::Placeholder)
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind == CommentKind::Placeholder
    }
}

/// Byte offsets of line starts, for offset to line/column conversion
#[derive(Debug, Clone, PartialEq, Eq)]
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn line_column(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&start| start <= offset).max(1);
        (line, offset - self.starts[line - 1] + 1)
    }
}

/// One parsed Go source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File name reported in positions
    pub name: String,
    source: String,
    /// Package name from the package clause
    pub package: Ident,
    package_clause: Span,
    pub decls: Vec<Decl>,
    /// Top-level comments, followed by any placeholders appended by transforms
    pub comments: Vec<Comment>,
    lines: LineIndex,
}

impl SourceFile {
    pub(crate) fn from_parts(
        name: String,
        source: String,
        package: Ident,
        package_clause: Span,
        decls: Vec<Decl>,
        comments: Vec<Comment>,
    ) -> Self {
        let lines = LineIndex::new(&source);
        Self {
            name,
            source,
            package,
            package_clause,
            decls,
            comments,
            lines,
        }
    }

    /// Parse Go source text
    pub fn parse(name: impl Into<String>, source: impl Into<String>) -> crate::Result<Self> {
        GoParser::new()?.parse(name, source)
    }

    /// Original source text
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn package_name(&self) -> &str {
        &self.package.name
    }

    pub fn package_clause(&self) -> Span {
        self.package_clause
    }

    /// Position of a byte offset within this file
    pub fn position(&self, offset: usize) -> Position {
        let (line, column) = self.lines.line_column(offset);
        Position::new(self.name.clone(), line, column)
    }

    pub fn import_specs(&self) -> impl Iterator<Item = &ImportSpec> {
        self.decls
            .iter()
            .filter_map(|decl| match decl {
                Decl::Import(group) => Some(group.specs.iter()),
                _ => None,
            })
            .flatten()
    }

    pub fn import_specs_mut(&mut self) -> impl Iterator<Item = &mut ImportSpec> {
        self.decls
            .iter_mut()
            .filter_map(|decl| match decl {
                Decl::Import(group) => Some(group.specs.iter_mut()),
                _ => None,
            })
            .flatten()
    }

    /// Replace the declaration at `index` with a tombstone and return it
    pub fn remove_decl(&mut self, index: usize) -> Decl {
        let span = self.decls[index].span();
        std::mem::replace(&mut self.decls[index], Decl::Removed(span))
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter().filter(|c| c.is_placeholder())
    }
}

/// Strip the delimiters of a Go string literal
pub(crate) fn unquote(literal: &str) -> &str {
    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| literal.strip_prefix('`').and_then(|s| s.strip_suffix('`')));
    inner.unwrap_or(literal)
}
