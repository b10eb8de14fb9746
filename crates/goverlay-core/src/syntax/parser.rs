// Go source loader backed by tree-sitter-go.
// Converts the concrete syntax tree into the declaration-level SourceFile,
// rejecting files with syntax errors. Offsets always refer to the original text.

use tree_sitter::Node;

use super::normalize::Normalized;
use super::{
    unquote, Comment, Decl, FuncDecl, GenDecl, Ident, ImportPath, ImportSpec, Keyword, LineIndex,
    Position, Receiver, SourceFile, Span, TypeSpec, ValueSpec,
};
use crate::error::{OverlayError, Result};

/// Go parser using tree-sitter-go
pub struct GoParser {
    parser: tree_sitter::Parser,
}

impl GoParser {
    pub fn new() -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| OverlayError::Language(e.to_string()))?;

        Ok(Self { parser })
    }

    /// Parse `source` into a [`SourceFile`] named `name`
    pub fn parse(&mut self, name: impl Into<String>, source: impl Into<String>) -> Result<SourceFile> {
        let name = name.into();
        let source = source.into();

        let normalized = Normalized::new(&source);
        let tree = self.parser.parse(normalized.text(), None).ok_or_else(|| OverlayError::Parse {
            file: name.clone(),
            line: 1,
            column: 1,
            message: "parser produced no syntax tree".to_string(),
        })?;

        let lines = LineIndex::new(&source);
        let builder = TreeBuilder {
            name: &name,
            source: &source,
            lines: &lines,
            normalized: &normalized,
        };
        let (package, package_clause, decls, comments) = builder.build(tree.root_node())?;

        Ok(SourceFile::from_parts(
            name,
            source,
            package,
            package_clause,
            decls,
            comments,
        ))
    }
}

type Parts = (Ident, Span, Vec<Decl>, Vec<Comment>);

struct TreeBuilder<'a> {
    name: &'a str,
    source: &'a str,
    lines: &'a LineIndex,
    normalized: &'a Normalized,
}

impl<'a> TreeBuilder<'a> {
    fn build(&self, root: Node) -> Result<Parts> {
        if root.has_error() {
            return Err(self.syntax_error(root));
        }

        let mut package = None;
        let mut decls = Vec::new();
        let mut comments = Vec::new();

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "package_clause" => package = Some(self.convert_package_clause(child)?),
                "comment" => comments.push(Comment::new(self.text(child), self.span(child))),
                "import_declaration" => {
                    decls.push(Decl::Import(self.convert_import_declaration(child)?))
                }
                "function_declaration" | "method_declaration" => {
                    decls.push(Decl::Func(self.convert_function(child)?))
                }
                "type_declaration" => decls.push(Decl::Type(self.convert_type_declaration(child)?)),
                "var_declaration" => {
                    decls.push(Decl::Value(self.convert_value_declaration(child, Keyword::Var)?))
                }
                "const_declaration" => {
                    decls.push(Decl::Value(self.convert_value_declaration(child, Keyword::Const)?))
                }
                other => return Err(self.unsupported(other, child)),
            }
        }

        let (package, package_clause) = package.ok_or_else(|| {
            OverlayError::parse(&self.position(0), "expected 'package' clause")
        })?;

        Ok((package, package_clause, decls, comments))
    }

    fn convert_package_clause(&self, node: Node) -> Result<(Ident, Span)> {
        let mut cursor = node.walk();
        let name = node
            .named_children(&mut cursor)
            .find(|child| child.kind() == "package_identifier")
            .ok_or_else(|| self.malformed(node, "package clause without a name"))?;
        Ok((self.ident(name), self.span(node)))
    }

    fn convert_import_declaration(&self, node: Node) -> Result<GenDecl<ImportSpec>> {
        let (nodes, open) = self.spec_nodes(node, &["import_spec"]);
        let specs = nodes
            .into_iter()
            .enumerate()
            .map(|(slot, spec)| self.convert_import_spec(spec, slot))
            .collect::<Result<Vec<_>>>()?;
        Ok(GenDecl::new(Keyword::Import, self.span(node), open, specs))
    }

    fn convert_import_spec(&self, node: Node, slot: usize) -> Result<ImportSpec> {
        let path = node
            .child_by_field_name("path")
            .ok_or_else(|| self.malformed(node, "import without a path"))?;
        Ok(ImportSpec {
            name: node.child_by_field_name("name").map(|name| self.ident(name)),
            path: ImportPath {
                value: unquote(self.text(path)).to_string(),
                span: self.span(path),
            },
            span: self.span(node),
            slot,
        })
    }

    fn convert_function(&self, node: Node) -> Result<FuncDecl> {
        let name = node
            .child_by_field_name("name")
            .ok_or_else(|| self.malformed(node, "function without a name"))?;
        let receiver = match node.child_by_field_name("receiver") {
            Some(list) => Some(self.convert_receiver(list)?),
            None => None,
        };

        Ok(FuncDecl {
            name: self.ident(name),
            receiver,
            body: node.child_by_field_name("body").map(|body| self.span(body)),
            span: self.span(node),
        })
    }

    fn convert_receiver(&self, list: Node) -> Result<Receiver> {
        let mut cursor = list.walk();
        let param = list
            .named_children(&mut cursor)
            .find(|child| child.kind() == "parameter_declaration")
            .ok_or_else(|| self.malformed(list, "method without a receiver"))?;
        let ty = param
            .child_by_field_name("type")
            .ok_or_else(|| self.malformed(param, "receiver without a type"))?;
        self.receiver_base(ty, false)
    }

    /// Reduce `T`, `*T`, `(T)` and `T[K]` to the base type name
    fn receiver_base(&self, node: Node, pointer: bool) -> Result<Receiver> {
        match node.kind() {
            "type_identifier" => Ok(Receiver {
                type_name: self.text(node).to_string(),
                pointer,
            }),
            "pointer_type" => {
                let inner = node
                    .named_child(0)
                    .ok_or_else(|| self.malformed(node, "pointer receiver without a type"))?;
                self.receiver_base(inner, true)
            }
            "parenthesized_type" => {
                let inner = node
                    .named_child(0)
                    .ok_or_else(|| self.malformed(node, "empty parenthesized receiver"))?;
                self.receiver_base(inner, pointer)
            }
            "generic_type" => {
                let inner = node
                    .child_by_field_name("type")
                    .ok_or_else(|| self.malformed(node, "generic receiver without a type"))?;
                self.receiver_base(inner, pointer)
            }
            other => Err(self.unsupported(other, node)),
        }
    }

    fn convert_type_declaration(&self, node: Node) -> Result<GenDecl<TypeSpec>> {
        let (nodes, open) = self.spec_nodes(node, &["type_spec", "type_alias"]);
        let specs = nodes
            .into_iter()
            .enumerate()
            .map(|(slot, spec)| {
                let name = spec
                    .child_by_field_name("name")
                    .ok_or_else(|| self.malformed(spec, "type without a name"))?;
                Ok(TypeSpec {
                    name: self.ident(name),
                    alias: spec.kind() == "type_alias",
                    span: self.span(spec),
                    slot,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(GenDecl::new(Keyword::Type, self.span(node), open, specs))
    }

    fn convert_value_declaration(&self, node: Node, keyword: Keyword) -> Result<GenDecl<ValueSpec>> {
        let spec_kind = match keyword {
            Keyword::Const => "const_spec",
            _ => "var_spec",
        };
        let (nodes, open) = self.spec_nodes(node, &[spec_kind]);
        let specs = nodes
            .into_iter()
            .enumerate()
            .map(|(slot, spec)| {
                let mut cursor = spec.walk();
                let names: Vec<Ident> = spec
                    .children_by_field_name("name", &mut cursor)
                    .map(|name| self.ident(name))
                    .collect();
                if names.is_empty() {
                    return Err(self.malformed(spec, "value binding without a name"));
                }
                Ok(ValueSpec {
                    names,
                    span: self.span(spec),
                    slot,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(GenDecl::new(keyword, self.span(node), open, specs))
    }

    fn ident(&self, node: Node) -> Ident {
        Ident::new(self.text(node), self.span(node))
    }

    fn text(&self, node: Node) -> &'a str {
        let span = self.span(node);
        &self.source[span.start..span.end]
    }

    fn span(&self, node: Node) -> Span {
        Span::new(self.offset(node.start_byte()), self.offset(node.end_byte()))
    }

    fn offset(&self, parsed: usize) -> usize {
        self.normalized.original(parsed)
    }

    fn spec_nodes<'t>(&self, decl: Node<'t>, kinds: &[&str]) -> (Vec<Node<'t>>, Option<usize>) {
        let (specs, open) = spec_nodes(decl, kinds);
        (specs, open.map(|open| self.offset(open)))
    }

    fn position(&self, offset: usize) -> Position {
        let (line, column) = self.lines.line_column(offset);
        Position::new(self.name, line, column)
    }

    fn malformed(&self, node: Node, message: &str) -> OverlayError {
        OverlayError::parse(&self.position(self.offset(node.start_byte())), message)
    }

    fn unsupported(&self, kind: &str, node: Node) -> OverlayError {
        OverlayError::UnsupportedNode {
            kind: kind.to_string(),
            position: self.position(self.offset(node.start_byte())),
        }
    }

    fn syntax_error(&self, root: Node) -> OverlayError {
        let Some(node) = first_error(root) else {
            return OverlayError::parse(&self.position(0), "syntax error");
        };
        let message = if node.is_missing() {
            format!("missing {}", node.kind())
        } else {
            let text = self.text(node);
            let snippet: String = text.chars().take(24).collect();
            format!("unexpected {snippet:?}")
        };
        OverlayError::parse(&self.position(self.offset(node.start_byte())), message)
    }
}

/// Collect the spec nodes of a declaration, looking through `*_list` wrappers,
/// and the offset just past the opening parenthesis if the declaration is grouped.
fn spec_nodes<'t>(decl: Node<'t>, kinds: &[&str]) -> (Vec<Node<'t>>, Option<usize>) {
    fn walk<'t>(node: Node<'t>, kinds: &[&str], specs: &mut Vec<Node<'t>>, open: &mut Option<usize>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            let kind = child.kind();
            if kinds.contains(&kind) {
                specs.push(child);
            } else if kind == "(" && open.is_none() {
                *open = Some(child.end_byte());
            } else if kind.ends_with("_list") {
                walk(child, kinds, specs, open);
            }
        }
    }

    let mut specs = Vec::new();
    let mut open = None;
    walk(decl, kinds, &mut specs, &mut open);
    (specs, open)
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    None
}
