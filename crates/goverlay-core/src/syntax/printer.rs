// Source code generation from a (possibly transformed) SourceFile.
// Untouched declarations are copied from the original text; edited group
// declarations are rebuilt from their original header, spec texts,
// separators and footer so comments and layout survive.

use std::borrow::Cow;

use super::{CommentKind, Decl, GenDecl, Patch, SourceFile, Span, Spec};

/// Trait for types that can generate their source code representation
pub trait ToSource {
    fn to_source(&self) -> String;
}

impl ToSource for SourceFile {
    fn to_source(&self) -> String {
        print_file(self)
    }
}

struct Item<'a> {
    span: Span,
    // Placeholders sort ahead of the declaration they are anchored to.
    rank: u8,
    body: Body<'a>,
}

enum Body<'a> {
    Text {
        text: Cow<'a, str>,
        comment: Option<CommentKind>,
    },
    Tombstone,
}

fn print_file(file: &SourceFile) -> String {
    let source = file.source();
    let mut items = Vec::with_capacity(file.decls.len() + file.comments.len() + 1);

    let clause = file.package_clause();
    items.push(Item {
        span: clause,
        rank: 1,
        body: Body::Text {
            text: Cow::Borrowed(&source[clause.start..clause.end]),
            comment: None,
        },
    });

    for decl in &file.decls {
        let body = match decl {
            Decl::Removed(_) => Body::Tombstone,
            Decl::Func(func) => Body::Text {
                text: Cow::Borrowed(&source[func.span.start..func.span.end]),
                comment: None,
            },
            Decl::Import(group) => group_text(source, group),
            Decl::Type(group) => group_text(source, group),
            Decl::Value(group) => group_text(source, group),
        };
        items.push(Item {
            span: decl.span(),
            rank: 1,
            body,
        });
    }

    for comment in &file.comments {
        items.push(Item {
            span: comment.span,
            rank: if comment.is_placeholder() { 0 } else { 1 },
            body: Body::Text {
                text: Cow::Borrowed(comment.text.as_str()),
                comment: Some(comment.kind),
            },
        });
    }

    items.sort_by_key(|item| (item.span.start, item.rank));

    let newline = if source.contains("\r\n") { "\r\n" } else { "\n" };
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    let mut first = true;
    let mut after_line_comment = false;

    for item in &items {
        match &item.body {
            Body::Tombstone => cursor = cursor.max(item.span.end),
            Body::Text { text, comment } => {
                let gap = if item.span.start > cursor {
                    &source[cursor..item.span.start]
                } else {
                    ""
                };
                if first {
                    out.push_str(gap);
                } else {
                    out.push_str(&separator(gap, newline, after_line_comment, *comment));
                }
                out.push_str(text);
                cursor = cursor.max(item.span.end);
                first = false;
                after_line_comment = matches!(
                    comment,
                    Some(CommentKind::Line | CommentKind::Placeholder)
                );
            }
        }
    }

    let tail = &source[cursor.min(source.len())..];
    if let Some(line_end) = line_break(tail) {
        out.push_str(&tail[line_end..]);
    }
    out
}

/// Text between two emitted items. `newline` is the file's line ending.
fn separator<'g>(
    gap: &'g str,
    newline: &'static str,
    after_line_comment: bool,
    next: Option<CommentKind>,
) -> Cow<'g, str> {
    if let Some(line_end) = line_break(gap) {
        return Cow::Borrowed(&gap[line_end..]);
    }
    if after_line_comment || next == Some(CommentKind::Placeholder) {
        return Cow::Borrowed(newline);
    }
    if next.is_some() && gap.contains(';') {
        return Cow::Owned(gap.replace(';', ""));
    }
    if gap.contains(';') {
        Cow::Borrowed(newline)
    } else {
        Cow::Borrowed(gap)
    }
}

/// Offset of the first line break in `text`, including a `\r` before the `\n`
fn line_break(text: &str) -> Option<usize> {
    let newline = text.find('\n')?;
    Some(match text[..newline].strip_suffix('\r') {
        Some(line) => line.len(),
        None => newline,
    })
}

fn group_text<'a, S: Spec>(source: &'a str, group: &GenDecl<S>) -> Body<'a> {
    let untouched = group.specs.len() == group.layout().len()
        && group.specs.iter().all(|spec| {
            let mut patches = Vec::new();
            spec.patches(source, &mut patches);
            patches.is_empty()
        });
    let text = if untouched {
        Cow::Borrowed(&source[group.span.start..group.span.end])
    } else {
        Cow::Owned(render_group(source, group))
    };
    Body::Text {
        text,
        comment: None,
    }
}

/// Split a separator at its first newline: the part before trails the
/// previous spec, the rest leads the next one.
fn split_gap(gap: &str) -> (&str, &str) {
    match line_break(gap) {
        Some(line_end) => gap.split_at(line_end),
        None => ("", gap),
    }
}

fn render_group<S: Spec>(source: &str, group: &GenDecl<S>) -> String {
    let layout = group.layout();
    let Some(first) = layout.first() else {
        return source[group.span.start..group.span.end].to_string();
    };
    let last = layout[layout.len() - 1];
    let open = group.open.unwrap_or(first.start);

    let mut leads = Vec::with_capacity(layout.len());
    let mut trails = Vec::with_capacity(layout.len());
    leads.push(&source[open..first.start]);
    for pair in layout.windows(2) {
        let (trail, lead) = split_gap(&source[pair[0].end..pair[1].start]);
        trails.push(trail);
        leads.push(lead);
    }
    let (trail, close) = split_gap(&source[last.end..group.span.end]);
    trails.push(trail);

    let mut out = String::with_capacity(group.span.len());
    out.push_str(&source[group.span.start..open]);
    for (index, spec) in group.specs.iter().enumerate() {
        let slot = spec.slot();
        let lead = if index == 0 && !leads[slot].contains('\n') {
            leads[0]
        } else {
            leads[slot]
        };
        out.push_str(lead);
        out.push_str(&render_spec(source, spec));
        out.push_str(trails[slot]);
    }
    out.push_str(close);
    out
}

fn render_spec<S: Spec>(source: &str, spec: &S) -> String {
    let mut patches = Vec::new();
    spec.patches(source, &mut patches);
    apply_patches(source, spec.span(), patches)
}

/// Original text of `span` with non-overlapping patches applied
pub(crate) fn apply_patches(source: &str, span: Span, mut patches: Vec<Patch>) -> String {
    patches.sort_by_key(|patch| (patch.span.start, patch.span.end));

    let mut out = String::with_capacity(span.len() + 16);
    let mut cursor = span.start;
    for patch in &patches {
        if patch.span.start < cursor || patch.span.end > span.end {
            continue;
        }
        out.push_str(&source[cursor..patch.span.start]);
        out.push_str(&patch.text);
        cursor = patch.span.end;
    }
    out.push_str(&source[cursor..span.end]);
    out
}
