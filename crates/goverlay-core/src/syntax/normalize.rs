// Rewrites single-line declaration groups into the one-spec-per-line shape
// tree-sitter-go accepts, e.g. `var (A int; B int)`.
// Only the parser sees the rewritten text. Offsets map back to the original.

const GROUP_KEYWORDS: [&[u8]; 4] = [b"import", b"type", b"var", b"const"];

enum Edit {
    /// Insert a newline before this byte
    Insert,
    /// Replace the `;` at this byte with a newline
    Replace,
}

/// Source text prepared for tree-sitter, with the positions of inserted bytes
pub(crate) struct Normalized {
    text: String,
    inserted: Vec<usize>,
}

impl Normalized {
    pub(crate) fn new(source: &str) -> Self {
        let edits = Scanner::new(source.as_bytes()).group_edits();
        if edits.is_empty() {
            return Self {
                text: source.to_string(),
                inserted: Vec::new(),
            };
        }

        let mut text = String::with_capacity(source.len() + edits.len());
        let mut inserted = Vec::new();
        let mut cursor = 0;
        for (offset, edit) in edits {
            text.push_str(&source[cursor..offset]);
            match edit {
                Edit::Insert => {
                    inserted.push(text.len());
                    text.push('\n');
                    cursor = offset;
                }
                Edit::Replace => {
                    text.push('\n');
                    cursor = offset + 1;
                }
            }
        }
        text.push_str(&source[cursor..]);

        Self { text, inserted }
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    /// Map an offset in the prepared text back to the source
    pub(crate) fn original(&self, offset: usize) -> usize {
        offset - self.inserted.partition_point(|&i| i < offset)
    }
}

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    edits: Vec<(usize, Edit)>,
}

impl<'a> Scanner<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            edits: Vec::new(),
        }
    }

    fn group_edits(mut self) -> Vec<(usize, Edit)> {
        let mut depth = 0usize;
        while let Some(&b) = self.bytes.get(self.pos) {
            if self.skip_literal_or_comment() {
                continue;
            }
            match b {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth = depth.saturating_sub(1),
                _ if is_ident_byte(b) => {
                    let start = self.pos;
                    while self.bytes.get(self.pos).is_some_and(|&b| is_ident_byte(b)) {
                        self.pos += 1;
                    }
                    if depth == 0 && GROUP_KEYWORDS.contains(&&self.bytes[start..self.pos]) {
                        if let Some(open) = self.group_open() {
                            self.pos = open + 1;
                            self.group(open);
                        }
                    }
                    continue;
                }
                _ => {}
            }
            self.pos += 1;
        }
        self.edits
    }

    /// Offset of the `(` following a keyword, if the declaration is grouped
    fn group_open(&self) -> Option<usize> {
        let mut pos = self.pos;
        while let Some(&b) = self.bytes.get(pos) {
            match b {
                b' ' | b'\t' | b'\r' | b'\n' => pos += 1,
                b'(' => return Some(pos),
                _ => return None,
            }
        }
        None
    }

    /// Walk a group body starting just past its `(`
    fn group(&mut self, open: usize) {
        let first = self.bytes[open + 1..]
            .iter()
            .position(|&b| !matches!(b, b' ' | b'\t' | b'\r'))
            .map(|i| open + 1 + i);
        if let Some(first) = first {
            if !matches!(self.bytes[first], b'\n' | b')') {
                self.edits.push((open + 1, Edit::Insert));
            }
        }

        let mut depth = 0usize;
        let mut line_ended = true;
        while let Some(&b) = self.bytes.get(self.pos) {
            if self.skip_literal_or_comment() {
                line_ended = false;
                continue;
            }
            match b {
                b'\n' => line_ended = true,
                b';' if depth == 0 => {
                    self.edits.push((self.pos, Edit::Replace));
                    line_ended = true;
                }
                b'(' | b'[' | b'{' => {
                    depth += 1;
                    line_ended = false;
                }
                b')' if depth == 0 => {
                    if !line_ended {
                        self.edits.push((self.pos, Edit::Insert));
                    }
                    self.pos += 1;
                    return;
                }
                b')' | b']' | b'}' => {
                    depth = depth.saturating_sub(1);
                    line_ended = false;
                }
                b' ' | b'\t' | b'\r' => {}
                _ => line_ended = false,
            }
            self.pos += 1;
        }
    }

    /// Step over a comment or a string, raw string or rune literal at the cursor
    fn skip_literal_or_comment(&mut self) -> bool {
        let rest = &self.bytes[self.pos..];
        let end = match rest {
            [b'/', b'/', ..] => find(rest, b"\n").unwrap_or(rest.len()),
            [b'/', b'*', ..] => find(&rest[2..], b"*/").map_or(rest.len(), |i| i + 4),
            [b'`', ..] => find(&rest[1..], b"`").map_or(rest.len(), |i| i + 2),
            [quote @ (b'"' | b'\''), ..] => quoted_len(rest, *quote),
            _ => return false,
        };
        self.pos += end;
        true
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Length of an interpreted string or rune literal, honouring escapes
fn quoted_len(rest: &[u8], quote: u8) -> usize {
    let mut i = 1;
    while let Some(&b) = rest.get(i) {
        match b {
            b'\\' => i += 2,
            b'\n' => return i,
            _ if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    rest.len()
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}
