//! Reader for the `key: "value"` blocks used by the `env` and
//! `probe_headers` inputs.
//!
//! Only a flat YAML block mapping with scalar values is understood: plain,
//! single-quoted and double-quoted scalars (including multi-line flow
//! scalars) and literal/folded block scalars. Values are kept as text, so
//! `PORT: 8080` yields `"8080"`. Diagnostics use the wording of the js-yaml
//! loader that CI users already know from other actions, followed by the
//! 1-based `(line:column)` of the offending position.

use std::collections::HashSet;

use thiserror::Error;

pub const BAD_INDENTATION: &str = "bad indentation of a mapping entry";
pub const MULTILINE_IMPLICIT_KEY: &str =
    "can not read a block mapping entry; a multiline key may not be an implicit key";
pub const DUPLICATED_KEY: &str = "duplicated mapping key";
pub const TAB_INDENTATION: &str = "tab characters must not be used in indentation";
pub const EOF_IN_DOUBLE_QUOTED: &str = "unexpected end of the stream within a double quoted scalar";
pub const EOF_IN_SINGLE_QUOTED: &str = "unexpected end of the stream within a single quoted scalar";
pub const UNKNOWN_ESCAPE: &str = "unknown escape sequence";
pub const BAD_BLOCK_HEADER: &str = "invalid block scalar header";
pub const NESTED_COLLECTION: &str = "nested collections are not supported";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason} ({line}:{column})")]
pub struct BlockMapError {
    reason: &'static str,
    line: usize,
    column: usize,
}

impl BlockMapError {
    fn at(reason: &'static str, line_idx: usize, column_idx: usize) -> Self {
        Self {
            reason,
            line: line_idx + 1,
            column: column_idx + 1,
        }
    }

    pub fn reason(&self) -> &'static str {
        self.reason
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }
}

/// Top-level shape of a parsed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    /// Entries in source order.
    Mapping(Vec<(String, String)>),
    /// Empty text, a lone scalar, or a sequence.
    Other,
}

impl Document {
    pub fn into_pairs(self) -> Vec<(String, String)> {
        match self {
            Self::Mapping(pairs) => pairs,
            Self::Other => Vec::new(),
        }
    }
}

/// Parse `text` into ordered `(key, value)` pairs; anything that is not a
/// mapping yields an empty list.
pub fn parse_pairs(text: &str) -> Result<Vec<(String, String)>, BlockMapError> {
    parse(text).map(Document::into_pairs)
}

pub fn parse(text: &str) -> Result<Document, BlockMapError> {
    let mut lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    if lines.len() > 1 && lines.last() == Some(&"") {
        lines.pop();
    }
    let mut parser = Parser { lines, pos: 0 };

    parser.skip_blank();
    if parser.at_end() {
        return Ok(Document::Other);
    }
    if parser.lines[parser.pos].trim_end() == "---" {
        parser.pos += 1;
        parser.skip_blank();
        if parser.at_end() {
            return Ok(Document::Other);
        }
    }

    let indent = parser.indent_of(parser.pos)?;
    let first_line = parser.lines[parser.pos];
    let content = &first_line[indent..];
    if is_sequence_entry(content) || content.starts_with('[') {
        return Ok(Document::Other);
    }
    if content.starts_with('{') {
        return Err(BlockMapError::at(NESTED_COLLECTION, parser.pos, indent));
    }
    match split_key(content) {
        Ok(Some(_)) => parser.mapping(indent).map(Document::Mapping),
        Ok(None) => Ok(Document::Other),
        Err(offset) => Err(BlockMapError::at(UNKNOWN_ESCAPE, parser.pos, indent + offset)),
    }
}

struct Parser<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.lines.len()
    }

    fn skip_blank(&mut self) {
        while !self.at_end() && is_blank_or_comment(self.lines[self.pos]) {
            self.pos += 1;
        }
    }

    /// Next line at or after `from` that is not whitespace only.
    fn next_non_blank_line(&self, from: usize) -> Option<usize> {
        (from..self.lines.len()).find(|&idx| !self.lines[idx].trim().is_empty())
    }

    fn indent_of(&self, idx: usize) -> Result<usize, BlockMapError> {
        let line = self.lines[idx];
        let spaces = line.len() - line.trim_start_matches(' ').len();
        if line[spaces..].starts_with('\t') && !line.trim().is_empty() {
            return Err(BlockMapError::at(TAB_INDENTATION, idx, spaces));
        }
        Ok(spaces)
    }

    fn mapping(&mut self, base: usize) -> Result<Vec<(String, String)>, BlockMapError> {
        let mut pairs = Vec::new();
        let mut seen = HashSet::new();

        loop {
            self.skip_blank();
            if self.at_end() {
                break;
            }
            let idx = self.pos;
            let indent = self.indent_of(idx)?;
            if indent != base {
                return Err(BlockMapError::at(BAD_INDENTATION, idx, indent));
            }
            let line: &'a str = self.lines[idx];
            let content = &line[indent..];
            let (key, after_colon) = match split_key(content) {
                Ok(Some(found)) => found,
                Ok(None) => return Err(BlockMapError::at(MULTILINE_IMPLICIT_KEY, idx, indent)),
                Err(offset) => return Err(BlockMapError::at(UNKNOWN_ESCAPE, idx, indent + offset)),
            };
            if !seen.insert(key.clone()) {
                return Err(BlockMapError::at(DUPLICATED_KEY, idx, indent));
            }
            let value = self.value(base, &content[after_colon..], indent + after_colon)?;
            pairs.push((key, value));
        }

        Ok(pairs)
    }

    /// Read the value that starts at `rest` on the current line and leave
    /// `pos` on the first line after it.
    fn value(&mut self, base: usize, rest: &'a str, column: usize) -> Result<String, BlockMapError> {
        let trimmed = rest.trim_start();
        let column = column + (rest.len() - trimmed.len());
        let idx = self.pos;

        if trimmed.is_empty() || trimmed.starts_with('#') {
            self.pos += 1;
            return self.plain_continuation(base, String::new());
        }

        match trimmed.as_bytes()[0] {
            b'"' => self.double_quoted(&trimmed[1..], column + 1),
            b'\'' => self.single_quoted(&trimmed[1..], column + 1),
            b'|' | b'>' => self.block_scalar(base, trimmed, column),
            b'{' | b'[' => Err(BlockMapError::at(NESTED_COLLECTION, idx, column)),
            _ => {
                self.pos += 1;
                let first = strip_comment(trimmed).trim_end().to_string();
                self.plain_continuation(base, first)
            }
        }
    }

    /// Fold lines indented deeper than the mapping into a plain scalar.
    fn plain_continuation(&mut self, base: usize, mut text: String) -> Result<String, BlockMapError> {
        let mut pending_breaks = 0;
        while !self.at_end() {
            let idx = self.pos;
            let line = self.lines[idx];
            if line.trim().is_empty() {
                pending_breaks += 1;
                self.pos += 1;
                continue;
            }
            let indent = self.indent_of(idx)?;
            let content = line[indent..].trim_end();
            if indent <= base || content.starts_with('#') {
                break;
            }
            if text.is_empty() && (is_sequence_entry(content) || content.starts_with('{')) {
                return Err(BlockMapError::at(NESTED_COLLECTION, idx, indent));
            }
            if matches!(split_key(content), Ok(Some(_))) {
                let reason = if text.is_empty() { NESTED_COLLECTION } else { BAD_INDENTATION };
                return Err(BlockMapError::at(reason, idx, indent));
            }
            if !text.is_empty() {
                push_fold(&mut text, pending_breaks);
            }
            text.push_str(strip_comment(content).trim_end());
            pending_breaks = 0;
            self.pos += 1;
        }
        Ok(text)
    }

    fn double_quoted(&mut self, first: &'a str, column: usize) -> Result<String, BlockMapError> {
        let mut out = String::new();
        let mut idx = self.pos;
        let mut src = first;
        let mut src_column = column;

        loop {
            match scan_double_quoted(src) {
                Err(offset) => {
                    return Err(BlockMapError::at(UNKNOWN_ESCAPE, idx, src_column + offset));
                }
                Ok(Segment::Closed { text, rest }) => {
                    out.push_str(&text);
                    let tail = &src[rest..];
                    self.ensure_nothing_follows(idx, tail, src_column + rest)?;
                    self.pos = idx + 1;
                    return Ok(out);
                }
                Ok(Segment::Open {
                    text,
                    escaped_break,
                }) => {
                    if escaped_break {
                        out.push_str(&text);
                    } else {
                        out.push_str(text.trim_end_matches([' ', '\t']));
                    }
                    let (next, breaks) = self.next_flow_line(idx, EOF_IN_DOUBLE_QUOTED)?;
                    if escaped_break {
                        out.extend(std::iter::repeat_n('\n', breaks));
                    } else {
                        push_fold(&mut out, breaks);
                    }
                    idx = next;
                    let line = self.lines[idx];
                    src = line.trim_start();
                    src_column = line.len() - src.len();
                }
            }
        }
    }

    fn single_quoted(&mut self, first: &'a str, column: usize) -> Result<String, BlockMapError> {
        let mut out = String::new();
        let mut idx = self.pos;
        let mut src = first;
        let mut src_column = column;

        loop {
            match scan_single_quoted(src) {
                Segment::Closed { text, rest } => {
                    out.push_str(&text);
                    self.ensure_nothing_follows(idx, &src[rest..], src_column + rest)?;
                    self.pos = idx + 1;
                    return Ok(out);
                }
                Segment::Open { text, .. } => {
                    out.push_str(text.trim_end_matches([' ', '\t']));
                    let (next, breaks) = self.next_flow_line(idx, EOF_IN_SINGLE_QUOTED)?;
                    push_fold(&mut out, breaks);
                    idx = next;
                    let line = self.lines[idx];
                    src = line.trim_start();
                    src_column = line.len() - src.len();
                }
            }
        }
    }

    /// Advance a multi-line flow scalar to its next non-blank line, counting
    /// the blank lines skipped on the way.
    fn next_flow_line(&self, idx: usize, eof_reason: &'static str) -> Result<(usize, usize), BlockMapError> {
        let mut next = idx + 1;
        let mut blanks = 0;
        while next < self.lines.len() && self.lines[next].trim().is_empty() {
            blanks += 1;
            next += 1;
        }
        if next >= self.lines.len() {
            let last = self.lines.len() - 1;
            return Err(BlockMapError::at(eof_reason, last, self.lines[last].len()));
        }
        Ok((next, blanks))
    }

    /// After a quoted scalar only whitespace or a comment may remain on the
    /// line; anything else would start an implicit key spanning lines.
    fn ensure_nothing_follows(&self, idx: usize, tail: &str, column: usize) -> Result<(), BlockMapError> {
        let trimmed = tail.trim_start();
        if trimmed.is_empty() {
            return Ok(());
        }
        let whitespace_before = trimmed.len() != tail.len();
        if trimmed.starts_with('#') && whitespace_before {
            return Ok(());
        }
        Err(BlockMapError::at(
            MULTILINE_IMPLICIT_KEY,
            idx,
            column + (tail.len() - trimmed.len()),
        ))
    }

    fn block_scalar(&mut self, base: usize, header: &str, column: usize) -> Result<String, BlockMapError> {
        let header_idx = self.pos;
        let folded = header.starts_with('>');
        let mut chomping = Chomping::Clip;
        let mut explicit_indent = None;

        let mut indicators = header[1..].char_indices();
        let mut tail_start = header.len();
        for (offset, ch) in indicators.by_ref() {
            match ch {
                '-' | '+' if chomping == Chomping::Clip => {
                    chomping = if ch == '-' { Chomping::Strip } else { Chomping::Keep };
                }
                '1'..='9' if explicit_indent.is_none() => {
                    explicit_indent = Some(ch as usize - '0' as usize);
                }
                _ => {
                    tail_start = offset + 1;
                    break;
                }
            }
        }
        let tail = &header[tail_start..];
        if !tail.is_empty() && !tail.starts_with([' ', '\t']) {
            return Err(BlockMapError::at(BAD_BLOCK_HEADER, header_idx, column + tail_start));
        }
        let tail = tail.trim_start();
        if !tail.is_empty() && !tail.starts_with('#') {
            return Err(BlockMapError::at(BAD_BLOCK_HEADER, header_idx, column + tail_start));
        }

        self.pos += 1;
        let block_indent = match explicit_indent {
            Some(width) => base + width,
            None => match self.next_non_blank_line(self.pos) {
                Some(idx) => leading_spaces(self.lines[idx]),
                None => base + 1,
            },
        };
        // Blank lines may still belong to the block when content follows
        // them at the block's indentation.
        let mut body: Vec<&str> = Vec::new();
        while !self.at_end() {
            let line = self.lines[self.pos];
            if line.trim().is_empty() {
                body.push(line.get(block_indent..).unwrap_or(""));
            } else if block_indent > base && leading_spaces(line) >= block_indent {
                body.push(&line[block_indent..]);
            } else {
                break;
            }
            self.pos += 1;
        }

        let Some(last) = body.iter().rposition(|line| !line.trim().is_empty()) else {
            return Ok(match chomping {
                Chomping::Keep => "\n".repeat(body.len()),
                _ => String::new(),
            });
        };
        let trailing_breaks = body.len() - last - 1;
        let content = &body[..=last];

        let mut text = if folded {
            fold_block(content)
        } else {
            content.join("\n")
        };
        match chomping {
            Chomping::Strip => {}
            Chomping::Clip => text.push('\n'),
            Chomping::Keep => text.push_str(&"\n".repeat(trailing_breaks + 1)),
        }
        Ok(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chomping {
    Strip,
    Clip,
    Keep,
}

enum Segment {
    /// The closing quote was found; `rest` is the byte offset just past it.
    Closed { text: String, rest: usize },
    /// The line ended first.
    Open { text: String, escaped_break: bool },
}

/// Scan a double-quoted scalar body on one line. `Err` carries the byte
/// offset of an invalid escape.
fn scan_double_quoted(src: &str) -> Result<Segment, usize> {
    let mut text = String::new();
    let mut chars = src.char_indices();
    while let Some((offset, ch)) = chars.next() {
        match ch {
            '"' => {
                return Ok(Segment::Closed {
                    text,
                    rest: offset + 1,
                });
            }
            '\\' => {
                let Some((_, escape)) = chars.next() else {
                    return Ok(Segment::Open {
                        text,
                        escaped_break: true,
                    });
                };
                let decoded = match escape {
                    '0' => '\0',
                    'a' => '\x07',
                    'b' => '\x08',
                    't' | '\t' => '\t',
                    'n' => '\n',
                    'v' => '\x0b',
                    'f' => '\x0c',
                    'r' => '\r',
                    'e' => '\x1b',
                    ' ' => ' ',
                    '"' => '"',
                    '/' => '/',
                    '\\' => '\\',
                    'N' => '\u{85}',
                    '_' => '\u{a0}',
                    'L' => '\u{2028}',
                    'P' => '\u{2029}',
                    'x' | 'u' | 'U' => {
                        let width = match escape {
                            'x' => 2,
                            'u' => 4,
                            _ => 8,
                        };
                        let digits: String = chars.by_ref().take(width).map(|(_, c)| c).collect();
                        if digits.len() != width {
                            return Err(offset);
                        }
                        u32::from_str_radix(&digits, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or(offset)?
                    }
                    _ => return Err(offset),
                };
                text.push(decoded);
            }
            _ => text.push(ch),
        }
    }
    Ok(Segment::Open {
        text,
        escaped_break: false,
    })
}

fn scan_single_quoted(src: &str) -> Segment {
    let mut text = String::new();
    let mut chars = src.char_indices().peekable();
    while let Some((offset, ch)) = chars.next() {
        if ch == '\'' {
            if matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
                text.push('\'');
                continue;
            }
            return Segment::Closed {
                text,
                rest: offset + 1,
            };
        }
        text.push(ch);
    }
    Segment::Open {
        text,
        escaped_break: false,
    }
}

/// Split `key: rest` on one line. Returns the key and the byte offset just
/// past the `:`, `None` when the line is not a mapping entry, or the offset
/// of a bad escape in a double-quoted key.
fn split_key(content: &str) -> Result<Option<(String, usize)>, usize> {
    let (key, after_key) = match content.as_bytes().first() {
        Some(b'"') => match scan_double_quoted(&content[1..]).map_err(|offset| offset + 1)? {
            Segment::Closed { text, rest } => (text, rest + 1),
            Segment::Open { .. } => return Ok(None),
        },
        Some(b'\'') => match scan_single_quoted(&content[1..]) {
            Segment::Closed { text, rest } => (text, rest + 1),
            Segment::Open { .. } => return Ok(None),
        },
        Some(b'?') | Some(b'#') | None => return Ok(None),
        Some(_) => {
            let Some(colon) = find_mapping_colon(content) else {
                return Ok(None);
            };
            let key = content[..colon].trim_end();
            if key.is_empty() {
                return Ok(None);
            }
            return Ok(Some((key.to_string(), colon + 1)));
        }
    };

    let rest = &content[after_key..];
    let trimmed = rest.trim_start_matches([' ', '\t']);
    let colon = after_key + (rest.len() - trimmed.len());
    let mut tail = trimmed.chars();
    if tail.next() != Some(':') || !matches!(tail.next(), None | Some(' ') | Some('\t')) {
        return Ok(None);
    }
    Ok(Some((key, colon + 1)))
}

/// Byte offset of the first `:` that ends a plain key: followed by
/// whitespace or the end of the line, and not inside a comment.
fn find_mapping_colon(content: &str) -> Option<usize> {
    let bytes = content.as_bytes();
    for (offset, &byte) in bytes.iter().enumerate() {
        match byte {
            b'#' if offset > 0 && matches!(bytes[offset - 1], b' ' | b'\t') => return None,
            b':' if matches!(bytes.get(offset + 1), None | Some(b' ') | Some(b'\t')) => {
                return Some(offset);
            }
            _ => {}
        }
    }
    None
}

fn fold_block(lines: &[&str]) -> String {
    let mut text = String::new();
    let mut previous_more_indented: Option<bool> = None;
    let mut pending_blank = 0;

    for line in lines {
        if line.trim().is_empty() {
            pending_blank += 1;
            continue;
        }
        let more_indented = line.starts_with([' ', '\t']);
        match previous_more_indented {
            None => text.push_str(&"\n".repeat(pending_blank)),
            Some(previous) if !previous && !more_indented => push_fold(&mut text, pending_blank),
            Some(_) => text.push_str(&"\n".repeat(pending_blank + 1)),
        }
        text.push_str(line);
        previous_more_indented = Some(more_indented);
        pending_blank = 0;
    }
    text
}

/// A single line break folds to a space; each blank line in between keeps
/// one newline instead.
fn push_fold(text: &mut String, blank_lines: usize) {
    if blank_lines == 0 {
        text.push(' ');
    } else {
        text.push_str(&"\n".repeat(blank_lines));
    }
}

fn strip_comment(value: &str) -> &str {
    let bytes = value.as_bytes();
    for offset in 1..bytes.len() {
        if bytes[offset] == b'#' && matches!(bytes[offset - 1], b' ' | b'\t') {
            return &value[..offset];
        }
    }
    value
}

fn is_sequence_entry(content: &str) -> bool {
    content == "-" || content.starts_with("- ") || content.starts_with("-\t")
}

fn is_blank_or_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}
