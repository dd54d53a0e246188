//! Two-pass parser for Unity's multi-entry YAML documents.
//!
//! Pass one splits the text on `--- !u!<class> &<id>` headers. Pass two reads
//! each block's indentation-based attribute tree. References stay as
//! `{fileID: N}` handles; nothing is dereferenced here.

use std::sync::LazyLock;

use regex::Regex;

use crate::document::{Document, Entry};
use crate::error::ResolveError;
use crate::types::{EntryId, Reference, Scalar, Value};

/// Reason used for every unterminated construct.
const TRUNCATED: &str = "truncated attribute block";

/// `--- !u!<class> &<anchor>` with an optional `stripped` marker.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^--- !u!(\d+) &(-?\d+)(?: (stripped))?\s*$").expect("valid regex");
});

/// Signed integer literal.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"^[-+]?[0-9]+$").expect("valid regex"));

/// Decimal literal, optionally in scientific notation.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^[-+]?([0-9]+\.[0-9]*|\.[0-9]+|[0-9]+)([eE][-+]?[0-9]+)?$")
        .expect("valid regex");
});

/// Parse raw prefab text into a document.
///
/// # Errors
///
/// Returns `ResolveError::MalformedDocument` if a header lacks its class tag
/// or id, a block lacks its type tag, an attribute block is truncated, an id
/// repeats, or the text holds no entries at all.
pub fn parse(raw: &str) -> Result<Document, ResolveError> {
    let blocks = split_blocks(raw)?;
    if blocks.is_empty() {
        return Err(malformed(1, "no entries"));
    }

    let entries = blocks
        .iter()
        .map(parse_block)
        .collect::<Result<Vec<Entry>, ResolveError>>()?;
    return Document::from_entries(entries);
}

/// Shorthand for a `MalformedDocument` error.
fn malformed(line: usize, reason: impl Into<String>) -> ResolveError {
    return ResolveError::MalformedDocument {
        line,
        reason: reason.into(),
    };
}

// ── Pass one: blocks ──────────────────────────────────────────────────

/// One non-blank physical line, with indentation measured in spaces.
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    /// Leading spaces.
    indent: usize,
    /// One-based line number in the source.
    number: usize,
    /// Content without indentation or trailing whitespace.
    text: &'a str,
}

/// A header and the lines up to the next header.
struct RawBlock<'a> {
    /// Unity class id from `!u!`.
    class_id: &'a str,
    /// Line number of the header.
    header: usize,
    /// Anchor without `&`.
    id: &'a str,
    /// Body lines, blank lines dropped.
    lines: Vec<Line<'a>>,
    /// Header carried `stripped`.
    stripped: bool,
}

/// Split text into blocks at `---` headers, skipping directives and comments.
///
/// # Errors
///
/// Returns `MalformedDocument` for bad headers or content before the first header.
fn split_blocks(raw: &str) -> Result<Vec<RawBlock<'_>>, ResolveError> {
    let mut blocks: Vec<RawBlock<'_>> = Vec::new();

    for (offset, text) in raw.lines().enumerate() {
        let number = offset.saturating_add(1);
        if text.starts_with("---") {
            blocks.push(parse_header(text, number)?);
            continue;
        }

        let content = text.trim_start_matches(' ');
        if content.trim().is_empty() || content.starts_with('#') {
            continue;
        }
        let Some(block) = blocks.last_mut() else {
            if text.starts_with('%') {
                continue;
            }
            return Err(malformed(number, "content before the first entry header"));
        };
        block.lines.push(Line {
            indent: text.len().saturating_sub(content.len()),
            number,
            text: content.trim_end(),
        });
    }

    return Ok(blocks);
}

/// Read `--- !u!<class> &<anchor>[ stripped]`.
///
/// # Errors
///
/// Returns `MalformedDocument` naming the missing part.
fn parse_header(text: &str, number: usize) -> Result<RawBlock<'_>, ResolveError> {
    let Some(caps) = HEADER.captures(text) else {
        let reason = if !text.contains("!u!") {
            "entry header has no type tag"
        } else if !text.contains('&') {
            "entry header has no id"
        } else {
            "malformed entry header"
        };
        return Err(malformed(number, reason));
    };

    let class_id = caps.get(1).map_or("", |m| return m.as_str());
    let id = caps.get(2).map_or("", |m| return m.as_str());
    return Ok(RawBlock {
        class_id,
        header: number,
        id,
        lines: Vec::new(),
        stripped: caps.get(3).is_some(),
    });
}

// ── Pass two: attribute trees ─────────────────────────────────────────

/// Turn one raw block into an entry.
///
/// # Errors
///
/// Returns `MalformedDocument` for a missing type tag or a broken body.
fn parse_block(block: &RawBlock<'_>) -> Result<Entry, ResolveError> {
    let mut cursor = Cursor {
        lines: &block.lines,
        pos: 0,
    };

    let Some(tag_line) = cursor.peek() else {
        return Err(malformed(block.header, "missing type tag"));
    };
    let (type_tag, rest) = split_key(tag_line.text)
        .filter(|(tag, _)| return tag_line.indent == 0 && is_type_tag(tag))
        .ok_or_else(|| return malformed(tag_line.number, "missing type tag"))?;
    cursor.advance();

    let attributes = if rest.is_empty() {
        match cursor.peek() {
            Some(first) if first.indent > 0 => Value::Mapping(cursor.parse_mapping(first.indent)?),
            Some(first) => return Err(malformed(first.number, TRUNCATED)),
            None => return Err(malformed(tag_line.number, TRUNCATED)),
        }
    } else {
        let value = parse_inline(rest).map_err(|reason| return malformed(tag_line.number, reason))?;
        if !matches!(value, Value::Mapping(_)) {
            return Err(malformed(tag_line.number, "type tag must introduce a mapping"));
        }
        value
    };

    if let Some(extra) = cursor.peek() {
        return Err(malformed(extra.number, "unexpected content after attribute block"));
    }

    return Ok(Entry {
        attributes,
        class_id: block.class_id.to_string(),
        id: EntryId::new(block.id),
        line: block.header,
        stripped: block.stripped,
        type_tag: type_tag.to_string(),
    });
}

/// Type tags are bare identifiers such as `GameObject`.
fn is_type_tag(tag: &str) -> bool {
    return !tag.is_empty() && tag.chars().all(|c| return c.is_ascii_alphanumeric() || c == '_');
}

/// Whether a line opens a block sequence item.
fn is_sequence_item(text: &str) -> bool {
    return text == "-" || text.starts_with("- ");
}

/// Split `key: value` or `key:`. Returns `None` for anything that is not a key line.
fn split_key(text: &str) -> Option<(&str, &str)> {
    if text.starts_with(['{', '[', '\'', '"']) {
        return None;
    }
    let (key, rest) = match text.split_once(": ") {
        Some((key, rest)) => (key, rest.trim()),
        None => (text.strip_suffix(':')?, ""),
    };
    let key = key.trim_end();
    if key.is_empty() {
        return None;
    }
    return Some((key, rest));
}

/// Walks the body lines of one block.
struct Cursor<'a> {
    /// Body lines of the block.
    lines: &'a [Line<'a>],
    /// Next unread line.
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Next unread line.
    fn peek(&self) -> Option<Line<'a>> {
        return self.lines.get(self.pos).copied();
    }

    /// Consume one line.
    fn advance(&mut self) {
        self.pos = self.pos.saturating_add(1);
    }

    /// Read `key: value` lines at exactly `indent`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDocument` for over-indented or keyless lines.
    fn parse_mapping(&mut self, indent: usize) -> Result<Vec<(String, Value)>, ResolveError> {
        let mut pairs = Vec::new();
        while let Some(line) = self.peek() {
            if line.indent < indent || is_sequence_item(line.text) {
                break;
            }
            if line.indent > indent {
                return Err(malformed(line.number, "unexpected indentation"));
            }
            self.advance();
            let (key, rest) =
                split_key(line.text).ok_or_else(|| return malformed(line.number, "expected `key: value`"))?;
            let value = self.parse_value(rest, indent, line.number)?;
            pairs.push((key.to_string(), value));
        }
        return Ok(pairs);
    }

    /// Value of a key whose line sits at `indent`: inline text, or the
    /// nested block that follows when `rest` is empty.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDocument` for unterminated inline values.
    fn parse_value(&mut self, rest: &str, indent: usize, number: usize) -> Result<Value, ResolveError> {
        if rest.is_empty() {
            return self.parse_nested(indent);
        }
        let text = self.fold_continuation(rest, indent);
        return parse_inline(&text).map_err(|reason| return malformed(number, reason));
    }

    /// Block value under an empty `key:`. Unity writes sequences at the
    /// key's own indentation.
    ///
    /// # Errors
    ///
    /// Propagates errors from the nested mapping or sequence.
    fn parse_nested(&mut self, parent_indent: usize) -> Result<Value, ResolveError> {
        let Some(next) = self.peek() else {
            return Ok(Value::Scalar(Scalar::Null));
        };
        if is_sequence_item(next.text) && next.indent >= parent_indent {
            return Ok(Value::Sequence(self.parse_sequence(next.indent)?));
        }
        if next.indent > parent_indent {
            return Ok(mapping_value(self.parse_mapping(next.indent)?));
        }
        return Ok(Value::Scalar(Scalar::Null));
    }

    /// Read `- item` lines at exactly `indent`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDocument` for broken items.
    fn parse_sequence(&mut self, indent: usize) -> Result<Vec<Value>, ResolveError> {
        let mut items = Vec::new();
        while let Some(line) = self.peek() {
            if line.indent != indent || !is_sequence_item(line.text) {
                break;
            }
            self.advance();

            let content = line.text.strip_prefix('-').unwrap_or_default().trim_start();
            if content.is_empty() {
                items.push(self.parse_nested(indent)?);
                continue;
            }

            // Column where the item's own content starts.
            let column = indent.saturating_add(line.text.len().saturating_sub(content.len()));
            let Some((key, rest)) = split_key(content) else {
                let text = self.fold_continuation(content, indent);
                items.push(parse_inline(&text).map_err(|reason| return malformed(line.number, reason))?);
                continue;
            };
            let first = self.parse_value(rest, column, line.number)?;
            let mut pairs = vec![(key.to_string(), first)];
            pairs.extend(self.parse_mapping(column)?);
            items.push(mapping_value(pairs));
        }
        return Ok(items);
    }

    /// Join lines indented past `indent` onto an inline value, folding with spaces.
    fn fold_continuation(&mut self, first: &str, indent: usize) -> String {
        let mut text = first.to_string();
        while let Some(next) = self.peek() {
            if next.indent <= indent {
                break;
            }
            text.push(' ');
            text.push_str(next.text);
            self.advance();
        }
        return text;
    }
}

// ── Inline values ─────────────────────────────────────────────────────

/// Parse the text after `key: ` or `- `.
///
/// # Errors
///
/// Returns the reason when a flow collection or quoted scalar is unterminated
/// or followed by stray text.
fn parse_inline(text: &str) -> Result<Value, String> {
    let text = text.trim();
    if !text.starts_with(['{', '[', '\'', '"']) {
        return Ok(Value::Scalar(classify(text)));
    }

    let mut flow = Flow {
        chars: text.chars().collect(),
        pos: 0,
    };
    let value = flow.value()?;
    flow.skip_whitespace();
    if flow.peek().is_some() {
        let trailing: String = flow.chars.iter().skip(flow.pos).collect();
        return Err(format!("unexpected trailing text `{trailing}`"));
    }
    return Ok(value);
}

/// Keep the lexical class of a plain scalar.
fn classify(text: &str) -> Scalar {
    if matches!(text, "" | "~" | "null" | "Null" | "NULL") {
        return Scalar::Null;
    }
    if INTEGER.is_match(text) {
        return Scalar::Integer(text.to_string());
    }
    if DECIMAL.is_match(text) {
        return Scalar::Decimal(text.to_string());
    }
    return Scalar::Text(text.to_string());
}

/// A mapping, or a reference when it has the `{fileID, guid, type}` shape.
fn mapping_value(pairs: Vec<(String, Value)>) -> Value {
    return match pointer_parts(&pairs) {
        Some(reference) => Value::Reference(reference),
        None => Value::Mapping(pairs),
    };
}

/// Extract a reference from `fileID` (+ optional `guid`, `type`) pairs.
fn pointer_parts(pairs: &[(String, Value)]) -> Option<Reference> {
    let mut target = None;
    let mut asset_guid = None;
    for (key, value) in pairs {
        match (key.as_str(), value) {
            ("fileID", Value::Scalar(Scalar::Integer(id))) => target = Some(EntryId::new(id.as_str())),
            ("guid", Value::Scalar(guid)) => {
                asset_guid = Some(guid.as_text().to_string()).filter(|g| return !g.is_empty());
            },
            ("type", Value::Scalar(_)) => {},
            _ => return None,
        }
    }
    return Some(Reference {
        asset_guid,
        target: target?,
    });
}

/// Character cursor over a flow-style value.
struct Flow {
    /// Characters of the value.
    chars: Vec<char>,
    /// Next unread character.
    pos: usize,
}

impl Flow {
    /// Next character without consuming it.
    fn peek(&self) -> Option<char> {
        return self.chars.get(self.pos).copied();
    }

    /// Consume one character.
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos = self.pos.saturating_add(1);
        }
        return c;
    }

    /// Skip spaces.
    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Any flow value.
    ///
    /// # Errors
    ///
    /// Returns the reason for unterminated or misplaced syntax.
    fn value(&mut self) -> Result<Value, String> {
        self.skip_whitespace();
        return match self.peek() {
            Some('{') => self.mapping(),
            Some('[') => self.sequence(),
            Some(quote @ ('\'' | '"')) => Ok(Value::Scalar(Scalar::Text(self.quoted(quote)?))),
            Some(_) => Ok(Value::Scalar(classify(self.plain().trim()))),
            None => Err(TRUNCATED.to_string()),
        };
    }

    /// Plain scalar up to the next flow indicator.
    fn plain(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if matches!(c, ',' | '}' | ']') {
                break;
            }
            out.push(c);
            self.bump();
        }
        return out;
    }

    /// `{key: value, ...}`.
    ///
    /// # Errors
    ///
    /// Returns the reason for unterminated or misplaced syntax.
    fn mapping(&mut self) -> Result<Value, String> {
        self.bump();
        let mut pairs = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some('}') {
            self.bump();
            return Ok(Value::Mapping(pairs));
        }
        loop {
            let key = self.key()?;
            let value = self.value()?;
            pairs.push((key, value));
            self.skip_whitespace();
            match self.bump() {
                Some(',') => {},
                Some('}') => break,
                Some(c) => return Err(format!("unexpected `{c}` in flow mapping")),
                None => return Err(TRUNCATED.to_string()),
            }
        }
        return Ok(mapping_value(pairs));
    }

    /// Key of a flow mapping pair, consuming the `:`.
    ///
    /// # Errors
    ///
    /// Returns the reason for an empty, unterminated or malformed key.
    fn key(&mut self) -> Result<String, String> {
        let mut key = String::new();
        loop {
            match self.bump() {
                Some(':') => break,
                Some(c @ (',' | '{' | '}' | '[' | ']')) => {
                    return Err(format!("unexpected `{c}` in flow mapping key"));
                },
                Some(c) => key.push(c),
                None => return Err(TRUNCATED.to_string()),
            }
        }
        let key = key.trim();
        if key.is_empty() {
            return Err("empty key in flow mapping".to_string());
        }
        return Ok(key.to_string());
    }

    /// `[item, ...]`.
    ///
    /// # Errors
    ///
    /// Returns the reason for unterminated or misplaced syntax.
    fn sequence(&mut self) -> Result<Value, String> {
        self.bump();
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(']') {
            self.bump();
            return Ok(Value::Sequence(items));
        }
        loop {
            items.push(self.value()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => {},
                Some(']') => break,
                Some(c) => return Err(format!("unexpected `{c}` in flow sequence")),
                None => return Err(TRUNCATED.to_string()),
            }
        }
        return Ok(Value::Sequence(items));
    }

    /// Single- or double-quoted scalar.
    ///
    /// # Errors
    ///
    /// Returns the reason when the closing quote is missing.
    fn quoted(&mut self, quote: char) -> Result<String, String> {
        self.bump();
        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(format!("{TRUNCATED}: unterminated quoted scalar"));
            };
            if c == quote {
                // '' is an escaped quote inside single quotes.
                if quote == '\'' && self.peek() == Some('\'') {
                    self.bump();
                    out.push('\'');
                    continue;
                }
                return Ok(out);
            }
            if quote == '"' && c == '\\' {
                match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(escaped) => out.push(escaped),
                    None => return Err(format!("{TRUNCATED}: unterminated quoted scalar")),
                }
                continue;
            }
            out.push(c);
        }
    }
}
