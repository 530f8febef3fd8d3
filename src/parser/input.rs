//! Low-level input handling for the XML parser.
//!
//! [`ParserInput`] is a cursor over the document text with position tracking
//! (line, column, byte offset) and common parsing primitives such as
//! peeking, advancing, name parsing, and reference resolution.
//!
//! # Security
//!
//! `ParserInput` tracks nesting depth and entity expansion count to guard
//! against denial-of-service input:
//!
//! - **Depth limit**: prevents stack overflow from deeply nested elements.
//! - **Entity expansion limit**: bounds the work done expanding references
//!   to entities declared in the internal subset ("billion laughs").
//! - **Name length limit**: prevents memory exhaustion from huge names.
//!
//! No external entity loading is performed.

use std::collections::HashMap;

use super::ParseOptions;
use crate::error::{ParseError, SourceLocation};

/// The well-known XML namespace URI, pre-bound to the `xml` prefix.
pub(crate) const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// The well-known xmlns namespace URI.
pub(crate) const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

// -------------------------------------------------------------------------
// XML Name character classes (XML 1.0 §2.3)
// -------------------------------------------------------------------------

/// Returns `true` if `c` is a valid `Char` per XML 1.0 §2.2 `[2]`.
pub(crate) fn is_xml_char(c: char) -> bool {
    matches!(c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x0001_0000..=0x0010_FFFF
    )
}

/// Returns `true` if `c` is a valid `NameStartChar` per XML 1.0 §2.3 `[4]`.
pub(crate) fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z' |
        '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}' |
        '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' |
        '\u{200C}'..='\u{200D}' | '\u{2070}'..='\u{218F}' |
        '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}' |
        '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' |
        '\u{10000}'..='\u{EFFFF}'
    )
}

/// Returns `true` if `c` is a valid `NameChar` per XML 1.0 §2.3 `[4a]`.
pub(crate) fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' |
            '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}'
        )
}

/// Splits a qualified name into optional prefix and local part.
///
/// `"foo:bar"` → `(Some("foo"), "bar")`, `"bar"` → `(None, "bar")`
pub(crate) fn split_name(name: &str) -> (Option<&str>, &str) {
    match name.find(':') {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

/// An entity declared in the DTD internal subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EntityDecl {
    /// `<!ENTITY name "replacement text">`
    Internal(String),
    /// `<!ENTITY name SYSTEM "uri">`, never loaded.
    External,
}

// -------------------------------------------------------------------------
// ParserInput
// -------------------------------------------------------------------------

/// A reference read from markup (XML 1.0 §4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reference {
    /// A character reference or one of the five predefined entities.
    Char(char),
    /// A declared general entity and its fully expanded replacement text.
    Entity { name: String, value: String },
}

/// Cursor over the document text plus the limits and entity table that
/// govern it.
pub(crate) struct ParserInput<'a> {
    text: &'a str,
    /// Byte offset of the cursor; always on a character boundary between
    /// operations.
    pos: usize,
    line: u32,
    column: u32,
    depth: u32,
    entity_expansions: u32,
    limits: ParseOptions,
    /// General entities declared in the internal subset.
    pub(crate) entities: HashMap<String, EntityDecl>,
}

impl<'a> ParserInput<'a> {
    pub fn new(text: &'a str, limits: &ParseOptions) -> Self {
        Self {
            text,
            pos: 0,
            line: 1,
            column: 1,
            depth: 0,
            entity_expansions: 0,
            limits: limits.clone(),
            entities: HashMap::new(),
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.text.as_bytes()
    }

    /// The unread part of the input.
    fn rest(&self) -> &'a str {
        self.text.get(self.pos..).unwrap_or_default()
    }

    // -- Depth tracking --

    /// Enters one element level, failing once `max_depth` is passed.
    pub fn increment_depth(&mut self) -> Result<(), ParseError> {
        if self.depth >= self.limits.max_depth {
            return Err(self.fatal(format!(
                "maximum nesting depth exceeded ({})",
                self.limits.max_depth
            )));
        }
        self.depth += 1;
        Ok(())
    }

    pub fn decrement_depth(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // -- Position --

    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            byte_offset: self.pos,
        }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Returns the input between two byte offsets.
    pub fn slice_str(&self, start: usize, end: usize) -> Result<&'a str, ParseError> {
        self.text
            .get(start..end)
            .ok_or_else(|| self.fatal("range does not fall on character boundaries"))
    }

    pub fn peek(&self) -> Option<u8> {
        self.peek_at(0)
    }

    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes().get(self.pos + offset).copied()
    }

    pub fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Returns `true` if the unread input starts with `s`.
    pub fn looking_at(&self, s: &[u8]) -> bool {
        self.bytes()
            .get(self.pos..)
            .is_some_and(|rest| rest.starts_with(s))
    }

    // -- Consuming --

    /// Moves the cursor `count` bytes forward, keeping line and column
    /// (in characters) in step.
    pub fn advance(&mut self, count: usize) {
        let end = self.pos.saturating_add(count).min(self.text.len());
        for &b in &self.bytes()[self.pos..end] {
            match b {
                b'\n' => {
                    self.line += 1;
                    self.column = 1;
                }
                // UTF-8 continuation byte.
                _ if b & 0xC0 == 0x80 => {}
                _ => self.column += 1,
            }
        }
        self.pos = end;
    }

    /// Consumes `b` if it is the next byte.
    pub fn eat(&mut self, b: u8) -> bool {
        let found = self.peek() == Some(b);
        if found {
            self.advance(1);
        }
        found
    }

    pub fn next_byte(&mut self) -> Result<u8, ParseError> {
        let b = self
            .peek()
            .ok_or_else(|| self.fatal("unexpected end of input"))?;
        self.advance(1);
        Ok(b)
    }

    /// Consumes one `Char` (XML 1.0 §2.2), reporting `\r\n` and a lone `\r`
    /// as `\n` (§2.11).
    pub fn next_char(&mut self) -> Result<char, ParseError> {
        let ch = self
            .peek_char()
            .ok_or_else(|| self.fatal("unexpected end of input"))?;
        if !is_xml_char(ch) {
            return Err(self.fatal(format!("invalid XML character: U+{:04X}", u32::from(ch))));
        }
        self.advance(ch.len_utf8());
        if ch != '\r' {
            return Ok(ch);
        }
        self.eat(b'\n');
        Ok('\n')
    }

    pub fn expect_byte(&mut self, expected: u8) -> Result<(), ParseError> {
        if self.eat(expected) {
            return Ok(());
        }
        let found = self
            .peek_char()
            .map_or_else(|| "end of input".to_string(), |c| format!("'{c}'"));
        Err(self.fatal(format!(
            "expected '{}', found {found}",
            char::from(expected)
        )))
    }

    pub fn expect_str(&mut self, expected: &[u8]) -> Result<(), ParseError> {
        expected.iter().try_for_each(|&b| self.expect_byte(b))
    }

    /// Skips XML whitespace. Returns `true` if any was consumed.
    pub fn skip_whitespace(&mut self) -> bool {
        let n = self
            .rest()
            .bytes()
            .take_while(|&b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
            .count();
        self.advance(n);
        n > 0
    }

    pub fn skip_whitespace_required(&mut self) -> Result<(), ParseError> {
        if self.skip_whitespace() {
            Ok(())
        } else {
            Err(self.fatal("whitespace required"))
        }
    }

    /// Consumes ASCII bytes while `pred` holds.
    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        let n = self
            .rest()
            .bytes()
            .take_while(|&b| b.is_ascii() && pred(b))
            .count();
        self.advance(n);
        &self.text[start..self.pos]
    }

    /// Parses a `Name` (XML 1.0 §2.3 `[5]`), bounded by `max_name_length`.
    pub fn parse_name(&mut self) -> Result<String, ParseError> {
        let rest = self.rest();
        let mut chars = rest.char_indices();
        match chars.next() {
            None => return Err(self.fatal("expected name, found end of input")),
            Some((_, c)) if !is_name_start_char(c) => {
                return Err(self.fatal(format!("invalid name start character: '{c}'")));
            }
            Some(_) => {}
        }
        let len = chars
            .find(|&(_, c)| !is_name_char(c))
            .map_or(rest.len(), |(i, _)| i);
        if len > self.limits.max_name_length {
            return Err(self.fatal(format!(
                "name length ({len}) exceeds maximum ({})",
                self.limits.max_name_length
            )));
        }
        self.advance(len);
        Ok(rest[..len].to_string())
    }

    // -- References (XML 1.0 §4.1, §4.4) --

    fn count_expansion(&mut self) -> Result<(), ParseError> {
        if self.entity_expansions >= self.limits.max_entity_expansions {
            return Err(self.fatal(format!(
                "entity expansion limit exceeded ({})",
                self.limits.max_entity_expansions
            )));
        }
        self.entity_expansions += 1;
        Ok(())
    }

    /// Parses `&#NN;` or `&#xHH;`.
    pub fn parse_char_reference(&mut self) -> Result<char, ParseError> {
        self.expect_str(b"&#")?;
        let radix = if self.eat(b'x') { 16 } else { 10 };
        let digits = self.take_while(|b| b.is_ascii_hexdigit());
        self.expect_byte(b';')?;
        char_from_code(digits, radix).ok_or_else(|| {
            let x = if radix == 16 { "x" } else { "" };
            self.fatal(format!(
                "&#{x}{digits}; does not refer to a valid XML character"
            ))
        })
    }

    /// Parses any reference at the cursor. Declared entities come back
    /// fully expanded.
    pub fn parse_reference(&mut self) -> Result<Reference, ParseError> {
        if self.looking_at(b"&#") {
            return self.parse_char_reference().map(Reference::Char);
        }
        self.expect_byte(b'&')?;
        let name = self.parse_name()?;
        self.expect_byte(b';')?;
        if let Some(ch) = builtin_entity(&name) {
            return Ok(Reference::Char(ch));
        }
        let value = self.expand_entity(&name, 0)?;
        Ok(Reference::Entity { name, value })
    }

    fn expand_entity(&mut self, name: &str, level: u32) -> Result<String, ParseError> {
        self.count_expansion()?;
        if level > self.limits.max_depth {
            return Err(self.fatal(format!("entity '{name}' references itself")));
        }
        match self.entities.get(name).cloned() {
            Some(EntityDecl::Internal(text)) => self.expand_entity_text(&text, level + 1),
            Some(EntityDecl::External) => Err(self.fatal(format!(
                "reference to external entity '{name}' is not supported"
            ))),
            None => Err(self.fatal(format!("unknown entity reference: &{name};"))),
        }
    }

    fn expand_entity_text(&mut self, text: &str, level: u32) -> Result<String, ParseError> {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;
        while let Some((head, tail)) = rest.split_once('&') {
            result.push_str(head);
            let (reference, tail) = tail
                .split_once(';')
                .ok_or_else(|| self.fatal("unterminated reference in entity value"))?;
            if let Some(code) = reference.strip_prefix('#') {
                let ch = match code.strip_prefix('x') {
                    Some(hex) => char_from_code(hex, 16),
                    None => char_from_code(code, 10),
                }
                .ok_or_else(|| {
                    self.fatal(format!("invalid character reference in entity: &{reference};"))
                })?;
                result.push(ch);
            } else if let Some(ch) = builtin_entity(reference) {
                result.push(ch);
            } else {
                let expanded = self.expand_entity(reference, level)?;
                result.push_str(&expanded);
            }
            rest = tail;
        }
        result.push_str(rest);
        Ok(result)
    }

    // -- Quoted values --

    /// Parses a quoted attribute value, resolving references and turning
    /// tabs and line feeds into spaces (XML 1.0 §3.3.3).
    pub fn parse_attribute_value(&mut self) -> Result<String, ParseError> {
        let quote = self.next_byte()?;
        if !matches!(quote, b'"' | b'\'') {
            return Err(self.fatal("attribute value must be quoted"));
        }
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.fatal("unexpected end of input in attribute value")),
                Some(b) if b == quote => {
                    self.advance(1);
                    return Ok(value);
                }
                Some(b'<') => return Err(self.fatal("'<' not allowed in attribute values")),
                Some(b'&') => match self.parse_reference()? {
                    Reference::Char(ch) => value.push(ch),
                    Reference::Entity { value: text, .. } if text.contains('<') => {
                        return Err(self
                            .fatal("'<' not allowed in attribute values (from entity expansion)"));
                    }
                    Reference::Entity { value: text, .. } => value.push_str(&text),
                },
                Some(_) => match self.next_char()? {
                    '\n' | '\t' => value.push(' '),
                    ch => value.push(ch),
                },
            }
        }
    }

    /// Parses a quoted value taken literally, as in the XML declaration and
    /// DOCTYPE identifiers.
    pub fn parse_quoted_value(&mut self) -> Result<String, ParseError> {
        let quote = char::from(self.next_byte()?);
        if !matches!(quote, '"' | '\'') {
            return Err(self.fatal("expected quoted value"));
        }
        let (value, _) = self
            .rest()
            .split_once(quote)
            .ok_or_else(|| self.fatal(format!("missing closing {quote}")))?;
        self.advance(value.len() + 1);
        Ok(value.to_string())
    }

    pub fn fatal(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            location: self.location(),
        }
    }
}

/// Decodes the digits of a character reference. Code points that are not
/// XML `Char`s decode to `None`.
fn char_from_code(digits: &str, radix: u32) -> Option<char> {
    if !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u32::from_str_radix(digits, radix)
        .ok()
        .and_then(char::from_u32)
        .filter(|&c| is_xml_char(c))
}

/// Maps the five predefined entity names to their characters.
fn builtin_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        _ => None,
    }
}

// -------------------------------------------------------------------------
// Namespace resolver
// -------------------------------------------------------------------------

/// Manages namespace scope while parsing.
///
/// Maintains a stack of binding frames that mirrors the element nesting.
/// Resolution walks the stack from top to bottom.
pub(crate) struct NamespaceResolver {
    /// `(prefix, uri)` frames; a `None` prefix is the default namespace.
    stack: Vec<Vec<(Option<String>, String)>>,
}

impl NamespaceResolver {
    /// Creates a new resolver with the `xml` prefix pre-bound.
    pub fn new() -> Self {
        Self {
            stack: vec![vec![(Some("xml".to_string()), XML_NAMESPACE.to_string())]],
        }
    }

    pub fn push_scope(&mut self) {
        self.stack.push(Vec::new());
    }

    pub fn pop_scope(&mut self) {
        self.stack.pop();
    }

    /// Binds a namespace prefix to a URI in the current scope.
    pub fn bind(&mut self, prefix: Option<String>, uri: String) {
        if let Some(frame) = self.stack.last_mut() {
            frame.push((prefix, uri));
        }
    }

    /// Resolves a namespace prefix to its URI. `xmlns=""` undeclares the
    /// default namespace.
    pub fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        self.stack
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(p, _)| p.as_deref() == prefix)
            .and_then(|(_, uri)| (!uri.is_empty()).then_some(uri.as_str()))
    }
}

// -------------------------------------------------------------------------
// Markup helpers
// -------------------------------------------------------------------------

/// Parses a comment (`<!-- ... -->`), returning the content text.
///
/// See XML 1.0 §2.5 production `[15]`.
pub(crate) fn parse_comment_content(input: &mut ParserInput<'_>) -> Result<String, ParseError> {
    input.expect_str(b"<!--")?;
    let mut content = String::new();
    loop {
        if input.at_end() {
            return Err(input.fatal("unexpected end of input in comment"));
        }
        if input.looking_at(b"-->") {
            input.advance(3);
            return Ok(content);
        }
        if input.looking_at(b"--") {
            return Err(input.fatal("'--' not allowed inside comments"));
        }
        content.push(input.next_char()?);
    }
}

/// Parses a CDATA section (`<![CDATA[ ... ]]>`), returning the content text.
///
/// See XML 1.0 §2.7 production `[18]`.
pub(crate) fn parse_cdata_content(input: &mut ParserInput<'_>) -> Result<String, ParseError> {
    input.expect_str(b"<![CDATA[")?;
    let mut content = String::new();
    loop {
        if input.at_end() {
            return Err(input.fatal("unexpected end of input in CDATA section"));
        }
        if input.looking_at(b"]]>") {
            input.advance(3);
            return Ok(content);
        }
        content.push(input.next_char()?);
    }
}

/// Parses a processing instruction (`<?target data?>`), returning
/// `(target, optional_data)`.
///
/// See XML 1.0 §2.6 production `[16]`.
pub(crate) fn parse_pi_content(
    input: &mut ParserInput<'_>,
) -> Result<(String, Option<String>), ParseError> {
    input.expect_str(b"<?")?;
    let target = input.parse_name()?;

    if target.eq_ignore_ascii_case("xml") {
        return Err(input.fatal("PI target 'xml' is reserved"));
    }
    if target.contains(':') {
        return Err(input.fatal("PI target must not contain a colon"));
    }

    if !input.skip_whitespace() {
        input.expect_str(b"?>")?;
        return Ok((target, None));
    }

    let mut data = String::new();
    loop {
        if input.at_end() {
            return Err(input.fatal("unexpected end of input in processing instruction"));
        }
        if input.looking_at(b"?>") {
            input.advance(2);
            break;
        }
        data.push(input.next_char()?);
    }
    Ok((target, (!data.is_empty()).then_some(data)))
}

/// Parsed XML declaration data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<bool>,
}

/// Parses an XML declaration (`<?xml version="1.0" ...?>`).
///
/// See XML 1.0 §2.8 production `[23]`.
pub(crate) fn parse_xml_decl(input: &mut ParserInput<'_>) -> Result<XmlDeclaration, ParseError> {
    input.expect_str(b"<?xml")?;
    input.skip_whitespace_required()?;

    input.expect_str(b"version")?;
    let version = parse_pseudo_attribute_value(input)?;
    if !is_valid_version_num(&version) {
        return Err(input.fatal(format!("invalid version number: '{version}'")));
    }

    let had_ws = input.skip_whitespace();
    let encoding = if input.looking_at(b"encoding") {
        if !had_ws {
            return Err(input.fatal("whitespace required before encoding"));
        }
        input.expect_str(b"encoding")?;
        let enc = parse_pseudo_attribute_value(input)?;
        if !is_valid_encoding_name(&enc) {
            return Err(input.fatal(format!("invalid encoding name: '{enc}'")));
        }
        Some(enc)
    } else {
        None
    };

    let had_ws = input.skip_whitespace() || (encoding.is_none() && had_ws);
    let standalone = if input.looking_at(b"standalone") {
        if !had_ws {
            return Err(input.fatal("whitespace required before standalone"));
        }
        input.expect_str(b"standalone")?;
        match parse_pseudo_attribute_value(input)?.as_str() {
            "yes" => Some(true),
            "no" => Some(false),
            _ => return Err(input.fatal("standalone must be 'yes' or 'no'")),
        }
    } else {
        None
    };

    input.skip_whitespace();
    input.expect_str(b"?>")?;

    Ok(XmlDeclaration {
        version,
        encoding,
        standalone,
    })
}

fn parse_pseudo_attribute_value(input: &mut ParserInput<'_>) -> Result<String, ParseError> {
    input.skip_whitespace();
    input.expect_byte(b'=')?;
    input.skip_whitespace();
    input.parse_quoted_value()
}

/// `VersionNum ::= '1.' [0-9]+`
fn is_valid_version_num(s: &str) -> bool {
    s.strip_prefix("1.")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// `EncName ::= [A-Za-z] ([A-Za-z0-9._] | '-')*`
fn is_valid_encoding_name(s: &str) -> bool {
    let mut bytes = s.bytes();
    bytes.next().is_some_and(|b| b.is_ascii_alphabetic())
        && bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}
