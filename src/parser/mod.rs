//! XML 1.0 parser.
//!
//! A hand-rolled recursive descent parser for well-formed XML 1.0 with
//! namespaces. The parser is strict: the first well-formedness error aborts
//! parsing and is returned as a [`ParseError`] carrying the source location.
//!
//! No external resources are ever loaded. Entities declared in the internal
//! DTD subset are supported; external entities are rejected.

pub(crate) mod input;
mod xml;

use crate::error::ParseError;
use crate::tree::Document;

const DEFAULT_MAX_DEPTH: u32 = 256;
const DEFAULT_MAX_NAME_LENGTH: usize = 50_000;
const DEFAULT_MAX_ENTITY_EXPANSIONS: u32 = 10_000;

/// Parse options controlling the parser's security limits.
///
/// Use the builder pattern to configure options:
///
/// ```
/// use domcompare::parser::ParseOptions;
///
/// let opts = ParseOptions::default()
///     .max_depth(128)
///     .max_entity_expansions(500);
/// assert_eq!(opts.max_depth, 128);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum element nesting depth (default: 256).
    pub max_depth: u32,
    /// Maximum length in bytes of an element or attribute name (default: 50,000).
    pub max_name_length: usize,
    /// Maximum number of entity reference expansions per document (default: 10,000).
    pub max_entity_expansions: u32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            max_entity_expansions: DEFAULT_MAX_ENTITY_EXPANSIONS,
        }
    }
}

impl ParseOptions {
    /// Sets the maximum element nesting depth.
    #[must_use]
    pub fn max_depth(mut self, max: u32) -> Self {
        self.max_depth = max;
        self
    }

    /// Sets the maximum element/attribute name length in bytes.
    #[must_use]
    pub fn max_name_length(mut self, max: usize) -> Self {
        self.max_name_length = max;
        self
    }

    /// Sets the maximum number of entity reference expansions.
    #[must_use]
    pub fn max_entity_expansions(mut self, max: u32) -> Self {
        self.max_entity_expansions = max;
        self
    }
}

/// Parses an XML string with default options.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed XML.
pub fn parse_str(input: &str) -> Result<Document, ParseError> {
    parse_str_with_options(input, &ParseOptions::default())
}

/// Parses an XML string with the given options.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed XML or exceeds one
/// of the configured limits.
pub fn parse_str_with_options(input: &str, options: &ParseOptions) -> Result<Document, ParseError> {
    log::trace!("parsing {} bytes of XML", input.len());
    xml::XmlParser::new(input, options).parse()
}

/// Parses raw XML bytes, detecting the encoding from the byte order mark
/// and the XML declaration.
///
/// # Errors
///
/// Returns `ParseError` if the bytes cannot be decoded or the decoded text
/// is not well-formed XML.
///
/// # Examples
///
/// ```
/// use domcompare::parser::parse_bytes;
///
/// let doc = parse_bytes(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><r>\xE9</r>").unwrap();
/// assert_eq!(doc.encoding.as_deref(), Some("ISO-8859-1"));
/// assert_eq!(doc.text_content(doc.root_element().unwrap()), "\u{e9}");
/// ```
pub fn parse_bytes(input: &[u8]) -> Result<Document, ParseError> {
    let text = crate::encoding::decode_to_utf8(input)
        .map_err(|e| ParseError::without_location(e.to_string()))?;
    parse_str(&text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_options() {
        let opts = ParseOptions::default();
        assert_eq!(opts.max_depth, 256);
        assert_eq!(opts.max_name_length, 50_000);
        assert_eq!(opts.max_entity_expansions, 10_000);
    }

    #[test]
    fn test_name_length_option() {
        let opts = ParseOptions::default().max_name_length(3);
        assert!(parse_str_with_options("<abc/>", &opts).is_ok());
        assert!(parse_str_with_options("<abcd/>", &opts).is_err());
    }

    #[test]
    fn test_billion_laughs_is_bounded() {
        let mut input = String::from("<!DOCTYPE r [<!ENTITY l0 \"ha\">");
        for i in 1..10 {
            let prev = format!("&l{};", i - 1);
            input.push_str(&format!("<!ENTITY l{i} \"{}\">", prev.repeat(10)));
        }
        input.push_str("]><r>&l9;</r>");
        let err = parse_str(&input).unwrap_err();
        assert!(err.message.contains("expansion limit"));
    }

    #[test]
    fn test_parse_bytes_bad_encoding_has_no_location() {
        let err = parse_bytes(b"<r>\xFF</r>").unwrap_err();
        assert_eq!(err.location.line, 0);
        assert!(err.message.contains("encoding error"));
    }
}
