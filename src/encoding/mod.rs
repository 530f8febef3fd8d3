//! Encoding detection and transcoding.
//!
//! Implements BOM sniffing and XML declaration encoding detection per
//! XML 1.0 Section 4.3.3 and Appendix F, bridging to `encoding_rs` for
//! character encoding conversion. The serializer also asks this module
//! whether a character survives the document's declared output encoding.
//!
//! # Encoding Detection Strategy
//!
//! 1. Check for a Byte Order Mark (BOM) at the start of the input.
//! 2. If a BOM is found, use the indicated encoding and skip the BOM bytes.
//! 3. If no BOM is found, default to UTF-8 (per the XML specification).
//! 4. After initial decoding, inspect the XML declaration's `encoding=`
//!    attribute to confirm or override the detected encoding.

use encoding_rs::Encoding;

/// An error that occurs during encoding detection or transcoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("encoding error: {message}")]
pub struct EncodingError {
    /// A human-readable description of the encoding error.
    pub message: String,
}

impl EncodingError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Detects the encoding of an XML byte stream by inspecting the Byte Order Mark.
///
/// Returns a tuple of (encoding name, number of BOM bytes to skip).
///
/// # Examples
///
/// ```
/// use domcompare::encoding::detect_encoding;
///
/// assert_eq!(detect_encoding(b"\xEF\xBB\xBF<a/>"), ("UTF-8", 3));
/// assert_eq!(detect_encoding(b"<a/>"), ("UTF-8", 0));
/// ```
#[must_use]
pub fn detect_encoding(bytes: &[u8]) -> (&'static str, usize) {
    match bytes {
        [0xEF, 0xBB, 0xBF, ..] => ("UTF-8", 3),
        [0xFE, 0xFF, ..] => ("UTF-16BE", 2),
        [0xFF, 0xFE, ..] => ("UTF-16LE", 2),
        _ => ("UTF-8", 0),
    }
}

/// Transcodes a byte slice from the named encoding into a UTF-8 `String`.
///
/// # Errors
///
/// Returns `EncodingError` if the encoding name is not recognized or if
/// the input contains malformed byte sequences.
pub fn transcode(bytes: &[u8], encoding_name: &str) -> Result<String, EncodingError> {
    let encoding = Encoding::for_label(encoding_name.as_bytes())
        .ok_or_else(|| EncodingError::new(format!("unsupported encoding: {encoding_name}")))?;

    let (result, _used_encoding, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(EncodingError::new(format!(
            "malformed byte sequence for encoding {encoding_name}"
        )));
    }
    Ok(result.into_owned())
}

/// Decodes raw XML bytes into a UTF-8 string, automatically detecting the
/// encoding from the BOM and the XML declaration.
///
/// # Errors
///
/// Returns `EncodingError` if the bytes contain invalid sequences for the
/// detected encoding or if the declared encoding is unsupported.
///
/// # Examples
///
/// ```
/// use domcompare::encoding::decode_to_utf8;
///
/// let text = decode_to_utf8(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><a>\xE9</a>").unwrap();
/// assert!(text.ends_with("<a>\u{e9}</a>"));
/// ```
pub fn decode_to_utf8(bytes: &[u8]) -> Result<String, EncodingError> {
    let (bom_encoding, bom_skip) = detect_encoding(bytes);
    let content = &bytes[bom_skip..];

    if bom_encoding == "UTF-8" {
        if let Ok(s) = std::str::from_utf8(content) {
            if let Some(declared) = declared_encoding(content) {
                if !is_utf8_label(&declared) {
                    return transcode(content, &declared);
                }
            }
            return Ok(s.to_string());
        }
        // The declaration is ASCII-compatible, so it can be read from the
        // raw bytes even when the rest is not UTF-8.
        if let Some(declared) = declared_encoding(content) {
            return transcode(content, &declared);
        }
        return Err(EncodingError::new("input is not valid UTF-8"));
    }

    let text = transcode(content, bom_encoding)?;
    if let Some(declared) = declared_encoding(text.as_bytes()) {
        let declared = declared.to_ascii_uppercase();
        let same = declared == bom_encoding
            || (declared == "UTF-16" && bom_encoding.starts_with("UTF-16"));
        if !same {
            return transcode(content, &declared);
        }
    }
    Ok(text)
}

/// Labels of true ISO-8859-1. `encoding_rs` follows the WHATWG mapping of
/// these to windows-1252, which can also encode 0x80..=0x9F as `€`, `‰` and
/// the like; a Latin-1 document cannot.
const LATIN1_LABELS: &[&str] = &[
    "iso-8859-1",
    "iso8859-1",
    "iso88591",
    "iso_8859-1",
    "iso_8859-1:1987",
    "latin1",
    "l1",
    "cp819",
    "ibm819",
    "iso-ir-100",
    "csisolatin1",
];

/// Labels of 7-bit ASCII, likewise mapped to windows-1252 by `encoding_rs`.
const ASCII_LABELS: &[&str] = &["us-ascii", "ascii", "ansi_x3.4-1968", "iso646-us", "csascii"];

fn label_in(label: &str, labels: &[&str]) -> bool {
    labels.iter().any(|l| l.eq_ignore_ascii_case(label))
}

/// Returns `true` if `ch` can be written literally in a document whose
/// declared encoding is `label`.
///
/// Unknown labels and the Unicode encodings accept every character; for
/// legacy encodings the character is test-encoded with `encoding_rs`.
///
/// ```
/// use domcompare::encoding::is_representable;
///
/// assert!(is_representable("ISO-8859-1", '\u{e9}'));
/// assert!(!is_representable("ISO-8859-1", '\u{20ac}'));
/// assert!(is_representable("windows-1252", '\u{20ac}'));
/// ```
#[must_use]
pub fn is_representable(label: &str, ch: char) -> bool {
    if ch.is_ascii() {
        return true;
    }
    let label = label.trim();
    if label_in(label, LATIN1_LABELS) {
        return u32::from(ch) <= 0xFF;
    }
    if label_in(label, ASCII_LABELS) {
        return false;
    }
    let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
        return true;
    };
    if encoding == encoding_rs::UTF_8
        || encoding == encoding_rs::UTF_16BE
        || encoding == encoding_rs::UTF_16LE
    {
        return true;
    }
    let mut buf = [0u8; 4];
    let (_, _, had_errors) = encoding.encode(ch.encode_utf8(&mut buf));
    !had_errors
}

/// Extracts the `encoding` pseudo-attribute of a leading XML declaration,
/// reading the bytes as ASCII.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let scan = &bytes[..bytes.len().min(200)];
    if !scan.starts_with(b"<?xml") {
        return None;
    }
    let decl_end = scan.windows(2).position(|w| w == b"?>")?;
    let decl = &scan[..decl_end];

    let needle = b"encoding";
    let pos = decl.windows(needle.len()).position(|w| w == needle)?;
    let rest = skip_ascii_whitespace(&decl[pos + needle.len()..]);
    let rest = skip_ascii_whitespace(rest.strip_prefix(b"=")?);

    let quote = *rest.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let value = &rest[1..];
    let end = value.iter().position(|&b| b == quote)?;
    let name = &value[..end];
    name.iter()
        .all(u8::is_ascii)
        .then(|| String::from_utf8_lossy(name).into_owned())
}

fn skip_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let skip = bytes
        .iter()
        .take_while(|&&b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        .count();
    &bytes[skip..]
}

fn is_utf8_label(label: &str) -> bool {
    label.eq_ignore_ascii_case("UTF-8") || label.eq_ignore_ascii_case("UTF8")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_utf16le_bom() {
        let bytes = b"\xFF\xFE<\x00r\x00";
        assert_eq!(detect_encoding(bytes), ("UTF-16LE", 2));
    }

    #[test]
    fn test_detect_utf16be_bom() {
        let bytes = b"\xFE\xFF\x00<\x00r";
        assert_eq!(detect_encoding(bytes), ("UTF-16BE", 2));
    }

    #[test]
    fn test_detect_empty_input() {
        assert_eq!(detect_encoding(b""), ("UTF-8", 0));
    }

    #[test]
    fn test_transcode_unknown_label() {
        let err = transcode(b"abc", "x-no-such-charset").unwrap_err();
        assert!(err.message.contains("unsupported encoding"));
    }

    #[test]
    fn test_decode_plain_utf8() {
        let text = decode_to_utf8("<r>caf\u{e9}</r>".as_bytes()).unwrap();
        assert_eq!(text, "<r>caf\u{e9}</r>");
    }

    #[test]
    fn test_decode_declared_latin1() {
        let bytes = b"<?xml version='1.0' encoding='ISO-8859-1'?><r>\xFC</r>";
        let text = decode_to_utf8(bytes).unwrap();
        assert!(text.ends_with("<r>\u{fc}</r>"));
    }

    #[test]
    fn test_decode_utf16le_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<r/>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_to_utf8(&bytes).unwrap(), "<r/>");
    }

    #[test]
    fn test_decode_invalid_utf8_without_declaration() {
        assert!(decode_to_utf8(b"<r>\xFF</r>").is_err());
    }

    #[test]
    fn test_declared_encoding_single_quotes() {
        assert_eq!(
            declared_encoding(b"<?xml version='1.0' encoding='windows-1252'?>"),
            Some("windows-1252".to_string())
        );
        assert_eq!(declared_encoding(b"<r/>"), None);
    }

    #[test]
    fn test_is_representable() {
        assert!(is_representable("ISO-8859-1", '\u{e9}'));
        assert!(!is_representable("ISO-8859-1", '\u{4e2d}'));
        assert!(is_representable("UTF-8", '\u{4e2d}'));
        assert!(is_representable("x-unknown", '\u{4e2d}'));
        assert!(is_representable("US-ASCII", 'a'));
    }

    #[test]
    fn test_latin1_is_not_windows_1252() {
        for label in ["ISO-8859-1", "latin1", " iso_8859-1 "] {
            assert!(is_representable(label, '\u{ff}'), "{label}");
            assert!(!is_representable(label, '\u{20ac}'), "{label}");
            assert!(!is_representable(label, '\u{2030}'), "{label}");
        }
        assert!(is_representable("windows-1252", '\u{20ac}'));
        assert!(!is_representable("US-ASCII", '\u{e9}'));
        assert!(!is_representable("ascii", '\u{20ac}'));
    }
}
