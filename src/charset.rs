//! Declared character encodings of buffered bodies.
//!
//! Labels resolve through the WHATWG Encoding Standard table, so anything a
//! browser understands (`windows-1252`, `ISO-8859-15`, `GBK`, `Shift_JIS`,
//! …) decodes. A label outside that table is a decode failure, not a guess.

use std::fmt;

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

/// Why a body could not be turned into text.
#[derive(Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The declared label names no known charset.
    Unsupported(String),
    /// The byte count cannot be valid under the charset (odd UTF-16 length).
    Truncated,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported(label) => write!(f, "unsupported charset `{label}`"),
            Self::Truncated => f.write_str("body ends inside a code unit"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Extracts the `charset` parameter from a `content-type` value.
///
/// ```text
/// text/plain; charset=UTF-8     → Some("UTF-8")
/// text/html; Charset="latin1"   → Some("latin1")
/// application/json              → None
/// ```
pub fn declared(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

/// Decodes `bytes` under the charset named by `label` (UTF-8 when `None`).
///
/// Malformed sequences under a known charset become U+FFFD. UTF-16 honours a
/// leading byte-order mark; every other charset takes the bytes as they are.
pub fn decode(bytes: &[u8], label: Option<&str>) -> Result<String, DecodeError> {
    let encoding = match label {
        None => UTF_8,
        Some(label) => Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| DecodeError::Unsupported(label.to_owned()))?,
    };

    if encoding == UTF_16LE || encoding == UTF_16BE {
        if bytes.len() % 2 != 0 {
            return Err(DecodeError::Truncated);
        }
        let (text, _, _) = encoding.decode(bytes);
        return Ok(text.into_owned());
    }

    let (text, _) = encoding.decode_without_bom_handling(bytes);
    Ok(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_charset_parameter() {
        assert_eq!(declared("text/plain; charset=UTF-8"), Some("UTF-8"));
        assert_eq!(declared("text/html;Charset=\"latin1\""), Some("latin1"));
        assert_eq!(declared("multipart/form-data; boundary=x; charset=utf-8"), Some("utf-8"));
        assert_eq!(declared("application/json"), None);
    }

    #[test]
    fn defaults_to_utf8() {
        assert_eq!(decode("héllo".as_bytes(), None).unwrap(), "héllo");
    }

    #[test]
    fn latin1_maps_every_byte() {
        assert_eq!(decode(&[0x63, 0x61, 0x66, 0xE9], Some("ISO-8859-1")).unwrap(), "café");
    }

    #[test]
    fn windows_1252_decodes() {
        assert_eq!(decode(b"caf\xE9 \x80", Some("windows-1252")).unwrap(), "café €");
    }

    #[test]
    fn iso_8859_15_decodes() {
        assert_eq!(decode(b"\xA4", Some("ISO-8859-15")).unwrap(), "€");
    }

    #[test]
    fn gbk_decodes() {
        assert_eq!(decode(b"\xC4\xE3\xBA\xC3", Some("GBK")).unwrap(), "你好");
    }

    #[test]
    fn malformed_utf8_is_replaced_not_rejected() {
        assert_eq!(decode(&[b'o', 0xFF, b'k'], Some("utf-8")).unwrap(), "o\u{FFFD}k");
    }

    #[test]
    fn utf8_bom_is_kept_as_sent() {
        assert_eq!(decode(b"\xEF\xBB\xBFok", Some("utf-8")).unwrap(), "\u{FEFF}ok");
    }

    #[test]
    fn utf16_honours_byte_order_mark() {
        assert_eq!(decode(&[0xFF, 0xFE, b'o', 0, b'k', 0], Some("utf-16")).unwrap(), "ok");
        assert_eq!(decode(&[0xFE, 0xFF, 0, b'o', 0, b'k'], Some("utf-16")).unwrap(), "ok");
        assert_eq!(decode(&[0, b'o', 0, b'k'], Some("UTF-16BE")).unwrap(), "ok");
    }

    #[test]
    fn odd_utf16_length_fails() {
        assert_eq!(decode(&[0, b'o', 0], Some("utf-16le")), Err(DecodeError::Truncated));
    }

    #[test]
    fn unknown_label_fails() {
        assert_eq!(
            decode(b"ok", Some("no-such-charset")),
            Err(DecodeError::Unsupported("no-such-charset".to_owned())),
        );
    }
}
