//! Value escaping for distinguished names and search filters.

use std::fmt::Write;

/// Characters that must be backslash-escaped anywhere in a DN value.
const DN_SPECIALS: &[char] = &['\\', ',', '+', '"', '<', '>', ';', '='];

/// Escape a raw attribute value for use inside a distinguished name.
///
/// Escapes `\ , + " < > ; =` anywhere, a leading space or `#`, a trailing
/// space, and NUL (as `\00`).
///
/// ```
/// use ldaptx_codec::escape_value;
///
/// assert_eq!(escape_value("Widget, Inc."), "Widget\\, Inc.");
/// assert_eq!(escape_value("#1"), "\\#1");
/// assert_eq!(escape_value(" padded "), "\\ padded\\ ");
/// ```
#[must_use]
pub fn escape_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let last = raw.chars().count().saturating_sub(1);
    for (i, ch) in raw.chars().enumerate() {
        if ch == '\0' {
            out.push_str("\\00");
        } else if DN_SPECIALS.contains(&ch)
            || (i == 0 && (ch == ' ' || ch == '#'))
            || (i == last && ch == ' ')
        {
            out.push('\\');
            out.push(ch);
        } else {
            out.push(ch);
        }
    }
    out
}

/// Escape an assertion value for use inside a search filter (RFC 4515).
///
/// `* ( ) \` and NUL become `\2a \28 \29 \5c \00`.
#[must_use]
pub fn escape_filter_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '*' => out.push_str("\\2a"),
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '\\' => out.push_str("\\5c"),
            '\0' => out.push_str("\\00"),
            other => out.push(other),
        }
    }
    out
}

/// Escape an arbitrary byte string for use inside a search filter.
///
/// Valid UTF-8 goes through [`escape_filter_value`]; anything else is
/// hex-escaped byte by byte.
#[must_use]
pub fn escape_filter_bytes(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(text) => escape_filter_value(text),
        Err(_) => {
            let mut out = String::with_capacity(raw.len() * 3);
            for byte in raw {
                let _ = write!(out, "\\{byte:02x}");
            }
            out
        }
    }
}

/// Encode bytes as lowercase hex.
pub(crate) fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Value of a single ASCII hex digit.
pub(crate) fn hex_val(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_specials_anywhere() {
        assert_eq!(escape_value("a+b=c"), "a\\+b\\=c");
        assert_eq!(escape_value(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_value("x<y>z;w"), "x\\<y\\>z\\;w");
        assert_eq!(escape_value("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn escapes_leading_hash_only() {
        assert_eq!(escape_value("#tag"), "\\#tag");
        assert_eq!(escape_value("tag#"), "tag#");
    }

    #[test]
    fn escapes_edge_spaces() {
        assert_eq!(escape_value(" "), "\\ ");
        assert_eq!(escape_value("  "), "\\ \\ ");
        assert_eq!(escape_value("a b"), "a b");
    }

    #[test]
    fn escapes_nul() {
        assert_eq!(escape_value("a\0b"), "a\\00b");
    }

    #[test]
    fn non_ascii_passes_through() {
        assert_eq!(escape_value("Müller"), "Müller");
    }

    #[test]
    fn filter_escaping() {
        assert_eq!(escape_filter_value("a*b(c)d\\"), "a\\2ab\\28c\\29d\\5c");
        assert_eq!(escape_filter_value("plain"), "plain");
    }

    #[test]
    fn filter_bytes_hex_escape_invalid_utf8() {
        assert_eq!(escape_filter_bytes(&[0xff, 0x01]), "\\ff\\01");
        assert_eq!(escape_filter_bytes(b"ok*"), "ok\\2a");
    }

    #[test]
    fn hex_helpers() {
        assert_eq!(encode_hex(&[0x04, 0xab]), "04ab");
        assert_eq!(hex_val(b'F'), Some(15));
        assert_eq!(hex_val(b'g'), None);
    }
}
