//! Percent-encoding helpers for built URLs.
//!
//! Matching operates on already-decoded path text, so only the encoding
//! direction lives here: path segments emitted by converters and the
//! query string appended for unconsumed build values.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::params::Value;

/// Returns `true` for bytes that never need escaping.
const fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'.' | b'-' | b'~')
}

fn push_escaped(out: &mut String, byte: u8) {
    // Infallible: writing to a String cannot fail.
    let _ = write!(out, "%{byte:02X}");
}

/// Percent-encodes a path segment, leaving `/` literal.
pub(crate) fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        if is_unreserved(byte) || byte == b'/' {
            out.push(byte as char);
        } else {
            push_escaped(&mut out, byte);
        }
    }
    out
}

/// Percent-encodes a query-string component, mapping space to `+`.
pub(crate) fn quote_plus(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        if is_unreserved(byte) {
            out.push(byte as char);
        } else if byte == b' ' {
            out.push('+');
        } else {
            push_escaped(&mut out, byte);
        }
    }
    out
}

/// Serializes unconsumed build values as a `key=value&...` query string.
///
/// Keys are emitted in sorted order so built URLs are deterministic.
pub(crate) fn url_encode(pairs: &BTreeMap<&str, &Value>) -> String {
    let mut out = String::new();
    for (key, value) in pairs {
        if !out.is_empty() {
            out.push('&');
        }
        out.push_str(&quote(key));
        out.push('=');
        out.push_str(&quote_plus(&value.to_string()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_keeps_slashes() {
        assert_eq!(quote("a/b c"), "a/b%20c");
        assert_eq!(quote("héllo"), "h%C3%A9llo");
        assert_eq!(quote("safe-chars_~."), "safe-chars_~.");
    }

    #[test]
    fn test_quote_plus_escapes_slashes_and_spaces() {
        assert_eq!(quote_plus("a/b c"), "a%2Fb+c");
    }

    #[test]
    fn test_url_encode_sorted_pairs() {
        let name = Value::from("John Doe");
        let age = Value::from(30);
        let pi = Value::from(3.14);
        let pairs: BTreeMap<&str, &Value> =
            [("name", &name), ("age", &age), ("pi", &pi)].into_iter().collect();
        assert_eq!(url_encode(&pairs), "age=30&name=John+Doe&pi=3.14");
    }
}
