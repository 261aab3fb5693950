//! Transfer, header and charset decoding.
//!
//! Supports Base64, Quoted-Printable, RFC 2047 encoded-words, RFC 2231
//! percent-encoding and a small set of charsets.

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use tracing::debug;

use crate::error::Result;

/// Base64 engine that accepts missing padding and non-zero trailing bits,
/// both common in hand-built test mail.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data, ignoring embedded whitespace and line breaks.
///
/// # Errors
///
/// Returns an error if the input contains characters outside the Base64
/// alphabet.
pub fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    let cleaned: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    LENIENT.decode(cleaned).map_err(Into::into)
}

/// Decodes Quoted-Printable data (RFC 2045).
///
/// Malformed escapes are kept literally, the way most mail readers do.
#[must_use]
pub fn decode_quoted_printable(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        if byte != b'=' {
            out.push(byte);
            i += 1;
            continue;
        }

        // Soft line break, possibly with trailing whitespace before the CRLF.
        let mut j = i + 1;
        while j < data.len() && matches!(data[j], b' ' | b'\t') {
            j += 1;
        }
        if data.get(j) == Some(&b'\n') {
            i = j + 1;
            continue;
        }
        if data.get(j) == Some(&b'\r') && data.get(j + 1) == Some(&b'\n') {
            i = j + 2;
            continue;
        }

        match (data.get(i + 1).and_then(hex_value), data.get(i + 2).and_then(hex_value)) {
            (Some(hi), Some(lo)) => {
                out.push((hi << 4) | lo);
                i += 3;
            }
            _ => {
                out.push(b'=');
                i += 1;
            }
        }
    }

    out
}

/// Decodes RFC 2047 "Q" encoding: Quoted-Printable with `_` for space.
#[must_use]
pub fn decode_q(text: &str) -> Vec<u8> {
    let bytes: Vec<u8> = text
        .bytes()
        .map(|b| if b == b'_' { b' ' } else { b })
        .collect();
    decode_quoted_printable(&bytes)
}

/// Decodes RFC 2231 / RFC 3986 `%XX` escapes; malformed escapes are kept.
#[must_use]
pub fn percent_decode(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%'
            && let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).and_then(hex_value),
                bytes.get(i + 2).and_then(hex_value),
            )
        {
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    out
}

const fn hex_value(b: &u8) -> Option<u8> {
    match *b {
        b'0'..=b'9' => Some(*b - b'0'),
        b'a'..=b'f' => Some(*b - b'a' + 10),
        b'A'..=b'F' => Some(*b - b'A' + 10),
        _ => None,
    }
}

/// Decodes bytes in the declared charset.
///
/// Returns `None` when the charset is unknown or the bytes are not valid in
/// it. Only the charsets test mail realistically uses are known: UTF-8,
/// US-ASCII and ISO-8859-1.
#[must_use]
pub fn try_decode_charset(bytes: &[u8], charset: &str) -> Option<String> {
    // RFC 2231 allows a language suffix: utf-8*en
    let charset = charset.split('*').next().unwrap_or(charset).trim();

    match charset.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => std::str::from_utf8(bytes).ok().map(str::to_string),
        "us-ascii" | "ascii" => bytes
            .is_ascii()
            .then(|| bytes.iter().copied().map(char::from).collect()),
        "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" | "l1" => {
            Some(bytes.iter().copied().map(char::from).collect())
        }
        _ => None,
    }
}

/// Decodes bytes in the declared charset, falling back to lossy UTF-8.
///
/// Never fails: undecodable bytes degrade to U+FFFD.
#[must_use]
pub fn decode_charset(bytes: &[u8], charset: Option<&str>) -> String {
    let declared = charset.unwrap_or("utf-8");
    try_decode_charset(bytes, declared).unwrap_or_else(|| {
        debug!(charset = declared, "charset decode failed, using lossy UTF-8");
        String::from_utf8_lossy(bytes).into_owned()
    })
}

/// Decodes a single RFC 2047 encoded-word `=?charset?encoding?text?=`.
///
/// Returns `None` if `token` is not exactly one encoded-word or its payload
/// cannot be decoded, in which case callers keep the token as-is.
#[must_use]
pub fn decode_encoded_word(token: &str) -> Option<String> {
    let inner = token.strip_prefix("=?")?.strip_suffix("?=")?;
    let mut fields = inner.splitn(3, '?');
    let charset = fields.next().filter(|c| !c.is_empty())?;
    let encoding = fields.next()?;
    let text = fields.next()?;
    if text.contains('?') {
        return None;
    }

    let bytes = if encoding.eq_ignore_ascii_case("B") {
        decode_base64(text.as_bytes()).ok()?
    } else if encoding.eq_ignore_ascii_case("Q") {
        decode_q(text)
    } else {
        return None;
    };

    Some(decode_charset(&bytes, Some(charset)))
}

/// Decodes a header value that may contain encoded-words.
///
/// The value is split on whitespace; every token that is an encoded-word
/// is decoded, other tokens pass through unchanged, and the results are
/// joined with single spaces in their original order.
#[must_use]
pub fn decode_header_value(value: &str) -> String {
    value
        .split_ascii_whitespace()
        .map(|token| decode_encoded_word(token).unwrap_or_else(|| token.to_string()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Encodes text as a single Base64 encoded-word.
#[must_use]
pub fn encode_encoded_word(text: &str, charset: &str) -> String {
    format!("=?{charset}?B?{}?=", encode_base64(text.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base64_lenient() {
        assert_eq!(decode_base64(b"SGVsbG8sIFdvcmxkIQ==").unwrap(), b"Hello, World!");
        assert_eq!(decode_base64(b"SGVsbG8s\r\nIFdvcmxkIQ").unwrap(), b"Hello, World!");
        assert!(decode_base64(b"not*base64").is_err());
    }

    #[test]
    fn test_quoted_printable() {
        assert_eq!(decode_quoted_printable(b"H=C3=A9llo"), "Héllo".as_bytes());
        assert_eq!(decode_quoted_printable(b"soft=\r\nbreak"), b"softbreak");
        assert_eq!(decode_quoted_printable(b"soft= \nbreak"), b"softbreak");
        assert_eq!(decode_quoted_printable(b"a=zzb"), b"a=zzb");
        assert_eq!(decode_quoted_printable(b"end="), b"end=");
        assert_eq!(
            decode_quoted_printable(b"<a href=3D\"https://x.test/a\">"),
            b"<a href=\"https://x.test/a\">"
        );
    }

    #[test]
    fn test_q_underscore_is_space() {
        assert_eq!(decode_q("Hello_World=21"), b"Hello World!");
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("%E2%82%AC%20rates.pdf"), "€ rates.pdf".as_bytes());
        assert_eq!(percent_decode("100%"), b"100%");
    }

    #[test]
    fn test_charsets() {
        assert_eq!(try_decode_charset("é".as_bytes(), "UTF-8").unwrap(), "é");
        assert_eq!(try_decode_charset(&[0xE9], "iso-8859-1").unwrap(), "é");
        assert!(try_decode_charset(&[0xE9], "us-ascii").is_none());
        assert!(try_decode_charset(b"abc", "x-unknown").is_none());
        assert_eq!(try_decode_charset(b"abc", "utf-8*en").unwrap(), "abc");
    }

    #[test]
    fn test_charset_fallback_never_fails() {
        assert_eq!(decode_charset(b"abc", Some("x-unknown")), "abc");
        assert_eq!(decode_charset(&[b'a', 0xFF], Some("utf-8")), "a\u{FFFD}");
        assert_eq!(decode_charset(b"plain", None), "plain");
    }

    #[test]
    fn test_encoded_word_b_and_q() {
        assert_eq!(
            decode_encoded_word("=?UTF-8?B?V2VsY29tZSDwn5GL?=").unwrap(),
            "Welcome 👋"
        );
        assert_eq!(
            decode_encoded_word("=?iso-8859-1?q?caf=E9_cr=E8me?=").unwrap(),
            "café crème"
        );
        assert!(decode_encoded_word("plain").is_none());
        assert!(decode_encoded_word("=?UTF-8?X?abc?=").is_none());
        assert!(decode_encoded_word("prefix=?UTF-8?B?YQ==?=").is_none());
    }

    #[test]
    fn test_header_value_mixed_tokens() {
        assert_eq!(
            decode_header_value("Re: =?UTF-8?B?V2VsY29tZQ==?= aboard"),
            "Re: Welcome aboard"
        );
        assert_eq!(decode_header_value("  Plain   subject "), "Plain subject");
        assert_eq!(decode_header_value(""), "");
    }

    proptest! {
        #[test]
        fn prop_encoded_word_round_trip(text in "\\PC*") {
            let encoded = encode_encoded_word(&text, "UTF-8");
            prop_assert_eq!(decode_encoded_word(&encoded), Some(text));
        }
    }
}
