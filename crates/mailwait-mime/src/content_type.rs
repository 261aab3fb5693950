//! `Content-Type` and `Content-Disposition` values and their parameters.

use std::collections::HashMap;

use crate::encoding::{decode_charset, decode_header_value, percent_decode};
use crate::error::{Error, Result};

/// Header parameters (`; key=value`), with RFC 2231 extensions resolved on
/// lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    raw: HashMap<String, String>,
}

impl Parameters {
    /// Parses the `; key=value` list that follows a header's main value.
    fn parse<'a>(items: impl Iterator<Item = &'a str>) -> Self {
        let mut raw = HashMap::new();
        for item in items {
            if let Some((key, value)) = item.split_once('=') {
                let key = key.trim().to_ascii_lowercase();
                if !key.is_empty() {
                    raw.insert(key, unquote(value.trim()));
                }
            }
        }
        Self { raw }
    }

    /// Returns the raw, undecoded value of a parameter.
    #[must_use]
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.raw.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Returns a parameter value with all encodings resolved.
    ///
    /// Lookup order: the RFC 2231 extended form `name*`, RFC 2231
    /// continuations `name*0`, `name*1*`, ..., then the plain `name`, whose
    /// RFC 2047 encoded-words (used by many mailers for filenames) are
    /// decoded.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();

        if let Some(extended) = self.raw.get(&format!("{name}*")) {
            return Some(decode_extended(extended));
        }

        if let Some(joined) = self.continuation(&name) {
            return Some(joined);
        }

        self.raw.get(&name).map(|v| {
            if v.contains("=?") {
                decode_header_value(v)
            } else {
                v.clone()
            }
        })
    }

    fn continuation(&self, name: &str) -> Option<String> {
        let mut bytes = Vec::new();
        let mut charset = None;
        let mut found = false;

        for index in 0.. {
            if let Some(segment) = self.raw.get(&format!("{name}*{index}*")) {
                let segment = if index == 0 {
                    let (cs, rest) = split_extended(segment);
                    charset = cs;
                    rest
                } else {
                    segment.as_str()
                };
                bytes.extend(percent_decode(segment));
            } else if let Some(segment) = self.raw.get(&format!("{name}*{index}")) {
                bytes.extend_from_slice(segment.as_bytes());
            } else {
                break;
            }
            found = true;
        }

        found.then(|| decode_charset(&bytes, charset))
    }
}

/// Splits `charset'language'value` into its charset and value.
fn split_extended(value: &str) -> (Option<&str>, &str) {
    let mut fields = value.splitn(3, '\'');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(charset), Some(_language), Some(rest)) => {
            (Some(charset).filter(|c| !c.is_empty()), rest)
        }
        _ => (None, value),
    }
}

fn decode_extended(value: &str) -> String {
    let (charset, rest) = split_extended(value);
    decode_charset(&percent_decode(rest), charset)
}

/// Strips surrounding quotes and backslash escapes.
fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"') else {
        return value.to_string();
    };
    let inner = inner.strip_suffix('"').unwrap_or(inner);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Splits a header value on `;` outside quoted strings.
fn split_params(value: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                items.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&value[start..]);
    items
}

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "mixed").
    pub sub_type: String,
    /// Parameters (e.g., charset, boundary, name).
    pub parameters: Parameters,
}

impl ContentType {
    /// Creates a content type without parameters.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: Parameters::default(),
        }
    }

    /// The RFC 2045 default, `text/plain`.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    /// The bare `type/subtype`, lowercased.
    #[must_use]
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type).to_ascii_lowercase()
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.raw("charset")
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.raw("boundary").filter(|b| !b.is_empty())
    }

    /// Returns the decoded `name` parameter, used as a fallback filename.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.parameters.get("name")
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("multipart")
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("text")
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="value 2"`
    ///
    /// # Errors
    ///
    /// Returns an error if the `type/subtype` part is missing or empty.
    pub fn parse(s: &str) -> Result<Self> {
        let items = split_params(s);
        let mut items = items.into_iter();

        let type_str = items.next().unwrap_or_default().trim();
        let (main_type, sub_type) = type_str
            .split_once('/')
            .map(|(m, s)| (m.trim().to_ascii_lowercase(), s.trim().to_ascii_lowercase()))
            .filter(|(m, s)| !m.is_empty() && !s.is_empty())
            .ok_or_else(|| Error::InvalidContentType(format!("expected type/subtype, got {type_str:?}")))?;

        Ok(Self {
            main_type,
            sub_type,
            parameters: Parameters::parse(items),
        })
    }
}

/// Parsed `Content-Disposition` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type, lowercased (`attachment`, `inline`, ...).
    pub kind: String,
    /// Parameters (e.g., filename).
    pub parameters: Parameters,
}

impl ContentDisposition {
    /// Parses a disposition header value.
    ///
    /// # Errors
    ///
    /// Returns an error if the disposition type is empty.
    pub fn parse(s: &str) -> Result<Self> {
        let items = split_params(s);
        let mut items = items.into_iter();

        let kind = items.next().unwrap_or_default().trim().to_ascii_lowercase();
        if kind.is_empty() {
            return Err(Error::InvalidContentType(
                "empty content disposition".to_string(),
            ));
        }

        Ok(Self {
            kind,
            parameters: Parameters::parse(items),
        })
    }

    /// Returns `true` for `attachment`.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.kind == "attachment"
    }

    /// Returns the decoded `filename` parameter.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.parameters.get("filename")
    }
}
