//! MIME message structure: a tree of parts with decoded views.

use std::fmt;

use tracing::warn;

use crate::address::{Address, parse_address_list};
use crate::content_type::{ContentDisposition, ContentType};
use crate::encoding::{decode_base64, decode_charset, decode_quoted_printable};
use crate::error::Result;
use crate::header::Headers;

/// Nesting limit for multipart containers; deeper parts are kept as leaves.
pub const MAX_DEPTH: usize = 32;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses a `Content-Transfer-Encoding` value; unknown values are 7bit.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// One node of the MIME tree.
///
/// Multipart containers have `parts` and an empty `body`; leaves have a raw
/// (still transfer-encoded) `body` and no `parts`.
#[derive(Debug, Clone, Default)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Raw body bytes of a leaf.
    pub body: Vec<u8>,
    /// Children of a multipart container.
    pub parts: Vec<Part>,
}

impl Part {
    fn parse(raw: &[u8], depth: usize) -> Self {
        let (header_bytes, body) = split_header_body(raw);
        let headers = Headers::parse(&String::from_utf8_lossy(header_bytes));
        let mut part = Self {
            headers,
            body: Vec::new(),
            parts: Vec::new(),
        };

        let content_type = part.content_type();
        let children = match content_type.boundary() {
            Some(boundary) if content_type.is_multipart() && depth < MAX_DEPTH => {
                split_multipart(body, boundary)
            }
            _ => Vec::new(),
        };
        if children.is_empty() {
            part.body = body.to_vec();
        } else {
            part.parts = children
                .into_iter()
                .map(|child| Self::parse(child, depth + 1))
                .collect();
        }
        part
    }

    /// Gets the content type, defaulting to `text/plain` when missing or
    /// malformed.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.headers
            .get("content-type")
            .and_then(|value| ContentType::parse(value).ok())
            .unwrap_or_else(ContentType::text_plain)
    }

    /// Gets the parsed `Content-Disposition`, if any.
    #[must_use]
    pub fn disposition(&self) -> Option<ContentDisposition> {
        self.headers
            .get("content-disposition")
            .and_then(|value| ContentDisposition::parse(value).ok())
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Returns `true` for multipart containers with parsed children.
    ///
    /// A part declared `multipart/*` whose body could not be split is a leaf.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        !self.parts.is_empty()
    }

    /// Returns `true` for a leaf that declares a `Content-Disposition`.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        !self.is_multipart() && self.headers.get("content-disposition").is_some()
    }

    /// Returns the part's filename: `Content-Disposition` `filename`, then
    /// `Content-Type` `name`.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.disposition()
            .and_then(|d| d.filename())
            .or_else(|| self.content_type().name())
            .filter(|name| !name.trim().is_empty())
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if a Base64 body contains invalid characters.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        match self.transfer_encoding() {
            TransferEncoding::Base64 => decode_base64(&self.body),
            TransferEncoding::QuotedPrintable => Ok(decode_quoted_printable(&self.body)),
            _ => Ok(self.body.clone()),
        }
    }

    /// Decoded payload bytes; a body that fails transfer decoding is
    /// returned raw.
    #[must_use]
    pub fn payload(&self) -> Vec<u8> {
        self.decode_body().unwrap_or_else(|e| {
            warn!(error = %e, "transfer decoding failed, using raw body");
            self.body.clone()
        })
    }

    /// Decoded body as text in the declared charset, with lossy fallback.
    #[must_use]
    pub fn text(&self) -> String {
        let content_type = self.content_type();
        decode_charset(&self.payload(), content_type.charset())
    }

    /// Walks this part and all descendants depth-first, parents first.
    #[must_use]
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }
}

/// Depth-first pre-order iterator over a part tree.
#[derive(Debug)]
pub struct Walk<'a> {
    stack: Vec<&'a Part>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Part;

    fn next(&mut self) -> Option<Self::Item> {
        let part = self.stack.pop()?;
        self.stack.extend(part.parts.iter().rev());
        Some(part)
    }
}

/// A parsed message: the root part plus header accessors.
#[derive(Debug, Clone, Default)]
pub struct Message {
    /// Root of the MIME tree; its headers are the message headers.
    pub root: Part,
}

impl Message {
    /// Parses a raw RFC 5322 message (or just its header block).
    ///
    /// Parsing is lenient and never fails: malformed structure degrades to
    /// a single text part.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        Self {
            root: Part::parse(raw, 0),
        }
    }

    /// Message headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.root.headers
    }

    /// Decoded `Subject` header.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.headers().get_decoded("subject")
    }

    /// Raw `Date` header.
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.headers().get("date")
    }

    /// Addresses in the `From` header.
    #[must_use]
    pub fn from(&self) -> Vec<Address> {
        self.addresses("from")
    }

    /// Addresses in the `To` header.
    #[must_use]
    pub fn to(&self) -> Vec<Address> {
        self.addresses("to")
    }

    fn addresses(&self, name: &str) -> Vec<Address> {
        self.headers()
            .get_all(name)
            .into_iter()
            .flat_map(parse_address_list)
            .collect()
    }

    /// Concatenated text of all inline `text/*` leaves, in tree order,
    /// one line break between parts.
    ///
    /// Parts with a filename are attachments and are left out. A
    /// `multipart/*` leaf that could not be split is read as text.
    #[must_use]
    pub fn text_body(&self) -> String {
        self.root
            .walk()
            .filter(|part| !part.is_multipart())
            .filter(|part| {
                let content_type = part.content_type();
                content_type.is_text() || content_type.is_multipart()
            })
            .filter(|part| {
                part.disposition()
                    .is_none_or(|d| !d.is_attachment() && d.filename().is_none())
            })
            .map(Part::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Leaves that declare a `Content-Disposition`, in tree order.
    #[must_use]
    pub fn attachment_parts(&self) -> Vec<&Part> {
        self.root.walk().filter(|part| part.is_attachment()).collect()
    }
}

/// Splits at the first empty line. Input without one is all header.
fn split_header_body(raw: &[u8]) -> (&[u8], &[u8]) {
    let mut pos = 0;
    while pos < raw.len() {
        let end = raw[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(raw.len(), |i| pos + i + 1);
        let line = &raw[pos..end];
        if line == b"\n" || line == b"\r\n" {
            return (&raw[..pos], &raw[end..]);
        }
        pos = end;
    }
    (raw, &[])
}

/// Splits a multipart body into its raw child parts.
///
/// The preamble and epilogue are dropped. A missing close delimiter keeps
/// the last part.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();
    let mut start: Option<usize> = None;
    let mut pos = 0;

    while pos < body.len() {
        let end = body[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(body.len(), |i| pos + i + 1);
        let line = body[pos..end].trim_ascii_end();

        if let Some(rest) = line.strip_prefix(delimiter.as_bytes()) {
            let closing = rest == b"--";
            if closing || rest.is_empty() {
                if let Some(s) = start {
                    parts.push(strip_line_ending(&body[s..pos]));
                }
                if closing {
                    return parts;
                }
                start = Some(end);
            }
        }
        pos = end;
    }

    if let Some(s) = start {
        parts.push(&body[s..]);
    }
    parts
}

/// Drops the line break that belongs to the following delimiter.
fn strip_line_ending(part: &[u8]) -> &[u8] {
    part.strip_suffix(b"\r\n")
        .or_else(|| part.strip_suffix(b"\n"))
        .unwrap_or(part)
}
