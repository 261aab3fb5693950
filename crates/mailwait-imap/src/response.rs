//! Response parser.
//!
//! Parses one framed response (literals already inlined by
//! [`crate::FramedStream`]) into a [`Response`]. Only the subset of RFC 9051
//! this client relies on is modelled; everything else becomes
//! [`Untagged::Other`].

#![allow(clippy::missing_errors_doc)]

use chrono::{DateTime, FixedOffset};

use crate::{Error, Result};

/// Completion or condition status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// OK
    Ok,
    /// NO
    No,
    /// BAD
    Bad,
    /// PREAUTH (greeting only)
    PreAuth,
    /// BYE
    Bye,
}

impl Status {
    fn from_atom(atom: &str) -> Option<Self> {
        match atom.to_ascii_uppercase().as_str() {
            "OK" => Some(Self::Ok),
            "NO" => Some(Self::No),
            "BAD" => Some(Self::Bad),
            "PREAUTH" => Some(Self::PreAuth),
            "BYE" => Some(Self::Bye),
            _ => None,
        }
    }
}

/// A parsed server response.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Command completion.
    Tagged {
        /// The command tag.
        tag: String,
        /// Completion status.
        status: Status,
        /// Human-readable text, including any `[CODE]`.
        text: String,
    },
    /// Server data.
    Untagged(Untagged),
    /// Continuation request (`+ ...`).
    Continuation(String),
}

/// Untagged server data.
#[derive(Debug, Clone, PartialEq)]
pub enum Untagged {
    /// `* OK|NO|BAD|PREAUTH|BYE text`
    Status {
        /// Condition.
        status: Status,
        /// Human-readable text.
        text: String,
    },
    /// `* SEARCH n n n`
    Search(Vec<u32>),
    /// `* n EXISTS`
    Exists(u32),
    /// `* n FETCH (...)`
    Fetch {
        /// Message sequence number.
        seq: u32,
        /// Decoded attributes.
        data: FetchData,
    },
    /// Anything else, kept as text.
    Other(String),
}

/// Attributes of one FETCH response this client understands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchData {
    /// `UID`
    pub uid: Option<u32>,
    /// `INTERNALDATE`
    pub internal_date: Option<DateTime<FixedOffset>>,
    /// `FLAGS`
    pub flags: Vec<String>,
    /// `BODY[HEADER]` / `RFC822.HEADER`
    pub header: Option<Vec<u8>>,
    /// `BODY[]` / `RFC822`
    pub body: Option<Vec<u8>>,
}

/// Parses one complete response.
pub fn parse(input: &[u8]) -> Result<Response> {
    let mut cursor = Cursor::new(input);

    match cursor.peek() {
        Some(b'*') => {
            cursor.advance(1);
            cursor.expect(b' ')?;
            parse_untagged(&mut cursor)
        }
        Some(b'+') => {
            cursor.advance(1);
            cursor.skip_spaces();
            Ok(Response::Continuation(cursor.rest_of_line()))
        }
        Some(_) => {
            let tag = cursor.atom()?;
            cursor.expect(b' ')?;
            let word = cursor.atom()?;
            let status = Status::from_atom(&word)
                .ok_or_else(|| cursor.error(format!("unknown completion status {word:?}")))?;
            cursor.skip_spaces();
            Ok(Response::Tagged {
                tag,
                status,
                text: cursor.rest_of_line(),
            })
        }
        None => Err(cursor.error("empty response")),
    }
}

fn parse_untagged(cursor: &mut Cursor<'_>) -> Result<Response> {
    let first = cursor.atom()?;

    if let Some(status) = Status::from_atom(&first) {
        cursor.skip_spaces();
        return Ok(Response::Untagged(Untagged::Status {
            status,
            text: cursor.rest_of_line(),
        }));
    }

    if first.eq_ignore_ascii_case("SEARCH") {
        let mut ids = Vec::new();
        loop {
            cursor.skip_spaces();
            if cursor.at_line_end() {
                break;
            }
            // ESEARCH-style modifiers such as (MODSEQ n) are not requested.
            let atom = cursor.atom()?;
            let id = atom
                .parse()
                .map_err(|_| cursor.error(format!("invalid SEARCH id {atom:?}")))?;
            ids.push(id);
        }
        return Ok(Response::Untagged(Untagged::Search(ids)));
    }

    if let Ok(number) = first.parse::<u32>() {
        cursor.expect(b' ')?;
        let kind = cursor.atom()?;
        if kind.eq_ignore_ascii_case("EXISTS") {
            return Ok(Response::Untagged(Untagged::Exists(number)));
        }
        if kind.eq_ignore_ascii_case("FETCH") {
            cursor.expect(b' ')?;
            let data = parse_fetch(cursor)?;
            return Ok(Response::Untagged(Untagged::Fetch { seq: number, data }));
        }
        return Ok(Response::Untagged(Untagged::Other(format!(
            "{number} {kind}"
        ))));
    }

    cursor.skip_spaces();
    Ok(Response::Untagged(Untagged::Other(format!(
        "{first} {}",
        cursor.rest_of_line()
    ))))
}

fn parse_fetch(cursor: &mut Cursor<'_>) -> Result<FetchData> {
    cursor.expect(b'(')?;
    let mut data = FetchData::default();

    loop {
        cursor.skip_spaces();
        match cursor.peek() {
            Some(b')') => {
                cursor.advance(1);
                return Ok(data);
            }
            None => return Err(cursor.error("unterminated FETCH response")),
            Some(_) => {}
        }

        let name = cursor.fetch_attribute_name()?.to_ascii_uppercase();
        cursor.expect(b' ')?;
        let value = cursor.value()?;

        match name.as_str() {
            "UID" => {
                let atom = value.into_atom().unwrap_or_default();
                data.uid = Some(
                    atom.parse()
                        .map_err(|_| cursor.error(format!("invalid UID {atom:?}")))?,
                );
            }
            "INTERNALDATE" => {
                data.internal_date = value.into_text().and_then(|t| parse_internal_date(&t));
            }
            "FLAGS" => {
                if let Value::List(items) = value {
                    data.flags = items.into_iter().filter_map(Value::into_atom).collect();
                }
            }
            "BODY[HEADER]" | "RFC822.HEADER" => data.header = value.into_bytes(),
            "BODY[]" | "RFC822" => data.body = value.into_bytes(),
            _ => {}
        }
    }
}

/// Parses an INTERNALDATE such as `17-Jul-1996 02:44:25 -0700`.
#[must_use]
pub fn parse_internal_date(text: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(text.trim(), "%d-%b-%Y %H:%M:%S %z").ok()
}

/// A generic FETCH value.
#[derive(Debug)]
enum Value {
    Nil,
    Atom(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
}

impl Value {
    fn into_atom(self) -> Option<String> {
        match self {
            Self::Atom(atom) => Some(atom),
            _ => None,
        }
    }

    fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::Atom(atom) => Some(atom.into_bytes()),
            Self::Nil | Self::List(_) => None,
        }
    }

    fn into_text(self) -> Option<String> {
        self.into_bytes()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
    }
}

struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.into(),
        }
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.peek() == Some(byte) {
            self.advance(1);
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}", char::from(byte))))
        }
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.advance(1);
        }
    }

    fn at_line_end(&self) -> bool {
        matches!(self.peek(), None | Some(b'\r' | b'\n'))
    }

    fn rest_of_line(&mut self) -> String {
        let start = self.pos;
        while !self.at_line_end() {
            self.advance(1);
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    fn atom(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b' ' | b'(' | b')' | b'"' | b'{' | b'\r' | b'\n') {
                break;
            }
            self.advance(1);
        }
        if start == self.pos {
            return Err(self.error("expected atom"));
        }
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    /// Reads names like `UID` or `BODY[HEADER.FIELDS (FROM)]<0>`.
    fn fetch_attribute_name(&mut self) -> Result<String> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            match b {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b' ' | b')' if depth == 0 => break,
                b'\r' | b'\n' => break,
                _ => {}
            }
            self.advance(1);
        }
        if start == self.pos {
            return Err(self.error("expected FETCH attribute name"));
        }
        let name = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
        // Partial origins (`BODY[]<0>`) do not change what the data is.
        Ok(name
            .split_once('<')
            .map_or(name.clone(), |(base, _)| base.to_string()))
    }

    fn value(&mut self) -> Result<Value> {
        match self.peek() {
            Some(b'(') => {
                self.advance(1);
                let mut items = Vec::new();
                loop {
                    self.skip_spaces();
                    match self.peek() {
                        Some(b')') => {
                            self.advance(1);
                            return Ok(Value::List(items));
                        }
                        None => return Err(self.error("unterminated list")),
                        Some(_) => items.push(self.value()?),
                    }
                }
            }
            Some(b'"') => self.quoted().map(Value::Bytes),
            Some(b'{') => self.literal().map(Value::Bytes),
            Some(_) => {
                let atom = self.atom()?;
                if atom.eq_ignore_ascii_case("NIL") {
                    Ok(Value::Nil)
                } else {
                    Ok(Value::Atom(atom))
                }
            }
            None => Err(self.error("expected value")),
        }
    }

    fn quoted(&mut self) -> Result<Vec<u8>> {
        self.expect(b'"')?;
        let mut out = Vec::new();
        loop {
            match self.peek() {
                Some(b'"') => {
                    self.advance(1);
                    return Ok(out);
                }
                Some(b'\\') => {
                    self.advance(1);
                    let escaped = self.peek().ok_or_else(|| self.error("dangling escape"))?;
                    out.push(escaped);
                    self.advance(1);
                }
                Some(b'\r' | b'\n') | None => {
                    return Err(self.error("unterminated quoted string"));
                }
                Some(b) => {
                    out.push(b);
                    self.advance(1);
                }
            }
        }
    }

    fn literal(&mut self) -> Result<Vec<u8>> {
        self.expect(b'{')?;
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.advance(1);
        }
        let len: usize = std::str::from_utf8(&self.input[start..self.pos])
            .ok()
            .and_then(|digits| digits.parse().ok())
            .ok_or_else(|| self.error("invalid literal length"))?;
        if self.peek() == Some(b'+') {
            self.advance(1);
        }
        self.expect(b'}')?;
        if self.peek() == Some(b'\r') {
            self.advance(1);
        }
        self.expect(b'\n')?;

        let end = self
            .pos
            .checked_add(len)
            .ok_or_else(|| self.error("literal extends past end of response"))?;
        let bytes = self
            .input
            .get(self.pos..end)
            .ok_or_else(|| self.error("literal extends past end of response"))?
            .to_vec();
        self.pos = end;
        Ok(bytes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_ok() {
        let parsed = parse(b"A0003 OK [READ-WRITE] SELECT completed\r\n").unwrap();
        assert_eq!(
            parsed,
            Response::Tagged {
                tag: "A0003".to_string(),
                status: Status::Ok,
                text: "[READ-WRITE] SELECT completed".to_string(),
            }
        );
    }

    #[test]
    fn test_tagged_no() {
        let parsed = parse(b"A0001 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n").unwrap();
        assert!(matches!(
            parsed,
            Response::Tagged {
                status: Status::No,
                ..
            }
        ));
    }

    #[test]
    fn test_greeting_and_bye() {
        assert_eq!(
            parse(b"* OK IMAP4rev1 ready\r\n").unwrap(),
            Response::Untagged(Untagged::Status {
                status: Status::Ok,
                text: "IMAP4rev1 ready".to_string(),
            })
        );
        assert!(matches!(
            parse(b"* BYE shutting down\r\n").unwrap(),
            Response::Untagged(Untagged::Status {
                status: Status::Bye,
                ..
            })
        ));
    }

    #[test]
    fn test_search() {
        assert_eq!(
            parse(b"* SEARCH 2 84 882\r\n").unwrap(),
            Response::Untagged(Untagged::Search(vec![2, 84, 882]))
        );
        assert_eq!(
            parse(b"* SEARCH\r\n").unwrap(),
            Response::Untagged(Untagged::Search(Vec::new()))
        );
    }

    #[test]
    fn test_exists_and_other() {
        assert_eq!(
            parse(b"* 23 EXISTS\r\n").unwrap(),
            Response::Untagged(Untagged::Exists(23))
        );
        assert!(matches!(
            parse(b"* FLAGS (\\Answered \\Seen)\r\n").unwrap(),
            Response::Untagged(Untagged::Other(_))
        ));
        assert!(matches!(
            parse(b"* 5 RECENT\r\n").unwrap(),
            Response::Untagged(Untagged::Other(_))
        ));
    }

    #[test]
    fn test_continuation() {
        assert_eq!(
            parse(b"+ Ready for literal\r\n").unwrap(),
            Response::Continuation("Ready for literal".to_string())
        );
    }

    #[test]
    fn test_fetch_header_literal() {
        let input = b"* 4 FETCH (UID 120 INTERNALDATE \"18-Oct-2026 10:15:00 +0000\" FLAGS (\\Recent) BODY[HEADER] {20}\r\nSubject: Welcome\r\n\r\n)\r\n";
        let Response::Untagged(Untagged::Fetch { seq, data }) = parse(input).unwrap() else {
            panic!("expected FETCH");
        };
        assert_eq!(seq, 4);
        assert_eq!(data.uid, Some(120));
        assert_eq!(data.flags, vec!["\\Recent".to_string()]);
        assert_eq!(
            data.internal_date.unwrap().to_rfc3339(),
            "2026-10-18T10:15:00+00:00"
        );
        assert_eq!(data.header.unwrap(), b"Subject: Welcome\r\n\r\n");
        assert!(data.body.is_none());
    }

    #[test]
    fn test_fetch_full_body_with_origin() {
        let input = b"* 1 FETCH (BODY[]<0> {5}\r\nhello UID 9)\r\n";
        let Response::Untagged(Untagged::Fetch { data, .. }) = parse(input).unwrap() else {
            panic!("expected FETCH");
        };
        assert_eq!(data.body.unwrap(), b"hello");
        assert_eq!(data.uid, Some(9));
    }

    #[test]
    fn test_fetch_skips_unknown_structures() {
        let input = b"* 2 FETCH (UID 3 ENVELOPE (NIL \"Hi\" ((\"A\" NIL \"a\" \"x.test\")) NIL NIL NIL NIL NIL NIL NIL) BODY[HEADER.FIELDS (FROM)] {3}\r\nabc)\r\n";
        let Response::Untagged(Untagged::Fetch { data, .. }) = parse(input).unwrap() else {
            panic!("expected FETCH");
        };
        assert_eq!(data.uid, Some(3));
        assert!(data.header.is_none());
    }

    #[test]
    fn test_fetch_truncated_literal_is_error() {
        let input = b"* 1 FETCH (BODY[] {50}\r\nshort)\r\n";
        assert!(matches!(parse(input), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_fetch_oversized_literal_is_error() {
        let input = format!("* 1 FETCH (BODY[] {{{}}}\r\nx)\r\n", usize::MAX);
        assert!(matches!(parse(input.as_bytes()), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_internal_date() {
        let date = parse_internal_date("17-Jul-1996 02:44:25 -0700").unwrap();
        assert_eq!(date.to_rfc3339(), "1996-07-17T02:44:25-07:00");
        assert!(parse_internal_date("not a date").is_none());
    }
}
