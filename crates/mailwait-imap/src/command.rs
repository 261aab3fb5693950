//! IMAP commands and their wire serialization.

use chrono::NaiveDate;

use crate::{Error, Result};

/// A message flag that can be stored or searched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flag {
    /// `\Seen`
    Seen,
    /// `\Deleted`
    Deleted,
    /// `\Flagged`
    Flagged,
}

impl Flag {
    /// Returns the wire form of the flag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Seen => "\\Seen",
            Self::Deleted => "\\Deleted",
            Self::Flagged => "\\Flagged",
        }
    }
}

/// SEARCH criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// All messages.
    All,
    /// Messages without `\Seen`.
    Unseen,
    /// Messages whose internal date is on or after the given day.
    Since(NaiveDate),
    /// Every nested criterion must hold.
    And(Vec<Self>),
}

impl SearchCriteria {
    fn write(&self, buf: &mut Vec<u8>) {
        match self {
            Self::All => buf.extend_from_slice(b"ALL"),
            Self::Unseen => buf.extend_from_slice(b"UNSEEN"),
            Self::Since(day) => {
                buf.extend_from_slice(b"SINCE ");
                buf.extend_from_slice(format_imap_date(*day).as_bytes());
            }
            Self::And(all) if all.is_empty() => buf.extend_from_slice(b"ALL"),
            Self::And(all) => {
                buf.push(b'(');
                for (i, criterion) in all.iter().enumerate() {
                    if i > 0 {
                        buf.push(b' ');
                    }
                    criterion.write(buf);
                }
                buf.push(b')');
            }
        }
    }
}

/// Formats a day as an IMAP `date` (`18-Oct-2026`).
#[must_use]
pub fn format_imap_date(day: NaiveDate) -> String {
    day.format("%-d-%b-%Y").to_string()
}

/// Individual FETCH attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// UID.
    Uid,
    /// Message flags.
    Flags,
    /// Server-side arrival time.
    InternalDate,
    /// A body section; `section = None` is the whole message.
    Body {
        /// Section specifier such as `HEADER`.
        section: Option<String>,
        /// `BODY.PEEK` leaves `\Seen` untouched.
        peek: bool,
    },
}

impl FetchAttribute {
    /// `BODY.PEEK[HEADER]`
    #[must_use]
    pub fn header_peek() -> Self {
        Self::Body {
            section: Some("HEADER".to_string()),
            peek: true,
        }
    }

    /// `BODY.PEEK[]`
    #[must_use]
    pub const fn full_peek() -> Self {
        Self::Body {
            section: None,
            peek: true,
        }
    }

    fn write(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Uid => buf.extend_from_slice(b"UID"),
            Self::Flags => buf.extend_from_slice(b"FLAGS"),
            Self::InternalDate => buf.extend_from_slice(b"INTERNALDATE"),
            Self::Body { section, peek } => {
                let open: &[u8] = if *peek { b"BODY.PEEK[" } else { b"BODY[" };
                buf.extend_from_slice(open);
                if let Some(section) = section {
                    buf.extend_from_slice(section.as_bytes());
                }
                buf.push(b']');
            }
        }
    }
}

/// STORE action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// `+FLAGS.SILENT`
    AddFlags(Vec<Flag>),
    /// `-FLAGS.SILENT`
    RemoveFlags(Vec<Flag>),
}

/// IMAP commands issued by this client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// LOGIN with a username and password.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// STARTTLS.
    StartTls,
    /// SELECT a mailbox.
    Select {
        /// Mailbox name.
        mailbox: String,
    },
    /// UID SEARCH.
    UidSearch {
        /// Search criteria.
        criteria: SearchCriteria,
    },
    /// UID FETCH.
    UidFetch {
        /// Target UIDs.
        uids: Vec<u32>,
        /// Requested attributes.
        items: Vec<FetchAttribute>,
    },
    /// UID STORE (always silent).
    UidStore {
        /// Target UIDs.
        uids: Vec<u32>,
        /// Flag change.
        action: StoreAction,
    },
    /// EXPUNGE.
    Expunge,
    /// LOGOUT.
    Logout,
}

impl Command {
    /// Serializes the command with its tag, including the trailing CRLF.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] for strings that cannot be sent as a
    /// quoted string (CR, LF or NUL) and for empty UID sets.
    pub fn serialize(&self, tag: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_astring(&mut buf, username)?;
                buf.push(b' ');
                write_astring(&mut buf, password)?;
            }
            Self::StartTls => buf.extend_from_slice(b"STARTTLS"),
            Self::Select { mailbox } => {
                buf.extend_from_slice(b"SELECT ");
                write_astring(&mut buf, mailbox)?;
            }
            Self::UidSearch { criteria } => {
                buf.extend_from_slice(b"UID SEARCH ");
                match criteria {
                    // Top-level conjunctions need no parentheses.
                    SearchCriteria::And(all) if !all.is_empty() => {
                        for (i, criterion) in all.iter().enumerate() {
                            if i > 0 {
                                buf.push(b' ');
                            }
                            criterion.write(&mut buf);
                        }
                    }
                    other => other.write(&mut buf),
                }
            }
            Self::UidFetch { uids, items } => {
                buf.extend_from_slice(b"UID FETCH ");
                write_uid_set(&mut buf, uids)?;
                buf.push(b' ');
                if let [single] = items.as_slice() {
                    single.write(&mut buf);
                } else {
                    buf.push(b'(');
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            buf.push(b' ');
                        }
                        item.write(&mut buf);
                    }
                    buf.push(b')');
                }
            }
            Self::UidStore { uids, action } => {
                buf.extend_from_slice(b"UID STORE ");
                write_uid_set(&mut buf, uids)?;
                let (prefix, flags) = match action {
                    StoreAction::AddFlags(flags) => (&b" +FLAGS.SILENT ("[..], flags),
                    StoreAction::RemoveFlags(flags) => (&b" -FLAGS.SILENT ("[..], flags),
                };
                buf.extend_from_slice(prefix);
                for (i, flag) in flags.iter().enumerate() {
                    if i > 0 {
                        buf.push(b' ');
                    }
                    buf.extend_from_slice(flag.as_str().as_bytes());
                }
                buf.push(b')');
            }
            Self::Expunge => buf.extend_from_slice(b"EXPUNGE"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
        }

        buf.extend_from_slice(b"\r\n");
        Ok(buf)
    }
}

/// Writes an atom when possible, a quoted string otherwise.
fn write_astring(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    if s.bytes().any(|b| matches!(b, b'\r' | b'\n' | 0)) {
        return Err(Error::Protocol(
            "string contains CR, LF or NUL and cannot be quoted".to_string(),
        ));
    }

    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
    Ok(())
}

const fn needs_quoting(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']'
    ) || b < 0x20
        || b >= 0x7F
}

/// Writes a sorted, range-compressed UID set such as `3:5,9`.
fn write_uid_set(buf: &mut Vec<u8>, uids: &[u32]) -> Result<()> {
    if uids.is_empty() {
        return Err(Error::Protocol("empty UID set".to_string()));
    }

    let mut sorted = uids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges: Vec<(u32, u32)> = Vec::new();
    for uid in sorted {
        match ranges.last_mut() {
            Some((_, end)) if end.checked_add(1) == Some(uid) => *end = uid,
            _ => ranges.push((uid, uid)),
        }
    }

    let rendered: Vec<String> = ranges
        .into_iter()
        .map(|(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}:{end}")
            }
        })
        .collect();
    buf.extend_from_slice(rendered.join(",").as_bytes());
    Ok(())
}
