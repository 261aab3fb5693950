//! Decodes candidates and evaluates the caller's filters against them.

use chrono::{DateTime, FixedOffset};
use mailwait_mime::{Address, Message};

use crate::filter::FilterSpec;
use crate::mailbox::{Candidate, RawMessage};

/// Decoded header fields of one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Message UID.
    pub uid: u32,
    /// Server arrival time.
    pub internal_date: Option<DateTime<FixedOffset>>,
    /// First `From` mailbox.
    pub sender: String,
    /// First `To` mailbox.
    pub recipient: String,
    /// Decoded subject; empty when absent.
    pub subject: String,
    /// Raw `Date` header.
    pub date: Option<String>,
}

impl Envelope {
    /// Decodes the header block of a candidate.
    #[must_use]
    pub fn decode(candidate: &Candidate) -> Self {
        Self::from_message(
            candidate.uid,
            candidate.internal_date,
            &Message::parse(&candidate.header),
        )
    }

    /// Reads the envelope fields of an already parsed message.
    #[must_use]
    pub fn from_message(
        uid: u32,
        internal_date: Option<DateTime<FixedOffset>>,
        message: &Message,
    ) -> Self {
        let headers = message.headers();
        Self {
            uid,
            internal_date,
            sender: first_mailbox(message.from(), headers.get("from")),
            recipient: first_mailbox(message.to(), headers.get("to")),
            subject: message.subject().unwrap_or_default(),
            date: message.date().map(str::to_string),
        }
    }

    /// Evaluates the sender, recipient and subject predicates.
    #[must_use]
    pub fn matches(&self, filters: &FilterSpec) -> bool {
        filters.matches_sender(&self.sender)
            && filters.matches_recipient(&self.recipient)
            && filters.matches_subject(&self.subject)
    }
}

/// Renders the first parsed mailbox, falling back to the raw header.
fn first_mailbox(addresses: Vec<Address>, raw: Option<&str>) -> String {
    addresses.into_iter().next().map_or_else(
        || raw.map(str::trim).unwrap_or_default().to_string(),
        |address| address.to_string(),
    )
}

/// The plain-text body of a fetched message.
///
/// A body already decoded by the mailbox backend wins over walking the
/// MIME tree.
#[must_use]
pub fn decode_body(raw: &RawMessage, message: &Message) -> String {
    raw.text_body
        .clone()
        .unwrap_or_else(|| message.text_body())
}

/// Sorts candidates newest first by arrival time, then by UID.
pub fn newest_first(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.internal_date
            .cmp(&a.internal_date)
            .then_with(|| b.uid.cmp(&a.uid))
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn candidate(uid: u32, minute: Option<u32>, header: &str) -> Candidate {
        Candidate {
            uid,
            internal_date: minute.map(|m| {
                FixedOffset::east_opt(0)
                    .unwrap()
                    .with_ymd_and_hms(2026, 10, 19, 9, m, 0)
                    .unwrap()
            }),
            header: header.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_decode_envelope() {
        let header = "From: =?UTF-8?B?U2hvcA==?= <NoReply@shop.test>\r\n\
                      To: qa@example.com, other@example.com\r\n\
                      Subject: =?utf-8?q?Willkommen_bei?= Shop\r\n\
                      Date: Mon, 19 Oct 2026 09:00:00 +0000\r\n\r\n";
        let envelope = Envelope::decode(&candidate(5, Some(0), header));

        assert_eq!(envelope.sender, "Shop <NoReply@shop.test>");
        assert_eq!(envelope.recipient, "qa@example.com");
        assert_eq!(envelope.subject, "Willkommen bei Shop");
        assert_eq!(envelope.date.as_deref(), Some("Mon, 19 Oct 2026 09:00:00 +0000"));

        let filters = FilterSpec::new(
            Some("noreply@shop.test"),
            Some("QA@example.com"),
            Some("Willkommen"),
            None,
        )
        .unwrap();
        assert!(envelope.matches(&filters));

        let wrong_sender = FilterSpec::new(Some("shop.test"), None, None, None).unwrap();
        assert!(!envelope.matches(&wrong_sender));
    }

    #[test]
    fn test_missing_headers() {
        let envelope = Envelope::decode(&candidate(1, None, "X-Test: 1\r\n\r\n"));
        assert_eq!(envelope.sender, "");
        assert_eq!(envelope.subject, "");
        assert!(envelope.matches(&FilterSpec::any()));
        assert!(!envelope.matches(&FilterSpec::new(None, None, Some("Hi"), None).unwrap()));
    }

    #[test]
    fn test_decode_body_prefers_backend_text() {
        let message = Message::parse(b"Subject: x\r\n\r\nfrom tree\r\n");
        let mut raw = RawMessage {
            uid: 1,
            raw: Vec::new(),
            text_body: Some("from backend".to_string()),
        };
        assert_eq!(decode_body(&raw, &message), "from backend");

        raw.text_body = None;
        assert_eq!(decode_body(&raw, &message), "from tree\r\n");
    }

    #[test]
    fn test_newest_first() {
        let mut candidates = vec![
            candidate(3, Some(50), ""),
            candidate(9, None, ""),
            candidate(4, Some(55), ""),
            candidate(8, Some(50), ""),
        ];
        newest_first(&mut candidates);
        let order: Vec<u32> = candidates.iter().map(|c| c.uid).collect();
        assert_eq!(order, vec![4, 8, 3, 9]);
    }
}
