//! Filter predicates evaluated against decoded messages.

use regex::Regex;

use crate::Result;

/// The caller's predicates. Unset predicates always pass; all set
/// predicates must pass for a message to match.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    sender: Option<String>,
    recipient: Option<String>,
    subject: Option<Regex>,
    body: Option<Regex>,
}

impl FilterSpec {
    /// Builds a filter set.
    ///
    /// `subject` is matched at the start of the decoded subject; `body` may
    /// match anywhere in the decoded body.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if a pattern does not compile.
    pub fn new(
        sender: Option<&str>,
        recipient: Option<&str>,
        subject: Option<&str>,
        body: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            sender: sender.map(str::to_string),
            recipient: recipient.map(str::to_string),
            subject: subject.map(|p| Regex::new(&format!("^(?:{p})"))).transpose()?,
            body: body.map(Regex::new).transpose()?,
        })
    }

    /// A filter set that matches every message.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Sender predicate.
    #[must_use]
    pub fn matches_sender(&self, sender: &str) -> bool {
        self.sender
            .as_deref()
            .is_none_or(|expected| address_matches(expected, sender))
    }

    /// Recipient predicate.
    #[must_use]
    pub fn matches_recipient(&self, recipient: &str) -> bool {
        self.recipient
            .as_deref()
            .is_none_or(|expected| address_matches(expected, recipient))
    }

    /// Subject predicate.
    #[must_use]
    pub fn matches_subject(&self, subject: &str) -> bool {
        self.subject.as_ref().is_none_or(|re| re.is_match(subject))
    }

    /// Body predicate.
    #[must_use]
    pub fn matches_body(&self, body: &str) -> bool {
        self.body.as_ref().is_none_or(|re| re.is_match(body))
    }
}

/// Case-insensitive address comparison.
///
/// `field` is a rendered mailbox such as `Name <addr>` or `addr`. It matches
/// when it equals `expected`, or when it contains `<expected>`.
///
/// The containment rule also accepts a display name that embeds the
/// bracketed address, e.g. `"<qa@example.com>" <evil@x.test>`.
#[must_use]
pub fn address_matches(expected: &str, field: &str) -> bool {
    let expected = expected.trim().to_lowercase();
    let field = field.trim().to_lowercase();
    field == expected || field.contains(&format!("<{expected}>"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_spec_matches_everything() {
        let spec = FilterSpec::any();
        assert!(spec.matches_sender("anyone@example.com"));
        assert!(spec.matches_recipient(""));
        assert!(spec.matches_subject("whatever"));
        assert!(spec.matches_body(""));
    }

    #[test]
    fn test_address_matches() {
        assert!(address_matches("noreply@shop.test", "NoReply@Shop.Test"));
        assert!(address_matches("noreply@shop.test", "Shop <NOREPLY@shop.test>"));
        assert!(!address_matches("noreply@shop.test", "Shop <support@shop.test>"));
        assert!(!address_matches("shop.test", "Shop <noreply@shop.test>"));
        // Bracketed containment is deliberately loose.
        assert!(address_matches(
            "qa@example.com",
            "\"<qa@example.com>\" <evil@x.test>"
        ));
    }

    #[test]
    fn test_subject_is_anchored_at_start() {
        let spec = FilterSpec::new(None, None, Some("Welcome|Hello"), None).unwrap();
        assert!(spec.matches_subject("Welcome to Shop"));
        assert!(spec.matches_subject("Hello there"));
        assert!(!spec.matches_subject("Re: Welcome to Shop"));
        assert!(!spec.matches_subject("Say Hello"));
    }

    #[test]
    fn test_body_is_unanchored() {
        let spec = FilterSpec::new(None, None, None, Some(r"code: \d{6}")).unwrap();
        assert!(spec.matches_body("Hi!\nYour code: 123456\nBye"));
        assert!(!spec.matches_body("Your code: 12"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = FilterSpec::new(None, None, Some("(unclosed"), None).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidPattern(_)));
    }
}
