//! The mailbox capability the poller runs against.
//!
//! [`Connector`] opens a [`MailboxSession`] with the target folder already
//! selected; the IMAP implementation lives in [`crate::imap`].

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::Result;

/// Which messages to enumerate: unseen ones received on or after `since`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchCriteria {
    /// Only messages without `\Seen`.
    pub unseen: bool,
    /// Start of the look-back window.
    pub since: DateTime<Utc>,
}

impl SearchCriteria {
    /// Unseen messages within `look_back` of `now`.
    #[must_use]
    pub fn unseen_within(now: DateTime<Utc>, look_back: Duration) -> Self {
        let look_back = chrono::Duration::from_std(look_back).unwrap_or(chrono::Duration::MAX);
        Self {
            unseen: true,
            since: now.checked_sub_signed(look_back).unwrap_or(DateTime::<Utc>::MIN_UTC),
        }
    }

    /// The day of `since`; servers compare SEARCH SINCE by date only.
    #[must_use]
    pub fn since_day(&self) -> NaiveDate {
        self.since.date_naive()
    }

    /// Returns `false` for a message that arrived before the window.
    ///
    /// Messages without an arrival time are kept.
    #[must_use]
    pub fn admits(&self, internal_date: Option<DateTime<FixedOffset>>) -> bool {
        internal_date.is_none_or(|date| date >= self.since)
    }
}

/// Header-level view of one search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Message UID.
    pub uid: u32,
    /// Server arrival time.
    pub internal_date: Option<DateTime<FixedOffset>>,
    /// Raw header block.
    pub header: Vec<u8>,
}

/// A fully fetched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Message UID.
    pub uid: u32,
    /// Complete RFC 5322 message.
    pub raw: Vec<u8>,
    /// Plain-text body, when the mailbox backend already decoded it.
    pub text_body: Option<String>,
}

/// An open session on the selected folder.
pub trait MailboxSession: Send + Sized {
    /// Returns UIDs of messages matching `criteria`.
    fn search(
        &mut self,
        criteria: &SearchCriteria,
    ) -> impl Future<Output = Result<Vec<u32>>> + Send;

    /// Fetches header blocks without marking messages seen.
    fn fetch_headers(&mut self, uids: &[u32]) -> impl Future<Output = Result<Vec<Candidate>>> + Send;

    /// Fetches one complete message without marking it seen.
    ///
    /// Returns `None` if the message disappeared meanwhile.
    fn fetch_message(&mut self, uid: u32) -> impl Future<Output = Result<Option<RawMessage>>> + Send;

    /// Flags a message `\Seen`.
    fn mark_seen(&mut self, uid: u32) -> impl Future<Output = Result<()>> + Send;

    /// Flags a message `\Deleted`, expunging when `expunge` is set.
    fn delete(&mut self, uid: u32, expunge: bool) -> impl Future<Output = Result<()>> + Send;

    /// Ends the session.
    fn logout(self) -> impl Future<Output = Result<()>> + Send;
}

/// Session factory.
pub trait Connector: Send + Sync {
    /// Session type produced by [`Connector::open`].
    type Session: MailboxSession;

    /// Connects, authenticates and selects the configured folder.
    fn open(&self) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// Runs `body` on a fresh session and always logs out afterwards.
///
/// The body's error takes precedence over a logout error; a logout error
/// after a successful body is logged and dropped.
pub async fn with_session<C, T, F>(connector: &C, body: F) -> Result<T>
where
    C: Connector,
    F: AsyncFnOnce(&mut C::Session) -> Result<T>,
{
    let mut session = connector.open().await?;
    let outcome = body(&mut session).await;
    let closed = session.logout().await;

    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(value), Err(e)) => {
            tracing::warn!(error = %e, "logout failed");
            Ok(value)
        }
        (Err(e), Err(logout_error)) => {
            tracing::debug!(error = %logout_error, "logout failed after error");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_unseen_within() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
        let criteria = SearchCriteria::unseen_within(now, Duration::from_secs(86_400));
        assert!(criteria.unseen);
        assert_eq!(criteria.since_day(), NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
    }

    #[test]
    fn test_admits() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
        let criteria = SearchCriteria::unseen_within(now, Duration::from_secs(3600));
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();

        let recent = offset.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap();
        let old = offset.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        assert!(criteria.admits(Some(recent)));
        assert!(!criteria.admits(Some(old)));
        assert!(criteria.admits(None));
    }

    #[test]
    fn test_huge_look_back_saturates() {
        let criteria = SearchCriteria::unseen_within(Utc::now(), Duration::MAX);
        assert_eq!(criteria.since, DateTime::<Utc>::MIN_UTC);
    }
}
