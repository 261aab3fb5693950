//! The bounded poll-and-match loop.

use std::time::Duration;

use chrono::Utc;
use mailwait_mime::Message;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::attachments::save_attachments;
use crate::config::ClientConfig;
use crate::email::MatchedEmail;
use crate::filter::FilterSpec;
use crate::mailbox::{Connector, MailboxSession, SearchCriteria, with_session};
use crate::matcher::{Envelope, decode_body, newest_first};
use crate::{Error, Result};

/// Polls one folder until a message satisfies a [`FilterSpec`].
///
/// Every iteration opens its own session through the connector and logs
/// out before sleeping.
#[derive(Debug)]
pub struct Poller<'a, C> {
    connector: &'a C,
    config: &'a ClientConfig,
}

impl<'a, C: Connector> Poller<'a, C> {
    /// Creates a poller reading look-back, attachment and flag settings
    /// from `config`.
    #[must_use]
    pub const fn new(connector: &'a C, config: &'a ClientConfig) -> Self {
        Self { connector, config }
    }

    /// Waits for the newest unseen message that satisfies `filters`.
    ///
    /// At least one poll always runs. Between polls the loop sleeps for
    /// `poll_frequency`, cut short at the deadline.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if nothing matched before `timeout` elapsed.
    /// - Any session error, immediately and without retry.
    /// - [`Error::Attachment`] if saving an attachment of the match fails.
    pub async fn wait_for_email(
        &self,
        filters: &FilterSpec,
        poll_frequency: Duration,
        timeout: Duration,
    ) -> Result<MatchedEmail> {
        let deadline = Instant::now().checked_add(timeout);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(attempt, "polling mailbox");

            let found = with_session(self.connector, async |session| {
                self.poll_once(session, filters).await
            })
            .await?;

            if let Some(email) = found {
                info!(
                    message_id = email.message_id,
                    subject = %email.subject,
                    attempt,
                    "Found matching email"
                );
                return Ok(email);
            }

            let remaining = deadline.map_or(poll_frequency, |d| {
                d.saturating_duration_since(Instant::now())
            });
            if remaining.is_zero() {
                break;
            }
            sleep(poll_frequency.min(remaining)).await;
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
        }

        info!(attempts = attempt, ?timeout, "no matching email before deadline");
        Err(Error::Timeout(timeout))
    }

    /// One pass over the current candidates.
    async fn poll_once<S: MailboxSession>(
        &self,
        session: &mut S,
        filters: &FilterSpec,
    ) -> Result<Option<MatchedEmail>> {
        let criteria = SearchCriteria::unseen_within(Utc::now(), self.config.look_back);
        let uids = session.search(&criteria).await?;
        if uids.is_empty() {
            debug!("no unseen mail in window");
            return Ok(None);
        }

        let mut candidates = session.fetch_headers(&uids).await?;
        candidates.retain(|c| criteria.admits(c.internal_date));
        newest_first(&mut candidates);
        info!(count = candidates.len(), "Found candidate emails");

        for candidate in &candidates {
            let envelope = Envelope::decode(candidate);
            if !envelope.matches(filters) {
                debug!(
                    uid = candidate.uid,
                    sender = %envelope.sender,
                    subject = %envelope.subject,
                    "headers do not match"
                );
                continue;
            }

            let Some(raw) = session.fetch_message(candidate.uid).await? else {
                debug!(uid = candidate.uid, "message disappeared before fetch");
                continue;
            };
            let message = Message::parse(&raw.raw);
            let body = decode_body(&raw, &message);
            if !filters.matches_body(&body) {
                debug!(uid = candidate.uid, "body does not match");
                continue;
            }

            let attachments = save_attachments(&message, &self.config.attachment_dir).await?;
            if self.config.mark_seen {
                session.mark_seen(candidate.uid).await?;
            }

            return Ok(Some(MatchedEmail {
                message_id: envelope.uid,
                recipient: envelope.recipient,
                sender: envelope.sender,
                subject: envelope.subject,
                body,
                attachments,
                date: envelope.date,
            }));
        }

        Ok(None)
    }
}
