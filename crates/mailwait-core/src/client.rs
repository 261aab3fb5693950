//! The caller-facing facade over configuration and the poller.

use tracing::info;

use crate::Result;
use crate::config::ClientConfig;
use crate::email::MatchedEmail;
use crate::imap::ImapConnector;
use crate::links;
use crate::mailbox::{Connector, MailboxSession, with_session};
use crate::options::WaitOptions;
use crate::poller::Poller;

/// Entry point for test code: holds the mailbox configuration and a
/// session factory, and exposes the wait, delete and link operations.
#[derive(Debug, Clone)]
pub struct EmailClient<C = ImapConnector> {
    connector: C,
    config: ClientConfig,
}

impl EmailClient<ImapConnector> {
    /// Creates an IMAP client with default settings for everything but
    /// the server and credentials.
    #[must_use]
    pub fn init_email_client(
        host: impl Into<String>,
        email_address: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::new(ClientConfig::new(host, email_address, password))
    }

    /// Creates an IMAP client from a full configuration.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            connector: ImapConnector::new(config.clone()),
            config,
        }
    }
}

impl<C: Connector> EmailClient<C> {
    /// Creates a client over a custom session factory.
    #[must_use]
    pub const fn with_connector(connector: C, config: ClientConfig) -> Self {
        Self { connector, config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Waits until a message matching `options` arrives.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidOption`] or
    /// [`crate::Error::InvalidPattern`] for bad options before any
    /// connection is made, and otherwise whatever
    /// [`Poller::wait_for_email`] returns.
    pub async fn wait_for_email(&self, options: &WaitOptions) -> Result<MatchedEmail> {
        options.validate()?;
        let filters = options.filters()?;

        Poller::new(&self.connector, &self.config)
            .wait_for_email(&filters, options.poll_frequency, options.timeout)
            .await
    }

    /// Flags a matched message `\Deleted`, expunging when configured.
    ///
    /// # Errors
    ///
    /// Returns any session error.
    pub async fn delete_email(&self, email: &MatchedEmail) -> Result<()> {
        let uid = email.message_id;
        let expunge = self.config.expunge_on_delete;

        with_session(&self.connector, async |session| {
            session.delete(uid, expunge).await
        })
        .await?;

        info!(message_id = uid, expunge, "Deleted email");
        Ok(())
    }

    /// Returns the `href` targets in the message body, in order.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn get_links_from_email(&self, email: &MatchedEmail) -> Vec<String> {
        links::get_links_from_email(email)
    }
}
