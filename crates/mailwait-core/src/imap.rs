//! IMAP-backed [`Connector`] and [`MailboxSession`].

use mailwait_imap::{
    Client, FetchAttribute, Flag, ImapStream, SearchCriteria as ImapCriteria, Selected,
    StoreAction,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::Result;
use crate::config::ClientConfig;
use crate::mailbox::{Candidate, Connector, MailboxSession, RawMessage, SearchCriteria};

/// Opens IMAP sessions for a [`ClientConfig`].
#[derive(Debug, Clone)]
pub struct ImapConnector {
    config: ClientConfig,
}

impl ImapConnector {
    /// Creates a connector.
    #[must_use]
    pub const fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration sessions are opened with.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Connector for ImapConnector {
    type Session = ImapSession<ImapStream>;

    async fn open(&self) -> Result<Self::Session> {
        let config = &self.config;
        info!(host = %config.host, folder = %config.folder, "Open mail box...");

        let client = Client::connect(&config.imap_config()).await?;
        let client = client.login(&config.email_address, &config.password).await?;
        let client = client.select(&config.folder).await?;

        info!(exists = client.exists(), "Open mail box success");
        Ok(ImapSession::new(client))
    }
}

/// A selected IMAP folder.
#[derive(Debug)]
pub struct ImapSession<S> {
    client: Client<S, Selected>,
}

impl<S> ImapSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wraps a client that already has a folder selected.
    #[must_use]
    pub const fn new(client: Client<S, Selected>) -> Self {
        Self { client }
    }
}

impl<S> MailboxSession for ImapSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<u32>> {
        let mut terms = Vec::with_capacity(2);
        if criteria.unseen {
            terms.push(ImapCriteria::Unseen);
        }
        terms.push(ImapCriteria::Since(criteria.since_day()));

        let uids = self.client.uid_search(&ImapCriteria::And(terms)).await?;
        debug!(count = uids.len(), since = %criteria.since_day(), "search finished");
        Ok(uids)
    }

    async fn fetch_headers(&mut self, uids: &[u32]) -> Result<Vec<Candidate>> {
        let items = [FetchAttribute::InternalDate, FetchAttribute::header_peek()];
        let fetched = self.client.uid_fetch(uids, &items).await?;

        Ok(fetched
            .into_iter()
            .filter_map(|data| {
                Some(Candidate {
                    uid: data.uid?,
                    internal_date: data.internal_date,
                    header: data.header.unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn fetch_message(&mut self, uid: u32) -> Result<Option<RawMessage>> {
        let fetched = self
            .client
            .uid_fetch(&[uid], &[FetchAttribute::full_peek()])
            .await?;

        Ok(fetched
            .into_iter()
            .find(|data| data.uid == Some(uid))
            .and_then(|data| data.body)
            .map(|raw| RawMessage {
                uid,
                raw,
                text_body: None,
            }))
    }

    async fn mark_seen(&mut self, uid: u32) -> Result<()> {
        self.client
            .uid_store(&[uid], StoreAction::AddFlags(vec![Flag::Seen]))
            .await?;
        Ok(())
    }

    async fn delete(&mut self, uid: u32, expunge: bool) -> Result<()> {
        self.client
            .uid_store(&[uid], StoreAction::AddFlags(vec![Flag::Deleted]))
            .await?;
        if expunge {
            self.client.expunge().await?;
        }
        Ok(())
    }

    async fn logout(self) -> Result<()> {
        self.client.logout().await?;
        Ok(())
    }
}
