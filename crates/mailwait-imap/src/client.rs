//! Type-state IMAP client.
//!
//! The connection state is tracked in the type parameter so that only the
//! commands valid in a state can be called:
//!
//! ```text
//! NotAuthenticated ── login() ──→ Authenticated ── select() ──→ Selected
//! ```
//!
//! Every state can `logout()`, which consumes the client.

#![allow(clippy::missing_errors_doc)]

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, trace};

use crate::command::{Command, FetchAttribute, SearchCriteria, StoreAction};
use crate::config::{Config, Security};
use crate::framed::FramedStream;
use crate::response::{self, FetchData, Response, Status, Untagged};
use crate::stream::{self, ImapStream};
use crate::tag::TagGenerator;
use crate::{Error, Result};

/// State before LOGIN.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// State after a successful LOGIN.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// State after a successful SELECT.
#[derive(Debug, Clone)]
pub struct Selected {
    mailbox: String,
    exists: u32,
}

/// IMAP client connection; `State` is one of the marker types above.
pub struct Client<S, State> {
    stream: FramedStream<S>,
    tags: TagGenerator,
    io_timeout: Duration,
    state: State,
}

impl<S, State: std::fmt::Debug> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tags", &self.tags)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Client<ImapStream, NotAuthenticated> {
    /// Connects according to `config`, reads the greeting and performs
    /// STARTTLS when requested.
    pub async fn connect(config: &Config) -> Result<Self> {
        let raw = stream::connect(config).await?;
        let client = Self::from_stream(raw, config.io_timeout).await?;

        if config.security != Security::StartTls {
            return Ok(client);
        }

        let Self {
            mut stream,
            mut tags,
            io_timeout,
            state,
        } = client;
        let tag = tags.next_tag();
        let cmd = Command::StartTls.serialize(&tag)?;
        let responses = exchange(&mut stream, &tag, &cmd, io_timeout).await?;
        check_completion(&responses, &tag)?;

        debug!(host = %config.host, "upgrading connection with STARTTLS");
        let upgraded = stream.into_inner().upgrade_to_tls(&config.host).await?;
        Ok(Self {
            stream: FramedStream::new(upgraded),
            tags,
            io_timeout,
            state,
        })
    }
}

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an established stream and reads the server greeting.
    pub async fn from_stream(stream: S, io_timeout: Duration) -> Result<Self> {
        let mut stream = FramedStream::new(stream);
        let greeting = tokio::time::timeout(io_timeout, stream.read_response())
            .await
            .map_err(|_| Error::Timeout(io_timeout))??;

        match response::parse(&greeting)? {
            Response::Untagged(Untagged::Status {
                status: Status::Ok | Status::PreAuth,
                text,
            }) => trace!(%text, "server greeting"),
            Response::Untagged(Untagged::Status {
                status: Status::Bye,
                text,
            }) => return Err(Error::Bye(text)),
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        }

        Ok(Self {
            stream,
            tags: TagGenerator::default(),
            io_timeout,
            state: NotAuthenticated,
        })
    }

    /// Authenticates with LOGIN.
    ///
    /// A NO completion is reported as [`Error::Auth`].
    pub async fn login(mut self, username: &str, password: &str) -> Result<Client<S, Authenticated>> {
        let cmd = Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        };
        match self.run(&cmd).await {
            Ok(_) => {}
            Err(Error::No(text)) => return Err(Error::Auth(text)),
            Err(e) => return Err(e),
        }
        Ok(self.transition(Authenticated))
    }
}

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a mailbox (read-write).
    pub async fn select(mut self, mailbox: &str) -> Result<Client<S, Selected>> {
        let cmd = Command::Select {
            mailbox: mailbox.to_string(),
        };
        let untagged = self.run(&cmd).await?;

        let exists = untagged
            .iter()
            .filter_map(|raw| match response::parse(raw) {
                Ok(Response::Untagged(Untagged::Exists(n))) => Some(n),
                _ => None,
            })
            .last()
            .unwrap_or(0);

        Ok(self.transition(Selected {
            mailbox: mailbox.to_string(),
            exists,
        }))
    }
}

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the selected mailbox name.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        &self.state.mailbox
    }

    /// Returns the message count reported by SELECT.
    #[must_use]
    pub const fn exists(&self) -> u32 {
        self.state.exists
    }

    /// Runs `UID SEARCH` and returns matching UIDs.
    pub async fn uid_search(&mut self, criteria: &SearchCriteria) -> Result<Vec<u32>> {
        let cmd = Command::UidSearch {
            criteria: criteria.clone(),
        };
        let untagged = self.run(&cmd).await?;

        let mut uids = Vec::new();
        for raw in &untagged {
            if let Response::Untagged(Untagged::Search(ids)) = response::parse(raw)? {
                uids.extend(ids);
            }
        }
        Ok(uids)
    }

    /// Runs `UID FETCH` and returns one entry per returned message.
    ///
    /// Entries without a UID (unsolicited flag updates) are dropped.
    pub async fn uid_fetch(
        &mut self,
        uids: &[u32],
        items: &[FetchAttribute],
    ) -> Result<Vec<FetchData>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let mut items = items.to_vec();
        if !items.contains(&FetchAttribute::Uid) {
            items.insert(0, FetchAttribute::Uid);
        }
        let cmd = Command::UidFetch {
            uids: uids.to_vec(),
            items,
        };
        let untagged = self.run(&cmd).await?;

        let mut results = Vec::new();
        for raw in &untagged {
            if let Response::Untagged(Untagged::Fetch { data, .. }) = response::parse(raw)?
                && data.uid.is_some()
            {
                results.push(data);
            }
        }
        Ok(results)
    }

    /// Runs a silent `UID STORE`.
    pub async fn uid_store(&mut self, uids: &[u32], action: StoreAction) -> Result<()> {
        let cmd = Command::UidStore {
            uids: uids.to_vec(),
            action,
        };
        self.run(&cmd).await.map(drop)
    }

    /// Permanently removes messages flagged `\Deleted`.
    pub async fn expunge(&mut self) -> Result<()> {
        self.run(&Command::Expunge).await.map(drop)
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Sends LOGOUT and closes the connection.
    pub async fn logout(mut self) -> Result<()> {
        self.run(&Command::Logout).await?;
        // The server has already said BYE; a failing shutdown changes nothing.
        let _ = self.stream.shutdown().await;
        Ok(())
    }

    /// Sends `cmd`, waits for its completion and returns the untagged
    /// responses that preceded it.
    async fn run(&mut self, cmd: &Command) -> Result<Vec<Vec<u8>>> {
        let tag = self.tags.next_tag();
        let wire = cmd.serialize(&tag)?;
        let mut responses = exchange(&mut self.stream, &tag, &wire, self.io_timeout).await?;
        check_completion(&responses, &tag)?;
        responses.pop();
        Ok(responses)
    }

    fn transition<Next>(self, state: Next) -> Client<S, Next> {
        Client {
            stream: self.stream,
            tags: self.tags,
            io_timeout: self.io_timeout,
            state,
        }
    }
}

async fn exchange<S>(
    stream: &mut FramedStream<S>,
    tag: &str,
    wire: &[u8],
    io_timeout: Duration,
) -> Result<Vec<Vec<u8>>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let round_trip = async {
        stream.write_command(wire).await?;
        stream.read_until_tagged(tag).await
    };
    tokio::time::timeout(io_timeout, round_trip)
        .await
        .map_err(|_| Error::Timeout(io_timeout))?
}

/// Maps the tagged completion (the last response) to a result.
fn check_completion(responses: &[Vec<u8>], tag: &str) -> Result<()> {
    let last = responses
        .last()
        .ok_or_else(|| Error::Protocol("missing tagged response".to_string()))?;

    match response::parse(last)? {
        Response::Tagged {
            tag: resp_tag,
            status,
            text,
        } if resp_tag == tag => match status {
            Status::Ok | Status::PreAuth => Ok(()),
            Status::No => Err(Error::No(text)),
            Status::Bad => Err(Error::Bad(text)),
            Status::Bye => Err(Error::Bye(text)),
        },
        other => Err(Error::Protocol(format!(
            "expected completion for {tag}, got {other:?}"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_check_completion() {
        let ok = vec![b"* SEARCH 1\r\n".to_vec(), b"A0001 OK done\r\n".to_vec()];
        assert!(check_completion(&ok, "A0001").is_ok());

        let no = vec![b"A0001 NO [NONEXISTENT] no such mailbox\r\n".to_vec()];
        assert!(matches!(check_completion(&no, "A0001"), Err(Error::No(_))));

        let bad = vec![b"A0001 BAD parse error\r\n".to_vec()];
        assert!(matches!(check_completion(&bad, "A0001"), Err(Error::Bad(_))));

        assert!(matches!(
            check_completion(&[], "A0001"),
            Err(Error::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_bye_greeting_is_error() {
        let mock = Builder::new().read(b"* BYE too many connections\r\n").build();
        let err = Client::from_stream(mock, TIMEOUT).await.unwrap_err();
        assert!(matches!(err, Error::Bye(text) if text == "too many connections"));
    }

    #[tokio::test]
    async fn test_login_no_is_auth_error() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN qa secret\r\n")
            .read(b"A0000 NO [AUTHENTICATIONFAILED] bad credentials\r\n")
            .build();
        let client = Client::from_stream(mock, TIMEOUT).await.unwrap();
        let err = client.login("qa", "secret").await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[tokio::test]
    async fn test_select_records_exists() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN qa secret\r\n")
            .read(b"A0000 OK logged in\r\n")
            .write(b"A0001 SELECT INBOX\r\n")
            .read(b"* 7 EXISTS\r\n* 0 RECENT\r\n")
            .read(b"A0001 OK [READ-WRITE] selected\r\n")
            .build();
        let client = Client::from_stream(mock, TIMEOUT).await.unwrap();
        let client = client.login("qa", "secret").await.unwrap();
        let client = client.select("INBOX").await.unwrap();
        assert_eq!(client.mailbox(), "INBOX");
        assert_eq!(client.exists(), 7);
    }
}
