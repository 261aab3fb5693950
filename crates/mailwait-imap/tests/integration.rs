//! Integration tests for the IMAP client.
//!
//! These tests use a mock stream to simulate IMAP server responses
//! without requiring a real server connection.

#![allow(clippy::unwrap_used)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use mailwait_imap::{Client, Error, FetchAttribute, Flag, SearchCriteria, StoreAction};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Mock stream that returns predefined responses and records writes.
struct MockStream {
    responses: Cursor<Vec<u8>>,
    sent: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    fn new(responses: &[u8]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            responses: Cursor::new(responses.to_vec()),
            sent: Arc::clone(&sent),
        };
        (stream, sent)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.responses.get_ref();
        let pos = usize::try_from(self.responses.position()).unwrap();

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.responses.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn sent_text(sent: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8(sent.lock().unwrap().clone()).unwrap()
}

#[tokio::test]
async fn test_full_poll_session() {
    let script = concat!(
        "* OK [CAPABILITY IMAP4rev1] Dovecot ready.\r\n",
        "A0000 OK Logged in\r\n",
        "* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n",
        "* 3 EXISTS\r\n",
        "* 0 RECENT\r\n",
        "A0001 OK [READ-WRITE] Select completed\r\n",
        "* SEARCH 11 12\r\n",
        "A0002 OK Search completed\r\n",
        "* 2 FETCH (UID 11 INTERNALDATE \"18-Oct-2026 09:00:00 +0000\" BODY[HEADER] {16}\r\n",
        "Subject: one\r\n\r\n",
        ")\r\n",
        "* 3 FETCH (UID 12 INTERNALDATE \"18-Oct-2026 09:05:00 +0000\" BODY[HEADER] {16}\r\n",
        "Subject: two\r\n\r\n",
        ")\r\n",
        "A0003 OK Fetch completed\r\n",
        "A0004 OK Store completed\r\n",
        "* BYE Logging out\r\n",
        "A0005 OK Logout completed\r\n",
    );
    let (stream, sent) = MockStream::new(script.as_bytes());

    let client = Client::from_stream(stream, TIMEOUT).await.unwrap();
    let client = client.login("qa@example.com", "secret").await.unwrap();
    let mut client = client.select("INBOX").await.unwrap();
    assert_eq!(client.exists(), 3);

    let since = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
    let uids = client
        .uid_search(&SearchCriteria::And(vec![
            SearchCriteria::Unseen,
            SearchCriteria::Since(since),
        ]))
        .await
        .unwrap();
    assert_eq!(uids, vec![11, 12]);

    let fetched = client
        .uid_fetch(
            &uids,
            &[FetchAttribute::InternalDate, FetchAttribute::header_peek()],
        )
        .await
        .unwrap();
    assert_eq!(fetched.len(), 2);
    assert_eq!(fetched[1].uid, Some(12));
    assert_eq!(fetched[1].header.as_deref(), Some(&b"Subject: two\r\n\r\n"[..]));
    assert!(fetched[0].internal_date < fetched[1].internal_date);

    client
        .uid_store(&[12], StoreAction::AddFlags(vec![Flag::Seen]))
        .await
        .unwrap();
    client.logout().await.unwrap();

    let sent = sent_text(&sent);
    let expected = concat!(
        "A0000 LOGIN qa@example.com secret\r\n",
        "A0001 SELECT INBOX\r\n",
        "A0002 UID SEARCH UNSEEN SINCE 18-Oct-2026\r\n",
        "A0003 UID FETCH 11:12 (UID INTERNALDATE BODY.PEEK[HEADER])\r\n",
        "A0004 UID STORE 12 +FLAGS.SILENT (\\Seen)\r\n",
        "A0005 LOGOUT\r\n",
    );
    assert_eq!(sent, expected);
}

#[tokio::test]
async fn test_empty_search_skips_fetch() {
    let script = concat!(
        "* OK ready\r\n",
        "A0000 OK Logged in\r\n",
        "A0001 OK Select completed\r\n",
        "* SEARCH\r\n",
        "A0002 OK Search completed\r\n",
    );
    let (stream, sent) = MockStream::new(script.as_bytes());

    let client = Client::from_stream(stream, TIMEOUT).await.unwrap();
    let client = client.login("qa", "secret").await.unwrap();
    let mut client = client.select("INBOX").await.unwrap();

    let uids = client.uid_search(&SearchCriteria::Unseen).await.unwrap();
    assert!(uids.is_empty());
    let fetched = client
        .uid_fetch(&uids, &[FetchAttribute::header_peek()])
        .await
        .unwrap();
    assert!(fetched.is_empty());
    assert!(!sent_text(&sent).contains("FETCH"));
}

#[tokio::test]
async fn test_delete_and_expunge() {
    let script = concat!(
        "* OK ready\r\n",
        "A0000 OK Logged in\r\n",
        "A0001 OK Select completed\r\n",
        "A0002 OK Store completed\r\n",
        "* 4 EXPUNGE\r\n",
        "A0003 OK Expunge completed\r\n",
    );
    let (stream, sent) = MockStream::new(script.as_bytes());

    let client = Client::from_stream(stream, TIMEOUT).await.unwrap();
    let client = client.login("qa", "secret").await.unwrap();
    let mut client = client.select("INBOX").await.unwrap();

    client
        .uid_store(&[42], StoreAction::AddFlags(vec![Flag::Deleted]))
        .await
        .unwrap();
    client.expunge().await.unwrap();

    let sent = sent_text(&sent);
    assert!(sent.contains("A0002 UID STORE 42 +FLAGS.SILENT (\\Deleted)\r\n"));
    assert!(sent.ends_with("A0003 EXPUNGE\r\n"));
}

#[tokio::test]
async fn test_select_missing_mailbox() {
    let script = concat!(
        "* OK ready\r\n",
        "A0000 OK Logged in\r\n",
        "A0001 NO [NONEXISTENT] Mailbox doesn't exist: Tests\r\n",
    );
    let (stream, _sent) = MockStream::new(script.as_bytes());

    let client = Client::from_stream(stream, TIMEOUT).await.unwrap();
    let client = client.login("qa", "secret").await.unwrap();
    let err = client.select("Tests").await.unwrap_err();
    assert!(matches!(err, Error::No(text) if text.contains("NONEXISTENT")));
}

#[tokio::test]
async fn test_connection_closed_mid_command() {
    let script = "* OK ready\r\n";
    let (stream, _sent) = MockStream::new(script.as_bytes());

    let client = Client::from_stream(stream, TIMEOUT).await.unwrap();
    let err = client.login("qa", "secret").await.unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
