//! # mailwait-imap
//!
//! A small async IMAP client covering what a test-mail poller needs:
//! LOGIN, SELECT, UID SEARCH, UID FETCH, UID STORE, EXPUNGE and LOGOUT.
//!
//! ## Features
//!
//! - **Type-state connection management**: `NotAuthenticated` →
//!   `Authenticated` → `Selected` is enforced at compile time
//! - **TLS via rustls**: implicit TLS or STARTTLS, no OpenSSL
//! - **Timeouts**: every command round-trip is bounded by the configured
//!   I/O timeout
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//!
//! use mailwait_imap::{Client, Config, FetchAttribute, SearchCriteria, Security};
//!
//! #[tokio::main]
//! async fn main() -> mailwait_imap::Result<()> {
//!     let timeout = Duration::from_secs(30);
//!     let config = Config::new("imap.example.com", Security::Tls, None, timeout, timeout);
//!     let client = Client::connect(&config).await?;
//!     let client = client.login("qa@example.com", "password").await?;
//!     let mut client = client.select("INBOX").await?;
//!
//!     let uids = client.uid_search(&SearchCriteria::Unseen).await?;
//!     let headers = client
//!         .uid_fetch(&uids, &[FetchAttribute::header_peek()])
//!         .await?;
//!     println!("{} unseen messages", headers.len());
//!
//!     client.logout().await
//! }
//! ```

pub mod client;
pub mod command;
pub mod config;
mod error;
pub mod framed;
pub mod response;
pub mod stream;
pub mod tag;

pub use client::{Authenticated, Client, NotAuthenticated, Selected};
pub use command::{Command, FetchAttribute, Flag, SearchCriteria, StoreAction, format_imap_date};
pub use config::{Config, Security};
pub use error::{Error, Result};
pub use framed::FramedStream;
pub use response::{FetchData, Response, Status, Untagged};
pub use stream::{ImapStream, connect};
pub use tag::TagGenerator;
