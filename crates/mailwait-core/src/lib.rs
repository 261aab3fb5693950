//! # mailwait-core
//!
//! Wait for test email in an IMAP mailbox.
//!
//! This crate provides:
//! - A bounded poll loop that reopens the mailbox every iteration and
//!   returns the newest unseen message matching the caller's filters
//! - Sender, recipient, subject and body filters
//! - Attachment extraction to a local directory
//! - Link extraction from matched bodies
//! - The [`EmailClient`] facade used by test code
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwait_core::{EmailClient, WaitOptions};
//!
//! let client = EmailClient::init_email_client("imap.example.com", "qa@example.com", "secret");
//! let options = WaitOptions::from_pairs([("subject", "^Welcome"), ("timeout", "60")])?;
//! let email = client.wait_for_email(&options).await?;
//! for link in client.get_links_from_email(&email) {
//!     println!("{link}");
//! }
//! client.delete_email(&email).await?;
//! ```

#![forbid(unsafe_code)]

pub mod attachments;
pub mod client;
pub mod config;
pub mod email;
mod error;
pub mod filter;
pub mod imap;
pub mod links;
pub mod mailbox;
pub mod matcher;
pub mod options;
pub mod poller;

pub use attachments::save_attachments;
pub use client::EmailClient;
pub use config::{ClientConfig, Security};
pub use email::MatchedEmail;
pub use error::{Error, Result};
pub use filter::{FilterSpec, address_matches};
pub use imap::{ImapConnector, ImapSession};
pub use links::{extract_links, get_links_from_email};
pub use mailbox::{
    Candidate, Connector, MailboxSession, RawMessage, SearchCriteria, with_session,
};
pub use matcher::Envelope;
pub use options::{DEFAULT_POLL_FREQUENCY, DEFAULT_TIMEOUT, WaitOptions};
pub use poller::Poller;
