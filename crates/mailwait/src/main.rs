//! `mailwait` - wait for test email from the command line.
//!
//! Connection settings come from flags or `MAILWAIT_*` environment
//! variables; results are printed as JSON on stdout and logs go to stderr.

#![forbid(unsafe_code)]

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mailwait_core::{ClientConfig, EmailClient, MatchedEmail, WaitOptions};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: Connection,

    #[command(subcommand)]
    command: Command,
}

/// Mailbox connection settings.
#[derive(Args, Debug)]
struct Connection {
    /// IMAP server hostname
    #[arg(long, global = true, env = "MAILWAIT_HOST")]
    host: Option<String>,

    /// IMAP server port
    #[arg(long, global = true, env = "MAILWAIT_PORT")]
    port: Option<String>,

    /// tls, starttls or plain
    #[arg(long, global = true, env = "MAILWAIT_SECURITY")]
    security: Option<String>,

    /// Login address
    #[arg(long, global = true, env = "MAILWAIT_EMAIL")]
    email: Option<String>,

    /// Login password
    #[arg(long, global = true, env = "MAILWAIT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Folder to poll
    #[arg(long, global = true, env = "MAILWAIT_FOLDER")]
    folder: Option<String>,

    /// Directory attachments are saved to
    #[arg(long, global = true, env = "MAILWAIT_ATTACHMENT_DIR")]
    attachment_dir: Option<String>,
}

impl Connection {
    fn lookup(&self, key: &str) -> Option<String> {
        let value = match key {
            "MAILWAIT_HOST" => &self.host,
            "MAILWAIT_PORT" => &self.port,
            "MAILWAIT_SECURITY" => &self.security,
            "MAILWAIT_EMAIL" => &self.email,
            "MAILWAIT_PASSWORD" => &self.password,
            "MAILWAIT_FOLDER" => &self.folder,
            "MAILWAIT_ATTACHMENT_DIR" => &self.attachment_dir,
            _ => return None,
        };
        value.clone()
    }

    fn config(&self) -> Result<ClientConfig> {
        ClientConfig::from_lookup(|key| self.lookup(key)).context("invalid mailbox settings")
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Wait for a matching message and print it as JSON
    Wait {
        /// Expected sender address
        #[arg(long)]
        sender: Option<String>,
        /// Expected recipient address
        #[arg(long)]
        recipient: Option<String>,
        /// Regex matched at the start of the subject
        #[arg(long)]
        subject: Option<String>,
        /// Regex searched in the body
        #[arg(long)]
        body: Option<String>,
        /// Seconds to wait in total
        #[arg(long)]
        timeout: Option<String>,
        /// Seconds between polls
        #[arg(long)]
        poll_frequency: Option<String>,
        /// Leave the matched message unseen
        #[arg(long)]
        keep_unseen: bool,
    },
    /// Flag a message deleted by its UID
    Delete {
        /// UID from the `messageId` field
        message_id: u32,
        /// Expunge after flagging
        #[arg(long)]
        expunge: bool,
    },
    /// Print the links of a matched message, one per line
    Links {
        /// JSON file written by `wait`, or `-` for stdin
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailwait=info,mailwait_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Wait {
            sender,
            recipient,
            subject,
            body,
            timeout,
            poll_frequency,
            keep_unseen,
        } => {
            let pairs = [
                ("sender", sender),
                ("recipient", recipient),
                ("subject", subject),
                ("body", body),
                ("timeout", timeout),
                ("poll_frequency", poll_frequency),
            ]
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)));
            let options = WaitOptions::from_pairs(pairs)?;

            let mut config = cli.connection.config()?;
            config.mark_seen = !keep_unseen;
            let client = EmailClient::new(config);

            let email = client.wait_for_email(&options).await?;
            println!("{}", serde_json::to_string_pretty(&email)?);
        }
        Command::Delete {
            message_id,
            expunge,
        } => {
            let mut config = cli.connection.config()?;
            config.expunge_on_delete |= expunge;
            let client = EmailClient::new(config);

            let email = MatchedEmail {
                message_id,
                ..MatchedEmail::default()
            };
            client
                .delete_email(&email)
                .await
                .with_context(|| format!("failed to delete message {message_id}"))?;
        }
        Command::Links { input } => {
            let email = read_matched(&input)?;
            let links = mailwait_core::get_links_from_email(&email);
            info!(count = links.len(), "extracted links");
            for link in links {
                println!("{link}");
            }
        }
    }

    Ok(())
}

fn read_matched(input: &Path) -> Result<MatchedEmail> {
    let json = if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("failed to read {}", input.display()))?
    };
    serde_json::from_str(&json).context("input is not a matched email")
}
