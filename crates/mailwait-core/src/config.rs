//! Connection and polling configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// Implicit TLS (connect directly with TLS, port 993).
    #[default]
    Tls,
    /// STARTTLS upgrade after plaintext connect (port 143).
    StartTls,
    /// No encryption (port 143); local test servers only.
    Plain,
}

impl FromStr for Security {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tls" | "ssl" => Ok(Self::Tls),
            "starttls" => Ok(Self::StartTls),
            "plain" | "none" => Ok(Self::Plain),
            other => Err(Error::Config(format!(
                "unknown security mode {other:?} (expected tls, starttls or plain)"
            ))),
        }
    }
}

impl From<Security> for mailwait_imap::Security {
    fn from(security: Security) -> Self {
        match security {
            Security::Tls => Self::Tls,
            Security::StartTls => Self::StartTls,
            Security::Plain => Self::Plain,
        }
    }
}

/// Everything needed to reach the test mailbox.
///
/// Built once (from [`ClientConfig::new`], [`ClientConfig::from_env`] or
/// serde) and handed to the session factory.
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    /// IMAP server hostname.
    pub host: String,
    /// IMAP server port; defaults from `security`.
    #[serde(default)]
    pub port: Option<u16>,
    /// Security mode.
    #[serde(default)]
    pub security: Security,
    /// Login name, normally the mailbox address.
    #[serde(alias = "email")]
    pub email_address: String,
    /// Login password.
    pub password: String,
    /// Folder to poll.
    #[serde(default = "default_folder")]
    pub folder: String,
    /// Only unseen mail received within this window is considered.
    #[serde(default = "default_look_back", deserialize_with = "seconds::deserialize")]
    pub look_back: Duration,
    /// TCP + TLS connect timeout.
    #[serde(default = "default_connect_timeout", deserialize_with = "seconds::deserialize")]
    pub connect_timeout: Duration,
    /// Per-command timeout.
    #[serde(default = "default_io_timeout", deserialize_with = "seconds::deserialize")]
    pub io_timeout: Duration,
    /// Directory attachments are written to.
    #[serde(default = "default_attachment_dir")]
    pub attachment_dir: PathBuf,
    /// Flag the matched message `\Seen`.
    #[serde(default = "default_true")]
    pub mark_seen: bool,
    /// Issue EXPUNGE after flagging a message `\Deleted`.
    #[serde(default)]
    pub expunge_on_delete: bool,
}

fn default_folder() -> String {
    "INBOX".to_string()
}

const fn default_look_back() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

const fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_io_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_attachment_dir() -> PathBuf {
    PathBuf::from(".")
}

const fn default_true() -> bool {
    true
}

impl ClientConfig {
    /// Creates a configuration with defaults for everything but the
    /// server and credentials.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        email_address: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::default(),
            email_address: email_address.into(),
            password: password.into(),
            folder: default_folder(),
            look_back: default_look_back(),
            connect_timeout: default_connect_timeout(),
            io_timeout: default_io_timeout(),
            attachment_dir: default_attachment_dir(),
            mark_seen: true,
            expunge_on_delete: false,
        }
    }

    /// Reads the configuration from `MAILWAIT_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ClientConfig::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or a
    /// value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("{key} is not set")))
        };

        let mut config = Self::new(
            required("MAILWAIT_HOST")?,
            required("MAILWAIT_EMAIL")?,
            required("MAILWAIT_PASSWORD")?,
        );

        if let Some(port) = lookup("MAILWAIT_PORT") {
            config.port = Some(
                port.trim()
                    .parse()
                    .map_err(|_| Error::Config(format!("MAILWAIT_PORT is not a port: {port:?}")))?,
            );
        }
        if let Some(security) = lookup("MAILWAIT_SECURITY") {
            config.security = security.parse()?;
        }
        if let Some(folder) = lookup("MAILWAIT_FOLDER") {
            config.folder = folder;
        }
        if let Some(dir) = lookup("MAILWAIT_ATTACHMENT_DIR") {
            config.attachment_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// Builds the protocol-level connection configuration.
    #[must_use]
    pub fn imap_config(&self) -> mailwait_imap::Config {
        mailwait_imap::Config::new(
            self.host.clone(),
            self.security.into(),
            self.port,
            self.connect_timeout,
            self.io_timeout,
        )
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("email_address", &self.email_address)
            .field("password", &"<redacted>")
            .field("folder", &self.folder)
            .field("look_back", &self.look_back)
            .field("connect_timeout", &self.connect_timeout)
            .field("io_timeout", &self.io_timeout)
            .field("attachment_dir", &self.attachment_dir)
            .field("mark_seen", &self.mark_seen)
            .field("expunge_on_delete", &self.expunge_on_delete)
            .finish()
    }
}

/// Durations written as (possibly fractional) seconds.
pub(crate) mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, de};

    /// Parses `"2"`, `"2.5"` or `" 10 "` as seconds.
    pub fn parse(value: &str) -> Option<Duration> {
        let secs: f64 = value.trim().parse().ok()?;
        from_f64(secs)
    }

    fn from_f64(secs: f64) -> Option<Duration> {
        if secs.is_finite() && secs >= 0.0 {
            Duration::try_from_secs_f64(secs).ok()
        } else {
            None
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Float(f64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let duration = match Raw::deserialize(deserializer)? {
            Raw::Int(secs) => Some(Duration::from_secs(secs)),
            Raw::Float(secs) => from_f64(secs),
            Raw::Text(text) => parse(&text),
        };
        duration.ok_or_else(|| de::Error::custom("expected a non-negative number of seconds"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("imap.example.com", "qa@example.com", "secret");
        assert_eq!(config.folder, "INBOX");
        assert_eq!(config.look_back, Duration::from_secs(86_400));
        assert!(config.mark_seen);
        assert!(!config.expunge_on_delete);

        let imap = config.imap_config();
        assert_eq!(imap.port, 993);
        assert_eq!(imap.security, mailwait_imap::Security::Tls);
        assert_eq!(imap.io_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ClientConfig::new("imap.example.com", "qa@example.com", "hunter2");
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_from_lookup() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("MAILWAIT_HOST", "localhost"),
            ("MAILWAIT_EMAIL", "qa@example.com"),
            ("MAILWAIT_PASSWORD", "secret"),
            ("MAILWAIT_PORT", "3143"),
            ("MAILWAIT_SECURITY", "plain"),
            ("MAILWAIT_FOLDER", "Tests"),
        ]))
        .unwrap();
        assert_eq!(config.folder, "Tests");
        let imap = config.imap_config();
        assert_eq!(imap.port, 3143);
        assert_eq!(imap.security, mailwait_imap::Security::Plain);
    }

    #[test]
    fn test_from_lookup_missing_and_invalid() {
        let err = ClientConfig::from_lookup(lookup(&[("MAILWAIT_HOST", "localhost")])).unwrap_err();
        assert!(err.to_string().contains("MAILWAIT_EMAIL"));

        let err = ClientConfig::from_lookup(lookup(&[
            ("MAILWAIT_HOST", "localhost"),
            ("MAILWAIT_EMAIL", "qa@example.com"),
            ("MAILWAIT_PASSWORD", "secret"),
            ("MAILWAIT_SECURITY", "ssl3"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_deserialize() {
        let config: ClientConfig = serde_json::from_str(
            r#"{
                "host": "imap.example.com",
                "email": "qa@example.com",
                "password": "secret",
                "security": "starttls",
                "look_back": 3600,
                "io_timeout": "7.5",
                "expunge_on_delete": true
            }"#,
        )
        .unwrap();
        assert_eq!(config.email_address, "qa@example.com");
        assert_eq!(config.security, Security::StartTls);
        assert_eq!(config.look_back, Duration::from_secs(3600));
        assert_eq!(config.io_timeout, Duration::from_millis(7500));
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert!(config.expunge_on_delete);
        assert_eq!(config.imap_config().port, 143);
    }

    #[test]
    fn test_seconds_parse() {
        assert_eq!(seconds::parse("2"), Some(Duration::from_secs(2)));
        assert_eq!(seconds::parse(" 0.5 "), Some(Duration::from_millis(500)));
        assert_eq!(seconds::parse("-1"), None);
        assert_eq!(seconds::parse("NaN"), None);
        assert_eq!(seconds::parse("soon"), None);
    }
}
