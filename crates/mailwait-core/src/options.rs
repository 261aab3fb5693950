//! Options accepted by `wait_for_email`.

use std::time::Duration;

use serde::Deserialize;

use crate::config::seconds;
use crate::filter::FilterSpec;
use crate::{Error, Result};

/// Default pause between polls.
pub const DEFAULT_POLL_FREQUENCY: Duration = Duration::from_secs(10);

/// Default total wait.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Parsed option set of a wait call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WaitOptions {
    /// Pause between polls.
    #[serde(deserialize_with = "seconds::deserialize")]
    pub poll_frequency: Duration,
    /// Total time to wait for a match.
    #[serde(deserialize_with = "seconds::deserialize")]
    pub timeout: Duration,
    /// Expected sender address.
    pub sender: Option<String>,
    /// Expected recipient address.
    pub recipient: Option<String>,
    /// Regex matched at the start of the decoded subject.
    pub subject: Option<String>,
    /// Regex searched in the decoded body.
    pub body: Option<String>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_frequency: DEFAULT_POLL_FREQUENCY,
            timeout: DEFAULT_TIMEOUT,
            sender: None,
            recipient: None,
            subject: None,
            body: None,
        }
    }
}

impl WaitOptions {
    /// Builds options from `key=value` style pairs.
    ///
    /// Recognized keys: `poll_frequency`, `timeout` (seconds, integer or
    /// decimal), `sender`, `recipient`, `subject`, `body`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOption`] for unknown keys and malformed
    /// durations.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut options = Self::default();

        for (key, value) in pairs {
            let key = key.as_ref();
            let value: String = value.into();
            match key {
                "poll_frequency" => options.poll_frequency = parse_duration(key, &value)?,
                "timeout" => options.timeout = parse_duration(key, &value)?,
                "sender" => options.sender = Some(value),
                "recipient" => options.recipient = Some(value),
                "subject" => options.subject = Some(value),
                "body" => options.body = Some(value),
                other => {
                    return Err(Error::InvalidOption(format!("unknown option {other:?}")));
                }
            }
        }

        options.validate()?;
        Ok(options)
    }

    /// Checks values that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOption`] for a zero poll frequency.
    pub fn validate(&self) -> Result<()> {
        if self.poll_frequency.is_zero() {
            return Err(Error::InvalidOption(
                "poll_frequency must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Compiles the filter predicates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if a pattern does not compile.
    pub fn filters(&self) -> Result<FilterSpec> {
        FilterSpec::new(
            self.sender.as_deref(),
            self.recipient.as_deref(),
            self.subject.as_deref(),
            self.body.as_deref(),
        )
    }
}

fn parse_duration(key: &str, value: &str) -> Result<Duration> {
    seconds::parse(value).ok_or_else(|| {
        Error::InvalidOption(format!("{key} must be a non-negative number of seconds, got {value:?}"))
    })
}
