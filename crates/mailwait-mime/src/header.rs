//! MIME header handling.

use std::collections::HashMap;

use crate::encoding::decode_header_value;

/// Collection of message or part headers, keyed case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    headers: HashMap<String, Vec<String>>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_ascii_lowercase();
        self.headers.entry(name).or_default().push(value.into());
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|v| v.first().map(String::as_str))
    }

    /// Gets the first value for a header with encoded-words decoded.
    #[must_use]
    pub fn get_decoded(&self, name: &str) -> Option<String> {
        self.get(name).map(decode_header_value)
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Parses a header block, unfolding continuation lines.
    ///
    /// Parsing stops at the first empty line. Lines that are neither a
    /// `Name: value` field nor a continuation are ignored.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = current.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.add(name, value.trim());
            }

            if let Some((name, value)) = line.split_once(':') {
                let name = name.trim();
                if !name.is_empty() && !name.contains(' ') {
                    current = Some((name.to_string(), value.trim().to_string()));
                }
            }
        }

        if let Some((name, value)) = current {
            headers.add(name, value.trim());
        }

        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert!(headers.get("Subject").is_none());
    }

    #[test]
    fn test_headers_parse_unfolds() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: A long\r\n",
            "\tfolded subject\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n",
            "Body: not a header\r\n",
        );

        let headers = Headers::parse(text);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("To"), Some("recipient@example.com"));
        assert_eq!(headers.get("Subject"), Some("A long folded subject"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        assert!(headers.get("Body").is_none());
    }

    #[test]
    fn test_repeated_headers_keep_order() {
        let headers = Headers::parse("Received: one\nReceived: two\n\n");
        assert_eq!(headers.get_all("received"), vec!["one", "two"]);
        assert_eq!(headers.get("received"), Some("one"));
    }

    #[test]
    fn test_get_decoded() {
        let headers = Headers::parse("Subject: =?UTF-8?Q?Caf=C3=A9?= menu\r\n\r\n");
        assert_eq!(headers.get_decoded("subject").as_deref(), Some("Café menu"));
    }

    #[test]
    fn test_garbage_lines_ignored() {
        let headers = Headers::parse("not a header\nX-Ok: yes\n");
        assert_eq!(headers.get("x-ok"), Some("yes"));
        assert_eq!(headers.get_all("x-ok"), vec!["yes"]);
        assert!(Headers::parse("").get("x-ok").is_none());
    }
}
