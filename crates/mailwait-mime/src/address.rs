//! RFC 5322 address lists, parsed loosely.

use std::fmt;

use crate::encoding::decode_header_value;

/// One mailbox from a `From`/`To`/`Cc` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Display name, with encoded-words decoded.
    pub name: Option<String>,
    /// The bare `local@domain` address.
    pub email: String,
}

impl Address {
    /// Parses a single mailbox: `Name <addr>`, `<addr>` or `addr`.
    ///
    /// Returns `None` for empty input or group syntax without a mailbox.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = strip_comments(value.trim());
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        if let Some(open) = value.rfind('<') {
            let close = value[open..].find('>').map_or(value.len(), |i| open + i);
            let email = value[open + 1..close].trim().to_string();
            if email.is_empty() {
                return None;
            }
            let name = value[..open].trim().trim_matches('"').trim();
            let name = (!name.is_empty()).then(|| decode_header_value(name));
            return Some(Self { name, email });
        }

        // `group:` prefixes and trailing `;` are not part of the address.
        let email = value
            .rsplit_once(':')
            .map_or(value, |(_, rest)| rest)
            .trim_end_matches(';')
            .trim();
        (!email.is_empty()).then(|| Self {
            name: None,
            email: email.to_string(),
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => f.write_str(&self.email),
        }
    }
}

/// Parses a comma-separated address list.
///
/// Commas inside quoted display names and angle brackets do not split.
#[must_use]
pub fn parse_address_list(value: &str) -> Vec<Address> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut in_angle = false;

    for (i, c) in value.char_indices() {
        match c {
            '"' if !in_angle => in_quotes = !in_quotes,
            '<' if !in_quotes => in_angle = true,
            '>' if !in_quotes => in_angle = false,
            ',' if !in_quotes && !in_angle => {
                items.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&value[start..]);

    items.into_iter().filter_map(Address::parse).collect()
}

/// Removes `(comments)` outside quoted strings.
fn strip_comments(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut depth = 0usize;
    let mut in_quotes = false;

    for c in value.chars() {
        match c {
            '"' if depth == 0 => {
                in_quotes = !in_quotes;
                out.push(c);
            }
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes && depth > 0 => depth -= 1,
            _ if depth > 0 => {}
            _ => out.push(c),
        }
    }
    out
}
