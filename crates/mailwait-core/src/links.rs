//! Link extraction from matched message bodies.

use std::sync::LazyLock;

use regex::Regex;

use crate::email::MatchedEmail;

#[allow(clippy::expect_used)]
static HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href=['"]?([^'" >]+)"#).expect("valid href pattern"));

/// Returns every `href` target in `body`, in order of appearance.
#[must_use]
pub fn extract_links(body: &str) -> Vec<String> {
    HREF.captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Returns every `href` target in the decoded body of `email`.
#[must_use]
pub fn get_links_from_email(email: &MatchedEmail) -> Vec<String> {
    extract_links(&email.body)
}
