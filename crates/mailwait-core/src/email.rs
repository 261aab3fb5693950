//! The value returned to the caller.

use serde::{Deserialize, Serialize};

/// Snapshot of the message that satisfied a wait call.
///
/// Serializes with the keys `messageId`, `recipient`, `sender`,
/// `subject`, `body`, `attachments` and `date`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedEmail {
    /// UID of the message in the polled folder.
    pub message_id: u32,
    /// First `To` mailbox, rendered as `Name <addr>` or `addr`.
    pub recipient: String,
    /// First `From` mailbox, rendered the same way.
    pub sender: String,
    /// Decoded subject.
    pub subject: String,
    /// Decoded plain-text body.
    pub body: String,
    /// Names of the attachment files written, in part-tree order.
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Raw `Date` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_json_keys() {
        let email = MatchedEmail {
            message_id: 42,
            recipient: "qa@example.com".to_string(),
            sender: "Shop <noreply@shop.test>".to_string(),
            subject: "Welcome".to_string(),
            body: "hi".to_string(),
            attachments: vec!["invoice.pdf".to_string()],
            date: None,
        };
        let json = serde_json::to_value(&email).unwrap();
        assert_eq!(json["messageId"], 42);
        assert_eq!(json["sender"], "Shop <noreply@shop.test>");
        assert_eq!(json["attachments"][0], "invoice.pdf");
        assert!(json.get("date").is_none());

        let back: MatchedEmail = serde_json::from_value(json).unwrap();
        assert_eq!(back, email);
    }
}
