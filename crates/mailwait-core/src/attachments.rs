//! Persists attachment payloads of a matched message.

use std::path::Path;

use mailwait_mime::Message;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Writes every attachment of `message` into `dir` and returns the file
/// names, in depth-first part order.
///
/// Leaves without a `Content-Disposition` are inline body parts and are
/// skipped, as are parts whose filename is unusable.
///
/// # Errors
///
/// Returns [`Error::Attachment`] if the directory cannot be created or a
/// file cannot be written.
pub async fn save_attachments(message: &Message, dir: &Path) -> Result<Vec<String>> {
    let mut saved = Vec::new();

    for part in message.attachment_parts() {
        let Some(name) = part.filename().as_deref().and_then(sanitize_filename) else {
            let attachment = part.disposition().is_some_and(|d| d.is_attachment());
            if attachment {
                warn!(
                    content_type = %part.content_type().mime_type(),
                    "attachment has no usable filename, skipping"
                );
            }
            continue;
        };

        if saved.is_empty() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| Error::Attachment {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        let path = dir.join(&name);
        let payload = part.payload();
        tokio::fs::write(&path, &payload)
            .await
            .map_err(|source| Error::Attachment {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), bytes = payload.len(), "attachment saved");
        saved.push(name);
    }

    Ok(saved)
}

/// Reduces a declared filename to its last path component.
///
/// Returns `None` when nothing usable is left.
fn sanitize_filename(name: &str) -> Option<String> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .replace('\0', "");

    match base.as_str() {
        "" | "." | ".." => None,
        _ => Some(base),
    }
}
