//! v003 -- Sanitize stored attachments.
//!
//! Attachments without a base64 payload are removed, missing MIME types are
//! defaulted, and a message left with no attachments loses the key entirely.

use serde_json::Value;

use crate::attachments::{sanitize_attachments, AttachmentInput};

use super::messages_mut;

/// Apply the upgrade.  Returns the number of attachments dropped.
pub fn up(chats: &mut Value) -> usize {
    let mut dropped = 0;
    for message in messages_mut(chats) {
        let Some(raw) = message.remove("attachments") else {
            continue;
        };

        let inputs: Vec<AttachmentInput> = match raw {
            Value::Array(items) => items
                .into_iter()
                .map(|item| serde_json::from_value(item).unwrap_or_default())
                .collect(),
            _ => Vec::new(),
        };
        let total = inputs.len();
        let kept = sanitize_attachments(inputs);
        dropped += total - kept.len();

        if !kept.is_empty() {
            match serde_json::to_value(kept) {
                Ok(value) => {
                    message.insert("attachments".into(), value);
                }
                Err(e) => tracing::warn!(error = %e, "failed to re-encode attachments"),
            }
        }
    }
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drops_empty_payloads_and_lists() {
        let mut chats = json!([{"messages": [
            {"text": "a", "attachments": [{"name": "x.png"}, {"name": "y.txt", "data": "eQ=="}]},
            {"text": "b", "attachments": [{"name": "z.png", "data": ""}]},
            {"text": "c", "attachments": "nonsense"},
            {"text": "d", "attachments": []}
        ]}]);

        assert_eq!(up(&mut chats), 2);
        let messages = chats[0]["messages"].as_array().unwrap();
        assert_eq!(
            messages[0]["attachments"],
            json!([{"name": "y.txt", "mimeType": "application/octet-stream", "data": "eQ=="}])
        );
        for message in &messages[1..] {
            assert!(message.get("attachments").is_none());
        }
    }
}
