use gemchat_shared::constants::{EMPTY_PREVIEW, PREVIEW_MAX_CHARS};

use crate::models::Chat;

/// One-line summary of a chat for the chat list.
///
/// The last message's trimmed text, or an attachment descriptor when it has
/// no text, cut to `PREVIEW_MAX_CHARS` characters.
pub fn chat_preview(chat: &Chat) -> String {
    let full = chat.last_message().map(|last| {
        let text = last.text.trim();
        if !text.is_empty() {
            return text.to_string();
        }

        let attachments = last.attachments();
        let Some(first) = attachments.first() else {
            return String::new();
        };
        let descriptor = if attachments.len() > 1 {
            format!("{} attachments", attachments.len())
        } else if first.name.is_empty() {
            "Attachment".to_string()
        } else {
            first.name.clone()
        };
        let kind = if first.mime_type.starts_with("image/") {
            "Image"
        } else {
            "Attachment"
        };
        format!("{kind}: {descriptor}")
    });

    match full {
        Some(preview) if !preview.is_empty() => preview.chars().take(PREVIEW_MAX_CHARS).collect(),
        _ => EMPTY_PREVIEW.to_string(),
    }
}
