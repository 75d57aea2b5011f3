//! Conversion of a chat's message log into a `generateContent` request.

use gemchat_shared::constants::{CONVERSATION_WINDOW, DEFAULT_MIME_TYPE};
use gemchat_shared::protocol::{
    Content, GenerateContentRequest, GenerationConfig, Part, SystemInstruction,
};
use gemchat_shared::Role;
use gemchat_store::settings::{normalize_max_tokens, normalize_temperature};
use gemchat_store::{Chat, GlobalSettings, Message};

use crate::error::CompletionError;

/// Wire parts for one message: its trimmed text (if any) followed by one
/// inline part per attachment that carries data.
pub fn build_parts(message: &Message) -> Vec<Part> {
    let mut parts = Vec::with_capacity(1 + message.attachments().len());

    let text = message.text.trim();
    if !text.is_empty() {
        parts.push(Part::text(text));
    }

    for attachment in message.attachments() {
        if attachment.data.is_empty() {
            continue;
        }
        let mime_type = match attachment.mime_type.trim() {
            "" => DEFAULT_MIME_TYPE,
            trimmed => trimmed,
        };
        parts.push(Part::inline(mime_type, attachment.data.as_str()));
    }

    parts
}

/// The trailing window of the chat as conversation turns, oldest first.
///
/// Messages that produce no parts are left out; if nothing remains the chat
/// has nothing to send.
pub fn build_conversation(chat: &Chat) -> Result<Vec<Content>, CompletionError> {
    let start = chat.messages.len().saturating_sub(CONVERSATION_WINDOW);

    let contents: Vec<Content> = chat.messages[start..]
        .iter()
        .filter_map(|message| {
            let parts = build_parts(message);
            (!parts.is_empty()).then(|| Content {
                role: Role::from(message.sender),
                parts,
            })
        })
        .collect();

    if contents.is_empty() {
        return Err(CompletionError::NoContent);
    }
    Ok(contents)
}

/// Full request body for `chat` under `settings`.
pub fn build_payload(
    chat: &Chat,
    settings: &GlobalSettings,
) -> Result<GenerateContentRequest, CompletionError> {
    let contents = build_conversation(chat)?;

    let instructions = &chat.settings.system_instructions;
    let system_instruction = (!instructions.is_empty()).then(|| SystemInstruction {
        parts: vec![Part::text(instructions.as_str())],
    });

    Ok(GenerateContentRequest {
        contents,
        generation_config: GenerationConfig {
            temperature: normalize_temperature(settings.temperature),
            max_output_tokens: normalize_max_tokens(f64::from(settings.max_output_tokens)),
        },
        system_instruction,
    })
}
