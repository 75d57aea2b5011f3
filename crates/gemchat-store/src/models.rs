//! Domain model structs persisted in the key-value store.
//!
//! Every struct derives `Serialize` and `Deserialize` with camelCase field
//! names so stored data stays compatible with the layout written by earlier
//! clients.

use serde::{Deserialize, Serialize};

use gemchat_shared::constants::{
    DEFAULT_AI_NAME, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MODEL, DEFAULT_SYSTEM_INSTRUCTIONS,
    DEFAULT_TEMPERATURE, DEFAULT_USER_NAME,
};
use gemchat_shared::{ChatId, MessageId, Sender};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Per-chat assistant configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSettings {
    pub user_name: String,
    pub ai_name: String,
    /// Sent as the request's system instruction when non-empty.
    pub system_instructions: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            user_name: DEFAULT_USER_NAME.to_string(),
            ai_name: DEFAULT_AI_NAME.to_string(),
            system_instructions: DEFAULT_SYSTEM_INSTRUCTIONS.to_string(),
        }
    }
}

/// A persisted conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    /// Clock-derived identifier, immutable after creation.
    pub id: ChatId,
    pub name: String,
    /// Ordered message log, oldest first.
    pub messages: Vec<Message>,
    pub settings: ChatSettings,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    /// Refreshed on every change to `messages`, `name` or `settings`.
    pub updated_at: i64,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// One turn in a chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Stable identifier assigned at creation.
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    /// Milliseconds since the Unix epoch, unique within the chat.
    pub timestamp: i64,
    /// Never `Some(vec![])`: an empty attachment list is stored as absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
}

impl Message {
    pub fn attachments(&self) -> &[Attachment] {
        self.attachments.as_deref().unwrap_or(&[])
    }
}

/// A base64-encoded file carried by a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    /// Base64 payload without a data-URL header.  Never empty.
    pub data: String,
    /// Size of the decoded file in bytes, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

// ---------------------------------------------------------------------------
// Global settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::System => "system",
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "system" => Ok(Theme::System),
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(StoreError::InvalidSetting(format!(
                "unknown theme '{other}' (expected system, light or dark)"
            ))),
        }
    }
}

/// Application-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    pub api_key: String,
    pub theme: Theme,
    pub model: String,
    /// Always within `[0, 1]`.
    pub temperature: f64,
    /// Always within `[1, 8192]`.
    pub max_output_tokens: u32,
    /// Keys written by other clients, carried through unchanged.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            theme: Theme::System,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            extra: serde_json::Map::new(),
        }
    }
}

impl GlobalSettings {
    /// `true` when an API key (ignoring surrounding whitespace) is configured.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}
