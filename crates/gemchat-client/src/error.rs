use std::path::PathBuf;

use thiserror::Error;

use gemchat_shared::{ChatId, MessageId};
use gemchat_store::{Attachment, StoreError};

/// Outcome of a failed completion.  Every variant is terminal: the client
/// never retries on its own.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Gemini API key is missing")]
    MissingKey,

    #[error("No conversation content to send")]
    NoContent,

    /// Non-2xx status (`status` set, `message` is the response body) or an
    /// `error` object in a 2xx body (`status` unset).
    #[error("Gemini API request failed{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    ApiError { status: Option<u16>, message: String },

    #[error("Gemini API returned an empty response")]
    EmptyResponse,

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failure to turn a file or data URL into an attachment.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("File is empty: {}", .0.display())]
    Empty(PathBuf),

    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),
}

/// What the user submitted, handed back when a send fails so it can be
/// offered for re-send.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingInput {
    pub text: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("A reply is already pending for chat {0}")]
    Busy(ChatId),

    #[error("Chat not found: {0}")]
    ChatNotFound(ChatId),

    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),

    #[error("Only user messages can be retried ({0} is an assistant reply)")]
    NotRetryable(MessageId),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("{source}")]
    Completion {
        source: CompletionError,
        input: PendingInput,
    },
}

impl SessionError {
    /// The user's input, when the failure happened after it was accepted.
    pub fn pending_input(&self) -> Option<&PendingInput> {
        match self {
            SessionError::Completion { input, .. } => Some(input),
            _ => None,
        }
    }
}
