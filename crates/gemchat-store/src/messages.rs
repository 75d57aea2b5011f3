use gemchat_shared::constants::{DEFAULT_CHAT_NAME, TITLE_ELLIPSIS, TITLE_MAX_CHARS};
use gemchat_shared::{ChatId, MessageId, Sender};

use crate::attachments::{sanitize_attachments, AttachmentInput};
use crate::clock;
use crate::error::Result;
use crate::kv::KeyValueStore;
use crate::models::{Chat, Message};
use crate::repository::ChatRepository;

/// A message about to be appended.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub text: String,
    pub sender: Sender,
    pub attachments: Vec<AttachmentInput>,
}

impl NewMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
            attachments: Vec::new(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Ai,
            attachments: Vec::new(),
        }
    }

    pub fn with_attachments<I>(mut self, attachments: I) -> Self
    where
        I: IntoIterator<Item = AttachmentInput>,
    {
        self.attachments.extend(attachments);
        self
    }
}

impl Chat {
    pub fn find_message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// First `TITLE_MAX_CHARS` characters of `text`, with an ellipsis when cut.
pub fn title_from_text(text: &str) -> String {
    let mut chars = text.chars();
    let mut title: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        title.push_str(TITLE_ELLIPSIS);
    }
    title
}

impl<S: KeyValueStore> ChatRepository<S> {
    /// Append a message to a chat and persist.
    ///
    /// Attachments are sanitized first; the stored message carries no
    /// `attachments` key when none survive.  The timestamp is the clock,
    /// bumped past the chat's previous message if needed.  Returns `None`
    /// for an unknown chat.
    pub fn append_message(&mut self, chat_id: &ChatId, new: NewMessage) -> Result<Option<MessageId>> {
        let Some(chat) = self.get_mut(chat_id) else {
            tracing::debug!(chat_id = %chat_id, "append to unknown chat ignored");
            return Ok(None);
        };

        let attachments = sanitize_attachments(new.attachments);
        let message = Message {
            id: MessageId::new(),
            text: new.text,
            sender: new.sender,
            timestamp: clock::after(chat.last_message().map(|m| m.timestamp)),
            attachments: (!attachments.is_empty()).then_some(attachments),
        };
        let id = message.id;

        tracing::debug!(
            chat_id = %chat_id,
            message_id = %id,
            sender = message.sender.as_str(),
            attachments = message.attachments().len(),
            "message appended"
        );

        chat.updated_at = message.timestamp;
        chat.messages.push(message);
        self.persist()?;
        Ok(Some(id))
    }

    /// Name a fresh chat after the first thing the user said.
    ///
    /// Applies only while the chat holds exactly one exchange and still has
    /// the default name, so it never fires twice.
    pub fn derive_initial_title(&mut self, chat_id: &ChatId, first_user_text: &str) -> Result<bool> {
        let source = first_user_text.trim();
        let Some(chat) = self.get_mut(chat_id) else {
            return Ok(false);
        };
        if chat.messages.len() != 2 || chat.name != DEFAULT_CHAT_NAME || source.is_empty() {
            return Ok(false);
        }

        chat.name = title_from_text(source);
        chat.updated_at = clock::now_millis();
        tracing::debug!(chat_id = %chat_id, name = %chat.name, "derived chat title");
        self.persist()?;
        Ok(true)
    }

    /// Delete one message.  Returns `true` if it existed.
    pub fn remove_message(&mut self, chat_id: &ChatId, message_id: MessageId) -> Result<bool> {
        let Some(chat) = self.get_mut(chat_id) else {
            return Ok(false);
        };
        let Some(index) = chat.messages.iter().position(|m| m.id == message_id) else {
            return Ok(false);
        };

        chat.messages.remove(index);
        chat.updated_at = clock::now_millis();
        tracing::debug!(chat_id = %chat_id, message_id = %message_id, "message removed");
        self.persist()?;
        Ok(true)
    }

    pub fn find_message(&self, chat_id: &ChatId, message_id: MessageId) -> Option<&Message> {
        self.get(chat_id)?.find_message(message_id)
    }
}
