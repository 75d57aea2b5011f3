//! Send orchestration.
//!
//! A [`ChatSession`] ties the repository, the settings and the completion
//! client together: it appends the user's message, asks the provider for a
//! reply, appends the reply (or a fixed failure reply), names fresh chats
//! and persists, while refusing overlapping sends for the same chat.
//!
//! State is kept in `RefCell`s and borrowed only between suspension points,
//! so sends for different chats can run concurrently on one thread.

use std::cell::{Ref, RefCell, RefMut};

use gemchat_shared::constants::FAILURE_REPLY;
use gemchat_shared::{ChatId, MessageId, Sender};
use gemchat_store::{
    sanitize_attachments, Attachment, AttachmentInput, ChatRepository, GlobalSettings,
    KeyValueStore, NewMessage, SettingsManager,
};

use crate::completion::CompletionClient;
use crate::error::{PendingInput, SessionError};
use crate::inflight::InFlight;

/// Result of a completed send.
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    pub user_message: MessageId,
    pub reply_message: Option<MessageId>,
    pub reply: String,
    /// `true` when the chat was named after this message.
    pub renamed: bool,
}

pub struct ChatSession<S: KeyValueStore> {
    repo: RefCell<ChatRepository<S>>,
    settings: RefCell<SettingsManager<S>>,
    client: CompletionClient,
    inflight: InFlight,
    /// Used when no key is stored.  Never persisted.
    fallback_api_key: Option<String>,
}

impl<S: KeyValueStore> ChatSession<S> {
    pub fn new(repo: ChatRepository<S>, settings: SettingsManager<S>, client: CompletionClient) -> Self {
        Self {
            repo: RefCell::new(repo),
            settings: RefCell::new(settings),
            client,
            inflight: InFlight::new(),
            fallback_api_key: None,
        }
    }

    pub fn with_fallback_api_key(mut self, key: Option<String>) -> Self {
        self.fallback_api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn repo(&self) -> Ref<'_, ChatRepository<S>> {
        self.repo.borrow()
    }

    pub fn repo_mut(&self) -> RefMut<'_, ChatRepository<S>> {
        self.repo.borrow_mut()
    }

    pub fn settings(&self) -> Ref<'_, SettingsManager<S>> {
        self.settings.borrow()
    }

    pub fn settings_mut(&self) -> RefMut<'_, SettingsManager<S>> {
        self.settings.borrow_mut()
    }

    pub fn is_busy(&self, chat_id: &ChatId) -> bool {
        self.inflight.is_busy(chat_id)
    }

    /// Stored settings with the fallback key filled in when none is stored.
    pub fn effective_settings(&self) -> GlobalSettings {
        let mut settings = self.settings.borrow().current().clone();
        if !settings.has_api_key() {
            if let Some(key) = &self.fallback_api_key {
                settings.api_key = key.clone();
            }
        }
        settings
    }

    /// Send `text` and `attachments` to the chat and wait for the reply.
    ///
    /// Returns `Ok(None)` without doing anything when there is nothing to
    /// send.  On a completion failure the fixed failure reply is appended
    /// and the error carries the user's input for re-sending.
    pub async fn send(
        &self,
        chat_id: &ChatId,
        text: &str,
        attachments: Vec<Attachment>,
    ) -> Result<Option<SendOutcome>, SessionError> {
        let text = text.trim();
        let attachments = sanitize_attachments(attachments.into_iter().map(AttachmentInput::from));
        if text.is_empty() && attachments.is_empty() {
            return Ok(None);
        }

        if self.repo.borrow().get(chat_id).is_none() {
            return Err(SessionError::ChatNotFound(chat_id.clone()));
        }
        let _guard = self.inflight.try_acquire(chat_id).ok_or_else(|| {
            tracing::warn!(chat_id = %chat_id, "send rejected, reply still pending");
            SessionError::Busy(chat_id.clone())
        })?;

        let input = PendingInput {
            text: text.to_string(),
            attachments: attachments.clone(),
        };

        let (user_message, snapshot) = {
            let mut repo = self.repo.borrow_mut();
            let new = NewMessage::user(text).with_attachments(attachments.into_iter().map(AttachmentInput::from));
            let id = repo
                .append_message(chat_id, new)?
                .ok_or_else(|| SessionError::ChatNotFound(chat_id.clone()))?;
            let snapshot = repo
                .get(chat_id)
                .cloned()
                .ok_or_else(|| SessionError::ChatNotFound(chat_id.clone()))?;
            (id, snapshot)
        };
        let settings = self.effective_settings();

        tracing::info!(
            chat_id = %chat_id,
            message_id = %user_message,
            attachments = input.attachments.len(),
            "sending message"
        );

        match self.client.complete(&snapshot, &settings).await {
            Ok(reply) => {
                let mut repo = self.repo.borrow_mut();
                let reply_message = repo.append_message(chat_id, NewMessage::ai(reply.as_str()))?;
                let renamed = repo.derive_initial_title(chat_id, text)?;
                tracing::info!(chat_id = %chat_id, renamed, "reply stored");

                Ok(Some(SendOutcome {
                    user_message,
                    reply_message,
                    reply,
                    renamed,
                }))
            }
            Err(source) => {
                tracing::warn!(chat_id = %chat_id, error = %source, "completion failed");
                self.repo
                    .borrow_mut()
                    .append_message(chat_id, NewMessage::ai(FAILURE_REPLY))?;
                Err(SessionError::Completion { source, input })
            }
        }
    }

    /// Send an earlier user message again, with its attachments.
    pub async fn retry(
        &self,
        chat_id: &ChatId,
        message_id: MessageId,
    ) -> Result<Option<SendOutcome>, SessionError> {
        let (text, attachments) = {
            let repo = self.repo.borrow();
            let chat = repo
                .get(chat_id)
                .ok_or_else(|| SessionError::ChatNotFound(chat_id.clone()))?;
            let message = chat
                .find_message(message_id)
                .ok_or(SessionError::MessageNotFound(message_id))?;
            if message.sender != Sender::User {
                return Err(SessionError::NotRetryable(message_id));
            }
            (message.text.clone(), message.attachments().to_vec())
        };

        tracing::debug!(chat_id = %chat_id, message_id = %message_id, "retrying message");
        self.send(chat_id, &text, attachments).await
    }

    /// Take the repository and settings back out of the session.
    pub fn into_parts(self) -> (ChatRepository<S>, SettingsManager<S>) {
        (self.repo.into_inner(), self.settings.into_inner())
    }
}
