//! Per-chat guard against overlapping sends.

use std::collections::HashSet;
use std::sync::Mutex;

use gemchat_shared::ChatId;

/// Set of chats with a completion outstanding.
#[derive(Debug, Default)]
pub struct InFlight {
    chats: Mutex<HashSet<ChatId>>,
}

/// Held while a send is outstanding; releases the chat when dropped.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    chat_id: ChatId,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `chat_id` busy.  `None` if it already is.
    pub fn try_acquire(&self, chat_id: &ChatId) -> Option<InFlightGuard<'_>> {
        if !self.lock().insert(chat_id.clone()) {
            return None;
        }
        Some(InFlightGuard {
            owner: self,
            chat_id: chat_id.clone(),
        })
    }

    pub fn is_busy(&self, chat_id: &ChatId) -> bool {
        self.lock().contains(chat_id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<ChatId>> {
        self.chats.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.lock().remove(&self.chat_id);
    }
}
