//! CRUD operations for [`Chat`] records.

use gemchat_shared::constants::{DEFAULT_AI_NAME, DEFAULT_CHAT_NAME, DEFAULT_USER_NAME};
use gemchat_shared::ChatId;

use crate::clock;
use crate::error::Result;
use crate::kv::KeyValueStore;
use crate::models::{Chat, ChatSettings, Message};
use crate::repository::ChatRepository;

/// Fields replaced by [`ChatRepository::update`].  `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ChatUpdate {
    pub name: Option<String>,
    pub settings: Option<ChatSettings>,
    pub messages: Option<Vec<Message>>,
}

/// Values submitted from the per-chat settings form.
///
/// Blank names fall back to their defaults; `system_instructions` is trimmed
/// and may end up empty.
#[derive(Debug, Clone, Default)]
pub struct ChatSettingsUpdate {
    pub name: Option<String>,
    pub user_name: Option<String>,
    pub ai_name: Option<String>,
    pub system_instructions: Option<String>,
}

impl<S: KeyValueStore> ChatRepository<S> {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Create an empty chat at the front of the list and make it current.
    pub fn create(&mut self) -> Result<&Chat> {
        let id = self.next_chat_id();
        let now = clock::now_millis();
        let chat = Chat {
            id: id.clone(),
            name: DEFAULT_CHAT_NAME.to_string(),
            messages: Vec::new(),
            settings: ChatSettings::default(),
            created_at: now,
            updated_at: now,
        };

        self.chats.insert(0, chat);
        self.current_id = id;
        self.persist()?;

        tracing::info!(chat_id = %self.current_id, "chat created");
        Ok(&self.chats[0])
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// All chats, newest created first.
    pub fn list(&self) -> &[Chat] {
        &self.chats
    }

    pub fn get(&self, id: &ChatId) -> Option<&Chat> {
        self.chats.iter().find(|c| &c.id == id)
    }

    /// The chat the user is looking at.
    pub fn current(&self) -> &Chat {
        let index = self.position(&self.current_id).unwrap_or(0);
        &self.chats[index]
    }

    pub fn current_id(&self) -> &ChatId {
        &self.current_id
    }

    /// Point the repository at `id`.  Returns `false` and changes nothing
    /// when no such chat exists.
    pub fn set_current(&mut self, id: &ChatId) -> Result<bool> {
        if self.get(id).is_none() {
            tracing::debug!(chat_id = %id, "set_current ignored for unknown chat");
            return Ok(false);
        }
        self.current_id = id.clone();
        self.persist_current()?;
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Shallow-merge `update` into the chat and refresh `updated_at`.
    ///
    /// Unknown ids are a silent no-op returning `false`.
    pub fn update(&mut self, id: &ChatId, update: ChatUpdate) -> Result<bool> {
        let Some(chat) = self.get_mut(id) else {
            return Ok(false);
        };

        if let Some(name) = update.name {
            chat.name = name;
        }
        if let Some(settings) = update.settings {
            chat.settings = settings;
        }
        if let Some(messages) = update.messages {
            chat.messages = messages;
        }
        chat.updated_at = clock::now_millis();

        self.persist()?;
        Ok(true)
    }

    /// Rename a chat.  The name is trimmed; blank input keeps the old name.
    pub fn rename(&mut self, id: &ChatId, name: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() || self.get(id).is_none() {
            return Ok(false);
        }
        self.update(
            id,
            ChatUpdate {
                name: Some(name.to_string()),
                ..Default::default()
            },
        )
    }

    /// Apply the per-chat settings form.
    pub fn update_settings(&mut self, id: &ChatId, form: ChatSettingsUpdate) -> Result<bool> {
        let Some(chat) = self.get(id) else {
            return Ok(false);
        };

        let name = form.name.map(|n| or_default(&n, DEFAULT_CHAT_NAME));
        let mut settings = chat.settings.clone();
        if let Some(user_name) = form.user_name {
            settings.user_name = or_default(&user_name, DEFAULT_USER_NAME);
        }
        if let Some(ai_name) = form.ai_name {
            settings.ai_name = or_default(&ai_name, DEFAULT_AI_NAME);
        }
        if let Some(instructions) = form.system_instructions {
            settings.system_instructions = instructions.trim().to_string();
        }

        self.update(
            id,
            ChatUpdate {
                name,
                settings: Some(settings),
                messages: None,
            },
        )
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a chat.  If it was current, the first remaining chat becomes
    /// current, or a fresh chat is created when none remain.
    pub fn delete(&mut self, id: &ChatId) -> Result<bool> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        self.chats.remove(index);
        tracing::info!(chat_id = %id, "chat deleted");

        if &self.current_id == id {
            match self.chats.first() {
                Some(first) => self.current_id = first.id.clone(),
                None => {
                    // create() persists
                    self.create()?;
                    return Ok(true);
                }
            }
        }

        self.persist()?;
        Ok(true)
    }
}

fn or_default(value: &str, default: &str) -> String {
    match value.trim() {
        "" => default.to_string(),
        trimmed => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use gemchat_shared::constants::{KEY_CHATS, KEY_CURRENT_CHAT_ID};

    use super::*;
    use crate::memory::MemoryStore;

    fn repo() -> ChatRepository<MemoryStore> {
        ChatRepository::initialize(MemoryStore::new()).unwrap()
    }

    #[test]
    fn test_list_is_newest_first_and_stable() {
        let mut repo = repo();
        let first = repo.current().id.clone();
        let second = repo.create().unwrap().id.clone();
        let third = repo.create().unwrap().id.clone();

        let ids: Vec<_> = repo.list().iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec![third.clone(), second.clone(), first.clone()]);

        repo.rename(&first, "Oldest").unwrap();
        let ids: Vec<_> = repo.list().iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec![third, second, first]);
    }

    #[test]
    fn test_create_becomes_current() {
        let mut repo = repo();
        let id = repo.create().unwrap().id.clone();
        assert_eq!(repo.current_id(), &id);

        let chat = repo.current();
        assert_eq!(chat.name, DEFAULT_CHAT_NAME);
        assert!(chat.messages.is_empty());
        assert_eq!(chat.created_at, chat.updated_at);
        assert_eq!(chat.settings, ChatSettings::default());
    }

    #[test]
    fn test_set_current_unknown_is_rejected() {
        let mut repo = repo();
        let before = repo.current_id().clone();
        assert!(!repo.set_current(&ChatId::from("nope")).unwrap());
        assert_eq!(repo.current_id(), &before);
    }

    #[test]
    fn test_set_current_persists() {
        let mut repo = repo();
        let older = repo.current_id().clone();
        repo.create().unwrap();

        assert!(repo.set_current(&older).unwrap());
        let stored: ChatId = repo.store().get(KEY_CURRENT_CHAT_ID).unwrap().unwrap();
        assert_eq!(stored, older);
    }

    #[test]
    fn test_update_unknown_is_noop() {
        let mut repo = repo();
        let before = repo.list().to_vec();
        let changed = repo
            .update(
                &ChatId::from("missing"),
                ChatUpdate {
                    name: Some("x".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!changed);
        assert_eq!(repo.list(), before.as_slice());
    }

    #[test]
    fn test_update_refreshes_timestamp_and_persists() {
        let mut repo = repo();
        let id = repo.current_id().clone();
        let created = repo.current().updated_at;

        repo.update(
            &id,
            ChatUpdate {
                name: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(repo.current().updated_at >= created);
        let stored: Vec<Chat> = repo.store().get(KEY_CHATS).unwrap().unwrap();
        assert_eq!(stored[0].name, "Renamed");
    }

    #[test]
    fn test_rename_trims_and_ignores_blank() {
        let mut repo = repo();
        let id = repo.current_id().clone();

        assert!(repo.rename(&id, "  Plans  ").unwrap());
        assert_eq!(repo.current().name, "Plans");

        assert!(!repo.rename(&id, "   ").unwrap());
        assert_eq!(repo.current().name, "Plans");
    }

    #[test]
    fn test_delete_only_chat_leaves_fresh_one() {
        let mut repo = repo();
        let only = repo.current_id().clone();

        assert!(repo.delete(&only).unwrap());
        assert_eq!(repo.list().len(), 1);
        assert_ne!(repo.current().id, only);
        assert!(repo.current().messages.is_empty());
    }

    #[test]
    fn test_delete_current_selects_first_remaining() {
        let mut repo = repo();
        let a = repo.current_id().clone();
        let b = repo.create().unwrap().id.clone();
        let c = repo.create().unwrap().id.clone();
        repo.set_current(&b).unwrap();

        repo.delete(&b).unwrap();
        assert_eq!(repo.current_id(), &c);
        let ids: Vec<_> = repo.list().iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec![c, a]);
    }

    #[test]
    fn test_delete_other_keeps_current() {
        let mut repo = repo();
        let a = repo.current_id().clone();
        let b = repo.create().unwrap().id.clone();

        assert!(repo.delete(&a).unwrap());
        assert_eq!(repo.current_id(), &b);
        assert!(!repo.delete(&a).unwrap());
    }

    #[test]
    fn test_update_settings_defaults_blank_fields() {
        let mut repo = repo();
        let id = repo.current_id().clone();

        repo.update_settings(
            &id,
            ChatSettingsUpdate {
                name: Some("  ".into()),
                user_name: Some("Ana ".into()),
                ai_name: Some("".into()),
                system_instructions: Some("  Be brief.  ".into()),
            },
        )
        .unwrap();

        let chat = repo.current();
        assert_eq!(chat.name, DEFAULT_CHAT_NAME);
        assert_eq!(chat.settings.user_name, "Ana");
        assert_eq!(chat.settings.ai_name, DEFAULT_AI_NAME);
        assert_eq!(chat.settings.system_instructions, "Be brief.");

        repo.update_settings(
            &id,
            ChatSettingsUpdate {
                system_instructions: Some("   ".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(repo.current().settings.system_instructions, "");
        assert_eq!(repo.current().settings.user_name, "Ana");
    }
}
