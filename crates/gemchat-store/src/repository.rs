//! The chat repository: owner of the chat collection and the current-chat
//! pointer.
//!
//! A [`ChatRepository`] is created with [`ChatRepository::initialize`], which
//! loads (and if necessary upgrades) the stored chats, and released with
//! [`ChatRepository::dispose`].  Every mutating operation re-persists the
//! whole collection before it returns.  CRUD helpers live in `chats.rs` and
//! `messages.rs`.

use serde_json::Value;

use gemchat_shared::constants::{KEY_CHATS, KEY_CHATS_VERSION, KEY_CURRENT_CHAT_ID};
use gemchat_shared::ChatId;

use crate::clock;
use crate::error::Result;
use crate::kv::KeyValueStore;
use crate::models::Chat;
use crate::upgrades::{self, CURRENT_VERSION};

pub struct ChatRepository<S: KeyValueStore> {
    pub(crate) store: S,
    /// Newest created first.  Never empty once initialized.
    pub(crate) chats: Vec<Chat>,
    pub(crate) current_id: ChatId,
    /// Highest clock value handed out as a chat id.
    pub(crate) last_issued_id: i64,
}

impl<S: KeyValueStore> ChatRepository<S> {
    /// Load chats from `store`, upgrading legacy data in place.
    ///
    /// Creates a first chat when the store holds none and resolves the
    /// current pointer to the stored id, or to the first chat when the
    /// stored id is missing or stale.
    pub fn initialize(store: S) -> Result<Self> {
        let stored_version = read_version(&store)?;
        let mut raw = read_chats(&store)?;

        match raw.as_mut() {
            Some(chats) if stored_version < CURRENT_VERSION => {
                let version = upgrades::run_upgrades(chats, stored_version, clock::now_millis());
                store.set(KEY_CHATS, &*chats)?;
                store.set(KEY_CHATS_VERSION, &version)?;
                tracing::info!(from = stored_version, to = version, "upgraded stored chats");
            }
            Some(_) => {}
            None => {
                if stored_version < CURRENT_VERSION {
                    store.set(KEY_CHATS_VERSION, &CURRENT_VERSION)?;
                }
            }
        }

        let chats = decode_chats(raw.unwrap_or(Value::Null));
        let last_issued_id = chats
            .iter()
            .filter_map(|c| c.id.as_millis())
            .max()
            .unwrap_or(0);
        let stored_current: Option<ChatId> = match store.get(KEY_CURRENT_CHAT_ID) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable current chat id");
                None
            }
        };

        let mut repo = Self {
            store,
            chats,
            current_id: ChatId::from(""),
            last_issued_id,
        };

        if repo.chats.is_empty() {
            repo.create()?;
        } else {
            match stored_current.filter(|id| repo.get(id).is_some()) {
                Some(id) => repo.current_id = id,
                None => {
                    repo.current_id = repo.chats[0].id.clone();
                    repo.persist_current()?;
                }
            }
        }

        tracing::info!(
            chats = repo.chats.len(),
            current = %repo.current_id,
            "chat repository initialized"
        );
        Ok(repo)
    }

    /// Flush state and hand the store back.
    pub fn dispose(self) -> Result<S> {
        self.persist()?;
        tracing::debug!("chat repository disposed");
        Ok(self.store)
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// A fresh chat id: the clock, or one past the last issued id if the
    /// clock has not advanced.
    pub(crate) fn next_chat_id(&mut self) -> ChatId {
        let millis = clock::now_millis().max(self.last_issued_id + 1);
        self.last_issued_id = millis;
        ChatId::from_millis(millis)
    }

    pub(crate) fn position(&self, id: &ChatId) -> Option<usize> {
        self.chats.iter().position(|c| &c.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &ChatId) -> Option<&mut Chat> {
        self.chats.iter_mut().find(|c| &c.id == id)
    }

    /// Write the chat collection and the current pointer.
    pub(crate) fn persist(&self) -> Result<()> {
        self.store.set(KEY_CHATS, &self.chats)?;
        self.persist_current()
    }

    pub(crate) fn persist_current(&self) -> Result<()> {
        self.store.set(KEY_CURRENT_CHAT_ID, &self.current_id)
    }
}

fn read_version<S: KeyValueStore>(store: &S) -> Result<u32> {
    let Some(raw) = store.get_raw(KEY_CHATS_VERSION)? else {
        return Ok(0);
    };
    Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, value = %raw, "unreadable chats version, upgrading from scratch");
        0
    }))
}

fn read_chats<S: KeyValueStore>(store: &S) -> Result<Option<Value>> {
    let Some(raw) = store.get_raw(KEY_CHATS)? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "stored chats are not valid JSON, starting over");
        Value::Array(Vec::new())
    })))
}

/// Decode each chat on its own so one damaged record does not take the
/// rest with it.
fn decode_chats(raw: Value) -> Vec<Chat> {
    let Value::Array(items) = raw else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Chat>(item) {
            Ok(chat) => Some(chat),
            Err(e) => {
                tracing::warn!(error = %e, "skipping undecodable chat");
                None
            }
        })
        .collect()
}
