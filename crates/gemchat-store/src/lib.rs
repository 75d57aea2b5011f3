//! # gemchat-store
//!
//! Local persistence for gemchat.
//!
//! Everything is stored as JSON text under a handful of fixed keys in a
//! [`KeyValueStore`], either the SQLite-backed [`Database`] or the in-memory
//! [`MemoryStore`].  On top of the store sit the [`ChatRepository`], which
//! owns the chat collection and the current-chat pointer, and the
//! [`SettingsManager`], which owns the global settings.

pub mod attachments;
pub mod chats;
pub mod clock;
pub mod database;
pub mod kv;
pub mod memory;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod preview;
pub mod repository;
pub mod settings;
pub mod upgrades;

mod error;

pub use attachments::{format_size, sanitize_attachments, AttachmentInput};
pub use chats::{ChatSettingsUpdate, ChatUpdate};
pub use database::Database;
pub use error::{Result, StoreError};
pub use kv::KeyValueStore;
pub use memory::MemoryStore;
pub use messages::{title_from_text, NewMessage};
pub use models::*;
pub use preview::chat_preview;
pub use repository::ChatRepository;
pub use settings::{GlobalSettingsUpdate, SettingsManager};
