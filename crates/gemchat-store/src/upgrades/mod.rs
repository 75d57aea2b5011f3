//! Chat data upgrades.
//!
//! Stored chats are upgraded on load, before they are decoded into typed
//! [`Chat`](crate::Chat) records.  Upgrades operate on raw JSON so they can
//! repair any legacy shape, and are guarded by the version number stored
//! under `chatsVersion` so each one runs exactly once per store.

pub mod v001_message_timestamps;
pub mod v002_message_ids;
pub mod v003_attachments;

use serde_json::Value;

/// Current chat data version.  Bump this and add a new upgrade module whenever
/// the stored layout changes.
pub const CURRENT_VERSION: u32 = 3;

/// Bring `chats` from `from_version` to [`CURRENT_VERSION`].
///
/// `base_timestamp` seeds the timestamps backfilled by v001.  Returns the
/// version the data is now at.
pub fn run_upgrades(chats: &mut Value, from_version: u32, base_timestamp: i64) -> u32 {
    if !chats.is_array() {
        tracing::warn!("stored chats are not a list, starting from an empty collection");
        *chats = Value::Array(Vec::new());
    }

    tracing::info!(
        current_version = from_version,
        target_version = CURRENT_VERSION,
        "checking chat data upgrades"
    );

    if from_version < 1 {
        let repaired = v001_message_timestamps::up(chats, base_timestamp);
        tracing::info!(repaired, "applied upgrade v001_message_timestamps");
    }

    if from_version < 2 {
        let assigned = v002_message_ids::up(chats);
        tracing::info!(assigned, "applied upgrade v002_message_ids");
    }

    if from_version < 3 {
        let dropped = v003_attachments::up(chats);
        tracing::info!(dropped, "applied upgrade v003_attachments");
    }

    CURRENT_VERSION.max(from_version)
}

/// Mutable iterator over every message object of every chat object.
pub(crate) fn messages_mut(chats: &mut Value) -> impl Iterator<Item = &mut serde_json::Map<String, Value>> {
    chats
        .as_array_mut()
        .into_iter()
        .flatten()
        .filter_map(|chat| chat.get_mut("messages"))
        .filter_map(Value::as_array_mut)
        .flatten()
        .filter_map(Value::as_object_mut)
}
