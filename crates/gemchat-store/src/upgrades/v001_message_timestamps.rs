//! v001 -- Backfill message timestamps and complete legacy chat records.
//!
//! Early clients stored messages without a `timestamp`.  Each such message
//! gets `base + index`, where `index` is its position in the chat.  Chat
//! records missing `name`, `settings` or the created/updated stamps get the
//! defaults a freshly created chat would have.

use serde_json::{json, Map, Value};

use gemchat_shared::constants::{
    DEFAULT_AI_NAME, DEFAULT_CHAT_NAME, DEFAULT_SYSTEM_INSTRUCTIONS, DEFAULT_USER_NAME,
};

/// Apply the upgrade.  Returns the number of timestamps backfilled.
pub fn up(chats: &mut Value, base: i64) -> usize {
    let Some(list) = chats.as_array_mut() else {
        return 0;
    };

    let before = list.len();
    list.retain(Value::is_object);
    if list.len() != before {
        tracing::warn!(dropped = before - list.len(), "discarding malformed chat records");
    }

    let mut repaired = 0;
    for (chat_index, chat) in list.iter_mut().enumerate() {
        let Some(chat) = chat.as_object_mut() else {
            continue;
        };
        complete_chat(chat, base, chat_index);
        repaired += backfill_messages(chat, base);
    }
    repaired
}

fn complete_chat(chat: &mut Map<String, Value>, base: i64, chat_index: usize) {
    let id = match chat.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => (base + chat_index as i64).to_string(),
    };
    chat.insert("id".into(), Value::String(id.clone()));

    if !chat.get("name").is_some_and(Value::is_string) {
        chat.insert("name".into(), json!(DEFAULT_CHAT_NAME));
    }

    let settings = chat
        .entry("settings")
        .or_insert_with(|| Value::Object(Map::new()));
    if !settings.is_object() {
        *settings = Value::Object(Map::new());
    }
    if let Some(settings) = settings.as_object_mut() {
        for (key, default) in [
            ("userName", DEFAULT_USER_NAME),
            ("aiName", DEFAULT_AI_NAME),
            ("systemInstructions", DEFAULT_SYSTEM_INSTRUCTIONS),
        ] {
            if !settings.get(key).is_some_and(Value::is_string) {
                settings.insert(key.into(), json!(default));
            }
        }
    }

    let created_at = millis(chat.get("createdAt"))
        .or_else(|| id.parse::<i64>().ok())
        .unwrap_or(base);
    let updated_at = millis(chat.get("updatedAt")).unwrap_or(created_at);
    chat.insert("createdAt".into(), json!(created_at));
    chat.insert("updatedAt".into(), json!(updated_at));

    if !chat.get("messages").is_some_and(Value::is_array) {
        chat.insert("messages".into(), Value::Array(Vec::new()));
    }
}

fn backfill_messages(chat: &mut Map<String, Value>, base: i64) -> usize {
    let Some(messages) = chat.get_mut("messages").and_then(Value::as_array_mut) else {
        return 0;
    };
    messages.retain(Value::is_object);

    let mut repaired = 0;
    for (index, message) in messages.iter_mut().enumerate() {
        let Some(message) = message.as_object_mut() else {
            continue;
        };

        if !message.get("text").is_some_and(Value::is_string) {
            message.insert("text".into(), json!(""));
        }

        let sender = if message.get("sender").and_then(Value::as_str) == Some("ai") {
            "ai"
        } else {
            "user"
        };
        message.insert("sender".into(), json!(sender));

        let timestamp = match millis(message.get("timestamp")) {
            Some(ts) => ts,
            None => {
                repaired += 1;
                base + index as i64
            }
        };
        message.insert("timestamp".into(), json!(timestamp));
    }
    repaired
}

/// Integer milliseconds from a JSON number; fractional values are floored.
fn millis(value: Option<&Value>) -> Option<i64> {
    let n = value?.as_number()?;
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.is_finite())
            .map(|f| f.floor() as i64)
    })
}
