//! v002 -- Give every message a stable identifier.
//!
//! Messages used to be addressed by timestamp.  Any message whose `id` is
//! missing or not a UUID string receives a fresh one.

use serde_json::Value;

use gemchat_shared::MessageId;

use super::messages_mut;

/// Apply the upgrade.  Returns the number of identifiers assigned.
pub fn up(chats: &mut Value) -> usize {
    let mut assigned = 0;
    for message in messages_mut(chats) {
        let valid = message
            .get("id")
            .and_then(Value::as_str)
            .is_some_and(|s| s.parse::<MessageId>().is_ok());
        if !valid {
            message.insert("id".into(), Value::String(MessageId::new().to_string()));
            assigned += 1;
        }
    }
    assigned
}
