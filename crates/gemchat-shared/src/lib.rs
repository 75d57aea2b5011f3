//! # gemchat-shared
//!
//! Types shared by the store, the client and the CLI: store keys and
//! defaults, chat/message identifiers, and the provider wire protocol.

pub mod constants;
pub mod protocol;
pub mod types;

pub use types::{ChatId, MessageId, Role, Sender};
