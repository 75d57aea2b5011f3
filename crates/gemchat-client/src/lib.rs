//! # gemchat-client
//!
//! Everything between a stored chat and the provider: the request builder,
//! the completion client, file ingestion, and the [`ChatSession`] that
//! orchestrates a send.

pub mod completion;
pub mod config;
pub mod files;
pub mod inflight;
pub mod request;
pub mod session;

mod error;
#[cfg(test)]
mod mock;

pub use completion::CompletionClient;
pub use config::ClientConfig;
pub use error::{CompletionError, IngestError, PendingInput, SessionError};
pub use files::{attachment_from_data_url, read_attachment, read_attachments};
pub use session::{ChatSession, SendOutcome};
