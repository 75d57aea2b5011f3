/// Application name
pub const APP_NAME: &str = "gemchat";

/// Persistent store key holding the serialized chat collection
pub const KEY_CHATS: &str = "chats";

/// Persistent store key holding the id of the current chat
pub const KEY_CURRENT_CHAT_ID: &str = "currentChatId";

/// Persistent store key holding the global settings object
pub const KEY_GLOBAL_SETTINGS: &str = "globalSettings";

/// Persistent store key holding the chat data format version
pub const KEY_CHATS_VERSION: &str = "chatsVersion";

/// Name given to freshly created chats
pub const DEFAULT_CHAT_NAME: &str = "Untitled";

/// Per-chat defaults
pub const DEFAULT_USER_NAME: &str = "User";
pub const DEFAULT_AI_NAME: &str = "Assistant";
pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str = "You are a helpful assistant.";

/// Global settings defaults
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_TEMPERATURE: f64 = 0.6;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;

/// Generation parameter bounds
pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 1.0;
pub const MIN_OUTPUT_TOKENS: u32 = 1;
pub const MAX_OUTPUT_TOKENS: u32 = 8192;

/// Fallback MIME type for attachments of unknown type
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Maximum number of trailing messages sent in one completion request
pub const CONVERSATION_WINDOW: usize = 512;

/// Chat list preview length, in characters
pub const PREVIEW_MAX_CHARS: usize = 50;

/// Preview shown for chats without messages
pub const EMPTY_PREVIEW: &str = "No messages yet";

/// Auto-derived chat titles keep this many characters of the first message
pub const TITLE_MAX_CHARS: usize = 30;

/// Marker appended to a truncated auto-derived title
pub const TITLE_ELLIPSIS: &str = "...";

/// Assistant reply recorded when a completion fails
pub const FAILURE_REPLY: &str = "Sorry, something went wrong. Please try again.";

/// Gemini REST endpoint (model name and method are appended)
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Header carrying the API credential
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Default request timeout for completion calls, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
