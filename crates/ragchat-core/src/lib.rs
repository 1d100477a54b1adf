pub mod ai;
pub mod config;
pub mod conversation;
pub mod state;

// Re-export main types for convenience
pub use ai::RagClient;
pub use config::Config;
pub use conversation::{ChatSession, Conversation, ERROR_FALLBACK, NO_ANSWER_FALLBACK};
pub use state::{ChatMessage, ChatRole};
