//! 记忆层：对话记忆（单轮 / 会话级）与会话日志持久化

pub mod conversation;
pub mod persistence;

pub use conversation::{ConversationMemory, Message, Role};
pub use persistence::{list_sessions, SessionPersistence};
