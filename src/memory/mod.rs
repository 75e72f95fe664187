//! 记忆层：短期对话窗口、跨轮次会话上下文持久化

pub mod conversation;
pub mod session_store;

pub use conversation::{ConversationMemory, Message, Role};
pub use session_store::{FileSessionStore, InMemorySessionStore, SessionContext, SessionStore};
