//! 核心层：错误类型、会话状态、内存表

pub mod error;
pub mod state;
pub mod table;

pub use error::{AgentError, ParseError};
pub use state::{LlmCallLog, LogEntry, ProcessKind, ProcessLog, SessionState, TurnRecord};
pub use table::{Table, Tables};
