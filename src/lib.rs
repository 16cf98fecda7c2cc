//! BRAD - 生物信息对话智能体
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、会话状态、内存表
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）、单次调用封装
//! - **memory**: 对话记忆与会话日志持久化
//! - **observability**: tracing 初始化
//! - **planner**: 多步规划、阶段分解与顺序执行
//! - **prompts**: Prompt 模板
//! - **rag**: 文档检索问答
//! - **routing**: 基因数据库路由（解析、匹配、Enrichr / Gene Ontology 处理器、Dispatcher）

pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod planner;
pub mod prompts;
pub mod rag;
pub mod routing;

pub use crate::core::{AgentError, SessionState};
pub use planner::{execute_plan, plan};
pub use routing::Dispatcher;
