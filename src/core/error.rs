//! Agent 错误类型
//!
//! 解析错误单独成类（ParseError），便于调用方区分「模型输出格式不对」与「外部调用失败」。
//! Dispatcher 只在路由处理器边界捕获错误；Planner 不捕获，直接向上传播。

use thiserror::Error;

use crate::llm::LlmError;

/// 模型输出不符合约定结构时的错误（缺行、缺标记、非法指令）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected {expected} lines in route decision, found {found}")]
    MissingLine { expected: usize, found: usize },

    #[error("step {order} names module {module} but has no \"Prompt: \" line")]
    MissingPrompt { order: usize, module: String },

    #[error("invalid forced-routing directive: {0}")]
    InvalidDirective(String),
}

/// Agent 运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// 路由处理器（Enrichr / Gene Ontology）执行失败
    #[error("{message}")]
    RouteHandler { route: String, message: String },

    #[error("File load error: {0}")]
    FileLoad(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Database not loaded: {0}")]
    MissingDatabase(String),

    #[error("Unsupported module: {0}")]
    UnsupportedModule(String),
}

impl AgentError {
    pub fn route(route: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RouteHandler {
            route: route.into(),
            message: message.into(),
        }
    }
}
