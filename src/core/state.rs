//! 会话状态：贯穿每个阶段的唯一可变记录
//!
//! 覆盖型字段（prompt / output / planned）每轮重写；追加型字段（process.steps / chatlog）只能追加，
//! 类型上不提供删除或改写接口。所有阶段共享同一实例（&mut 传递），不做拷贝；
//! 后面的阶段需要容忍前面阶段失败后留下的半成品字段。

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::core::Tables;
use crate::llm::{CallUsage, Completion, LlmClient};
use crate::memory::ConversationMemory;
use crate::planner::Stage;
use crate::rag::DocumentIndex;
use crate::routing::Route;

/// 一次 oracle 调用的结构化日志
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmCallLog {
    pub purpose: String,
    pub model: String,
    /// 填充后的模板
    pub prompt: String,
    pub input: String,
    pub output: String,
    pub elapsed_secs: f64,
    pub usage: CallUsage,
    pub parsed: serde_json::Value,
}

impl LlmCallLog {
    pub fn new(
        purpose: impl Into<String>,
        llm: &dyn LlmClient,
        prompt: impl Into<String>,
        input: impl Into<String>,
        completion: &Completion,
        parsed: serde_json::Value,
    ) -> Self {
        Self {
            purpose: purpose.into(),
            model: llm.model_name().to_string(),
            prompt: prompt.into(),
            input: input.into(),
            output: completion.content.clone(),
            elapsed_secs: completion.elapsed.as_secs_f64(),
            usage: completion.usage,
            parsed,
        }
    }
}

/// process.steps 中的一条记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEntry {
    LlmCall(LlmCallLog),
    /// 路由处理器 / RAG / 阶段执行产生的结果摘要
    Result {
        source: String,
        detail: serde_json::Value,
    },
    Debug {
        message: String,
    },
    Error {
        info: String,
        message: String,
    },
}

/// 本轮 process 的类型：普通路由轮，或规划轮（附带阶段列表）
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ProcessKind {
    #[default]
    Turn,
    Planner {
        stages: Vec<Stage>,
    },
}

/// 单轮的追加型日志
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProcessLog {
    #[serde(flatten)]
    kind: ProcessKind,
    steps: Vec<LogEntry>,
    /// Dispatcher 选中的数据库
    database_route: Option<Route>,
}

impl ProcessLog {
    pub fn push(&mut self, entry: LogEntry) {
        self.steps.push(entry);
    }

    pub fn steps(&self) -> &[LogEntry] {
        &self.steps
    }

    pub fn kind(&self) -> &ProcessKind {
        &self.kind
    }

    pub fn database_route(&self) -> Option<Route> {
        self.database_route
    }

    pub(crate) fn set_database_route(&mut self, route: Route) {
        self.database_route = Some(route);
    }

    pub(crate) fn mark_planner(&mut self, stages: Vec<Stage>) {
        self.kind = ProcessKind::Planner { stages };
    }

    /// 本轮的错误记录
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|e| match e {
            LogEntry::Error { message, .. } => Some(message.as_str()),
            _ => None,
        })
    }
}

/// chatlog 中归档的一轮
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnRecord {
    pub prompt: String,
    pub output: Option<String>,
    pub process: ProcessLog,
    pub timestamp: DateTime<Utc>,
}

/// 会话状态（一次对话的生命周期）
pub struct SessionState {
    pub id: String,
    /// 当前用户输入，每轮覆盖
    pub prompt: String,
    llm: Arc<dyn LlmClient>,
    pub config: AppConfig,
    pub tables: Tables,
    pub databases: HashMap<String, Arc<dyn DocumentIndex>>,
    /// 会话级对话记忆（Planner 使用）
    pub memory: ConversationMemory,
    pub process: ProcessLog,
    pub planned: Vec<Stage>,
    /// 最近一次产出，每轮覆盖
    pub output: Option<String>,
    chatlog: Vec<TurnRecord>,
}

impl SessionState {
    pub fn new(llm: Arc<dyn LlmClient>, config: AppConfig) -> Self {
        let memory = ConversationMemory::new(config.app.max_context_turns);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            prompt: String::new(),
            llm,
            config,
            tables: Tables::new(),
            databases: HashMap::new(),
            memory,
            process: ProcessLog::default(),
            planned: Vec::new(),
            output: None,
            chatlog: Vec::new(),
        }
    }

    pub fn with_database(mut self, name: impl Into<String>, db: Arc<dyn DocumentIndex>) -> Self {
        self.databases.insert(name.into(), db);
        self
    }

    /// oracle 句柄，会话内不可替换
    pub fn llm(&self) -> Arc<dyn LlmClient> {
        Arc::clone(&self.llm)
    }

    /// 开始新一轮：覆盖 prompt，清空 output，新建 process
    pub fn begin_turn(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
        self.output = None;
        self.process = ProcessLog::default();
    }

    /// 结束本轮：把 prompt / output / process 归档到 chatlog
    pub fn finish_turn(&mut self) -> &TurnRecord {
        self.chatlog.push(TurnRecord {
            prompt: self.prompt.clone(),
            output: self.output.clone(),
            process: std::mem::take(&mut self.process),
            timestamp: Utc::now(),
        });
        &self.chatlog[self.chatlog.len() - 1]
    }

    pub fn chatlog(&self) -> &[TurnRecord] {
        &self.chatlog
    }

    /// 恢复已归档的历史（来自持久化文件）
    pub fn restore_chatlog(&mut self, records: Vec<TurnRecord>) {
        self.chatlog.extend(records);
    }

    /// 调试输出：总是发 tracing::debug，debug 开关打开时同时写入 process
    pub fn debug_log(&mut self, message: impl Display) {
        let message = message.to_string();
        tracing::debug!("{}", message);
        if self.config.app.debug {
            self.process.push(LogEntry::Debug { message });
        }
    }

    pub fn error_log(&mut self, info: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(info, "{}", message);
        self.process.push(LogEntry::Error {
            info: info.to_string(),
            message,
        });
    }
}
