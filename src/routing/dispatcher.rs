//! Dispatcher：一次数据库路由
//!
//! 表格上下文 -> 模板 -> oracle（单轮记忆）-> 记录调用 -> 解析 -> 匹配路由 ->
//! 取基因列表（回复或文件）-> 截断 -> 调用处理器。
//! 只有处理器的错误在这里被捕获并记入会话日志；oracle、解析、文件加载的错误照常返回给调用方。

use std::sync::Arc;

use crate::config::DatabaseSection;
use crate::core::{AgentError, LlmCallLog, LogEntry, SessionState};
use crate::llm::predict;
use crate::memory::ConversationMemory;
use crate::prompts;
use crate::routing::{parse_route_decision, GeneListLoader, Route, RouteHandlers, TableGeneLoader};

/// 写入 process.steps 的调用用途
pub const SELECT_DATABASE: &str = "Select database";

/// 处理器失败时错误日志的来源标记
const ERROR_INFO: &str = "routing::dispatcher";

/// 保留前 max 个检索词，保持原顺序
pub fn truncate_terms(terms: &mut Vec<String>, max: usize) {
    terms.truncate(max);
}

pub struct Dispatcher {
    handlers: RouteHandlers,
    loader: Arc<dyn GeneListLoader>,
}

impl Dispatcher {
    pub fn new(handlers: RouteHandlers, loader: Arc<dyn GeneListLoader>) -> Self {
        Self { handlers, loader }
    }

    /// HTTP 处理器 + 默认表格加载器
    pub fn from_config(cfg: &DatabaseSection) -> Result<Self, AgentError> {
        Ok(Self::new(
            RouteHandlers::from_config(cfg)?,
            Arc::new(TableGeneLoader::new()),
        ))
    }

    pub async fn run(&self, session: &mut SessionState) -> Result<(), AgentError> {
        let llm = session.llm();
        let query = session.prompt.clone();

        let template = prompts::gene_database_caller(&session.tables.columns_context());
        let mut memory = ConversationMemory::turn_scoped();
        let completion = predict(llm.as_ref(), &template, &mut memory, &query).await?;
        session.debug_log(&completion.content);

        let parsed = parse_route_decision(&completion.content);
        let parsed_json = match &parsed {
            Ok(decision) => serde_json::to_value(decision).unwrap_or_default(),
            Err(_) => serde_json::Value::Null,
        };
        session.process.push(LogEntry::LlmCall(LlmCallLog::new(
            SELECT_DATABASE,
            llm.as_ref(),
            template,
            query,
            &completion,
            parsed_json,
        )));
        let decision = parsed?;
        session.debug_log(format!("{decision:?}"));

        let route = Route::resolve(&decision.database);
        session.process.set_database_route(route);
        tracing::info!(label = %decision.database, route = %route, "Database selected");

        let mut genes = if decision.wants_file() {
            self.loader.load(session)?
        } else {
            decision.genes
        };
        truncate_terms(&mut genes, session.config.database.max_search_terms);
        session.debug_log(format!("search terms: {genes:?}"));

        if let Err(e) = self.handlers.get(route).handle(session, &genes).await {
            let output = format!("Error occurred while searching database: {e}");
            session.error_log(ERROR_INFO, output);
        }
        Ok(())
    }
}
