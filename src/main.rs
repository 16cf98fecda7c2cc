//! BRAD - 生物信息对话智能体
//!
//! 入口：加载配置、初始化日志、构建会话，然后逐行读取标准输入：
//! - `/plan <请求>`：规划并顺序执行各阶段
//! - `/force RAG <问题>` / `/force DATABASE <请求>`：直接进入指定模块
//! - 其它输入：数据库路由

use std::sync::Arc;

use anyhow::Context;
use brad::config::{load_config, AppConfig};
use brad::core::SessionState;
use brad::llm::create_llm_from_config;
use brad::memory::SessionPersistence;
use brad::planner::{execute_plan, plan, plan_request, run_module_for_directive};
use brad::rag::{ChunkingConfig, InMemoryIndex, RAG_DATABASE};
use brad::routing::Dispatcher;
use tokio::io::{AsyncBufReadExt, BufReader};

async fn handle_line(
    session: &mut SessionState,
    dispatcher: &Dispatcher,
    line: &str,
) -> Result<(), brad::AgentError> {
    session.begin_turn(line);
    if let Some(request) = plan_request(line)? {
        session.prompt = request.to_string();
        plan(session).await?;
        for stage in &session.planned {
            println!("[{}] {}", stage.order, stage.prompt);
        }
        execute_plan(session, dispatcher).await?;
        return Ok(());
    }

    if !run_module_for_directive(session, dispatcher).await? {
        dispatcher.run(session).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(Into::into);
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        eprintln!("Config load failed ({e}), using defaults");
        AppConfig::default()
    });
    brad::observability::init(cfg.app.debug);

    let llm = create_llm_from_config(&cfg);
    let dispatcher =
        Dispatcher::from_config(&cfg.database).context("Failed to build database handlers")?;
    let index = InMemoryIndex::with_chunking(ChunkingConfig::from(&cfg.rag));
    if let Some(dir) = &cfg.rag.docs_path {
        let added = index
            .load_dir(dir)
            .with_context(|| format!("Failed to load RAG documents from {}", dir.display()))?;
        tracing::info!(chunks = added, "RAG index loaded");
    }
    let mut session =
        SessionState::new(llm, cfg.clone()).with_database(RAG_DATABASE, Arc::new(index));
    let persistence = cfg
        .app
        .log_path
        .as_ref()
        .map(|root| SessionPersistence::new(root, &session.id));
    tracing::info!(session = %session.id, "Session started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "/quit" | "/exit") {
            break;
        }

        if let Err(e) = handle_line(&mut session, &dispatcher, line).await {
            session.error_log("main", e.to_string());
        }

        match (&session.output, session.process.errors().last()) {
            (Some(output), _) => println!("{output}"),
            (None, Some(err)) => println!("{err}"),
            (None, None) => println!("(no output)"),
        }
        session.finish_turn();

        if let Some(store) = &persistence {
            if let Err(e) = store.save(session.chatlog()) {
                tracing::warn!("Failed to save session log: {e}");
            }
        }
    }

    Ok(())
}
