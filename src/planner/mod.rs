//! Planner：一次调用 oracle 得到完整计划，分解为 Stage 列表存入会话
//!
//! 与 Dispatcher 不同：使用会话级记忆（历史随会话累积），并且不做错误兜底，
//! oracle 或分解失败直接返回给调用方。

pub mod decomposer;
pub mod executor;
pub mod stage;

pub use decomposer::{decompose, force_directive};
pub use executor::{
    execute_plan, plan_request, run_module, run_module_for_directive, ForcedDirective,
};
pub use stage::{Module, Stage};

use serde_json::json;

use crate::core::{AgentError, LlmCallLog, LogEntry, SessionState};
use crate::llm::predict;
use crate::prompts;

/// 写入 process.steps 的调用用途
pub const PLAN_PURPOSE: &str = "Plan";

pub async fn plan(session: &mut SessionState) -> Result<(), AgentError> {
    let llm = session.llm();
    let query = session.prompt.clone();
    let template = prompts::planner();

    let completion = predict(llm.as_ref(), &template, &mut session.memory, &query).await?;
    // 末尾补两个换行，保证最后一行 Prompt 也能被切出来
    let response = format!("{}\n\n", completion.content);
    session.debug_log(&response);

    let stages = decompose(&response, &Module::ALL)?;
    tracing::info!(stages = stages.len(), "Plan decomposed");

    session.process.push(LogEntry::LlmCall(LlmCallLog::new(
        PLAN_PURPOSE,
        llm.as_ref(),
        template,
        query,
        &completion,
        json!(stages),
    )));
    session.planned = stages.clone();
    session.process.mark_planner(stages);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::AppConfig;
    use crate::core::{ParseError, ProcessKind};
    use crate::llm::{LlmError, MockLlmClient};

    const PLAN: &str = "**Step 1**\nModule: RAG\nPrompt: find genes linked to myogenesis\n\n**Step 2**\nModule: DATABASE\nPrompt: run enrichment on MYOD1, MYOG";

    #[tokio::test]
    async fn test_plan_stores_stages() {
        let mock = Arc::new(MockLlmClient::with_responses([PLAN]));
        let mut s = SessionState::new(mock, AppConfig::default());
        s.begin_turn("plan a myogenesis study");

        plan(&mut s).await.unwrap();
        assert_eq!(s.planned.len(), 2);
        // 最后一步没有结尾换行也能提取
        assert_eq!(s.planned[1].prompt, "/force DATABASE run enrichment on MYOD1, MYOG");
        match s.process.kind() {
            ProcessKind::Planner { stages } => assert_eq!(stages, &s.planned),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_plan_uses_session_memory() {
        let mock = Arc::new(MockLlmClient::with_responses([PLAN, PLAN]));
        let mut s = SessionState::new(mock.clone(), AppConfig::default());
        s.begin_turn("first plan");
        plan(&mut s).await.unwrap();
        s.begin_turn("second plan");
        plan(&mut s).await.unwrap();

        let second = &mock.received()[1];
        assert_eq!(second.len(), 4);
        assert_eq!(second[1].content, "first plan");
        assert_eq!(s.memory.len(), 4);
    }

    #[tokio::test]
    async fn test_plan_errors_propagate() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_error(LlmError::Timeout);
        mock.push_response("**Step 1** RAG without prompt");
        let mut s = SessionState::new(mock, AppConfig::default());

        s.begin_turn("x");
        assert!(matches!(plan(&mut s).await, Err(AgentError::Llm(LlmError::Timeout))));

        s.begin_turn("y");
        assert!(matches!(
            plan(&mut s).await,
            Err(AgentError::Parse(ParseError::MissingPrompt { .. }))
        ));
        assert!(s.planned.is_empty());
    }
}
