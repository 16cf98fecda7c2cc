//! 顺序执行规划阶段
//!
//! 每个 Stage 的 `/force <MODULE> <子任务>` 指令被解析后，用子任务覆盖 prompt 再进入对应模块：
//! DATABASE 走 Dispatcher，RAG 走 query_docs；其它模块暂无实现，记一条错误后继续。
//! 单个阶段失败只记日志，不中断后续阶段。

use serde_json::json;

use crate::core::{AgentError, LogEntry, ParseError, SessionState};
use crate::planner::Module;
use crate::rag::query_docs;
use crate::routing::Dispatcher;

pub const FORCE_COMMAND: &str = "/force";

pub const PLAN_COMMAND: &str = "/plan";

const ERROR_INFO: &str = "planner::executor";

/// 解析后的强制路由指令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForcedDirective {
    pub module: Module,
    pub prompt: String,
}

/// 拆出命令词与其余参数（参数已去掉首尾空白）
fn split_command(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    }
}

/// `/plan <请求>` 返回请求文本；其它输入返回 Ok(None)；请求为空返回 InvalidDirective
pub fn plan_request(input: &str) -> Result<Option<&str>, ParseError> {
    match split_command(input) {
        (PLAN_COMMAND, "") => Err(ParseError::InvalidDirective(format!(
            "{PLAN_COMMAND} needs a request"
        ))),
        (PLAN_COMMAND, request) => Ok(Some(request)),
        _ => Ok(None),
    }
}

impl ForcedDirective {
    /// 命令词不是 `/force` 时返回 Ok(None)；缺少模块名或模块名不在词表内返回 InvalidDirective
    pub fn parse(input: &str) -> Result<Option<Self>, ParseError> {
        let (word, rest) = split_command(input);
        if word != FORCE_COMMAND {
            return Ok(None);
        }
        let (name, prompt) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let module = Module::from_name(&name.to_uppercase())
            .ok_or_else(|| ParseError::InvalidDirective(input.trim().to_string()))?;
        Ok(Some(Self {
            module,
            prompt: prompt.trim().to_string(),
        }))
    }
}

/// 在当前 prompt 上运行单个模块
pub async fn run_module(
    module: Module,
    session: &mut SessionState,
    dispatcher: &Dispatcher,
) -> Result<(), AgentError> {
    match module {
        Module::Database => dispatcher.run(session).await,
        Module::Rag => query_docs(session).await,
        Module::Scrape | Module::Code | Module::Write => {
            Err(AgentError::UnsupportedModule(module.name().to_string()))
        }
    }
}

/// 当前 prompt 若是 `/force` 指令，则改写 prompt 并直接运行对应模块，返回 true；否则返回 false
pub async fn run_module_for_directive(
    session: &mut SessionState,
    dispatcher: &Dispatcher,
) -> Result<bool, AgentError> {
    let Some(directive) = ForcedDirective::parse(&session.prompt)? else {
        return Ok(false);
    };
    session.prompt = directive.prompt;
    run_module(directive.module, session, dispatcher).await?;
    Ok(true)
}

/// 依次执行 session.planned，返回各阶段的输出（失败的阶段为 None）
pub async fn execute_plan(
    session: &mut SessionState,
    dispatcher: &Dispatcher,
) -> Result<Vec<Option<String>>, AgentError> {
    let stages = session.planned.clone();
    let mut outputs = Vec::with_capacity(stages.len());

    for stage in &stages {
        let directive = ForcedDirective::parse(&stage.prompt)?.ok_or_else(|| {
            ParseError::InvalidDirective(stage.prompt.clone())
        })?;
        tracing::info!(order = stage.order, module = %directive.module, "Executing stage");

        session.prompt = directive.prompt;
        session.output = None;
        let result = run_module(directive.module, session, dispatcher).await;
        if let Err(e) = result {
            session.error_log(
                ERROR_INFO,
                format!("Stage {} ({}) failed: {e}", stage.order, directive.module),
            );
        }

        session.process.push(LogEntry::Result {
            source: format!("stage {} {}", stage.order, directive.module),
            detail: json!({ "output": session.output }),
        });
        outputs.push(session.output.clone());
    }

    if let Some(last) = outputs.last() {
        session.output = last.clone();
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::config::AppConfig;
    use crate::llm::MockLlmClient;
    use crate::planner::Stage;
    use crate::rag::{InMemoryIndex, RAG_DATABASE};
    use crate::routing::{GeneListLoader, RouteHandler, RouteHandlers};

    struct EchoHandler;

    #[async_trait]
    impl RouteHandler for EchoHandler {
        async fn handle(&self, session: &mut SessionState, genes: &[String]) -> Result<(), AgentError> {
            session.output = Some(format!("searched {}", genes.join(",")));
            Ok(())
        }
    }

    struct NoLoader;

    impl GeneListLoader for NoLoader {
        fn load(&self, _session: &mut SessionState) -> Result<Vec<String>, AgentError> {
            Ok(Vec::new())
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            RouteHandlers::new(Arc::new(EchoHandler), Arc::new(EchoHandler)),
            Arc::new(NoLoader),
        )
    }

    fn stage(order: usize, module: Module, prompt: &str) -> Stage {
        Stage {
            order,
            module,
            prompt: format!("/force {} {}", module.name(), prompt),
            description: String::new(),
        }
    }

    #[test]
    fn test_parse_directive() {
        let d = ForcedDirective::parse("/force RAG find genes").unwrap().unwrap();
        assert_eq!(d.module, Module::Rag);
        assert_eq!(d.prompt, "find genes");

        let d = ForcedDirective::parse("/force database").unwrap().unwrap();
        assert_eq!(d.module, Module::Database);
        assert_eq!(d.prompt, "");

        assert_eq!(ForcedDirective::parse("what is TP53").unwrap(), None);
        assert!(matches!(
            ForcedDirective::parse("/force SING now"),
            Err(ParseError::InvalidDirective(_))
        ));
    }

    #[test]
    fn test_bare_commands_are_recognised() {
        // 输入行会被 trim，命令后不一定还有空格
        assert!(matches!(
            ForcedDirective::parse("/force"),
            Err(ParseError::InvalidDirective(_))
        ));
        let d = ForcedDirective::parse("/force\tRAG").unwrap().unwrap();
        assert_eq!((d.module, d.prompt.as_str()), (Module::Rag, ""));
        assert_eq!(ForcedDirective::parse("/forced RAG x").unwrap(), None);

        assert!(matches!(plan_request("/plan"), Err(ParseError::InvalidDirective(_))));
        assert!(matches!(plan_request("  /plan   "), Err(ParseError::InvalidDirective(_))));
        assert_eq!(plan_request("/plan  design a study ").unwrap(), Some("design a study"));
        assert_eq!(plan_request("/planets in TP53").unwrap(), None);
        assert_eq!(plan_request("what is TP53").unwrap(), None);
    }

    #[tokio::test]
    async fn test_execute_plan_runs_stages_in_order() {
        let idx = InMemoryIndex::new();
        idx.add("a.pdf", "MYOD1 controls muscle genes").unwrap();
        let mock = Arc::new(MockLlmClient::with_responses([
            "MYOD1 is a master regulator.",
            "database: ENRICHR\ngenes: MYOD1,MYOG\nload: False",
        ]));
        let mut s = SessionState::new(mock, AppConfig::default())
            .with_database(RAG_DATABASE, Arc::new(idx));
        s.begin_turn("plan");
        s.planned = vec![
            stage(0, Module::Rag, "muscle genes"),
            stage(1, Module::Database, "enrich MYOD1 and MYOG"),
            stage(2, Module::Write, "summarize"),
        ];

        let outputs = execute_plan(&mut s, &dispatcher()).await.unwrap();
        assert_eq!(
            outputs,
            vec![
                Some("MYOD1 is a master regulator.".to_string()),
                Some("searched MYOD1,MYOG".to_string()),
                None,
            ]
        );
        let errors: Vec<&str> = s.process.errors().collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Unsupported module: WRITE"));
        assert_eq!(s.prompt, "summarize");
        assert!(s.output.is_none());
    }

    #[tokio::test]
    async fn test_directive_runs_module_directly() {
        let mock = Arc::new(MockLlmClient::with_responses([
            "database: ENRICHR\ngenes: PAX7\nload: False",
        ]));
        let mut s = SessionState::new(mock, AppConfig::default());

        s.begin_turn("/force DATABASE enrich PAX7");
        assert!(run_module_for_directive(&mut s, &dispatcher()).await.unwrap());
        assert_eq!(s.prompt, "enrich PAX7");
        assert_eq!(s.output.as_deref(), Some("searched PAX7"));

        s.begin_turn("plain question");
        assert!(!run_module_for_directive(&mut s, &dispatcher()).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_rag_stage_does_not_stop_plan() {
        let mock = Arc::new(MockLlmClient::with_responses([
            "database: GENEONTOLOGY\ngenes: TP53\nload: False",
        ]));
        let mut s = SessionState::new(mock, AppConfig::default());
        s.planned = vec![
            stage(0, Module::Rag, "no index loaded"),
            stage(1, Module::Database, "TP53 function"),
        ];
        let outputs = execute_plan(&mut s, &dispatcher()).await.unwrap();
        assert_eq!(outputs[0], None);
        assert_eq!(outputs[1].as_deref(), Some("searched TP53"));
        assert_eq!(s.output.as_deref(), Some("searched TP53"));
    }
}
