//! 会话流程集成测试：规划 -> 执行 -> 归档 -> 落盘，全程使用 Mock oracle 与本地处理器

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use brad::config::AppConfig;
use brad::core::{AgentError, LogEntry, ProcessKind, SessionState};
use brad::llm::MockLlmClient;
use brad::memory::SessionPersistence;
use brad::planner::{execute_plan, plan, Module};
use brad::rag::{InMemoryIndex, RAG_DATABASE};
use brad::routing::{Dispatcher, GeneListLoader, Route, RouteHandler, RouteHandlers};

const PLAN: &str = "Here is the plan.\n\n**Step 1**\nModule: RAG\nPrompt: which genes drive myogenesis\n\n**Step 2**\nModule: DATABASE\nPrompt: run enrichment on the genes from step 1";

struct RecordingHandler {
    name: &'static str,
    calls: Mutex<Vec<Vec<String>>>,
}

impl RecordingHandler {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl RouteHandler for RecordingHandler {
    async fn handle(&self, session: &mut SessionState, genes: &[String]) -> Result<(), AgentError> {
        self.calls.lock().unwrap().push(genes.to_vec());
        session.output = Some(format!("{}: {}", self.name, genes.join(" ")));
        Ok(())
    }
}

struct NoFiles;

impl GeneListLoader for NoFiles {
    fn load(&self, _session: &mut SessionState) -> Result<Vec<String>, AgentError> {
        Err(AgentError::FileLoad("no files in test".to_string()))
    }
}

fn session(mock: Arc<MockLlmClient>) -> SessionState {
    let idx = InMemoryIndex::new();
    idx.add("myogenesis.md", "MYOD1 and MYOG drive myogenesis in skeletal muscle.")
        .unwrap();
    SessionState::new(mock, AppConfig::default()).with_database(RAG_DATABASE, Arc::new(idx))
}

#[tokio::test]
async fn test_plan_then_execute_then_archive() {
    let mock = Arc::new(MockLlmClient::with_responses([
        PLAN,
        "MYOD1 and MYOG.",
        "database: ENRICHR\ngenes: MYOD1, MYOG\nload: False",
    ]));
    let enrichr = RecordingHandler::new("enrichr");
    let go = RecordingHandler::new("go");
    let dispatcher = Dispatcher::new(
        RouteHandlers::new(enrichr.clone(), go.clone()),
        Arc::new(NoFiles),
    );
    let mut s = session(mock.clone());

    s.begin_turn("plan a myogenesis enrichment study");
    plan(&mut s).await.unwrap();
    assert_eq!(s.planned.len(), 2);
    assert_eq!(s.planned[0].module, Module::Rag);
    assert_eq!(s.planned[1].module, Module::Database);
    assert_eq!(s.planned[0].prompt, "/force RAG which genes drive myogenesis");

    let outputs = execute_plan(&mut s, &dispatcher).await.unwrap();
    assert_eq!(outputs[0].as_deref(), Some("MYOD1 and MYOG."));
    assert_eq!(outputs[1].as_deref(), Some("enrichr: MYOD1 MYOG"));
    assert_eq!(*enrichr.calls.lock().unwrap(), vec![vec!["MYOD1".to_string(), "MYOG".to_string()]]);
    assert!(go.calls.lock().unwrap().is_empty());
    assert_eq!(s.process.database_route(), Some(Route::Enrichr));
    assert_eq!(mock.call_count(), 3);

    let record = s.finish_turn().clone();
    assert_eq!(record.prompt, "run enrichment on the genes from step 1");
    assert!(matches!(record.process.kind(), ProcessKind::Planner { stages } if stages.len() == 2));
    let purposes: Vec<&str> = record
        .process
        .steps()
        .iter()
        .filter_map(|e| match e {
            LogEntry::LlmCall(call) => Some(call.purpose.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(purposes, vec!["Plan", "RAG", "Select database"]);
    assert_eq!(s.chatlog().len(), 1);
}

#[tokio::test]
async fn test_handler_failure_is_logged_and_session_continues() {
    struct Failing;

    #[async_trait]
    impl RouteHandler for Failing {
        async fn handle(&self, _s: &mut SessionState, _g: &[String]) -> Result<(), AgentError> {
            Err(AgentError::route("GENEONTOLOGY", "timeout"))
        }
    }

    let mock = Arc::new(MockLlmClient::with_responses([
        "database: GENEONTOLOGY\ngenes: TP53\nload: False",
        "database: ENRICHR\ngenes: TP53\nload: True",
    ]));
    let dispatcher = Dispatcher::new(
        RouteHandlers::new(RecordingHandler::new("enrichr"), Arc::new(Failing)),
        Arc::new(NoFiles),
    );
    let mut s = session(mock);

    s.begin_turn("what does TP53 do");
    dispatcher.run(&mut s).await.unwrap();
    let errors: Vec<&str> = s.process.errors().collect();
    assert_eq!(errors, vec!["Error occurred while searching database: timeout"]);
    s.finish_turn();

    // 文件加载失败不被兜底
    s.begin_turn("enrich the genes in my file");
    let err = dispatcher.run(&mut s).await.unwrap_err();
    assert!(matches!(err, AgentError::FileLoad(_)));
    s.finish_turn();

    assert_eq!(s.chatlog().len(), 2);
    assert_eq!(s.chatlog()[0].process.errors().count(), 1);
}

#[tokio::test]
async fn test_chatlog_survives_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockLlmClient::with_responses([
        "database: ENRICHR\ngenes: PAX7\nload: False",
    ]));
    let dispatcher = Dispatcher::new(
        RouteHandlers::new(RecordingHandler::new("enrichr"), RecordingHandler::new("go")),
        Arc::new(NoFiles),
    );
    let mut s = session(mock);
    let store = SessionPersistence::new(dir.path(), &s.id);

    s.begin_turn("enrich PAX7");
    dispatcher.run(&mut s).await.unwrap();
    s.finish_turn();
    store.save(s.chatlog()).unwrap();

    let mut restored = session(Arc::new(MockLlmClient::new()));
    restored.restore_chatlog(store.load().unwrap());
    assert_eq!(restored.chatlog().len(), 1);
    assert_eq!(restored.chatlog()[0].prompt, "enrich PAX7");
    assert_eq!(restored.chatlog()[0].process.database_route(), Some(Route::Enrichr));
    assert_eq!(restored.chatlog()[0].output.as_deref(), Some("enrichr: PAX7"));
}
