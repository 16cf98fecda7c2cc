//! 文档检索问答（RAG）
//!
//! DocumentIndex 是会话 databases 中的检索句柄；当前实现为 InMemoryIndex（分块后按关键词重叠打分），
//! 后续可接真实向量库。query_docs 检索 -> 把命中的块塞进问答模板 -> 调一次 oracle -> 写回 output。

pub mod chunker;

pub use chunker::{Chunk, Chunker, ChunkingConfig};

use std::collections::HashSet;
use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::{AgentError, LlmCallLog, LogEntry, SessionState};
use crate::llm::predict;
use crate::memory::ConversationMemory;
use crate::prompts;

/// databases 中 RAG 索引的键名
pub const RAG_DATABASE: &str = "RAG";

/// 写入 process.steps 的调用用途
pub const RAG_PURPOSE: &str = "RAG";

/// 检索命中的文档块
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub content: String,
    pub source: String,
    /// 块在来源文档中的字节偏移
    pub offset: usize,
    /// 相关度，范围 [0, 1]
    pub score: f32,
}

/// 检索句柄
pub trait DocumentIndex: Send + Sync {
    fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>, AgentError>;
}

/// 将文本切分为小写词集合
fn tokenize_lower(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 1)
        .collect()
}

/// 内存索引：文档先分块，每块单独打分；得分 = 查询词与块内词的交集 / 查询词数
#[derive(Default)]
pub struct InMemoryIndex {
    chunker: Chunker,
    docs: RwLock<Vec<(ScoredDocument, HashSet<String>)>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunking(config: ChunkingConfig) -> Self {
        Self {
            chunker: Chunker::new(config),
            docs: RwLock::default(),
        }
    }

    /// 分块后加入索引，返回块数
    pub fn add(
        &self,
        source: impl Into<String>,
        content: impl AsRef<str>,
    ) -> Result<usize, AgentError> {
        let source = source.into();
        let entries: Vec<_> = self
            .chunker
            .chunk(content.as_ref())
            .into_iter()
            .map(|chunk| {
                let tokens = tokenize_lower(&chunk.text);
                let doc = ScoredDocument {
                    content: chunk.text,
                    source: source.clone(),
                    offset: chunk.offset,
                    score: 0.0,
                };
                (doc, tokens)
            })
            .collect();
        let added = entries.len();
        self.docs
            .write()
            .map_err(|_| AgentError::Retrieval(format!("index lock poisoned, {source} not added")))?
            .extend(entries);
        Ok(added)
    }

    /// 把目录下的 .txt / .md 文件逐个分块加入索引（不递归），来源为文件名；返回加入的块数
    pub fn load_dir(&self, dir: &Path) -> Result<usize, AgentError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| AgentError::Retrieval(format!("{}: {e}", dir.display())))?;
        let mut added = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_text = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "txt" | "md"));
            if !is_text || !path.is_file() {
                continue;
            }
            let content = std::fs::read_to_string(&path)
                .map_err(|e| AgentError::Retrieval(format!("{}: {e}", path.display())))?;
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let chunks = self.add(source.as_str(), &content)?;
            tracing::debug!(source = %source, chunks, "Indexed document");
            added += chunks;
        }
        Ok(added)
    }

    /// 索引中的块数
    pub fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentIndex for InMemoryIndex {
    fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>, AgentError> {
        let query_tokens = tokenize_lower(query);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }
        let docs = self
            .docs
            .read()
            .map_err(|_| AgentError::Retrieval("index lock poisoned".to_string()))?;
        let mut scored: Vec<ScoredDocument> = docs
            .iter()
            .filter_map(|(doc, tokens)| {
                let hits = query_tokens.intersection(tokens).count();
                (hits > 0).then(|| ScoredDocument {
                    score: hits as f32 / query_tokens.len() as f32,
                    ..doc.clone()
                })
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }
}

fn format_documents(docs: &[ScoredDocument]) -> String {
    docs.iter()
        .enumerate()
        .map(|(i, d)| format!("[{}] ({} @{})\n{}", i + 1, d.source, d.offset, d.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 用会话中的 RAG 索引回答当前 prompt
pub async fn query_docs(session: &mut SessionState) -> Result<(), AgentError> {
    let index = session
        .databases
        .get(RAG_DATABASE)
        .cloned()
        .ok_or_else(|| AgentError::MissingDatabase(RAG_DATABASE.to_string()))?;
    let llm = session.llm();
    let query = session.prompt.clone();

    let docs = index.similarity_search(&query, session.config.rag.top_k)?;
    tracing::info!(documents = docs.len(), "RAG retrieval finished");

    let template = prompts::rag_qa(&format_documents(&docs));
    let mut memory = ConversationMemory::turn_scoped();
    let completion = predict(llm.as_ref(), &template, &mut memory, &query).await?;

    let sources: Vec<_> = docs
        .iter()
        .map(|d| json!({ "source": d.source, "offset": d.offset, "score": d.score }))
        .collect();
    session.process.push(LogEntry::LlmCall(LlmCallLog::new(
        RAG_PURPOSE,
        llm.as_ref(),
        template,
        query,
        &completion,
        json!({ "documents": sources }),
    )));
    session.output = Some(completion.content);
    Ok(())
}
