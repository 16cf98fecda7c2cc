//! 单次 oracle 调用：模板 + 对话记忆 + 用户输入
//!
//! predict 拼出 [system(模板), 历史..., user(输入)]，计时并用累计 token 的前后差值得到本次用量；
//! 成功后把 user/assistant 这一轮写回传入的记忆。记忆由调用方决定作用域（单轮新建或会话级）。

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::llm::{LlmClient, LlmError};
use crate::memory::{ConversationMemory, Message};

/// 单次调用的 token 用量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl CallUsage {
    fn between(before: (u64, u64, u64), after: (u64, u64, u64)) -> Self {
        Self {
            prompt_tokens: after.0.saturating_sub(before.0),
            completion_tokens: after.1.saturating_sub(before.1),
            total_tokens: after.2.saturating_sub(before.2),
        }
    }
}

/// 一次补全的结果与计量
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub elapsed: Duration,
    pub usage: CallUsage,
}

pub async fn predict(
    llm: &dyn LlmClient,
    template: &str,
    memory: &mut ConversationMemory,
    input: &str,
) -> Result<Completion, LlmError> {
    let mut messages = Vec::with_capacity(memory.len() + 2);
    messages.push(Message::system(template));
    messages.extend(memory.messages().iter().cloned());
    messages.push(Message::user(input));

    let before = llm.token_usage();
    let start = Instant::now();
    let content = llm.complete(&messages).await?;
    let elapsed = start.elapsed();
    let usage = CallUsage::between(before, llm.token_usage());

    memory.push(Message::user(input));
    memory.push(Message::assistant(content.clone()));

    tracing::debug!(
        model = llm.model_name(),
        elapsed_ms = elapsed.as_millis() as u64,
        total_tokens = usage.total_tokens,
        "llm call"
    );

    Ok(Completion {
        content,
        elapsed,
        usage,
    })
}
