//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）、单次调用封装

pub mod chain;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use chain::{predict, CallUsage, Completion};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{LlmClient, LlmError};

use crate::config::AppConfig;

/// 根据配置与环境变量选择 LLM 后端：有 API Key 走 OpenAI 兼容端点，否则 Mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let key = match cfg.llm.provider.to_lowercase().as_str() {
        "deepseek" => std::env::var("DEEPSEEK_API_KEY").ok(),
        _ => std::env::var("OPENAI_API_KEY").ok(),
    };

    match key {
        Some(key) => {
            let base = cfg.llm.base_url.as_deref().or_else(|| {
                (cfg.llm.provider.eq_ignore_ascii_case("deepseek"))
                    .then_some("https://api.deepseek.com/v1")
            });
            tracing::info!("Using {} LLM ({})", cfg.llm.provider, cfg.llm.model);
            Arc::new(OpenAiClient::new(base, &cfg.llm.model, Some(&key)))
        }
        None => {
            tracing::warn!("No API key set for provider {}, using Mock LLM", cfg.llm.provider);
            Arc::new(MockLlmClient::new())
        }
    }
}
