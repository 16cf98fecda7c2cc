//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `BRAD__*` 覆盖（双下划线表示嵌套，如 `BRAD__DATABASE__MAX_SEARCH_TERMS=5`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub database: DatabaseSection,
    pub rag: RagSection,
    pub llm: LlmSection,
}

/// [app] 段：调试开关、会话日志目录、对话轮数上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// 打开后调试输出也会写入会话日志
    pub debug: bool,
    /// 会话日志根目录；未设置时不落盘
    pub log_path: Option<PathBuf>,
    /// Planner 会话记忆保留轮数
    pub max_context_turns: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            debug: false,
            log_path: None,
            max_context_turns: 20,
        }
    }
}

/// [database] 段：检索词上限与 Enrichr / Gene Ontology 端点
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// 单次查询最多使用的基因 / 检索词数量，超出部分丢弃
    pub max_search_terms: usize,
    pub enrichr_url: String,
    pub enrichr_library: String,
    pub gene_ontology_url: String,
    pub timeout_secs: u64,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            max_search_terms: 10,
            enrichr_url: "https://maayanlab.cloud/Enrichr".to_string(),
            enrichr_library: "KEGG_2021_Human".to_string(),
            gene_ontology_url: "https://api.geneontology.org/api".to_string(),
            timeout_secs: 30,
        }
    }
}

/// [rag] 段：检索条数、分块参数与启动时载入的文档目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagSection {
    pub top_k: usize,
    /// 文档块大小（字符数）
    pub chunk_size: usize,
    /// 相邻块重叠的字符数
    pub overlap: usize,
    /// 目录下的 .txt / .md 文件会在启动时分块加入 RAG 索引
    pub docs_path: Option<PathBuf>,
}

impl Default for RagSection {
    fn default() -> Self {
        Self {
            top_k: 4,
            chunk_size: 500,
            overlap: 50,
            docs_path: None,
        }
    }
}

/// [llm] 段：后端选择
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// openai / deepseek；决定读取哪个 API Key 环境变量
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
        }
    }
}

/// 从 config 目录加载配置，环境变量 BRAD__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 BRAD__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("BRAD")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert!(!cfg.app.debug);
        assert_eq!(cfg.database.max_search_terms, 10);
        assert_eq!(cfg.rag.top_k, 4);
    }

    #[test]
    fn test_load_explicit_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brad.toml");
        std::fs::write(
            &path,
            "[app]\ndebug = true\n\n[database]\nmax_search_terms = 3\n\n[rag]\nchunk_size = 200\n",
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert!(cfg.app.debug);
        assert_eq!(cfg.database.max_search_terms, 3);
        assert_eq!(cfg.database.enrichr_library, "KEGG_2021_Human");
        assert_eq!(cfg.rag.chunk_size, 200);
        assert_eq!(cfg.rag.overlap, 50);
    }
}
