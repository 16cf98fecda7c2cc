//! 会话日志持久化
//!
//! 每个会话一个目录：`<log_path>/<session-id>/log.json`，内容为按轮归档的 TurnRecord 列表（JSON）。
//! 用于跨进程恢复会话或离线查看每轮的调用记录。

use std::path::{Path, PathBuf};

use crate::core::TurnRecord;

pub const LOG_FILE: &str = "log.json";

#[derive(Debug)]
pub struct SessionPersistence {
    path: PathBuf,
}

impl SessionPersistence {
    pub fn new(log_root: impl AsRef<Path>, session_id: &str) -> Self {
        Self {
            path: log_root.as_ref().join(session_id).join(LOG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 从 JSON 文件加载会话日志；文件不存在时返回空 Vec
    pub fn load(&self) -> anyhow::Result<Vec<TurnRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// 写入会话日志；父目录不存在时自动创建
    pub fn save(&self, records: &[TurnRecord]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(records)?)?;
        Ok(())
    }
}

/// 列出 log_root 下已有的会话目录名
pub fn list_sessions(log_root: &Path) -> anyhow::Result<Vec<String>> {
    let mut sessions = Vec::new();
    for entry in std::fs::read_dir(log_root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            sessions.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    sessions.sort();
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::AppConfig;
    use crate::core::SessionState;
    use crate::llm::MockLlmClient;
    use crate::planner::{Module, Stage};

    #[test]
    fn test_save_and_load_chatlog() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = SessionState::new(Arc::new(MockLlmClient::new()), AppConfig::default());

        s.begin_turn("what is TP53");
        s.output = Some("a tumor suppressor".into());
        s.error_log("test", "partial failure");
        s.finish_turn();

        s.begin_turn("plan it");
        s.process.mark_planner(vec![Stage {
            order: 0,
            module: Module::Rag,
            prompt: "/force RAG q".into(),
            description: "step".into(),
        }]);
        s.finish_turn();

        let store = SessionPersistence::new(dir.path(), &s.id);
        store.save(s.chatlog()).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, s.chatlog());
        assert_eq!(list_sessions(dir.path()).unwrap(), vec![s.id.clone()]);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionPersistence::new(dir.path(), "nope");
        assert!(store.load().unwrap().is_empty());
    }
}
