//! 规划阶段与模块词表

use serde::{Deserialize, Serialize};

/// 规划中可使用的模块（固定词表）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Module {
    Rag,
    Scrape,
    Database,
    Code,
    Write,
}

impl Module {
    /// 词表顺序也是同一步内多个模块的输出顺序
    pub const ALL: [Module; 5] = [
        Module::Rag,
        Module::Scrape,
        Module::Database,
        Module::Code,
        Module::Write,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Module::Rag => "RAG",
            Module::Scrape => "SCRAPE",
            Module::Database => "DATABASE",
            Module::Code => "CODE",
            Module::Write => "WRITE",
        }
    }

    pub fn from_name(name: &str) -> Option<Module> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 一个规划阶段；创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub order: usize,
    pub module: Module,
    /// 强制路由指令：`/force <MODULE> <子任务>`
    pub prompt: String,
    /// 所在步骤的完整文本
    pub description: String,
}
