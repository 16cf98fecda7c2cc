//! 从文件 / 已加载表中取基因列表
//!
//! 模型回复 load: True 时，Dispatcher 不用回复里的 genes，而是调用 GeneListLoader。

use std::path::{Path, PathBuf};

use crate::core::{AgentError, SessionState, Table};

/// 文件加载协作者：可修改会话（如登记新读入的表），返回基因列表
pub trait GeneListLoader: Send + Sync {
    fn load(&self, session: &mut SessionState) -> Result<Vec<String>, AgentError>;
}

/// 被视为基因列的列名（不区分大小写）
const GENE_COLUMNS: [&str; 4] = ["gene", "genes", "symbol", "gene_symbol"];

const TABLE_EXTENSIONS: [&str; 3] = ["csv", "tsv", "txt"];

/// 默认实现：
/// 1. prompt 中提到的表格文件（.csv / .tsv / .txt）若存在，读入并以文件名登记到 tables；
/// 2. 取最近加载的表；
/// 3. 优先取名为 gene / genes / symbol / gene_symbol 的列，否则取第一列。
#[derive(Debug, Default)]
pub struct TableGeneLoader;

impl TableGeneLoader {
    pub fn new() -> Self {
        Self
    }
}

/// 在 prompt 中找存在的表格文件路径
fn referenced_files(prompt: &str) -> Vec<PathBuf> {
    prompt
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| matches!(c, '"' | '\'' | ',' | ';' | '(' | ')')))
        .map(PathBuf::from)
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| TABLE_EXTENSIONS.iter().any(|t| e.eq_ignore_ascii_case(t)))
        })
        .filter(|p| p.is_file())
        .collect()
}

fn table_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
        .to_string()
}

fn gene_column(table: &Table) -> Option<usize> {
    GENE_COLUMNS
        .iter()
        .find_map(|name| table.column_index(name))
        .or_else(|| (!table.columns.is_empty()).then_some(0))
}

impl GeneListLoader for TableGeneLoader {
    fn load(&self, session: &mut SessionState) -> Result<Vec<String>, AgentError> {
        for path in referenced_files(&session.prompt) {
            let table = Table::read_file(&path)?;
            let name = table_name(&path);
            tracing::info!(table = %name, path = %path.display(), "Loaded table from prompt");
            session.tables.insert(name, table);
        }

        let (name, table) = session
            .tables
            .latest()
            .ok_or_else(|| AgentError::FileLoad("no table loaded to read genes from".to_string()))?;
        let column = gene_column(table)
            .ok_or_else(|| AgentError::FileLoad(format!("table {name} has no columns")))?;
        let genes = table.column_values(column);
        let message = format!(
            "Loaded {} genes from {}.{}",
            genes.len(),
            name,
            table.columns[column]
        );
        session.debug_log(message);
        Ok(genes)
    }
}
