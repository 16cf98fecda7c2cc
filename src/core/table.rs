//! 内存表：会话中加载的表格数据（列名 + 行）
//!
//! 只做 Dispatcher 需要的事：列名供 prompt 上下文，按列取值供基因列表加载。

use std::path::Path;

use crate::core::AgentError;

/// prompt 上下文中每张表最多列出的列数
pub const MAX_CONTEXT_COLUMNS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// 解析分隔文本：首行为表头，空行跳过
    pub fn parse_delimited(text: &str, delimiter: char) -> Self {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let columns = lines
            .next()
            .map(|h| split_row(h, delimiter))
            .unwrap_or_default();
        let rows = lines.map(|l| split_row(l, delimiter)).collect();
        Self { columns, rows }
    }

    /// 按扩展名选择分隔符读取文件：.csv 用逗号，.tsv / .txt 用制表符
    pub fn read_file(path: &Path) -> Result<Self, AgentError> {
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ',',
            Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("txt") => '\t',
            _ => {
                return Err(AgentError::FileLoad(format!(
                    "unsupported table file: {}",
                    path.display()
                )))
            }
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| AgentError::FileLoad(format!("{}: {e}", path.display())))?;
        Ok(Self::parse_delimited(&text, delimiter))
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// 某列的非空值，保持行序
    pub fn column_values(&self, index: usize) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|r| r.get(index))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    }
}

fn split_row(line: &str, delimiter: char) -> Vec<String> {
    line.split(delimiter)
        .map(|c| c.trim().trim_matches('"').to_string())
        .collect()
}

/// 按加载顺序保存的表集合；同名表重新加载时移到末尾
#[derive(Debug, Clone, Default)]
pub struct Tables {
    entries: Vec<(String, Table)>,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, table: Table) {
        let name = name.into();
        self.entries.retain(|(n, _)| *n != name);
        self.entries.push((name, table));
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    /// 最近加载的表
    pub fn latest(&self) -> Option<(&str, &Table)> {
        self.entries.last().map(|(n, t)| (n.as_str(), t))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 每张表一行：`<name>.columns = [c1, c2, ..., c10, ...]`，超过 10 列追加 `...`
    pub fn columns_context(&self) -> String {
        let mut out = String::new();
        for (name, table) in self.iter() {
            let mut cols: Vec<&str> = table
                .columns
                .iter()
                .take(MAX_CONTEXT_COLUMNS)
                .map(String::as_str)
                .collect();
            if table.columns.len() > MAX_CONTEXT_COLUMNS {
                cols.push("...");
            }
            out.push_str(&format!("{name}.columns = [{}]\n", cols.join(", ")));
        }
        out
    }
}
