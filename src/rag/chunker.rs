//! 文档分块
//!
//! 按字符数切块（UTF-8 安全），尽量在段落、换行、句末或空格处断开；相邻块保留 overlap 个字符的重叠。

use crate::config::RagSection;

/// 文档块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    /// 在原文档中的字节偏移
    pub offset: usize,
}

/// 分块策略
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// 目标块大小（字符数）
    pub chunk_size: usize,
    /// 块之间的重叠（字符数）
    pub overlap: usize,
    /// 分隔符优先级（从高到低）
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::from(&RagSection::default())
    }
}

impl From<&RagSection> for ChunkingConfig {
    fn from(cfg: &RagSection) -> Self {
        Self {
            chunk_size: cfg.chunk_size.max(1),
            overlap: cfg.overlap,
            separators: ["\n\n", "\n", "。", ". ", "? ", "! ", "; ", " "]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// 切分文本；空白块被丢弃，每块不超过 chunk_size 个字符
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total {
            let target_end = (start + self.config.chunk_size).min(total);
            let mut end = target_end;

            // 不在文末时，退到窗口内最后一个分隔符之后
            if target_end < total {
                let window: String = chars[start..target_end].iter().collect();
                for sep in &self.config.separators {
                    if let Some(pos) = window.rfind(sep.as_str()) {
                        end = start + window[..pos].chars().count() + sep.chars().count();
                        break;
                    }
                }
            }
            if end <= start {
                end = (start + 1).min(total);
            }

            let piece: String = chars[start..end].iter().collect();
            let trimmed = piece.trim();
            if !trimmed.is_empty() {
                let leading = piece.len() - piece.trim_start().len();
                let offset: usize = chars[..start].iter().map(|c| c.len_utf8()).sum();
                chunks.push(Chunk {
                    text: trimmed.to_string(),
                    offset: offset + leading,
                });
            }

            if end >= total {
                break;
            }
            let overlap = self.config.overlap.min(end - start);
            let next = end.saturating_sub(overlap);
            start = if next > start { next } else { end };
        }

        chunks
    }
}
