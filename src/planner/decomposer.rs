//! 规划文本分解：把 `**Step n**` 分段的计划拆成有序的 Stage 列表
//!
//! - 按 `**Step ` 标记切段。第一个标记之前的前言段若提到模块，自成 order 0，
//!   其后第 i 个标记（从 0 计）开始的段 order 为 i + 1；前言没有模块时各段 order 为 i。
//!   因此 order 单调不减，只有同一段中的多个模块共享 order。
//! - 段内按词表顺序查找模块名（区分大小写的子串匹配），没有模块的段不产生 Stage。
//! - 子任务取段内第一个 `Prompt: ` 到行尾的文本；段内有模块却没有该行时报 ParseError::MissingPrompt。

use std::sync::OnceLock;

use regex::Regex;

use crate::core::ParseError;
use crate::planner::{Module, Stage};

pub const STEP_MARKER: &str = "**Step ";

fn prompt_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Prompt: (.*?)\n").expect("valid prompt regex"))
}

/// 强制路由指令
pub fn force_directive(module: Module, prompt: &str) -> String {
    format!("/force {} {}", module.name(), prompt)
}

fn modules_in(segment: &str, modules: &[Module]) -> Vec<Module> {
    modules
        .iter()
        .copied()
        .filter(|m| segment.contains(m.name()))
        .collect()
}

pub fn decompose(response: &str, modules: &[Module]) -> Result<Vec<Stage>, ParseError> {
    let segments: Vec<&str> = response.split(STEP_MARKER).collect();
    // 前言没有模块时不占序号
    let preamble_slot = usize::from(!modules_in(segments[0], modules).is_empty());

    let mut stages = Vec::new();
    for (i, segment) in segments.iter().enumerate() {
        let order = if i == 0 { 0 } else { i - 1 + preamble_slot };
        let found = modules_in(segment, modules);
        let Some(first) = found.first() else {
            continue;
        };

        let prompt = prompt_regex()
            .captures(segment)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .ok_or_else(|| ParseError::MissingPrompt {
                order,
                module: first.name().to_string(),
            })?;

        for module in found {
            stages.push(Stage {
                order,
                module,
                prompt: force_directive(module, prompt),
                description: segment.to_string(),
            });
        }
    }
    Ok(stages)
}
