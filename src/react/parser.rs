//! ReAct 输出解析：从模型自由文本中提取 Thought / Action / Action Input
//!
//! 约定格式：
//! ```text
//! Thought: ...
//! Action: <tool_name | Final Answer>
//! Action Input: {"param": "value"} | N/A
//! ```
//! 解析是全函数：任何输入都返回结构完整的 ParsedStep，失败时取安全默认值并偏向结束。

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::react::state::FINAL_ANSWER;

/// 缺少 Thought 标记时的默认思考
pub const DEFAULT_THOUGHT: &str = "No clear thought provided";

static THOUGHT_RE: OnceLock<Option<Regex>> = OnceLock::new();
static ACTION_RE: OnceLock<Option<Regex>> = OnceLock::new();
static INPUT_RE: OnceLock<Option<Regex>> = OnceLock::new();
static JSON_BLOCK_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// 控制器只看这个和类型，不直接读原始文本
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    /// 调用工具（名字可能未注册，由 Step Executor 处理）
    Continue { action: String, input: Map<String, Value> },
    /// 模型给出 "Final Answer"
    Finish,
    /// 没有 Action 标记，按结束处理
    Malformed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStep {
    pub thought: String,
    pub result: ParseResult,
}

impl ParsedStep {
    /// 模型调用失败时的合成步骤：Final Answer + 说明错误的 thought
    pub fn finish_with_thought(thought: impl Into<String>) -> Self {
        Self {
            thought: thought.into(),
            result: ParseResult::Finish,
        }
    }

    pub fn action(&self) -> &str {
        match &self.result {
            ParseResult::Continue { action, .. } => action,
            ParseResult::Finish | ParseResult::Malformed { .. } => FINAL_ANSWER,
        }
    }

    pub fn action_input(&self) -> Map<String, Value> {
        match &self.result {
            ParseResult::Continue { input, .. } => input.clone(),
            _ => Map::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.result, ParseResult::Continue { .. })
    }
}

pub fn parse_react_output(text: &str) -> ParsedStep {
    let thought = compiled(&THOUGHT_RE, r"(?s)Thought:\s*(.*?)(?:Action:|\z)")
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| DEFAULT_THOUGHT.to_string());

    let action = compiled(&ACTION_RE, r"(?s)Action:\s*(.*?)(?:Action Input:|\z)")
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string());

    let result = match action {
        None => ParseResult::Malformed {
            reason: "no Action marker in model output".to_string(),
        },
        Some(a) if a.is_empty() => ParseResult::Malformed {
            reason: "empty Action in model output".to_string(),
        },
        Some(a) if a == FINAL_ANSWER => ParseResult::Finish,
        Some(action) => ParseResult::Continue {
            action,
            input: parse_action_input(text),
        },
    };
    ParsedStep { thought, result }
}

/// N/A、none、空串为空参数；否则取第一个 `{` 到最后一个 `}` 按 JSON 对象解析，失败为空参数
fn parse_action_input(text: &str) -> Map<String, Value> {
    let Some(raw) = compiled(&INPUT_RE, r"(?s)Action Input:\s*(.*)\z")
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
    else {
        return Map::new();
    };
    if matches!(raw.to_lowercase().as_str(), "n/a" | "none" | "") {
        return Map::new();
    }
    compiled(&JSON_BLOCK_RE, r"(?s)\{.*\}")
        .and_then(|re| re.find(raw))
        .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok())
        .and_then(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default()
}
