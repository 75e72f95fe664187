//! ReAct 过程事件：供命令行 `--events` 等观察者展示思考、工具调用与观察

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Observation 预览最大字符数
pub const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// 单步过程事件（可序列化为 JSON 行）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReactEvent {
    /// 第几步 / 最大步数
    StepUpdate { step: usize, max_steps: usize },
    /// 解析出的思考
    Thought { text: String },
    ToolCall {
        tool: String,
        args: serde_json::Value,
    },
    /// 工具返回（预览）
    Observation { tool: String, preview: String },
    /// 工具失败或未知动作，运行继续
    ToolFailure { tool: String, reason: String },
    /// 进入最终回答
    Finalizing { iterations: usize },
    Done { iterations: usize, tools_used: Vec<String> },
    /// 模型调用失败（已转为文本，不中断）
    Error { text: String },
}

/// 可选的事件通道；未设置时 emit 为空操作
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<ReactEvent>>,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<ReactEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn emit(&self, ev: ReactEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ev);
        }
    }
}

pub fn preview(text: &str) -> String {
    if text.chars().count() > OBSERVATION_PREVIEW_CHARS {
        format!("{}...", text.chars().take(OBSERVATION_PREVIEW_CHARS).collect::<String>())
    } else {
        text.to_string()
    }
}
