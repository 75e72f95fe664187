//! 单次运行的状态：推理历史、迭代计数、继续标志与阶段

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 结束哨兵：不对应任何工具调用
pub const FINAL_ANSWER: &str = "Final Answer";

/// 一次迭代的记录，追加后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    /// 从 1 开始
    pub iteration: usize,
    pub thought: String,
    pub action: String,
    pub action_input: Map<String, Value>,
    pub observation: String,
    pub timestamp: DateTime<Utc>,
}

impl ReasoningStep {
    pub fn is_final(&self) -> bool {
        self.action == FINAL_ANSWER
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Init,
    Reasoning,
    Acting,
    Finalizing,
    Done,
}

/// 循环中传递的可变状态；历史只能通过 Step Executor 追加，保证 len(history) == iteration_count
#[derive(Debug, Clone)]
pub struct RunState {
    user_message: String,
    reasoning_history: Vec<ReasoningStep>,
    iteration_count: usize,
    max_iterations: usize,
    should_continue: bool,
    final_response: Option<String>,
    phase: RunPhase,
}

impl RunState {
    pub fn new(user_message: impl Into<String>, max_iterations: usize) -> Self {
        Self {
            user_message: user_message.into(),
            reasoning_history: Vec::new(),
            iteration_count: 0,
            max_iterations,
            should_continue: true,
            final_response: None,
            phase: RunPhase::Init,
        }
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn history(&self) -> &[ReasoningStep] {
        &self.reasoning_history
    }

    pub fn into_history(self) -> Vec<ReasoningStep> {
        self.reasoning_history
    }

    pub fn iteration_count(&self) -> usize {
        self.iteration_count
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn should_continue(&self) -> bool {
        self.should_continue
    }

    pub fn final_response(&self) -> Option<&str> {
        self.final_response.as_deref()
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// 最近 window 步（提示词用；历史本身不截断）
    pub fn recent_steps(&self, window: usize) -> &[ReasoningStep] {
        let start = self.reasoning_history.len().saturating_sub(window);
        &self.reasoning_history[start..]
    }

    /// 按顺序列出用过的工具（不含 Final Answer）
    pub fn tools_used(&self) -> Vec<String> {
        tools_used(&self.reasoning_history)
    }

    pub(crate) fn set_phase(&mut self, phase: RunPhase) {
        self.phase = phase;
    }

    /// 下一步的序号
    pub(crate) fn next_iteration(&self) -> usize {
        self.iteration_count + 1
    }

    /// 追加一步并计数加一；唯一的历史写入口
    pub(crate) fn record(&mut self, step: ReasoningStep) {
        self.reasoning_history.push(step);
        self.iteration_count += 1;
    }

    pub(crate) fn set_should_continue(&mut self, value: bool) {
        self.should_continue = value;
    }

    pub(crate) fn set_final_response(&mut self, response: String) {
        self.final_response = Some(response);
    }
}

pub fn tools_used(history: &[ReasoningStep]) -> Vec<String> {
    history
        .iter()
        .filter(|s| !s.is_final())
        .map(|s| s.action.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(iteration: usize, action: &str) -> ReasoningStep {
        ReasoningStep {
            iteration,
            thought: String::new(),
            action: action.to_string(),
            action_input: Map::new(),
            observation: String::new(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_record_keeps_count_in_sync() {
        let mut state = RunState::new("q", 5);
        assert_eq!(state.phase(), RunPhase::Init);
        assert!(state.should_continue());
        for i in 1..=4 {
            state.record(step(state.next_iteration(), if i == 4 { FINAL_ANSWER } else { "check_stock_alerts" }));
            assert_eq!(state.history().len(), state.iteration_count());
        }
        assert_eq!(state.history()[3].iteration, 4);
        assert_eq!(state.recent_steps(3).len(), 3);
        assert_eq!(state.recent_steps(3)[0].iteration, 2);
        assert_eq!(state.tools_used().len(), 3);
    }

    #[test]
    fn test_step_serializes_timestamp_as_rfc3339() {
        let v = serde_json::to_value(step(1, "get_inventory_status")).unwrap();
        assert_eq!(v["iteration"], 1);
        assert!(v["timestamp"].as_str().unwrap().contains('T'));
    }
}
