//! Step Executor：执行一步动作并写入推理历史
//!
//! Final Answer 不查注册表；未知动作与工具失败都变成 Observation 文本，运行继续。
//! 无论结果如何，每次调用恰好追加一条 ReasoningStep 并使 iteration_count 加一。

use chrono::Utc;
use serde_json::Value;

use crate::react::events::{preview, EventSink, ReactEvent};
use crate::react::parser::ParsedStep;
use crate::react::state::{ReasoningStep, RunState, FINAL_ANSWER};
use crate::tools::{ToolArgs, ToolExecutor};

pub const READY_OBSERVATION: &str = "Ready to provide final answer";
/// 未注册动作的观察前缀；Finalizer 据此渲染为错误块
pub const UNKNOWN_ACTION_PREFIX: &str = "Unknown action:";

pub async fn execute_step(
    tools: &ToolExecutor,
    parsed: &ParsedStep,
    state: &mut RunState,
    events: &EventSink,
) {
    let action = parsed.action().to_string();
    let action_input = parsed.action_input();

    let observation = if action == FINAL_ANSWER {
        state.set_should_continue(false);
        READY_OBSERVATION.to_string()
    } else {
        match tools.lookup(&action) {
            Err(unregistered) => {
                tracing::warn!(action = %action, "{}", unregistered);
                let observation = unknown_action(&action, &tools.tool_names());
                events.emit(ReactEvent::ToolFailure {
                    tool: action.clone(),
                    reason: unregistered.to_string(),
                });
                observation
            }
            Ok(tool) => {
                events.emit(ReactEvent::ToolCall {
                    tool: action.clone(),
                    args: Value::Object(action_input.clone()),
                });
                let args = ToolArgs::from(action_input.clone());
                match tools.invoke(tool.as_ref(), &args).await {
                    Ok(value) => {
                        let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                        events.emit(ReactEvent::Observation {
                            tool: action.clone(),
                            preview: preview(&text),
                        });
                        text
                    }
                    Err(e) => {
                        events.emit(ReactEvent::ToolFailure {
                            tool: action.clone(),
                            reason: e.to_string(),
                        });
                        format!("Error executing {}: {}", action, e)
                    }
                }
            }
        }
    };

    let step = ReasoningStep {
        iteration: state.next_iteration(),
        thought: parsed.thought.clone(),
        action,
        action_input,
        observation,
        timestamp: Utc::now(),
    };
    state.record(step);
}

fn unknown_action(action: &str, names: &[&str]) -> String {
    let listed: Vec<String> = names.iter().map(|n| format!("'{}'", n)).collect();
    format!("{} {}. Available actions: [{}]", UNKNOWN_ACTION_PREFIX, action, listed.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use crate::core::ToolError;
    use crate::react::parser::parse_react_output;
    use crate::tools::{Tool, ToolId, ToolRegistry};

    struct Recording {
        seen: Arc<Mutex<Vec<ToolArgs>>>,
    }

    #[async_trait]
    impl Tool for Recording {
        fn id(&self) -> ToolId {
            ToolId::CheckStockAlerts
        }

        async fn invoke(&self, args: &ToolArgs) -> Result<Value, ToolError> {
            self.seen.lock().unwrap().push(args.clone());
            Ok(json!({"success": true, "alerts": []}))
        }
    }

    struct Failing;

    #[async_trait]
    impl Tool for Failing {
        fn id(&self) -> ToolId {
            ToolId::GetBatchHistory
        }

        async fn invoke(&self, _args: &ToolArgs) -> Result<Value, ToolError> {
            Err(ToolError::MissingArgument("batch_id"))
        }
    }

    fn executor(seen: Arc<Mutex<Vec<ToolArgs>>>) -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        registry.register(Recording { seen });
        registry.register(Failing);
        ToolExecutor::new(registry, None)
    }

    #[tokio::test]
    async fn test_tool_invoked_with_empty_mapping() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let tools = executor(Arc::clone(&seen));
        let mut state = RunState::new("q", 5);
        let parsed = parse_react_output("Thought: need stock levels\nAction: check_stock_alerts\nAction Input: N/A");

        execute_step(&tools, &parsed, &mut state, &EventSink::none()).await;

        let calls = seen.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].is_empty());
        let step = &state.history()[0];
        assert_eq!(step.iteration, 1);
        assert_eq!(step.thought, "need stock levels");
        assert!(step.observation.contains("\"alerts\""));
        assert_eq!(state.iteration_count(), 1);
    }

    #[tokio::test]
    async fn test_tool_failure_becomes_observation() {
        let tools = executor(Arc::new(Mutex::new(Vec::new())));
        let mut state = RunState::new("q", 5);
        let parsed = parse_react_output("Action: get_batch_history\nAction Input: {}");

        execute_step(&tools, &parsed, &mut state, &EventSink::none()).await;

        assert_eq!(state.iteration_count(), 1);
        assert_eq!(
            state.history()[0].observation,
            "Error executing get_batch_history: missing required argument 'batch_id'"
        );
        assert!(state.should_continue());
    }

    #[tokio::test]
    async fn test_unknown_action_lists_registered_tools() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let tools = executor(Arc::clone(&seen));
        let mut state = RunState::new("q", 5);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let parsed = parse_react_output("Action: analyze_sales_data\nAction Input: N/A");

        execute_step(&tools, &parsed, &mut state, &EventSink::new(tx)).await;

        let obs = &state.history()[0].observation;
        assert!(obs.starts_with("Unknown action: analyze_sales_data."));
        assert!(obs.contains("'check_stock_alerts'"));
        assert!(obs.contains("'get_batch_history'"));
        assert!(seen.lock().unwrap().is_empty());
        assert!(matches!(rx.try_recv().unwrap(), ReactEvent::ToolFailure { .. }));
    }

    #[tokio::test]
    async fn test_final_answer_skips_registry() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let tools = executor(Arc::clone(&seen));
        let mut state = RunState::new("q", 5);
        let parsed = parse_react_output("Thought: done\nAction: Final Answer\nAction Input: N/A");

        execute_step(&tools, &parsed, &mut state, &EventSink::none()).await;

        assert_eq!(state.history()[0].observation, READY_OBSERVATION);
        assert!(!state.should_continue());
        assert_eq!(state.iteration_count(), 1);
        assert!(seen.lock().unwrap().is_empty());
    }
}
