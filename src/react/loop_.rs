//! ReAct 主循环（Reasoning Controller）
//!
//! Init -> Reasoning -> Acting -> (Reasoning | Finalizing) -> Done。
//! 每步：拼推理提示词 -> 调一次模型 -> 解析 -> Step Executor；
//! 继续条件 `action != Final Answer && iteration_count < max_iterations` 每步都检查，
//! 所以无论模型输出什么，最多执行 max_iterations 步。模型调用失败按 Final Answer 处理。

use std::sync::Arc;

use chrono::Utc;

use crate::config::AppConfig;
use crate::insights::InsightFormatters;
use crate::llm::LlmClient;
use crate::memory::{Message, SessionContext};
use crate::react::events::{EventSink, ReactEvent};
use crate::react::finalizer::finalize;
use crate::react::parser::{parse_react_output, ParseResult, ParsedStep};
use crate::react::prompt::reasoning_prompt;
use crate::react::session::session_updates;
use crate::react::state::{RunPhase, RunState};
use crate::react::step::execute_step;
use crate::tools::ToolExecutor;

#[derive(Debug, Clone)]
pub struct ReactOptions {
    /// 至少 1
    pub max_iterations: usize,
    /// 推理提示词中保留的最近步数
    pub history_window: usize,
}

impl Default for ReactOptions {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            history_window: 3,
        }
    }
}

impl ReactOptions {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            max_iterations: cfg.react.max_iterations.max(1),
            history_window: cfg.react.history_window,
        }
    }
}

/// 一次运行的结果
#[derive(Debug)]
pub struct ReactOutcome {
    pub state: RunState,
    pub response: String,
    pub session_updates: SessionContext,
}

/// 控制器：模型客户端与工具作为显式依赖注入，便于替换为测试替身
pub struct ReactAgent {
    llm: Arc<dyn LlmClient>,
    tools: ToolExecutor,
    formatters: InsightFormatters,
    options: ReactOptions,
    events: EventSink,
}

impl ReactAgent {
    pub fn new(llm: Arc<dyn LlmClient>, tools: ToolExecutor, options: ReactOptions) -> Self {
        Self {
            llm,
            tools,
            formatters: InsightFormatters::with_defaults(),
            options: ReactOptions {
                max_iterations: options.max_iterations.max(1),
                ..options
            },
            events: EventSink::none(),
        }
    }

    pub fn with_formatters(mut self, formatters: InsightFormatters) -> Self {
        self.formatters = formatters;
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn options(&self) -> &ReactOptions {
        &self.options
    }

    pub fn tools(&self) -> &ToolExecutor {
        &self.tools
    }

    /// prior_turns：之前的对话，只在 Finalizer 中使用
    pub async fn run(&self, user_message: &str, prior_turns: &[Message]) -> ReactOutcome {
        let mut state = RunState::new(user_message, self.options.max_iterations);
        let schema = self.tools.registry().to_schema_json();

        loop {
            state.set_phase(RunPhase::Reasoning);
            self.events.emit(ReactEvent::StepUpdate {
                step: state.next_iteration(),
                max_steps: state.max_iterations(),
            });
            let parsed = self.reason(&state, &schema).await;
            self.events.emit(ReactEvent::Thought {
                text: parsed.thought.clone(),
            });

            state.set_phase(RunPhase::Acting);
            execute_step(&self.tools, &parsed, &mut state, &self.events).await;

            let keep_going = !parsed.is_terminal() && state.iteration_count() < state.max_iterations();
            state.set_should_continue(keep_going);
            if !keep_going {
                break;
            }
        }

        state.set_phase(RunPhase::Finalizing);
        self.events.emit(ReactEvent::Finalizing {
            iterations: state.iteration_count(),
        });
        let response = finalize(
            self.llm.as_ref(),
            &self.formatters,
            state.user_message(),
            state.history(),
            prior_turns,
        )
        .await;
        state.set_final_response(response.clone());

        let updates = session_updates(state.history(), state.iteration_count(), Utc::now());
        state.set_phase(RunPhase::Done);
        self.events.emit(ReactEvent::Done {
            iterations: state.iteration_count(),
            tools_used: state.tools_used(),
        });
        // 客户端的累计值（跨运行）
        let (prompt_tokens, completion_tokens, total_tokens) = self.llm.token_usage();
        tracing::info!(
            iterations = state.iteration_count(),
            tools = ?state.tools_used(),
            prompt_tokens,
            completion_tokens,
            total_tokens,
            "react run finished"
        );

        ReactOutcome {
            state,
            response,
            session_updates: updates,
        }
    }

    /// 单次模型调用 + 解析；模型失败转为带错误说明的 Final Answer
    async fn reason(&self, state: &RunState, schema: &str) -> ParsedStep {
        let prompt = reasoning_prompt(state, self.options.history_window, schema);
        tracing::debug!(iteration = state.next_iteration(), prompt_chars = prompt.len(), "reasoning prompt");
        match self.llm.complete(&[Message::user(prompt)]).await {
            Ok(text) => {
                let parsed = parse_react_output(&text);
                if let ParseResult::Malformed { reason } = &parsed.result {
                    tracing::debug!(reason = %reason, "model output not in ReAct format, finishing");
                }
                tracing::debug!(action = %parsed.action(), "parsed step");
                parsed
            }
            Err(e) => {
                tracing::warn!(error = %e, "reasoning call failed");
                self.events.emit(ReactEvent::Error { text: e.to_string() });
                ParsedStep::finish_with_thought(format!("Error in reasoning: {}", e))
            }
        }
    }
}
