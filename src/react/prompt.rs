//! 提示词构建：推理提示词（每一步）与最终回答提示词

use std::collections::BTreeSet;

use crate::memory::Message;
use crate::react::state::{ReasoningStep, RunState};

pub const FINAL_SYSTEM_PROMPT: &str =
    "You are a business analytics assistant that provides insights based on data analysis.";

/// 用户问题 + 最近 window 步 + 完整工具清单 + 当前迭代
pub fn reasoning_prompt(state: &RunState, window: usize, tool_schema: &str) -> String {
    let mut context = format!("User Question: {}\n\n", state.user_message());
    let recent = state.recent_steps(window);
    if !recent.is_empty() {
        context.push_str("Previous Reasoning Steps:\n");
        for (i, step) in recent.iter().enumerate() {
            context.push_str(&format!(
                "Step {}:\n  Thought: {}\n  Action: {}\n  Observation: {}\n\n",
                i + 1,
                step.thought,
                step.action,
                step.observation
            ));
        }
    }

    format!(
        r#"You are a business analytics assistant using the ReAct (Reasoning and Acting) approach.
You must INTELLIGENTLY choose which tools to call based on the user's question.

{context}
AVAILABLE TOOLS AND WHEN TO USE THEM:
{tool_schema}

REACT METHODOLOGY:
1. THINK: Analyze the user's question and determine what information you need
2. ACT: Select the MOST APPROPRIATE tool and parameters for the current need
3. OBSERVE: Review the tool result and determine next steps
4. REPEAT: Continue until you have sufficient information for a complete answer

INTELLIGENT TOOL SELECTION GUIDELINES:
- Choose tools based on the user's specific question, not pre-defined patterns
- Consider what information you already have vs what you still need
- Start with broader analysis tools, then drill down to specifics if needed
- If a tool fails, try a different approach or check system status
- Don't call redundant tools - build on previous observations

Current iteration: {current} / {max}

RESPONSE FORMAT (EXACTLY):
Thought: [Your detailed reasoning about what tool to use and why]
Action: [exact_tool_name OR "Final Answer"]
Action Input: {{"parameter_name": "value", "another_param": "value"}} OR N/A for Final Answer

If you have sufficient information to fully answer the user's question:
Action: Final Answer
Action Input: N/A
"#,
        context = context,
        tool_schema = tool_schema,
        current = state.next_iteration(),
        max = state.max_iterations(),
    )
}

/// "Analysis performed: N steps using tools: a, b"
pub fn analysis_summary(history: &[ReasoningStep]) -> String {
    if history.is_empty() {
        return String::new();
    }
    let tools: BTreeSet<&str> = history.iter().map(|s| s.action.as_str()).collect();
    format!(
        "Analysis performed: {} steps using tools: {}",
        history.len(),
        tools.into_iter().collect::<Vec<_>>().join(", ")
    )
}

/// 最终回答的消息列表：system + 之前的对话 + 汇总分析结果的 user 消息
pub fn final_messages(
    user_message: &str,
    insights: &str,
    summary: &str,
    prior_turns: &[Message],
) -> Vec<Message> {
    let body = format!(
        r#"Based on the analysis results, provide a conversational, helpful response to the user.

User Question: "{user_message}"

ANALYSIS RESULTS:
{insights}

{summary}

Guidelines:
1. Be conversational and engaging
2. Use the structured insights above to provide clear, actionable information
3. Lead with key insights and actionable recommendations
4. Use specific numbers and metrics from the analysis
5. Add relevant emojis for key insights (📈 📉 💡 ⚠️)
6. Suggest follow-up questions or actions
7. Keep under 400 words
8. If there were errors, explain what went wrong and suggest alternatives
9. Focus on business value and next steps

Generate a helpful, business-focused response based on the structured data above:"#
    );
    let mut messages = Vec::with_capacity(prior_turns.len() + 2);
    messages.push(Message::system(FINAL_SYSTEM_PROMPT));
    messages.extend(prior_turns.iter().cloned());
    messages.push(Message::user(body));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::Map;

    fn push(state: &mut RunState, action: &str) {
        let step = ReasoningStep {
            iteration: state.next_iteration(),
            thought: format!("thought {}", state.next_iteration()),
            action: action.to_string(),
            action_input: Map::new(),
            observation: format!("obs {}", state.next_iteration()),
            timestamp: Utc::now(),
        };
        state.record(step);
    }

    #[test]
    fn test_reasoning_prompt_windows_history() {
        let mut state = RunState::new("Which items are low?", 5);
        for _ in 0..4 {
            push(&mut state, "check_stock_alerts");
        }
        let prompt = reasoning_prompt(&state, 3, "[]");
        assert!(prompt.contains("User Question: Which items are low?"));
        assert!(!prompt.contains("thought 1"));
        assert!(prompt.contains("thought 2"));
        assert!(prompt.contains("obs 4"));
        assert!(prompt.contains("Current iteration: 5 / 5"));
        assert!(prompt.contains("Action Input: {\"parameter_name\""));
    }

    #[test]
    fn test_first_prompt_has_no_history_block() {
        let state = RunState::new("hi", 3);
        let prompt = reasoning_prompt(&state, 3, "[{\"name\": \"x\"}]");
        assert!(!prompt.contains("Previous Reasoning Steps"));
        assert!(prompt.contains("Current iteration: 1 / 3"));
        assert!(prompt.contains("[{\"name\": \"x\"}]"));
    }

    #[test]
    fn test_final_messages_layout() {
        let prior = vec![Message::user("earlier"), Message::assistant("answer")];
        let msgs = final_messages("q", "📦 block", "Analysis performed: 1 steps using tools: a", &prior);
        assert_eq!(msgs.len(), 4);
        assert_eq!(msgs[0].content, FINAL_SYSTEM_PROMPT);
        assert_eq!(msgs[1].content, "earlier");
        assert!(msgs[3].content.contains("ANALYSIS RESULTS:\n📦 block"));
    }
}
