//! Finalizer：用完整推理历史（不是最近窗口）生成面向用户的回答
//!
//! 每步 Observation 先经 InsightFormatters 转成要点块，再发起一次模型调用；
//! 模型失败时返回带错误信息的确定性道歉文本，不向上抛错。

use crate::insights::InsightFormatters;
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::react::prompt::{analysis_summary, final_messages};
use crate::react::state::ReasoningStep;

/// Final Answer 步没有工具结果，不参与汇总
pub fn format_insights(formatters: &InsightFormatters, history: &[ReasoningStep]) -> String {
    history
        .iter()
        .filter(|s| !s.is_final())
        .map(|s| formatters.format_observation(&s.action, &s.observation))
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn apology(error: &dyn std::fmt::Display) -> String {
    format!(
        "I analyzed your request using multiple reasoning steps, but encountered an error generating the final response: {}. Please try rephrasing your question.",
        error
    )
}

pub async fn finalize(
    llm: &dyn LlmClient,
    formatters: &InsightFormatters,
    user_message: &str,
    history: &[ReasoningStep],
    prior_turns: &[Message],
) -> String {
    let insights = format_insights(formatters, history);
    let summary = analysis_summary(history);
    let messages = final_messages(user_message, &insights, &summary, prior_turns);
    tracing::debug!(insight_chars = insights.len(), steps = history.len(), "final prompt");
    match llm.complete(&messages).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "final response failed");
            apology(&e)
        }
    }
}
