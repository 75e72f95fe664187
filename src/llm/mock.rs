//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! 按顺序返回预置的回复（或预置的失败），并记录每次收到的消息；脚本用完后固定回答 Final Answer。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};
use crate::memory::Message;

/// 脚本耗尽后的默认回复
pub const MOCK_FINAL_ANSWER: &str =
    "Thought: I have gathered enough information.\nAction: Final Answer\nAction Input: N/A";

#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 依次返回给定文本
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        for r in responses {
            client.push_response(r);
        }
        client
    }

    pub fn push_response(&self, text: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(text.into()));
        }
    }

    pub fn push_error(&self, err: LlmError) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(err));
        }
    }

    /// 已发生的调用次数
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// 第 n 次调用收到的消息（从 0 开始）
    pub fn call(&self, n: usize) -> Option<Vec<Message>> {
        self.calls.lock().ok().and_then(|c| c.get(n).cloned())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.unwrap_or_else(|| Ok(MOCK_FINAL_ANSWER.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_default() {
        let client = MockLlmClient::with_responses(["first"]);
        client.push_error(LlmError::Request("rate limited".into()));

        let msgs = vec![Message::user("q")];
        assert_eq!(client.complete(&msgs).await.unwrap(), "first");
        assert!(client.complete(&msgs).await.is_err());
        assert_eq!(client.complete(&msgs).await.unwrap(), MOCK_FINAL_ANSWER);
        assert_eq!(client.call_count(), 3);
        assert_eq!(client.call(0).unwrap()[0].content, "q");
    }
}
