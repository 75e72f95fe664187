//! 短期记忆：对话历史
//!
//! 调用方随请求带来的历史对话，保留最近 N 轮（user/assistant 对），供 Finalizer 拼接上下文。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// 从调用方传入的松散 JSON 解析一条消息：`{"role": "...", "content": "..."}`，
    /// 也接受 `{"sender": "user|bot", "text": "..."}`；无法识别则返回 None
    pub fn from_loose_json(value: &serde_json::Value) -> Option<Self> {
        let role = value
            .get("role")
            .or_else(|| value.get("sender"))
            .and_then(|v| v.as_str())?;
        let content = value
            .get("content")
            .or_else(|| value.get("text"))
            .or_else(|| value.get("message"))
            .and_then(|v| v.as_str())?;
        let role = match role.to_lowercase().as_str() {
            "user" | "human" => Role::User,
            "assistant" | "bot" | "ai" => Role::Assistant,
            "system" => Role::System,
            _ => return None,
        };
        Some(Self {
            role,
            content: content.to_string(),
        })
    }
}

/// 短期记忆：最近 N 轮对话（每轮含 user + assistant，故实际保留约 max_turns*2 条消息）
#[derive(Clone, Debug)]
pub struct ConversationMemory {
    messages: Vec<Message>,
    max_turns: usize,
}

impl ConversationMemory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_turns,
        }
    }

    /// 由请求中的 conversation_history 构建；无法识别的条目与 system 消息被忽略
    pub fn from_history(history: &[serde_json::Value], max_turns: usize) -> Self {
        let mut memory = Self::new(max_turns);
        for msg in history.iter().filter_map(Message::from_loose_json) {
            if msg.role != Role::System {
                memory.push(msg);
            }
        }
        memory
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
        self.prune();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 超出 max_turns*2 时丢弃最旧的消息，保留最近部分
    fn prune(&mut self) {
        if self.messages.len() > self.max_turns * 2 {
            let keep = self.max_turns * 2;
            self.messages.drain(..self.messages.len() - keep);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prune_keeps_latest_turns() {
        let mut memory = ConversationMemory::new(1);
        memory.push(Message::user("a"));
        memory.push(Message::assistant("b"));
        memory.push(Message::user("c"));
        assert_eq!(memory.messages().len(), 2);
        assert_eq!(memory.messages()[0].content, "b");
        assert_eq!(memory.messages()[1].content, "c");
    }

    #[test]
    fn test_from_history_accepts_both_shapes() {
        let history = vec![
            json!({"role": "user", "content": "how much flour?"}),
            json!({"sender": "bot", "text": "12 kg"}),
            json!({"role": "system", "content": "ignored"}),
            json!({"foo": "bar"}),
        ];
        let memory = ConversationMemory::from_history(&history, 10);
        assert_eq!(memory.messages().len(), 2);
        assert_eq!(memory.messages()[1].role, Role::Assistant);
        assert_eq!(memory.messages()[1].content, "12 kg");
    }
}
