//! 错误类型
//!
//! 三层隔离：ToolError 在 Step Executor 处转为 Observation 文本；解析错误在 Parser 内部吞掉；
//! LlmError 在 Controller / Finalizer 边界转为确定性文本。AgentError 只在运行时装配与入口层出现。

use thiserror::Error;

use crate::backend::BackendError;
use crate::llm::LlmError;

/// 运行时装配、请求校验、会话持久化等层面的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Session store error: {0}")]
    Session(String),
}

/// 单次工具调用失败（网络、参数、下游 4xx/5xx、超时）
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("missing required argument '{0}'")]
    MissingArgument(&'static str),

    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("timed out after {0}s")]
    Timeout(u64),
}

impl From<config::ConfigError> for AgentError {
    fn from(e: config::ConfigError) -> Self {
        AgentError::Config(e.to_string())
    }
}
