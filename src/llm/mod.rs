//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::LlmSection;

pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{LlmClient, LlmError};

/// 按 [llm].provider 创建客户端：mock 用于离线运行，其余一律走 OpenAI 兼容端点
pub fn create_llm_from_config(cfg: &LlmSection) -> Arc<dyn LlmClient> {
    match cfg.provider.to_lowercase().as_str() {
        "mock" => {
            tracing::info!("using mock LLM client");
            Arc::new(MockLlmClient::new())
        }
        _ => {
            tracing::info!(model = %cfg.model, base_url = ?cfg.base_url, "using OpenAI-compatible LLM client");
            Arc::new(OpenAiClient::from_config(cfg))
        }
    }
}
