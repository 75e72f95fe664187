//! Agent 运行时：请求解析、方法路由（intent / react / auto）、会话上下文读写
//!
//! Agent::from_config 装配 LLM、后端客户端、工具注册表与会话存储；
//! process 对单个请求总是返回结构完整的 RunResponse，不向调用方抛错。

use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::backend::BackendClient;
use crate::config::AppConfig;
use crate::core::AgentError;
use crate::llm::create_llm_from_config;
use crate::memory::{ConversationMemory, FileSessionStore, InMemorySessionStore, SessionContext, SessionStore};
use crate::react::{merge_context, EventSink, ReactAgent, ReactOptions, ReasoningStep};
use crate::tools::{default_registry, ToolExecutor};

/// 复杂问题走 ReAct
const COMPLEX_INDICATORS: [&str; 12] = [
    "why",
    "how",
    "explain",
    "analyze why",
    "what caused",
    "multiple",
    "compare and",
    "both",
    "also show",
    "comprehensive",
    "detailed analysis",
    "investigation",
];

/// 直接查询走 intent
const SIMPLE_INDICATORS: [&str; 8] = [
    "show me",
    "get",
    "list",
    "status",
    "current",
    "last month",
    "forecast",
    "inventory",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Intent,
    React,
    #[default]
    Auto,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Intent => "intent",
            Method::React => "react",
            Method::Auto => "auto",
        }
    }
}

impl FromStr for Method {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "intent" => Ok(Method::Intent),
            "react" => Ok(Method::React),
            "auto" | "" => Ok(Method::Auto),
            other => Err(AgentError::InvalidInput(format!("unknown method: {}", other))),
        }
    }
}

static COMPLEX_RE: OnceLock<Option<Regex>> = OnceLock::new();
static SIMPLE_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// 关键词按整词匹配（"show" 不含 "how"，"budget" 不含 "get"）
fn keyword_re(cell: &'static OnceLock<Option<Regex>>, words: &[&str]) -> Option<&'static Regex> {
    cell.get_or_init(|| {
        let alternation = words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|");
        Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).ok()
    })
    .as_ref()
}

fn mentions(cell: &'static OnceLock<Option<Regex>>, words: &[&str], message: &str) -> bool {
    keyword_re(cell, words).is_some_and(|re| re.is_match(message))
}

/// auto 路由：先看复杂关键词，再看简单关键词，都不命中时用 ReAct
pub fn select_method(message: &str) -> Method {
    if mentions(&COMPLEX_RE, &COMPLEX_INDICATORS, message) {
        Method::React
    } else if mentions(&SIMPLE_RE, &SIMPLE_INDICATORS, message) {
        Method::Intent
    } else {
        Method::React
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub message: String,
    pub session_id: String,
    pub conversation_history: Vec<Value>,
    /// None 时从会话存储读取
    pub session_context: Option<SessionContext>,
    pub method: Method,
}

impl RunRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: "default".to_string(),
            conversation_history: Vec::new(),
            session_context: None,
            method: Method::Auto,
        }
    }

    /// 同时接受扁平格式与 runner 格式（context.conversationHistory / context.sessionContext）；
    /// 两者都有时扁平字段优先
    pub fn from_json(value: &Value) -> Result<Self, AgentError> {
        let obj = value
            .as_object()
            .ok_or_else(|| AgentError::InvalidInput("request must be a JSON object".to_string()))?;
        let nested = obj.get("context").and_then(|c| c.as_object());

        let message = match obj.get("message") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(AgentError::InvalidInput("message must be a string".to_string())),
        };
        let session_id = obj
            .get("session_id")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("default")
            .to_string();
        let conversation_history = obj
            .get("conversation_history")
            .or_else(|| nested.and_then(|c| c.get("conversationHistory")))
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        let session_context = obj
            .get("session_context")
            .or_else(|| nested.and_then(|c| c.get("sessionContext")))
            .and_then(|v| v.as_object())
            .filter(|m| !m.is_empty())
            .cloned();
        let method = match obj.get("method").and_then(|v| v.as_str()) {
            Some(m) => m.parse()?,
            None => Method::Auto,
        };

        Ok(Self {
            message,
            session_id,
            conversation_history,
            session_context,
            method,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub run_id: String,
    pub reasoning_steps: usize,
    pub max_iterations: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResponse {
    pub success: bool,
    pub response: String,
    pub method: Method,
    pub reasoning_trace: Vec<ReasoningStep>,
    pub iterations: usize,
    pub tools_used: Vec<String>,
    pub session_context: SessionContext,
    pub metadata: RunMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_used: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_method: Option<Method>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// 意图流水线的回复
#[derive(Debug, Clone, Default)]
pub struct IntentReply {
    pub response: String,
    pub tools_used: Vec<String>,
    pub session_context: SessionContext,
}

/// 单轮「意图识别 -> 工具 -> 回复」流水线，作为外部协作者接入
#[async_trait]
pub trait IntentFlow: Send + Sync {
    async fn process(&self, request: &RunRequest) -> Result<IntentReply, AgentError>;
}

pub struct Agent {
    react: ReactAgent,
    store: Arc<dyn SessionStore>,
    intent: Option<Arc<dyn IntentFlow>>,
    max_context_turns: usize,
}

impl Agent {
    pub fn new(react: ReactAgent, store: Arc<dyn SessionStore>, max_context_turns: usize) -> Self {
        Self {
            react,
            store,
            intent: None,
            max_context_turns,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, AgentError> {
        let llm = create_llm_from_config(&cfg.llm);
        let backend = BackendClient::new(&cfg.backend).map_err(|e| AgentError::Config(e.to_string()))?;
        let registry = default_registry(Arc::new(backend));
        tracing::info!(tools = registry.len(), backend = %cfg.backend.base_url, "tool registry ready");
        let executor = ToolExecutor::new(registry, cfg.react.tool_timeout_secs);
        let react = ReactAgent::new(llm, executor, ReactOptions::from_config(cfg));
        let store: Arc<dyn SessionStore> = match &cfg.app.session_dir {
            Some(dir) => Arc::new(FileSessionStore::new(dir)),
            None => Arc::new(InMemorySessionStore::default()),
        };
        Ok(Self::new(react, store, cfg.app.max_context_turns))
    }

    pub fn with_intent_flow(mut self, flow: Arc<dyn IntentFlow>) -> Self {
        self.intent = Some(flow);
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.react = self.react.with_events(events);
        self
    }

    pub async fn process(&self, request: RunRequest) -> RunResponse {
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("run", run_id = %run_id, session = %request.session_id);
        self.process_run(request, run_id).instrument(span).await
    }

    async fn process_run(&self, request: RunRequest, run_id: String) -> RunResponse {
        let started_at = Utc::now();
        let clock = Instant::now();
        let base_context = self.base_context(&request);
        let meta = |steps: usize| RunMetadata {
            run_id: run_id.clone(),
            reasoning_steps: steps,
            max_iterations: self.react.options().max_iterations,
            started_at,
            elapsed_ms: clock.elapsed().as_millis() as u64,
        };

        if request.message.trim().is_empty() {
            let reason = "message is empty";
            tracing::warn!("{}", reason);
            return RunResponse {
                success: false,
                response: format!(
                    "I apologize, but I encountered an error during reasoning: {}. Please try again or ask for help.",
                    reason
                ),
                method: Method::React,
                reasoning_trace: Vec::new(),
                iterations: 0,
                tools_used: Vec::new(),
                session_context: base_context,
                metadata: meta(0),
                error: Some(reason.to_string()),
                fallback_used: None,
                original_method: None,
                fallback_reason: None,
            };
        }

        let method = match request.method {
            Method::Auto => select_method(&request.message),
            m => m,
        };
        tracing::info!(method = method.as_str(), requested = request.method.as_str(), "routing");

        let mut fallback: Option<String> = None;
        if method == Method::Intent {
            match &self.intent {
                Some(flow) => match flow.process(&request).await {
                    Ok(reply) => {
                        let context = merge_context(&base_context, reply.session_context);
                        self.save_context(&request.session_id, &context);
                        return RunResponse {
                            success: true,
                            response: reply.response,
                            method: Method::Intent,
                            reasoning_trace: Vec::new(),
                            iterations: 0,
                            tools_used: reply.tools_used,
                            session_context: context,
                            metadata: meta(0),
                            error: None,
                            fallback_used: None,
                            original_method: None,
                            fallback_reason: None,
                        };
                    }
                    Err(e) => fallback = Some(e.to_string()),
                },
                None => fallback = Some("intent flow not configured".to_string()),
            }
            tracing::warn!(reason = ?fallback, "intent flow unavailable, falling back to react");
        }

        let prior = ConversationMemory::from_history(&request.conversation_history, self.max_context_turns);
        let outcome = self.react.run(&request.message, prior.messages()).await;
        let context = merge_context(&base_context, outcome.session_updates);
        self.save_context(&request.session_id, &context);

        let iterations = outcome.state.iteration_count();
        let tools_used = outcome.state.tools_used();
        let trace = outcome.state.into_history();
        RunResponse {
            success: true,
            response: outcome.response,
            method: Method::React,
            metadata: meta(trace.len()),
            reasoning_trace: trace,
            iterations,
            tools_used,
            session_context: context,
            error: None,
            fallback_used: fallback.as_ref().map(|_| true),
            original_method: fallback.as_ref().map(|_| method),
            fallback_reason: fallback,
        }
    }

    /// 请求自带上下文优先；否则读存储，读失败按空上下文继续
    fn base_context(&self, request: &RunRequest) -> SessionContext {
        if let Some(ctx) = &request.session_context {
            return ctx.clone();
        }
        match self.store.load(&request.session_id) {
            Ok(ctx) => ctx.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "session context load failed");
                SessionContext::new()
            }
        }
    }

    fn save_context(&self, session_id: &str, context: &SessionContext) {
        if let Err(e) = self.store.save(session_id, context) {
            tracing::warn!(error = %e, "session context save failed");
        }
    }
}
