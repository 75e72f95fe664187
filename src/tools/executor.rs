//! 工具执行器
//!
//! 持有 ToolRegistry 与可选超时；invoke 在超时内调用工具，超时转为 ToolError::Timeout；
//! 每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::time::timeout;

use crate::core::ToolError;
use crate::tools::{Tool, ToolArgs, ToolRegistry, UnregisteredTool};

/// 工具执行器：可选地对每次调用施加超时，并记录审计日志
pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Option<Duration>,
}

impl ToolExecutor {
    /// timeout_secs 为 None 时不限时
    pub fn new(registry: ToolRegistry, timeout_secs: Option<u64>) -> Self {
        Self {
            registry,
            timeout: timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Tool>, UnregisteredTool> {
        self.registry.lookup(name)
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        self.registry.all_names()
    }

    /// 调用已解析的工具；输出 JSON 审计日志
    pub async fn invoke(&self, tool: &dyn Tool, args: &ToolArgs) -> Result<Value, ToolError> {
        let start = Instant::now();
        let name = tool.id().as_str();
        let result = match self.timeout {
            Some(limit) => match timeout(limit, tool.invoke(args)).await {
                Ok(r) => r,
                Err(_) => Err(ToolError::Timeout(limit.as_secs())),
            },
            None => tool.invoke(args).await,
        };

        let (ok, outcome): (bool, &str) = match &result {
            Ok(_) => (true, "ok"),
            Err(ToolError::Timeout(_)) => (false, "timeout"),
            Err(_) => (false, "error"),
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(args),
        });
        tracing::info!(audit = %audit.to_string(), "tool");
        result
    }
}

fn args_preview(args: &ToolArgs) -> String {
    let s = Value::Object(args.as_map().clone()).to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolId;
    use async_trait::async_trait;
    use serde_json::json;

    struct Slow;

    #[async_trait]
    impl Tool for Slow {
        fn id(&self) -> ToolId {
            ToolId::CheckBackendStatus
        }

        async fn invoke(&self, _args: &ToolArgs) -> Result<Value, ToolError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(json!({"success": true}))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_tool_error() {
        let mut registry = ToolRegistry::new();
        registry.register(Slow);
        let executor = ToolExecutor::new(registry, Some(1));
        let tool = executor.lookup("check_backend_status").unwrap();
        let err = executor.invoke(tool.as_ref(), &ToolArgs::default()).await.unwrap_err();
        assert!(matches!(err, ToolError::Timeout(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_timeout_waits_for_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Slow);
        let executor = ToolExecutor::new(registry, None);
        let tool = executor.lookup("check_backend_status").unwrap();
        let value = executor.invoke(tool.as_ref(), &ToolArgs::default()).await.unwrap();
        assert_eq!(value["success"], true);
    }
}
