//! 端到端：Agent -> ReAct 循环 -> 工具 -> Finalizer -> 会话存储

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use larder::core::ToolError;
use larder::llm::{LlmError, MockLlmClient};
use larder::memory::{FileSessionStore, Role, SessionStore};
use larder::react::{EventSink, ReactAgent, ReactEvent, ReactOptions};
use larder::tools::{Tool, ToolArgs, ToolExecutor, ToolId, ToolRegistry};
use larder::{Agent, Method, RunRequest};

/// 固定返回一条产品分析结果，并记录被调用次数
struct ProductTool {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Tool for ProductTool {
    fn id(&self) -> ToolId {
        ToolId::AnalyzeInventoryByProduct
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let id = args.require_str("product_id")?;
        Ok(json!({
            "success": true,
            "product_analysis": {"product_id": id, "product_name": "Paneer", "stock_status": "low_stock"},
        }))
    }
}

fn react(llm: Arc<MockLlmClient>, calls: Arc<AtomicUsize>) -> ReactAgent {
    let mut registry = ToolRegistry::new();
    registry.register(ProductTool { calls });
    ReactAgent::new(llm, ToolExecutor::new(registry, None), ReactOptions::default())
}

#[tokio::test]
async fn run_persists_context_for_next_turn() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileSessionStore::new(dir.path()));
    let calls = Arc::new(AtomicUsize::new(0));
    let llm = Arc::new(MockLlmClient::with_responses([
        "Thought: look at paneer\nAction: analyze_inventory_by_product\nAction Input: {\"product_id\": \"p-7\"}",
        "Thought: done\nAction: Final Answer\nAction Input: N/A",
        "Paneer is running low.",
    ]));
    let agent = Agent::new(react(llm.clone(), calls.clone()), store.clone(), 10);

    let mut request = RunRequest::new("Why is paneer running low this week?");
    request.session_id = "shop-1".to_string();
    request.method = Method::React;
    let out = agent.process(request).await;

    assert!(out.success);
    assert_eq!(out.response, "Paneer is running low.");
    assert_eq!(out.iterations, 2);
    assert_eq!(out.reasoning_trace.len(), 2);
    assert_eq!(out.tools_used, vec!["analyze_inventory_by_product".to_string()]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(out.metadata.reasoning_steps, 2);

    let saved = store.load("shop-1").unwrap().unwrap();
    assert_eq!(saved["last_analyzed_product"]["product_name"], "Paneer");
    assert_eq!(saved["last_analyzed_product"]["reasoning_step"], 1);
    assert_eq!(saved["last_react_reasoning"]["iterations"], 2);
}

#[tokio::test]
async fn stored_context_survives_a_run_without_product() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileSessionStore::new(dir.path()));
    let mut seeded = serde_json::Map::new();
    seeded.insert("preferred_location".to_string(), json!("downtown"));
    store.save("shop-2", &seeded).unwrap();

    let llm = Arc::new(MockLlmClient::with_responses([
        "Thought: nothing to look up\nAction: Final Answer\nAction Input: N/A",
        "Hello!",
    ]));
    let agent = Agent::new(react(llm, Arc::new(AtomicUsize::new(0))), store.clone(), 10);

    let mut request = RunRequest::new("Explain what you can analyze");
    request.session_id = "shop-2".to_string();
    let out = agent.process(request).await;

    assert_eq!(out.method, Method::React);
    assert_eq!(out.session_context["preferred_location"], "downtown");
    assert!(out.session_context.get("last_analyzed_product").is_none());
    let saved = store.load("shop-2").unwrap().unwrap();
    assert_eq!(saved["preferred_location"], "downtown");
    assert_eq!(saved["last_react_reasoning"]["iterations"], 1);
}

#[tokio::test]
async fn prior_turns_reach_final_answer_prompt() {
    let llm = Arc::new(MockLlmClient::with_responses([
        "Thought: answer directly\nAction: Final Answer\nAction Input: N/A",
        "Sure.",
    ]));
    let store = Arc::new(larder::memory::InMemorySessionStore::default());
    let agent = Agent::new(react(llm.clone(), Arc::new(AtomicUsize::new(0))), store, 10);

    let request = RunRequest::from_json(&json!({
        "message": "Why did that change?",
        "method": "react",
        "context": {
            "conversationHistory": [
                {"role": "user", "content": "How much flour is left?"},
                {"role": "assistant", "content": "12 kg of flour."}
            ]
        }
    }))
    .unwrap();
    let out = agent.process(request).await;
    assert_eq!(out.response, "Sure.");

    let final_call = llm.call(1).unwrap();
    assert_eq!(final_call[0].role, Role::System);
    assert!(final_call.iter().any(|m| m.content == "12 kg of flour."));
    let last = final_call.last().unwrap();
    assert_eq!(last.role, Role::User);
    assert!(last.content.contains("Why did that change?"));
}

#[tokio::test]
async fn finalizer_failure_still_returns_apology() {
    let llm = Arc::new(MockLlmClient::with_responses([
        "Thought: done\nAction: Final Answer\nAction Input: N/A",
    ]));
    llm.push_error(LlmError::Request("quota exceeded".to_string()));
    let agent = react(llm, Arc::new(AtomicUsize::new(0)));

    let out = agent.run("Summarize wastage", &[]).await;

    assert!(out.response.starts_with("I analyzed your request using multiple reasoning steps"));
    assert!(out.response.contains("quota exceeded"));
    assert_eq!(out.state.iteration_count(), 1);
}

#[tokio::test]
async fn missing_required_argument_is_observed_not_fatal() {
    let calls = Arc::new(AtomicUsize::new(0));
    let llm = Arc::new(MockLlmClient::with_responses([
        "Thought: check product\nAction: analyze_inventory_by_product\nAction Input: {}",
        "Thought: retry with id\nAction: analyze_inventory_by_product\nAction Input: {\"product_id\": \"p-1\"}",
        "Thought: done\nAction: Final Answer\nAction Input: N/A",
        "ok",
    ]));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let agent = react(llm, calls.clone()).with_events(EventSink::new(tx));

    let out = agent.run("How is paneer stocked?", &[]).await;
    drop(agent);

    let history = out.state.history();
    assert_eq!(history.len(), 3);
    assert!(history[0]
        .observation
        .starts_with("Error executing analyze_inventory_by_product: missing required argument 'product_id'"));
    assert!(history[1].observation.contains("\"product_name\": \"Paneer\""));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let mut failures = 0;
    while let Some(ev) = rx.recv().await {
        if matches!(ev, ReactEvent::ToolFailure { .. }) {
            failures += 1;
        }
    }
    assert_eq!(failures, 1);
}
