//! 后端工具集成测试：wiremock 提供假的数据 API

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use larder::backend::BackendClient;
use larder::config::BackendSection;
use larder::core::ToolError;
use larder::llm::MockLlmClient;
use larder::react::{ReactAgent, ReactOptions};
use larder::tools::{default_registry, ToolArgs, ToolExecutor, ToolId};

const TENANT: &str = "22222222-2222-2222-2222-222222222222";

fn backend(base_url: &str) -> Arc<BackendClient> {
    let cfg = BackendSection {
        base_url: base_url.to_string(),
        tenant_id: TENANT.to_string(),
        request_timeout_secs: 5,
    };
    Arc::new(BackendClient::new(&cfg).unwrap())
}

fn inventory_body() -> serde_json::Value {
    json!({
        "summary": {"total_in_stock": 1, "total_low_stock": 1, "total_out_of_stock": 1},
        "ingredient_items": [
            {"id": "p1", "name": "Flour", "type": "raw_material", "available_qty": 12, "unit": "kg", "stock_status": "low_stock"},
            {"id": "p2", "name": "Paneer", "type": "raw_material", "available_qty": 0, "unit": "kg", "stock_status": "out_of_stock"},
            {"id": "p3", "name": "Rice", "type": "raw_material", "available_qty": 80, "unit": "kg", "stock_status": "in_stock"}
        ]
    })
}

#[tokio::test]
async fn stock_alerts_send_tenant_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/inventory"))
        .and(header("X-Tenant-ID", TENANT))
        .respond_with(ResponseTemplate::new(200).set_body_json(inventory_body()))
        .expect(1)
        .mount(&server)
        .await;

    let registry = default_registry(backend(&server.uri()));
    let tool = registry.lookup("check_stock_alerts").unwrap();
    let out = tool.invoke(&ToolArgs::default()).await.unwrap();

    assert_eq!(out["total_alerts"], 2);
    assert_eq!(out["alerts"][0]["product_name"], "Paneer");
    assert_eq!(out["alerts"][0]["severity"], "Critical");
}

#[tokio::test]
async fn wastage_summary_sends_date_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/wastage/summary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total_cost": 750})))
        .mount(&server)
        .await;

    let registry = default_registry(backend(&server.uri()));
    let tool = registry.lookup(ToolId::GetWastageSummary.as_str()).unwrap();
    let args = ToolArgs::from_value(json!({"days_back": "7"}));
    let out = tool.invoke(&args).await.unwrap();

    assert_eq!(out["wastage_summary"]["business_insights"]["cost_impact"], "Medium");

    let requests = server.received_requests().await.unwrap();
    let query = requests[0].url.query().unwrap_or("").to_string();
    assert!(query.contains("start_date="));
    assert!(query.contains("end_date="));
}

#[tokio::test]
async fn server_error_maps_to_backend_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/cookbook"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let registry = default_registry(backend(&server.uri()));
    let tool = registry.lookup("get_all_cookbook_items").unwrap();
    let err = tool.invoke(&ToolArgs::default()).await.unwrap_err();

    assert!(matches!(err, ToolError::Backend(_)));
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn backend_status_reports_availability_as_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/healthz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let up = backend(&server.uri()).probe_health().await;
    assert_eq!(up["status"], "connected");
    assert_eq!(up["backend_available"], true);

    // 端口 9 (discard) 上没有服务
    let down = backend("http://127.0.0.1:9").probe_health().await;
    assert_eq!(down["backend_available"], false);
    assert_eq!(down["success"], false);
}

#[tokio::test]
async fn react_run_against_fake_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/inventory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(inventory_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/stock/batch/B-404/history"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let llm = Arc::new(MockLlmClient::with_responses([
        "Thought: check alerts\nAction: check_stock_alerts\nAction Input: N/A",
        "Thought: trace the batch\nAction: get_batch_history\nAction Input: {\"batch_id\": \"B-404\"}",
        "Thought: enough\nAction: Final Answer\nAction Input: N/A",
        "Paneer is out of stock and Flour is low.",
    ]));
    let tools = ToolExecutor::new(default_registry(backend(&server.uri())), None);
    let agent = ReactAgent::new(llm.clone(), tools, ReactOptions::default());

    let out = agent.run("What needs restocking?", &[]).await;

    assert_eq!(out.state.iteration_count(), 3);
    let history = out.state.history();
    assert!(history[0].observation.contains("\"total_alerts\": 2"));
    assert!(history[1].observation.starts_with("Error executing get_batch_history:"));
    assert!(history[1].observation.contains("404"));
    assert_eq!(out.response, "Paneer is out of stock and Flour is low.");

    let final_prompt = &llm.call(3).unwrap()[1].content;
    assert!(final_prompt.contains("🚨 **STOCK ALERTS** (2 items need attention)"));
    assert!(final_prompt.contains("⚠️ **Get Batch History**"));
}
