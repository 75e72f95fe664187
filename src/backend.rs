//! 后端数据 API 客户端（只读）
//!
//! 所有请求带 X-Tenant-ID 头，非 2xx 映射为 BackendError::Status；健康检查把可用性作为数据返回，不报错。

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::BackendSection;

pub const HEALTH_ENDPOINT: &str = "/api/v1/healthz";

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("backend returned status {status} for {endpoint}")]
    Status { status: u16, endpoint: String },

    #[error("invalid JSON from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("invalid backend configuration: {0}")]
    Config(String),
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    tenant_id: String,
}

impl BackendClient {
    pub fn new(cfg: &BackendSection) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Tenant-ID",
            HeaderValue::from_str(&cfg.tenant_id)
                .map_err(|e| BackendError::Config(format!("tenant_id: {}", e)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            tenant_id: cfg.tenant_id.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// GET `{base_url}{path}`，query 中的键值按原样编码
    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, ?query, "backend GET");
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| BackendError::Request {
                endpoint: path.to_string(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                endpoint: path.to_string(),
            });
        }
        let body = resp.text().await.map_err(|source| BackendError::Request {
            endpoint: path.to_string(),
            source,
        })?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| BackendError::Decode {
            endpoint: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// 探测健康端点；连接失败、超时、非 200 都作为 `backend_available: false` 返回
    pub async fn probe_health(&self) -> Value {
        let url = format!("{}{}", self.base_url, HEALTH_ENDPOINT);
        let start = Instant::now();
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                let body = resp
                    .json::<Value>()
                    .await
                    .unwrap_or_else(|_| json!({"status": "ok"}));
                json!({
                    "success": true,
                    "backend_available": true,
                    "status": "connected",
                    "base_url": self.base_url,
                    "health_endpoint": HEALTH_ENDPOINT,
                    "response_time_ms": elapsed_ms,
                    "response": body,
                })
            }
            Ok(resp) => json!({
                "success": false,
                "backend_available": false,
                "status": "unreachable",
                "status_code": resp.status().as_u16(),
                "base_url": self.base_url,
                "message": format!("Backend returned status {}", resp.status().as_u16()),
            }),
            Err(e) => {
                let (status, message) = if e.is_timeout() {
                    ("timeout", "Backend API request timed out".to_string())
                } else if e.is_connect() {
                    (
                        "connection_failed",
                        format!("Cannot connect to backend API at {}", self.base_url),
                    )
                } else {
                    ("error", format!("Unexpected error: {}", e))
                };
                json!({
                    "success": false,
                    "backend_available": false,
                    "status": status,
                    "base_url": self.base_url,
                    "message": message,
                })
            }
        }
    }
}
