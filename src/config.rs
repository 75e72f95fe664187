//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `LARDER__*` 覆盖（双下划线表示嵌套，如 `LARDER__REACT__MAX_ITERATIONS=3`）。
//! 最后兼容旧部署的环境变量：OPENAI_API_KEY、OPENAI_MODEL、BASE_URL、X_TENANT_ID（仅在对应键未配置时生效）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub backend: BackendSection,
    pub react: ReactSection,
}

/// [app] 段：应用名、会话上下文目录、对话轮数上限
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// 会话上下文持久化目录；未设置时不落盘
    pub session_dir: Option<PathBuf>,
    /// 传给 Finalizer 的历史对话轮数上限
    #[serde(default = "default_max_context_turns")]
    pub max_context_turns: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            session_dir: None,
            max_context_turns: default_max_context_turns(),
        }
    }
}

fn default_max_context_turns() -> usize {
    10
}

/// [llm] 段：后端选择、模型与采样温度
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// openai / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            api_key: None,
            temperature: default_temperature(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

/// [backend] 段：数据 API 地址、租户 ID、请求超时
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSection {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    /// 以 X-Tenant-ID 头发送
    #[serde(default = "default_tenant_id")]
    pub tenant_id: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            tenant_id: default_tenant_id(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_TENANT_ID: &str = "11111111-1111-1111-1111-111111111111";

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_tenant_id() -> String {
    DEFAULT_TENANT_ID.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// [react] 段：迭代上限、提示词中保留的最近步数、可选工具超时
#[derive(Debug, Clone, Deserialize)]
pub struct ReactSection {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// 单次工具调用超时（秒）；未设置则不限时，仅靠 max_iterations 兜底
    pub tool_timeout_secs: Option<u64>,
}

impl Default for ReactSection {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            history_window: default_history_window(),
            tool_timeout_secs: None,
        }
    }
}

fn default_max_iterations() -> usize {
    5
}

fn default_history_window() -> usize {
    3
}

/// 从 config 目录加载配置，环境变量 LARDER__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 叠加环境变量 LARDER__*（双下划线表示嵌套键）
/// 4. 旧环境变量补齐未配置的键
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("LARDER")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    let mut cfg: AppConfig = c.try_deserialize()?;
    apply_legacy_env(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

/// 旧部署的环境变量只填补缺省值，不覆盖显式配置
fn apply_legacy_env(cfg: &mut AppConfig, var: impl Fn(&str) -> Option<String>) {
    if cfg.llm.api_key.is_none() {
        cfg.llm.api_key = var("OPENAI_API_KEY");
    }
    if cfg.llm.model == default_model() {
        if let Some(model) = var("OPENAI_MODEL") {
            cfg.llm.model = model;
        }
    }
    if cfg.backend.base_url == DEFAULT_BACKEND_URL {
        if let Some(url) = var("BASE_URL") {
            cfg.backend.base_url = url;
        }
    }
    if cfg.backend.tenant_id == DEFAULT_TENANT_ID {
        if let Some(tenant) = var("X_TENANT_ID") {
            cfg.backend.tenant_id = tenant;
        }
    }
}
