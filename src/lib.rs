//! Larder - 餐饮经营数据分析助手
//!
//! 模块划分：
//! - **agent**: 运行时入口（请求解析、方法路由、会话上下文读写）
//! - **backend**: 只读后端数据 API 客户端
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型
//! - **insights**: 工具结果 -> 可读要点块
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 对话窗口与会话上下文持久化
//! - **observability**: 日志初始化
//! - **react**: ReAct 解析、单步执行、主循环、最终回答
//! - **tools**: 工具注册表、执行器与库存 / 菜谱 / 损耗 / 租户 / 批次 / 系统工具

pub mod agent;
pub mod backend;
pub mod config;
pub mod core;
pub mod insights;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod tools;

pub use agent::{Agent, IntentFlow, Method, RunRequest, RunResponse};
