//! 可观测性：tracing 日志写到 stderr（stdout 只输出结果 JSON）

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// RUST_LOG 未设置时为 info；重复调用不会 panic
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
