//! Larder 命令行入口
//!
//! 从参数或 stdin 读取一个 JSON 请求，跑一次分析，把结果 JSON 打印到 stdout。
//! 任何失败都输出 `success: false` 的 JSON 信封并以状态码 1 退出。

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde_json::{json, Value};

use larder::config::load_config;
use larder::react::EventSink;
use larder::{observability, Agent, RunRequest};

#[derive(Parser, Debug)]
#[command(name = "larder", version, about = "Business-analytics assistant over inventory, cookbook, wastage and tenancy data")]
struct Cli {
    /// 请求 JSON；省略时从 stdin 读取
    input: Option<String>,

    /// 额外的配置文件（覆盖 config/default.toml）
    #[arg(long, env = "LARDER_CONFIG")]
    config: Option<PathBuf>,

    /// 把 ReAct 过程事件以 JSON 行写到 stderr
    #[arg(long)]
    events: bool,
}

fn envelope(response: String, error: String) -> Value {
    json!({
        "success": false,
        "response": response,
        "error": error,
        "intent": "error",
    })
}

fn fail(body: Value) -> ! {
    println!("{}", body);
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    observability::init();
    let cli = Cli::parse();

    let raw = match read_input(cli.input.clone()) {
        Ok(raw) => raw,
        Err(e) => fail(envelope(format!("Processing failed: {:#}", e), format!("{:#}", e))),
    };
    let value: Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => fail(envelope("Invalid JSON input provided".to_string(), e.to_string())),
    };

    match run(&cli, &value).await {
        Ok(out) => println!("{}", out),
        Err(e) => fail(envelope(format!("Processing failed: {:#}", e), format!("{:#}", e))),
    }
}

fn read_input(arg: Option<String>) -> anyhow::Result<String> {
    match arg {
        Some(s) => Ok(s),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

async fn run(cli: &Cli, value: &Value) -> anyhow::Result<String> {
    let request = RunRequest::from_json(value).context("invalid request")?;
    let cfg = load_config(cli.config.clone()).context("failed to load config")?;
    let mut agent = Agent::from_config(&cfg).context("failed to create agent")?;

    let printer = if cli.events {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        agent = agent.with_events(EventSink::new(tx));
        Some(tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                if let Ok(line) = serde_json::to_string(&ev) {
                    eprintln!("{}", line);
                }
            }
        }))
    } else {
        None
    };

    let response = agent.process(request).await;
    // 释放事件发送端，让打印任务结束
    drop(agent);
    if let Some(handle) = printer {
        let _ = handle.await;
    }
    serde_json::to_string_pretty(&response).context("failed to serialize response")
}
