//! Session Context Updater：从完成的推理历史提取下一轮可用的上下文
//!
//! 纯函数，不修改 RunState。last_analyzed_product 让下一轮能解析"那个产品"之类的指代。

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::memory::SessionContext;
use crate::react::state::{tools_used, ReasoningStep};

pub fn session_updates(history: &[ReasoningStep], iteration_count: usize, now: DateTime<Utc>) -> SessionContext {
    let mut updates = Map::new();
    updates.insert(
        "last_react_reasoning".to_string(),
        json!({
            "iterations": iteration_count,
            "tools_used": tools_used(history),
            "reasoning_steps": history.len(),
            "completed_at": now.to_rfc3339(),
        }),
    );

    // 取最后一个带 product_name 的成功观察
    let product = history
        .iter()
        .filter(|s| !s.is_final() && !s.observation.is_empty() && !s.observation.starts_with("Error"))
        .filter_map(|s| {
            let data: Value = serde_json::from_str(&s.observation).ok()?;
            find_product_name(&data).map(|name| (s.iteration, name))
        })
        .last();
    if let Some((iteration, name)) = product {
        updates.insert(
            "last_analyzed_product".to_string(),
            json!({
                "from_react": true,
                "reasoning_step": iteration,
                "product_name": name,
            }),
        );
    }
    updates
}

/// 深度优先找第一个 product_name 字段
fn find_product_name(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(name) = map.get("product_name").filter(|v| !v.is_null()) {
                return Some(match name {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                });
            }
            map.values().find_map(find_product_name)
        }
        Value::Array(items) => items.iter().find_map(find_product_name),
        _ => None,
    }
}

/// 调用方传入的上下文 + 本轮更新（同名键以本轮为准）
pub fn merge_context(base: &SessionContext, updates: SessionContext) -> SessionContext {
    let mut merged = base.clone();
    merged.extend(updates);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::react::state::FINAL_ANSWER;

    fn step(iteration: usize, action: &str, observation: &str) -> ReasoningStep {
        ReasoningStep {
            iteration,
            thought: String::new(),
            action: action.to_string(),
            action_input: Map::new(),
            observation: observation.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_updates_track_tools_and_product() {
        let history = vec![
            step(1, "check_stock_alerts", r#"{"alerts": [{"product_name": "Paneer"}]}"#),
            step(2, "get_expiry_alerts", r#"{"expiry_alerts": [{"product_name": "Cream"}]}"#),
            step(3, "get_batch_history", "Error executing get_batch_history: product_name missing"),
            step(4, FINAL_ANSWER, "Ready to provide final answer"),
        ];
        let updates = session_updates(&history, 4, Utc::now());
        let reasoning = &updates["last_react_reasoning"];
        assert_eq!(reasoning["iterations"], 4);
        assert_eq!(reasoning["reasoning_steps"], 4);
        assert_eq!(
            reasoning["tools_used"],
            json!(["check_stock_alerts", "get_expiry_alerts", "get_batch_history"])
        );
        let product = &updates["last_analyzed_product"];
        assert_eq!(product["reasoning_step"], 2);
        assert_eq!(product["product_name"], "Cream");
        assert_eq!(product["from_react"], true);
    }

    #[test]
    fn test_no_product_without_field() {
        let history = vec![step(1, "check_backend_status", r#"{"status": "connected"}"#)];
        let updates = session_updates(&history, 1, Utc::now());
        assert!(!updates.contains_key("last_analyzed_product"));
    }

    #[test]
    fn test_merge_keeps_caller_keys() {
        let mut base = Map::new();
        base.insert("user_preference".into(), json!("weekly"));
        base.insert("last_react_reasoning".into(), json!({"iterations": 1}));
        let merged = merge_context(&base, session_updates(&[], 0, Utc::now()));
        assert_eq!(merged["user_preference"], "weekly");
        assert_eq!(merged["last_react_reasoning"]["iterations"], 0);
    }
}
