//! 洞察格式化：把工具的 JSON 观察结果转为简短可读的要点块，供 Finalizer 拼进提示词
//!
//! InsightFormatters 是按 ToolId 索引的策略表，未登记的工具走通用格式化；
//! 非 JSON 的观察走纯文本块（截断 300 字符），错误观察走 ⚠️ 块。

pub mod domain;

use std::collections::HashMap;

use serde_json::Value;

use crate::react::step::UNKNOWN_ACTION_PREFIX;
use crate::tools::ToolId;

/// 单个工具的格式化函数
pub type InsightFormatter = fn(&Value) -> String;

const PLAIN_TEXT_LIMIT: usize = 300;

/// 工具名 -> 格式化函数；必有通用兜底
#[derive(Clone)]
pub struct InsightFormatters {
    by_tool: HashMap<ToolId, InsightFormatter>,
}

impl Default for InsightFormatters {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl InsightFormatters {
    /// 空表：所有工具都用通用格式化
    pub fn generic_only() -> Self {
        Self {
            by_tool: HashMap::new(),
        }
    }

    /// 内置的领域格式化
    pub fn with_defaults() -> Self {
        let mut f = Self::generic_only();
        f.register(ToolId::GetInventoryStatus, domain::inventory_status);
        f.register(ToolId::CheckStockAlerts, domain::stock_alerts);
        f.register(ToolId::AnalyzeInventoryByProduct, domain::product_inventory);
        f.register(ToolId::GetExpiryAlerts, domain::expiry_alerts);
        f.register(ToolId::GetAllCookbookItems, domain::cookbook);
        f.register(ToolId::GetRecipeDetails, domain::recipe);
        f.register(ToolId::AnalyzeMenuProfitability, domain::menu_profitability);
        f.register(ToolId::GetWastageSummary, domain::wastage);
        f.register(ToolId::AnalyzeWastageByProduct, domain::wastage);
        f.register(ToolId::TrackWastageTrends, domain::wastage);
        f.register(ToolId::GetTenantInformation, domain::tenants);
        f.register(ToolId::AnalyzeProductCatalog, domain::catalog);
        f.register(ToolId::GetLocationOverview, domain::locations);
        f.register(ToolId::GetBatchHistory, domain::batch);
        f.register(ToolId::CheckBackendStatus, domain::system_status);
        f.register(ToolId::GetAvailableEndpoints, domain::endpoints);
        f
    }

    pub fn register(&mut self, id: ToolId, formatter: InsightFormatter) {
        self.by_tool.insert(id, formatter);
    }

    /// 格式化一次成功的 JSON 结果
    pub fn format_value(&self, tool_name: &str, data: &Value) -> String {
        let formatter = tool_name
            .parse::<ToolId>()
            .ok()
            .and_then(|id| self.by_tool.get(&id));
        match formatter {
            Some(f) => f(data),
            None => generic(tool_name, data),
        }
    }

    /// 格式化一条观察文本：空、"Error" 开头或未知动作为错误块，JSON 走工具格式化，其余为纯文本块
    pub fn format_observation(&self, tool_name: &str, observation: &str) -> String {
        if observation.is_empty()
            || observation.starts_with("Error")
            || observation.starts_with(UNKNOWN_ACTION_PREFIX)
        {
            return error_block(tool_name, observation);
        }
        match serde_json::from_str::<Value>(observation) {
            Ok(data) => self.format_value(tool_name, &data),
            Err(_) => plain_text(tool_name, observation),
        }
    }
}

/// "check_stock_alerts" -> "Check Stock Alerts"
pub fn title_case(s: &str) -> String {
    s.split(|c: char| c == '_' || c == ' ')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// 标量按原样显示（字符串不带引号），缺失显示 default
pub fn show(value: Option<&Value>, default: &str) -> String {
    match value {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// 金额：两位小数、千分位
pub fn money(amount: f64) -> String {
    let formatted = format!("{:.2}", amount.abs());
    let (int_part, frac) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if amount < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, frac)
}

pub fn plain_text(tool_name: &str, observation: &str) -> String {
    let name = title_case(tool_name);
    if observation.chars().count() > PLAIN_TEXT_LIMIT {
        let head: String = observation.chars().take(PLAIN_TEXT_LIMIT).collect();
        format!("📊 **{}**: {}...", name, head)
    } else {
        format!("📊 **{}**: {}", name, observation)
    }
}

pub fn error_block(tool_name: &str, observation: &str) -> String {
    format!("⚠️ **{}**: {}", title_case(tool_name), observation)
}

const KEY_FIELDS: [&str; 7] = ["total", "count", "summary", "result", "data", "value", "score"];

/// 通用格式化：关键字段 + 列表字段的条数与前三项
pub fn generic(tool_name: &str, data: &Value) -> String {
    let name = title_case(tool_name);
    if data.get("success").and_then(|v| v.as_bool()) == Some(false) {
        return format!(
            "⚠️ **{}**: {}",
            name,
            show(data.get("message"), "Operation failed")
        );
    }
    let mut lines = vec![format!("📊 **{}**", name.to_uppercase())];
    for field in KEY_FIELDS {
        if let Some(v) = data.get(field).filter(|v| !v.is_null()) {
            lines.push(format!("• {}: {}", title_case(field), show(Some(v), "")));
        }
    }
    if let Some(map) = data.as_object() {
        for (key, value) in map {
            let Some(items) = value.as_array().filter(|a| !a.is_empty()) else {
                continue;
            };
            lines.push(format!("• {}: {} items", title_case(key), items.len()));
            for item in items.iter().take(3) {
                match item {
                    Value::String(_) | Value::Number(_) => lines.push(format!("  - {}", show(Some(item), ""))),
                    Value::Object(obj) if obj.contains_key("name") => {
                        lines.push(format!("  - {}", show(obj.get("name"), "")))
                    }
                    _ => {}
                }
            }
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("check_stock_alerts"), "Check Stock Alerts");
        assert_eq!(title_case("low_stock"), "Low Stock");
    }

    #[test]
    fn test_money_groups_thousands() {
        assert_eq!(money(1234567.891), "$1,234,567.89");
        assert_eq!(money(12.0), "$12.00");
        assert_eq!(money(-950.5), "-$950.50");
        assert_eq!(money(0.0), "$0.00");
    }

    #[test]
    fn test_observation_routing() {
        let f = InsightFormatters::with_defaults();
        let err = f.format_observation("get_batch_history", "Error executing get_batch_history: boom");
        assert!(err.starts_with("⚠️ **Get Batch History**"));

        let long = "x".repeat(400);
        let plain = f.format_observation("whatever", &long);
        assert!(plain.starts_with("📊 **Whatever**: "));
        assert!(plain.ends_with("..."));

        let alerts = f.format_observation("check_stock_alerts", r#"{"success": true, "alerts": []}"#);
        assert!(alerts.contains("No critical alerts"));
    }

    #[test]
    fn test_unknown_action_renders_as_error() {
        let f = InsightFormatters::with_defaults();
        let out = f.format_observation(
            "analyze_sales_data",
            "Unknown action: analyze_sales_data. Available actions: ['check_stock_alerts']",
        );
        assert!(out.starts_with("⚠️ **Analyze Sales Data**: Unknown action: analyze_sales_data."));
        assert!(!out.contains("📊"));
    }

    #[test]
    fn test_generic_formatter() {
        let data = json!({"success": true, "total": 3, "rows": [{"name": "a"}, "b", 1, {"x": 1}]});
        let out = generic("custom_tool", &data);
        assert!(out.starts_with("📊 **CUSTOM TOOL**"));
        assert!(out.contains("• Total: 3"));
        assert!(out.contains("• Rows: 4 items"));
        assert!(out.contains("  - a\n  - b\n  - 1"));

        let failed = generic("custom_tool", &json!({"success": false, "message": "nope"}));
        assert_eq!(failed, "⚠️ **Custom Tool**: nope");
    }

    #[test]
    fn test_generic_only_ignores_domain_formatters() {
        let f = InsightFormatters::generic_only();
        let out = f.format_value("check_stock_alerts", &json!({"success": true, "total_alerts": 0}));
        assert!(out.starts_with("📊 **CHECK STOCK ALERTS**"));
    }
}
