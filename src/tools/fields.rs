//! 后端 JSON 字段读取辅助
//!
//! 后端返回的数字有时是字符串、字段有时缺失；这里按"缺失即默认值"的方式读取，不因单个字段报错。

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::core::ToolError;

/// 数字或数字字符串转 f64；其余情况为 0
pub fn num(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        Some(Value::Bool(true)) => 1.0,
        _ => 0.0,
    }
}

/// 读取数字字段，依次尝试多个键名（后端不同版本字段名不一致，如 cost_loss / cost）
pub fn num_field(item: &Value, keys: &[&str]) -> f64 {
    keys.iter()
        .find_map(|k| item.get(*k).filter(|v| !v.is_null()))
        .map(|v| num(Some(v)))
        .unwrap_or(0.0)
}

pub fn text<'a>(item: &'a Value, key: &str, default: &'a str) -> &'a str {
    item.get(key).and_then(|v| v.as_str()).unwrap_or(default)
}

/// 依次尝试多个键名取字符串
pub fn text_any<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| item.get(*k).and_then(|v| v.as_str()))
        .filter(|s| !s.is_empty())
}

/// 取字段原值，缺失为 null
pub fn raw(item: &Value, key: &str) -> Value {
    item.get(key).cloned().unwrap_or(Value::Null)
}

/// 列表字段：响应本身是数组时直接使用，是对象时取 key 对应的数组，单个对象视为一条记录
pub fn records<'a>(data: &'a Value, key: &str) -> Vec<&'a Value> {
    match data {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match map.get(key) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(_) => Vec::new(),
            None if map.is_empty() => Vec::new(),
            None => vec![data],
        },
        _ => Vec::new(),
    }
}

/// 对象中 key 对应的数组；缺失或类型不符为空
pub fn array<'a>(data: &'a Value, key: &str) -> Vec<&'a Value> {
    data.get(key)
        .and_then(|v| v.as_array())
        .map(|items| items.iter().collect())
        .unwrap_or_default()
}

/// 解析后端时间戳：RFC 3339、无时区的日期时间（按 UTC）或纯日期
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// 距到期的整天数（向下取整，已过期为负）
pub fn days_until(expiry: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expiry - now).num_seconds().div_euclid(86_400)
}

/// 路径参数只允许不含分隔符的 ID
pub fn path_segment(name: &'static str, value: &str) -> Result<String, ToolError> {
    if value.is_empty() || value.contains(|c: char| matches!(c, '/' | '?' | '#') || c.is_whitespace()) {
        return Err(ToolError::InvalidArgument {
            name,
            reason: format!("'{}' is not a valid identifier", value),
        });
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_num_accepts_strings() {
        assert_eq!(num(Some(&json!("12.5"))), 12.5);
        assert_eq!(num(Some(&json!(3))), 3.0);
        assert_eq!(num(Some(&json!(null))), 0.0);
        assert_eq!(num_field(&json!({"cost": "4", "cost_loss": null}), &["cost_loss", "cost"]), 4.0);
    }

    #[test]
    fn test_records_shapes() {
        assert_eq!(records(&json!([{"a": 1}, {"a": 2}]), "records").len(), 2);
        assert_eq!(records(&json!({"records": [{"a": 1}]}), "records").len(), 1);
        assert_eq!(records(&json!({"id": "t1"}), "records").len(), 1);
        assert!(records(&json!({}), "records").is_empty());
    }

    #[test]
    fn test_days_until_floors() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let tomorrow_morning = parse_timestamp("2024-05-11").unwrap();
        assert_eq!(days_until(tomorrow_morning, now), 0);
        let yesterday = parse_timestamp("2024-05-09T18:00:00Z").unwrap();
        assert_eq!(days_until(yesterday, now), -1);
        assert!(parse_timestamp("2024-05-09 08:30:00").is_some());
        assert!(parse_timestamp("soon").is_none());
    }

    #[test]
    fn test_path_segment_rejects_separators() {
        assert!(path_segment("product_id", "abc-123").is_ok());
        assert!(path_segment("product_id", "../etc").is_err());
    }
}
