//! 工具参数读取
//!
//! LLM 生成的参数常有格式漂移："N/A"、"none" 当作缺省，布尔/整数可能以字符串给出，
//! 列表可能是逗号分隔的字符串。这里统一容错，只有必填参数缺失或值无法理解时才报错。

use serde_json::{Map, Value};

use crate::core::ToolError;

/// 表示"未提供"的占位值（比较时忽略大小写）
const ABSENT_MARKERS: [&str; 4] = ["", "n/a", "none", "null"];

fn is_absent_marker(s: &str) -> bool {
    let s = s.trim();
    ABSENT_MARKERS.iter().any(|m| s.eq_ignore_ascii_case(m))
}

/// 一次工具调用的命名参数（可能为空）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// 非对象值视为空参数
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn present(&self, name: &str) -> Option<&Value> {
        match self.0.get(name)? {
            Value::Null => None,
            Value::String(s) if is_absent_marker(s) => None,
            v => Some(v),
        }
    }

    /// 字符串参数；数字会被转成字符串，占位值视为缺省
    pub fn str_arg(&self, name: &str) -> Option<String> {
        match self.present(name)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn require_str(&self, name: &'static str) -> Result<String, ToolError> {
        self.str_arg(name).ok_or(ToolError::MissingArgument(name))
    }

    pub fn bool_arg(&self, name: &'static str, default: bool) -> Result<bool, ToolError> {
        match self.present(name) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Number(n)) => Ok(n.as_f64().map(|v| v != 0.0).unwrap_or(default)),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                other => Err(ToolError::InvalidArgument {
                    name,
                    reason: format!("expected a boolean, got '{}'", other),
                }),
            },
            Some(other) => Err(ToolError::InvalidArgument {
                name,
                reason: format!("expected a boolean, got {}", other),
            }),
        }
    }

    pub fn int_arg(&self, name: &'static str, default: i64) -> Result<i64, ToolError> {
        match self.present(name) {
            None => Ok(default),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or_else(|| ToolError::InvalidArgument {
                    name,
                    reason: format!("expected an integer, got {}", n),
                }),
            Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| ToolError::InvalidArgument {
                name,
                reason: format!("expected an integer, got '{}'", s),
            }),
            Some(other) => Err(ToolError::InvalidArgument {
                name,
                reason: format!("expected an integer, got {}", other),
            }),
        }
    }

    /// 数组或逗号分隔字符串；缺省返回空列表
    pub fn list_arg(&self, name: &str) -> Vec<String> {
        match self.present(name) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(|p| p.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<Map<String, Value>> for ToolArgs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(v: Value) -> ToolArgs {
        ToolArgs::from_value(v)
    }

    #[test]
    fn test_absent_markers() {
        let a = args(json!({"product_id": "N/A", "category": "none", "tenant_id": null, "x": " "}));
        assert!(a.str_arg("product_id").is_none());
        assert!(a.str_arg("category").is_none());
        assert!(a.str_arg("tenant_id").is_none());
        assert!(a.str_arg("x").is_none());
        assert!(matches!(
            a.require_str("product_id"),
            Err(ToolError::MissingArgument("product_id"))
        ));
    }

    #[test]
    fn test_loose_scalars() {
        let a = args(json!({"flag": "False", "on": true, "days": "14", "limit": 20.0, "bad": "soon"}));
        assert!(!a.bool_arg("flag", true).unwrap());
        assert!(a.bool_arg("on", false).unwrap());
        assert!(a.bool_arg("missing", true).unwrap());
        assert_eq!(a.int_arg("days", 7).unwrap(), 14);
        assert_eq!(a.int_arg("limit", 0).unwrap(), 20);
        assert!(a.int_arg("bad", 0).is_err());
        assert!(a.bool_arg("bad", false).is_err());
    }

    #[test]
    fn test_list_shapes() {
        let a = args(json!({"a": ["low_stock", "dead_stock"], "b": "low_stock, 'expiring_soon'"}));
        assert_eq!(a.list_arg("a"), vec!["low_stock", "dead_stock"]);
        assert_eq!(a.list_arg("b"), vec!["low_stock", "expiring_soon"]);
        assert!(a.list_arg("c").is_empty());
    }

    #[test]
    fn test_non_object_is_empty() {
        assert!(ToolArgs::from_value(json!([1, 2])).is_empty());
    }
}
