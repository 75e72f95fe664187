//! 库存工具：库存状态、库存预警、单品批次分析、到期预警
//!
//! 数据来自 GET /api/v1/inventory（`{summary, ingredient_items}`）与 GET /api/v1/inventory/{id}（`{data: [...]}`）。
//! 拉取与分析分开：分析函数是纯函数，便于在没有后端的情况下测试。

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::backend::BackendClient;
use crate::core::ToolError;
use crate::tools::fields::{array, days_until, num, parse_timestamp, path_segment, raw, text};
use crate::tools::ToolArgs;

pub const INVENTORY_ENDPOINT: &str = "/api/v1/inventory";

const DEFAULT_ALERT_TYPES: [&str; 4] = ["low_stock", "out_of_stock", "expiring_soon", "dead_stock"];

pub async fn get_inventory_status(backend: &BackendClient, args: &ToolArgs) -> Result<Value, ToolError> {
    let product_id = args
        .str_arg("product_id")
        .map(|id| path_segment("product_id", &id))
        .transpose()?;
    let filter_status = args.str_arg("filter_status");
    let include_batches = args.bool_arg("include_batches", false)?;
    let include_sales_context = args.bool_arg("include_sales_context", true)?;

    let endpoint = match &product_id {
        Some(id) => format!("{}/{}", INVENTORY_ENDPOINT, id),
        None => INVENTORY_ENDPOINT.to_string(),
    };
    let data = backend.get_json(&endpoint, &[]).await?;
    Ok(summarize_inventory(
        &data,
        &endpoint,
        product_id.is_some(),
        filter_status.as_deref(),
        include_batches,
        include_sales_context,
    ))
}

/// 销量背景是启发式的：后端没有销售数据，按活跃度与库存状态估计
fn sales_context(item: &Value) -> Value {
    let status = text(item, "stock_status", "");
    let active = item.get("has_recent_activity").and_then(|v| v.as_bool()).unwrap_or(false);
    let (velocity, recommendation) = if active && text(item, "type", "") == "menu_item" {
        ("High", "Monitor closely - high turnover item")
    } else if status == "low_stock" {
        ("Medium", "Reorder soon to avoid stockout")
    } else if status == "dead_stock" {
        ("Low", "Consider promotional pricing or menu changes")
    } else {
        ("Medium", "Stock levels healthy")
    };
    let reorder_priority = if matches!(status, "low_stock" | "out_of_stock") {
        "High"
    } else {
        "Low"
    };
    json!({
        "sales_velocity": velocity,
        "recommendation": recommendation,
        "reorder_priority": reorder_priority,
    })
}

pub fn summarize_inventory(
    data: &Value,
    endpoint: &str,
    single_product: bool,
    filter_status: Option<&str>,
    include_batches: bool,
    include_sales_context: bool,
) -> Value {
    let (items, mut summary) = if single_product {
        (array(data, "data"), Map::new())
    } else {
        let summary = data
            .get("summary")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();
        (array(data, "ingredient_items"), summary)
    };

    let filter = filter_status.filter(|f| !f.eq_ignore_ascii_case("all"));
    let items: Vec<&Value> = items
        .into_iter()
        .filter(|item| filter.map_or(true, |f| text(item, "stock_status", "") == f))
        .collect();

    let mut enhanced = Vec::with_capacity(items.len());
    let mut high_velocity = 0;
    let mut reorder = 0;
    let mut dead_stock_value = 0.0;
    for item in &items {
        let mut out = json!({
            "id": raw(item, "id"),
            "name": raw(item, "name"),
            "type": raw(item, "type"),
            "available_qty": raw(item, "available_qty"),
            "unit": raw(item, "unit"),
            "price": raw(item, "price"),
            "stock_status": raw(item, "stock_status"),
            "last_updated": raw(item, "last_updated"),
            "has_recent_activity": raw(item, "has_recent_activity"),
        });
        if include_sales_context {
            let ctx = sales_context(item);
            if ctx["sales_velocity"] == "High" {
                high_velocity += 1;
            }
            if ctx["reorder_priority"] == "High" {
                reorder += 1;
            }
            out["sales_context"] = ctx;
        }
        if include_batches && item.get("batches").is_some_and(|b| !b.is_null()) {
            out["batches"] = raw(item, "batches");
            out["earliest_expiry"] = raw(item, "earliest_expiry_date");
        }
        if text(item, "stock_status", "") == "dead_stock" {
            dead_stock_value += num(item.get("price")) * num(item.get("available_qty"));
        }
        enhanced.push(out);
    }

    if include_sales_context && !summary.contains_key("sales_insights") {
        summary.insert(
            "sales_insights".to_string(),
            json!({
                "high_velocity_items": high_velocity,
                "reorder_priorities": reorder,
                "dead_stock_value": dead_stock_value,
            }),
        );
    }

    json!({
        "success": true,
        "total_items": enhanced.len(),
        "inventory_items": enhanced,
        "summary": summary,
        "filter_applied": filter_status,
        "source_endpoints": [endpoint],
        "generated_at": Utc::now().to_rfc3339(),
    })
}

pub async fn check_stock_alerts(backend: &BackendClient, args: &ToolArgs) -> Result<Value, ToolError> {
    let mut alert_types = args.list_arg("alert_types");
    if alert_types.is_empty() {
        alert_types = DEFAULT_ALERT_TYPES.iter().map(|s| s.to_string()).collect();
    }
    let data = backend.get_json(INVENTORY_ENDPOINT, &[]).await?;
    Ok(stock_alerts(&data, &alert_types))
}

fn severity_rank(severity: &str) -> u8 {
    match severity {
        "Critical" => 3,
        "High" => 2,
        "Medium" => 1,
        _ => 0,
    }
}

pub fn stock_alerts(data: &Value, alert_types: &[String]) -> Value {
    let mut alerts: Vec<Value> = array(data, "ingredient_items")
        .into_iter()
        .filter_map(|item| {
            let status = text(item, "stock_status", "");
            if !alert_types.iter().any(|t| t == status) {
                return None;
            }
            let severity = match status {
                "out_of_stock" => "Critical",
                "low_stock" => "High",
                _ => "Medium",
            };
            let mut alert = json!({
                "product_name": raw(item, "name"),
                "alert_type": status,
                "current_qty": raw(item, "available_qty"),
                "unit": raw(item, "unit"),
                "severity": severity,
            });
            let active = item.get("has_recent_activity").and_then(|v| v.as_bool()).unwrap_or(false);
            if text(item, "type", "") == "menu_item" && active {
                alert["sales_impact"] = json!("High - affects menu availability");
            } else if status == "expiring_soon" {
                alert["sales_impact"] = json!("Medium - consider promotions");
                alert["expiry_date"] = raw(item, "earliest_expiry_date");
            } else {
                alert["sales_impact"] = json!("Low");
            }
            Some(alert)
        })
        .collect();

    // 稳定排序：同级保持后端顺序
    alerts.sort_by_key(|a| std::cmp::Reverse(severity_rank(a["severity"].as_str().unwrap_or(""))));
    let critical_count = alerts.iter().filter(|a| a["severity"] == "Critical").count();

    json!({
        "success": true,
        "total_alerts": alerts.len(),
        "critical_count": critical_count,
        "alerts": alerts,
        "recommendations": [
            "Address critical alerts immediately to prevent sales disruption",
            "Plan promotional strategies for expiring items",
            "Review dead stock for potential write-offs"
        ],
        "source_endpoints": [INVENTORY_ENDPOINT],
        "generated_at": Utc::now().to_rfc3339(),
    })
}

pub async fn analyze_inventory_by_product(
    backend: &BackendClient,
    args: &ToolArgs,
) -> Result<Value, ToolError> {
    let product_id = path_segment("product_id", &args.require_str("product_id")?)?;
    let include_batch_details = args.bool_arg("include_batch_details", true)?;
    let include_expiry_analysis = args.bool_arg("include_expiry_analysis", true)?;
    let endpoint = format!("{}/{}", INVENTORY_ENDPOINT, product_id);
    let data = backend.get_json(&endpoint, &[]).await?;
    Ok(product_inventory_analysis(
        &product_id,
        &data,
        include_batch_details,
        include_expiry_analysis,
        Utc::now(),
    ))
}

/// 单批次到期状态：已过期 / 3 天内 / 7 天内 / 正常
fn batch_expiry_status(days: i64) -> &'static str {
    match days {
        d if d < 0 => "expired",
        d if d <= 3 => "critical",
        d if d <= 7 => "warning",
        _ => "good",
    }
}

pub fn product_inventory_analysis(
    product_id: &str,
    data: &Value,
    include_batch_details: bool,
    include_expiry_analysis: bool,
    now: DateTime<Utc>,
) -> Value {
    let product = array(data, "data").into_iter().next().unwrap_or(data);
    let status = text(product, "stock_status", "unknown");

    let mut product_analysis = json!({
        "product_id": product_id,
        "name": text(product, "name", "Unknown"),
        "type": text(product, "type", "unknown"),
        "category": text(product, "category", "uncategorized"),
        "total_quantity": num(product.get("available_qty")),
        "unit": text(product, "unit", ""),
        "current_status": status,
        "last_updated": text(product, "last_updated", ""),
        "has_recent_activity": product.get("has_recent_activity").and_then(|v| v.as_bool()).unwrap_or(false),
    });

    let mut batch_analysis = Map::new();
    let mut critical_batches = 0;
    if include_batch_details && product.get("batches").is_some() {
        let batches = array(product, "batches");
        let mut details = Vec::with_capacity(batches.len());
        let mut quantity_by_batch = Map::new();
        let mut total = 0.0;
        let mut expiry_dates: Vec<&str> = Vec::new();

        for batch in &batches {
            let quantity = num(batch.get("total_qty"));
            let batch_id = text(batch, "batch", "");
            let mut info = json!({
                "batch_id": batch_id,
                "quantity": quantity,
                "unit": text(batch, "unit", ""),
                "expiry_date": text(batch, "expiry_date", ""),
                "last_transaction": text(batch, "last_transaction", ""),
                "status": "active",
            });
            if let Some(expiry) = batch.get("expiry_date").and_then(|v| v.as_str()).filter(|s| !s.is_empty()) {
                expiry_dates.push(expiry);
                match parse_timestamp(expiry) {
                    Some(at) => {
                        let days = days_until(at, now);
                        info["expiry_status"] = json!(batch_expiry_status(days));
                        info["days_to_expiry"] = json!(days);
                    }
                    None => {
                        info["expiry_status"] = json!("unknown");
                        info["days_to_expiry"] = Value::Null;
                    }
                }
            }
            quantity_by_batch.insert(batch_id.to_string(), json!(quantity));
            total += quantity;
            details.push(info);
        }

        if include_expiry_analysis && !expiry_dates.is_empty() {
            let count = |s: &str| details.iter().filter(|b| b["expiry_status"] == s).count();
            critical_batches = count("critical");
            let alerts: Vec<Value> = details
                .iter()
                .filter(|b| matches!(b["expiry_status"].as_str(), Some("expired" | "critical" | "warning")))
                .map(|b| {
                    json!({
                        "batch_id": b["batch_id"],
                        "expiry_status": b["expiry_status"],
                        "days_to_expiry": b["days_to_expiry"],
                        "quantity": b["quantity"],
                    })
                })
                .collect();
            product_analysis["expiry_analysis"] = json!({
                "earliest_expiry": expiry_dates.iter().min(),
                "latest_expiry": expiry_dates.iter().max(),
                "expired_batches": count("expired"),
                "critical_batches": critical_batches,
                "warning_batches": count("warning"),
                "expiry_alerts": alerts,
            });
        }

        batch_analysis.insert("total_batches".to_string(), json!(batches.len()));
        batch_analysis.insert("batch_details".to_string(), Value::Array(details));
        batch_analysis.insert("quantity_by_batch".to_string(), Value::Object(quantity_by_batch));
        batch_analysis.insert("total_quantity_in_batches".to_string(), json!(total));
    }

    let total_batches = batch_analysis.get("total_batches").and_then(|v| v.as_u64()).unwrap_or(0);
    let mut recommendations = Vec::new();
    if critical_batches > 0 {
        recommendations.push("Prioritize usage of batches expiring soon");
    }
    if status == "low_stock" {
        recommendations.push("Consider reordering to maintain stock levels");
    }
    if total_batches > 5 {
        recommendations.push("Review batch rotation practices to optimize freshness");
    }

    json!({
        "success": true,
        "product_analysis": product_analysis,
        "batch_analysis": batch_analysis,
        "business_insights": {
            "inventory_health": if status == "in_stock" { "Good" } else { "Attention needed" },
            "batch_management": if total_batches > 0 { "Well managed" } else { "Limited tracking" },
            "expiry_risk": if critical_batches > 0 { "High" } else { "Low" },
            "recommendations": recommendations,
        },
        "generated_at": now.to_rfc3339(),
    })
}

pub async fn get_expiry_alerts(backend: &BackendClient, args: &ToolArgs) -> Result<Value, ToolError> {
    let days_ahead = args.int_arg("days_ahead", 7)?;
    let include_expired = args.bool_arg("include_expired", true)?;
    let severity_filter = args.str_arg("severity_filter").map(|s| s.to_lowercase());
    let data = backend.get_json(INVENTORY_ENDPOINT, &[]).await?;
    Ok(expiry_alerts(
        &data,
        days_ahead,
        include_expired,
        severity_filter.as_deref(),
        Utc::now(),
    ))
}

/// 到期分级：(严重度, 优先级)；超出 days_ahead 的批次不报警
fn expiry_severity(days: i64, days_ahead: i64) -> Option<(&'static str, u8)> {
    match days {
        d if d < 0 => Some(("expired", 1)),
        d if d <= 1 => Some(("critical", 2)),
        d if d <= 3 => Some(("high", 3)),
        d if d <= days_ahead => Some(("warning", 4)),
        _ => None,
    }
}

pub fn expiry_alerts(
    data: &Value,
    days_ahead: i64,
    include_expired: bool,
    severity_filter: Option<&str>,
    now: DateTime<Utc>,
) -> Value {
    let mut alerts: Vec<(u8, i64, Value)> = Vec::new();
    for item in array(data, "ingredient_items") {
        let price = num(item.get("price"));
        for batch in array(item, "batches") {
            let Some(expiry_str) = batch.get("expiry_date").and_then(|v| v.as_str()) else {
                continue;
            };
            let Some(expiry) = parse_timestamp(expiry_str) else {
                continue;
            };
            let days = days_until(expiry, now);
            let Some((severity, priority)) = expiry_severity(days, days_ahead) else {
                continue;
            };
            if severity_filter.is_some_and(|f| f != severity) {
                continue;
            }
            if !include_expired && severity == "expired" {
                continue;
            }
            let quantity = num(batch.get("total_qty"));
            alerts.push((
                priority,
                days,
                json!({
                    "product_id": text(item, "id", ""),
                    "product_name": text(item, "name", "Unknown"),
                    "batch_id": text(batch, "batch", ""),
                    "quantity": quantity,
                    "unit": text(batch, "unit", ""),
                    "expiry_date": expiry_str,
                    "days_to_expiry": days,
                    "severity": severity,
                    "priority": priority,
                    "estimated_value": quantity * price,
                    "last_transaction": text(batch, "last_transaction", ""),
                }),
            ));
        }
    }
    alerts.sort_by_key(|(priority, days, _)| (*priority, *days));
    let alerts: Vec<Value> = alerts.into_iter().map(|(_, _, a)| a).collect();

    let count = |s: &str| alerts.iter().filter(|a| a["severity"] == s).count();
    let total_value_at_risk: f64 = alerts.iter().map(|a| num(a.get("estimated_value"))).sum();
    let expired_value: f64 = alerts
        .iter()
        .filter(|a| a["severity"] == "expired")
        .map(|a| num(a.get("estimated_value")))
        .sum();
    let expired = count("expired");
    let critical = count("critical");
    let high = count("high");
    let warning = count("warning");

    let mut action_items = Vec::new();
    if expired > 0 {
        action_items.push(format!("Remove {} expired items immediately", expired));
    }
    if critical > 0 {
        action_items.push(format!("Use {} critical items within 24 hours", critical));
    }
    if high > 0 {
        action_items.push(format!("Prioritize {} items expiring in 1-3 days", high));
    }
    if warning > 0 {
        action_items.push(format!(
            "Plan usage for {} items expiring within {} days",
            warning, days_ahead
        ));
    }

    json!({
        "success": true,
        "analysis_parameters": {
            "days_ahead": days_ahead,
            "include_expired": include_expired,
            "severity_filter": severity_filter,
        },
        "summary_statistics": {
            "total_alerts": alerts.len(),
            "expired_items": expired,
            "critical_items": critical,
            "high_priority_items": high,
            "warning_items": warning,
            "total_value_at_risk": total_value_at_risk,
            "expired_value": expired_value,
        },
        "expiry_alerts": alerts,
        "action_items": action_items,
        "recommendations": [
            "Implement first-in-first-out (FIFO) inventory rotation",
            "Consider promotional pricing for items near expiry",
            "Review ordering patterns to reduce expiry waste"
        ],
        "generated_at": now.to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn inventory() -> Value {
        json!({
            "summary": {"total_items": 4},
            "ingredient_items": [
                {"id": "p1", "name": "Flour", "type": "raw_material", "available_qty": 12, "unit": "kg",
                 "price": 40, "stock_status": "low_stock"},
                {"id": "p2", "name": "Paneer", "type": "raw_material", "available_qty": 0, "unit": "kg",
                 "price": 300, "stock_status": "out_of_stock"},
                {"id": "p3", "name": "Cream", "type": "raw_material", "available_qty": 5, "unit": "l",
                 "price": "120", "stock_status": "expiring_soon", "earliest_expiry_date": "2024-05-12",
                 "batches": [
                    {"batch": "B-1", "total_qty": 2, "unit": "l", "expiry_date": "2024-05-09"},
                    {"batch": "B-2", "total_qty": 3, "unit": "l", "expiry_date": "2024-05-12T00:00:00Z"},
                    {"batch": "B-3", "total_qty": 1, "unit": "l", "expiry_date": "2024-06-30"}
                 ]},
                {"id": "p4", "name": "Dal Makhani", "type": "menu_item", "available_qty": 8, "unit": "plate",
                 "price": 299, "stock_status": "in_stock", "has_recent_activity": true}
            ]
        })
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_stock_alerts_sorted_by_severity() {
        let types: Vec<String> = DEFAULT_ALERT_TYPES.iter().map(|s| s.to_string()).collect();
        let out = stock_alerts(&inventory(), &types);
        assert_eq!(out["total_alerts"], 3);
        assert_eq!(out["critical_count"], 1);
        assert_eq!(out["alerts"][0]["product_name"], "Paneer");
        assert_eq!(out["alerts"][1]["severity"], "High");
        assert_eq!(out["alerts"][2]["sales_impact"], "Medium - consider promotions");
        assert_eq!(out["alerts"][2]["expiry_date"], "2024-05-12");
    }

    #[test]
    fn test_stock_alerts_respects_requested_types() {
        let out = stock_alerts(&inventory(), &["low_stock".to_string()]);
        assert_eq!(out["total_alerts"], 1);
        assert_eq!(out["alerts"][0]["alert_type"], "low_stock");
    }

    #[test]
    fn test_inventory_summary_adds_sales_insights() {
        let out = summarize_inventory(&inventory(), INVENTORY_ENDPOINT, false, None, false, true);
        assert_eq!(out["total_items"], 4);
        assert_eq!(out["summary"]["total_items"], 4);
        assert_eq!(out["summary"]["sales_insights"]["high_velocity_items"], 1);
        assert_eq!(out["summary"]["sales_insights"]["reorder_priorities"], 2);
        assert_eq!(out["inventory_items"][3]["sales_context"]["sales_velocity"], "High");
    }

    #[test]
    fn test_inventory_filter_status() {
        let out = summarize_inventory(&inventory(), INVENTORY_ENDPOINT, false, Some("low_stock"), false, false);
        assert_eq!(out["total_items"], 1);
        assert_eq!(out["inventory_items"][0]["name"], "Flour");
        assert!(out["summary"].get("sales_insights").is_none());
    }

    #[test]
    fn test_expiry_alerts_classify_batches() {
        let out = expiry_alerts(&inventory(), 7, true, None, now());
        let stats = &out["summary_statistics"];
        assert_eq!(stats["total_alerts"], 2);
        assert_eq!(stats["expired_items"], 1);
        assert_eq!(stats["critical_items"], 1);
        assert_eq!(stats["high_priority_items"], 0);
        assert_eq!(out["expiry_alerts"][0]["batch_id"], "B-1");
        assert_eq!(out["expiry_alerts"][0]["estimated_value"], 240.0);
        assert_eq!(out["action_items"][0], "Remove 1 expired items immediately");

        let without_expired = expiry_alerts(&inventory(), 7, false, None, now());
        assert_eq!(without_expired["summary_statistics"]["total_alerts"], 1);
    }

    #[test]
    fn test_product_analysis_reads_data_wrapper() {
        let data = json!({"data": [inventory()["ingredient_items"][2].clone()]});
        let out = product_inventory_analysis("p3", &data, true, true, now());
        assert_eq!(out["product_analysis"]["name"], "Cream");
        assert_eq!(out["batch_analysis"]["total_batches"], 3);
        assert_eq!(out["batch_analysis"]["total_quantity_in_batches"], 6.0);
        let expiry = &out["product_analysis"]["expiry_analysis"];
        assert_eq!(expiry["expired_batches"], 1);
        assert_eq!(expiry["critical_batches"], 1);
        assert_eq!(expiry["earliest_expiry"], "2024-05-09");
        assert_eq!(out["business_insights"]["expiry_risk"], "High");
    }
}
