//! 损耗工具：损耗汇总、按产品/原因分析、月度趋势
//!
//! GET /api/v1/wastage/summary?start_date&end_date 返回汇总对象；
//! GET /api/v1/wastage?... 返回记录数组或 `{records: [...]}`，字段名在不同版本间不一致（cost_loss/cost、qty/quantity）。

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Map, Value};

use crate::backend::BackendClient;
use crate::core::ToolError;
use crate::tools::fields::{num, num_field, parse_timestamp, records, text, text_any};
use crate::tools::ToolArgs;

pub const WASTAGE_ENDPOINT: &str = "/api/v1/wastage";
pub const WASTAGE_SUMMARY_ENDPOINT: &str = "/api/v1/wastage/summary";

const COST_KEYS: [&str; 2] = ["cost_loss", "cost"];
const QTY_KEYS: [&str; 2] = ["qty", "quantity"];

/// 查询窗口：[now - days, now]，日期以 YYYY-MM-DD 发送
fn window(now: DateTime<Utc>, days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - Duration::days(days), now)
}

fn ymd(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

fn positive(name: &'static str, value: i64) -> Result<i64, ToolError> {
    if value <= 0 {
        return Err(ToolError::InvalidArgument {
            name,
            reason: format!("must be positive, got {}", value),
        });
    }
    Ok(value)
}

pub async fn get_wastage_summary(backend: &BackendClient, args: &ToolArgs) -> Result<Value, ToolError> {
    let days_back = positive("days_back", args.int_arg("days_back", 30)?)?;
    let include_trends = args.bool_arg("include_trends", true)?;
    let include_cost_analysis = args.bool_arg("include_cost_analysis", true)?;
    let (start, end) = window(Utc::now(), days_back);
    let data = backend
        .get_json(
            WASTAGE_SUMMARY_ENDPOINT,
            &[("start_date", ymd(start)), ("end_date", ymd(end))],
        )
        .await?;
    Ok(wastage_summary(&data, start, end, days_back, include_trends, include_cost_analysis))
}

pub fn wastage_summary(
    data: &Value,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    days_back: i64,
    include_trends: bool,
    include_cost_analysis: bool,
) -> Value {
    let total_cost = num(data.get("total_cost"));
    let daily = if days_back > 0 { total_cost / days_back as f64 } else { 0.0 };
    let cost_impact = if total_cost > 1000.0 {
        "High"
    } else if total_cost > 500.0 {
        "Medium"
    } else {
        "Low"
    };

    let mut summary = json!({
        "period_analyzed": {
            "start_date": start.to_rfc3339(),
            "end_date": end.to_rfc3339(),
            "days_analyzed": days_back,
        },
        "summary_statistics": data,
        "business_insights": {
            "daily_average_cost": daily,
            "weekly_projection": daily * 7.0,
            "monthly_projection": daily * 30.0,
            "cost_impact": cost_impact,
        },
    });
    if include_trends {
        let trend = num(data.get("trend"));
        summary["trend_analysis"] = json!({
            "primary_reasons": data.get("wastage_by_reason").cloned().unwrap_or_else(|| json!({})),
            "trend_direction": if trend > 0.0 { "Increasing" } else if trend < 0.0 { "Decreasing" } else { "Stable" },
        });
    }
    if include_cost_analysis {
        summary["cost_analysis"] = json!({
            "total_wastage_cost": total_cost,
            "cost_breakdown_by_reason": data.get("cost_by_reason").cloned().unwrap_or_else(|| json!({})),
        });
    }

    json!({
        "success": true,
        "wastage_summary": summary,
        "action_items": [
            "Review top wastage categories for immediate intervention",
            "Implement preventive measures for primary waste reasons",
            "Set up monitoring alerts for unusual wastage patterns"
        ],
        "generated_at": Utc::now().to_rfc3339(),
    })
}

pub async fn analyze_wastage_by_product(
    backend: &BackendClient,
    args: &ToolArgs,
) -> Result<Value, ToolError> {
    let product_id = args.str_arg("product_id");
    let reason = args.str_arg("reason_filter");
    let days_back = positive("days_back", args.int_arg("days_back", 30)?)?;
    let limit = positive("limit", args.int_arg("limit", 20)?)?;
    let (start, end) = window(Utc::now(), days_back);

    let mut query = Vec::new();
    if let Some(id) = &product_id {
        query.push(("product_id", id.clone()));
    }
    if let Some(r) = &reason {
        query.push(("reason", r.clone()));
    }
    query.push(("start_date", ymd(start)));
    query.push(("end_date", ymd(end)));
    query.push(("limit", limit.to_string()));

    let data = backend.get_json(WASTAGE_ENDPOINT, &query).await?;
    let mut out = wastage_by_product(&data);
    out["analysis_period"] = json!({
        "start_date": start.to_rfc3339(),
        "end_date": end.to_rfc3339(),
        "days_analyzed": days_back,
    });
    out["filters_applied"] = json!({
        "product_id": product_id,
        "reason_filter": reason,
        "limit": limit,
    });
    Ok(out)
}

#[derive(Default)]
struct ProductWaste {
    cost: f64,
    quantity: f64,
    occurrences: usize,
    reasons: BTreeMap<String, usize>,
}

#[derive(Default)]
struct ReasonWaste {
    cost: f64,
    quantity: f64,
    count: usize,
}

pub fn wastage_by_product(data: &Value) -> Value {
    let rows = records(data, "records");
    let mut products: BTreeMap<String, ProductWaste> = BTreeMap::new();
    let mut reasons: BTreeMap<String, ReasonWaste> = BTreeMap::new();
    let mut total_cost = 0.0;
    let mut total_quantity = 0.0;

    for row in &rows {
        let product = text(row, "product_name", "Unknown").to_string();
        let reason = text(row, "reason", "unknown").to_string();
        let cost = num_field(row, &COST_KEYS);
        let quantity = num_field(row, &QTY_KEYS);

        let p = products.entry(product).or_default();
        p.cost += cost;
        p.quantity += quantity;
        p.occurrences += 1;
        *p.reasons.entry(reason.clone()).or_default() += 1;

        let r = reasons.entry(reason).or_default();
        r.cost += cost;
        r.quantity += quantity;
        r.count += 1;

        total_cost += cost;
        total_quantity += quantity;
    }

    let mut ranked: Vec<(String, ProductWaste)> = products.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cost.partial_cmp(&a.1.cost).unwrap_or(std::cmp::Ordering::Equal));
    let product_analysis: Vec<Value> = ranked
        .iter()
        .take(10)
        .map(|(name, p)| {
            let primary_reason = p
                .reasons
                .iter()
                .max_by_key(|(_, n)| **n)
                .map(|(r, _)| r.as_str())
                .unwrap_or("unknown");
            json!({
                "product_name": name,
                "total_cost": p.cost,
                "total_quantity": p.quantity,
                "occurrences": p.occurrences,
                "average_cost_per_incident": p.cost / p.occurrences as f64,
                "primary_reason": primary_reason,
                "cost_percentage": if total_cost > 0.0 { p.cost / total_cost * 100.0 } else { 0.0 },
            })
        })
        .collect();
    let reason_breakdown: Map<String, Value> = reasons
        .into_iter()
        .map(|(k, r)| (k, json!({"cost": r.cost, "quantity": r.quantity, "count": r.count})))
        .collect();

    json!({
        "success": true,
        "overall_summary": {
            "total_records": rows.len(),
            "total_cost": total_cost,
            "total_quantity": total_quantity,
            "average_cost_per_incident": if rows.is_empty() { 0.0 } else { total_cost / rows.len() as f64 },
        },
        "product_analysis": product_analysis,
        "reason_breakdown": reason_breakdown,
        "recommendations": [
            "Focus on top 3 products causing highest wastage costs",
            "Implement specific controls for primary wastage reasons",
            "Review inventory rotation practices for high-waste items"
        ],
        "generated_at": Utc::now().to_rfc3339(),
    })
}

pub async fn track_wastage_trends(backend: &BackendClient, args: &ToolArgs) -> Result<Value, ToolError> {
    let months_back = positive("months_back", args.int_arg("months_back", 6)?)?;
    let (start, end) = window(Utc::now(), months_back * 30);
    let data = backend
        .get_json(
            WASTAGE_ENDPOINT,
            &[
                ("start_date", ymd(start)),
                ("end_date", ymd(end)),
                ("limit", "200".to_string()),
            ],
        )
        .await?;
    let mut out = wastage_trends(&data);
    out["analysis_period"] = json!({
        "start_date": start.to_rfc3339(),
        "end_date": end.to_rfc3339(),
        "months_analyzed": months_back,
    });
    Ok(out)
}

#[derive(Default)]
struct MonthWaste {
    cost: f64,
    quantity: f64,
    incidents: usize,
    reasons: BTreeMap<String, usize>,
}

/// 按 recorded_at（或 created_at）的年月分组；比较最早 3 个月与最近 3 个月的平均损耗
pub fn wastage_trends(data: &Value) -> Value {
    let mut months: BTreeMap<String, MonthWaste> = BTreeMap::new();
    for row in records(data, "records") {
        let Some(at) = text_any(row, &["recorded_at", "created_at"]).and_then(parse_timestamp) else {
            continue;
        };
        let m = months.entry(at.format("%Y-%m").to_string()).or_default();
        m.cost += num_field(row, &COST_KEYS);
        m.quantity += num_field(row, &["quantity", "qty"]);
        m.incidents += 1;
        *m.reasons.entry(text(row, "reason", "unknown").to_string()).or_default() += 1;
    }

    let costs: Vec<f64> = months.values().map(|m| m.cost).collect();
    let (trend, recent_avg, earlier_avg) = if costs.len() >= 2 {
        let n = costs.len().min(3);
        let recent = costs[costs.len() - n..].iter().sum::<f64>() / n as f64;
        let earlier = costs[..n].iter().sum::<f64>() / n as f64;
        let direction = if recent > earlier {
            "Increasing"
        } else if recent < earlier {
            "Decreasing"
        } else {
            "Stable"
        };
        (direction, recent, earlier)
    } else {
        ("Insufficient data", 0.0, 0.0)
    };

    let peak = months
        .iter()
        .max_by(|a, b| a.1.cost.partial_cmp(&b.1.cost).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(k, _)| k.clone())
        .unwrap_or_else(|| "N/A".to_string());
    let lowest = months
        .iter()
        .min_by(|a, b| a.1.cost.partial_cmp(&b.1.cost).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(k, _)| k.clone())
        .unwrap_or_else(|| "N/A".to_string());
    let breakdown: Map<String, Value> = months
        .into_iter()
        .map(|(k, m)| {
            (
                k,
                json!({
                    "cost": m.cost,
                    "quantity": m.quantity,
                    "incidents": m.incidents,
                    "reasons": m.reasons,
                }),
            )
        })
        .collect();

    json!({
        "success": true,
        "trend_summary": {
            "overall_trend": trend,
            "recent_monthly_average": recent_avg,
            "earlier_monthly_average": earlier_avg,
            "trend_percentage": if earlier_avg > 0.0 { (recent_avg - earlier_avg) / earlier_avg * 100.0 } else { 0.0 },
        },
        "monthly_breakdown": breakdown,
        "insights": {
            "peak_wastage_month": peak,
            "lowest_wastage_month": lowest,
        },
        "recommendations": [
            "Monitor monthly trends for early intervention opportunities",
            "Investigate factors causing peak wastage months",
            "Implement preventive measures during high-risk periods"
        ],
        "generated_at": Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rows() -> Value {
        json!([
            {"product_name": "Cream", "reason": "expired", "cost_loss": 300, "qty": 2, "recorded_at": "2024-01-05T10:00:00Z"},
            {"product_name": "Cream", "reason": "expired", "cost_loss": "150", "qty": 1, "recorded_at": "2024-02-07T10:00:00Z"},
            {"product_name": "Paneer", "reason": "damaged", "cost": 600, "quantity": 3, "created_at": "2024-03-01"},
            {"product_name": "Cream", "reason": "damaged", "cost_loss": 50, "qty": 1, "recorded_at": "2024-03-20T10:00:00Z"},
            {"product_name": "Flour", "reason": "theft", "cost_loss": 20, "qty": 5}
        ])
    }

    #[test]
    fn test_summary_cost_impact() {
        let now = Utc.with_ymd_and_hms(2024, 5, 31, 0, 0, 0).unwrap();
        let (start, end) = window(now, 30);
        let out = wastage_summary(&json!({"total_cost": 1500, "trend": -2}), start, end, 30, true, true);
        let s = &out["wastage_summary"];
        assert_eq!(s["business_insights"]["cost_impact"], "High");
        assert_eq!(s["business_insights"]["daily_average_cost"], 50.0);
        assert_eq!(s["trend_analysis"]["trend_direction"], "Decreasing");
        assert_eq!(s["period_analyzed"]["days_analyzed"], 30);
        assert_eq!(ymd(start), "2024-05-01");
    }

    #[test]
    fn test_by_product_ranks_cost() {
        let out = wastage_by_product(&rows());
        assert_eq!(out["overall_summary"]["total_records"], 5);
        assert_eq!(out["overall_summary"]["total_cost"], 1120.0);
        assert_eq!(out["product_analysis"][0]["product_name"], "Paneer");
        assert_eq!(out["product_analysis"][1]["product_name"], "Cream");
        assert_eq!(out["product_analysis"][1]["primary_reason"], "expired");
        assert_eq!(out["reason_breakdown"]["damaged"]["count"], 2);
    }

    #[test]
    fn test_by_product_accepts_records_wrapper() {
        let out = wastage_by_product(&json!({"records": rows()}));
        assert_eq!(out["overall_summary"]["total_records"], 5);
        let empty = wastage_by_product(&json!([]));
        assert_eq!(empty["overall_summary"]["average_cost_per_incident"], 0.0);
    }

    #[test]
    fn test_trends_compare_first_and_last_months() {
        let out = wastage_trends(&rows());
        let breakdown = out["monthly_breakdown"].as_object().unwrap();
        assert_eq!(breakdown.len(), 3);
        assert_eq!(out["monthly_breakdown"]["2024-03"]["incidents"], 2);
        assert_eq!(out["insights"]["peak_wastage_month"], "2024-03");
        assert_eq!(out["insights"]["lowest_wastage_month"], "2024-02");
        // 三个月时首尾窗口相同
        assert_eq!(out["trend_summary"]["overall_trend"], "Stable");

        let single = wastage_trends(&json!([rows()[0].clone()]));
        assert_eq!(single["trend_summary"]["overall_trend"], "Insufficient data");
    }
}
