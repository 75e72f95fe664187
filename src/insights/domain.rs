//! 各数据工具的领域格式化

use serde_json::Value;

use crate::insights::{money, show, title_case};
use crate::tools::fields::num;

/// 失败结果统一成一行 ⚠️
fn failure(title: &str, data: &Value) -> Option<String> {
    if data.get("success").and_then(|v| v.as_bool()) == Some(false) {
        let msg = data
            .get("message")
            .or_else(|| data.get("error"))
            .map(|v| show(Some(v), ""))
            .unwrap_or_else(|| "Operation failed".to_string());
        return Some(format!("⚠️ **{}**: {}", title, msg));
    }
    None
}

fn items(data: &Value, key: &str) -> Vec<Value> {
    data.get(key).and_then(|v| v.as_array()).cloned().unwrap_or_default()
}

fn status_emoji(status: &str) -> &'static str {
    match status {
        "low_stock" => "⚠️",
        "out_of_stock" => "🚨",
        "expiring_soon" => "⏰",
        "dead_stock" => "💀",
        _ => "📦",
    }
}

pub fn inventory_status(data: &Value) -> String {
    if let Some(f) = failure("Inventory Status", data) {
        return f;
    }
    let mut lines = vec!["📦 **INVENTORY STATUS**".to_string()];
    let summary = &data["summary"];
    for (key, label) in [
        ("total_in_stock", "In Stock"),
        ("total_low_stock", "Low Stock"),
        ("total_out_of_stock", "Out of Stock"),
        ("total_expiring_soon", "Expiring Soon"),
    ] {
        if let Some(v) = summary.get(key).filter(|v| !v.is_null()) {
            lines.push(format!("• {}: {} items", label, show(Some(v), "0")));
        }
    }
    let attention: Vec<&Value> = data["inventory_items"]
        .as_array()
        .map(|a| {
            a.iter()
                .filter(|i| !matches!(i["stock_status"].as_str(), Some("in_stock") | None))
                .collect()
        })
        .unwrap_or_default();
    if !attention.is_empty() {
        lines.push(String::new());
        lines.push("**ITEMS NEEDING ATTENTION:**".to_string());
        for item in attention.iter().take(5) {
            let status = item["stock_status"].as_str().unwrap_or("unknown");
            lines.push(format!(
                "{} {}: {} {} ({})",
                status_emoji(status),
                show(item.get("name"), "Unknown"),
                show(item.get("available_qty"), "0"),
                show(item.get("unit"), ""),
                title_case(status)
            ));
        }
    }
    lines.join("\n")
}

pub fn stock_alerts(data: &Value) -> String {
    if let Some(f) = failure("Stock Alerts", data) {
        return f;
    }
    let alerts = items(data, "alerts");
    if alerts.is_empty() {
        return "✅ **STOCK ALERTS**: No critical alerts at this time".to_string();
    }
    let mut lines = vec![format!("🚨 **STOCK ALERTS** ({} items need attention)", alerts.len())];
    for (severity, heading) in [("Critical", "CRITICAL"), ("High", "HIGH PRIORITY"), ("Medium", "MEDIUM")] {
        let group: Vec<&Value> = alerts.iter().filter(|a| a["severity"] == severity).collect();
        if group.is_empty() {
            continue;
        }
        lines.push(format!("**{}:**", heading));
        for alert in group.iter().take(3) {
            lines.push(format!(
                "• {}: {} {} ({})",
                show(alert.get("product_name"), "Unknown"),
                show(alert.get("current_qty"), "0"),
                show(alert.get("unit"), ""),
                title_case(alert["alert_type"].as_str().unwrap_or("alert"))
            ));
        }
    }
    lines.join("\n")
}

pub fn product_inventory(data: &Value) -> String {
    if let Some(f) = failure("Product Inventory", data) {
        return f;
    }
    let product = &data["product_analysis"];
    let mut lines = vec![format!(
        "📦 **PRODUCT INVENTORY: {}**",
        show(product.get("name"), "Unknown").to_uppercase()
    )];
    lines.push(format!(
        "• Quantity: {} {}",
        show(product.get("total_quantity"), "0"),
        show(product.get("unit"), "")
    ));
    lines.push(format!(
        "• Status: {}",
        title_case(product["current_status"].as_str().unwrap_or("unknown"))
    ));
    if let Some(batches) = data["batch_analysis"].as_object() {
        lines.push(format!("• Batches: {}", show(batches.get("total_batches"), "0")));
    }
    let insights = &data["business_insights"];
    lines.push(format!("• Inventory Health: {}", show(insights.get("inventory_health"), "N/A")));
    lines.push(format!("• Expiry Risk: {}", show(insights.get("expiry_risk"), "N/A")));
    lines.join("\n")
}

pub fn expiry_alerts(data: &Value) -> String {
    if let Some(f) = failure("Expiry Alerts", data) {
        return f;
    }
    let alerts = items(data, "expiry_alerts");
    if alerts.is_empty() {
        return "✅ **EXPIRY ALERTS**: No batches expiring in the analysis window".to_string();
    }
    let stats = &data["summary_statistics"];
    let mut lines = vec![format!("⏰ **EXPIRY ALERTS** ({} batches)", alerts.len())];
    for (key, label) in [
        ("expired_items", "Expired"),
        ("critical_items", "Critical (≤1 day)"),
        ("high_priority_items", "High (≤3 days)"),
        ("warning_items", "Warning"),
    ] {
        lines.push(format!("• {}: {}", label, show(stats.get(key), "0")));
    }
    lines.push(format!("• Value at Risk: {}", money(num(stats.get("total_value_at_risk")))));
    lines.push(String::new());
    lines.push("**SOONEST TO EXPIRE:**".to_string());
    for alert in alerts.iter().take(3) {
        lines.push(format!(
            "• {} (batch {}): {} days, {} {}",
            show(alert.get("product_name"), "Unknown"),
            show(alert.get("batch_id"), "?"),
            show(alert.get("days_to_expiry"), "?"),
            show(alert.get("quantity"), "0"),
            show(alert.get("unit"), "")
        ));
    }
    lines.join("\n")
}

pub fn cookbook(data: &Value) -> String {
    if let Some(f) = failure("Cookbook", data) {
        return f;
    }
    let summary = &data["summary"];
    let mut lines = vec![
        "📖 **COOKBOOK OVERVIEW**".to_string(),
        format!("• Total Items: {}", show(summary.get("total_items"), "0")),
        format!("• Menu Items: {}", show(summary.get("menu_items"), "0")),
        format!("• Sub Products: {}", show(summary.get("sub_products"), "0")),
        format!("• Average Price: {}", money(num(summary.get("average_item_price")))),
    ];
    let top = items(&data["business_insights"], "most_expensive_items");
    if !top.is_empty() {
        lines.push(String::new());
        lines.push("**TOP PRICED ITEMS:**".to_string());
        for item in top.iter().take(3) {
            lines.push(format!(
                "• {}: {}",
                show(item.get("name"), "Unknown"),
                money(num(item.get("price")))
            ));
        }
    }
    lines.join("\n")
}

pub fn recipe(data: &Value) -> String {
    if let Some(f) = failure("Recipe Details", data) {
        return f;
    }
    let details = &data["recipe_details"];
    let mut lines = vec![
        format!("👨‍🍳 **RECIPE: {}**", show(details.get("name"), "Unknown").to_uppercase()),
        format!("• Type: {}", title_case(details["type"].as_str().unwrap_or("unknown"))),
        format!("• Price: {}", money(num(details.get("price")))),
    ];
    if let Some(recipe) = details.get("recipe").filter(|r| r.is_object()) {
        lines.push(format!("• Prep Time: {}", show(recipe.get("prep_time"), "N/A")));
        lines.push(format!("• Cook Time: {}", show(recipe.get("cook_time"), "N/A")));
    }
    if let Some(analysis) = details.get("ingredient_analysis").filter(|a| a.is_object()) {
        lines.push(format!("• Ingredients: {}", show(analysis.get("total_ingredients"), "0")));
        lines.push(format!("• Complexity Score: {:.1}", num(analysis.get("complexity_score"))));
    }
    lines.join("\n")
}

pub fn menu_profitability(data: &Value) -> String {
    if let Some(f) = failure("Menu Profitability", data) {
        return f;
    }
    let insights = &data["pricing_insights"];
    let dist = &insights["price_distribution"];
    let mut lines = vec![
        "💰 **MENU PROFITABILITY ANALYSIS**".to_string(),
        format!("• Total Menu Items: {}", show(insights.get("total_menu_items"), "0")),
        format!("• Average Price: {}", money(num(insights.get("average_price")))),
        format!(
            "• Price Bands: {} low, {} medium, {} high",
            show(dist.get("low_price_items"), "0"),
            show(dist.get("medium_price_items"), "0"),
            show(dist.get("high_price_items"), "0")
        ),
    ];
    let top = items(data, "top_priced_items");
    if !top.is_empty() {
        lines.push(String::new());
        lines.push("**HIGHEST PRICED ITEMS:**".to_string());
        for item in top.iter().take(3) {
            lines.push(format!(
                "• {}: {}",
                show(item.get("name"), "Unknown"),
                money(num(item.get("price")))
            ));
        }
    }
    lines.join("\n")
}

/// 三个损耗工具共用，按结果里出现的键分支
pub fn wastage(data: &Value) -> String {
    if let Some(f) = failure("Wastage Analysis", data) {
        return f;
    }
    let mut lines = vec!["🗑️ **WASTAGE ANALYSIS**".to_string()];
    if let Some(summary) = data.get("wastage_summary").filter(|v| v.is_object()) {
        let insights = &summary["business_insights"];
        lines.push(format!(
            "• Total Cost: {}",
            money(num(summary["summary_statistics"].get("total_cost")))
        ));
        lines.push(format!(
            "• Analysis Period: {} days",
            show(summary["period_analyzed"].get("days_analyzed"), "?")
        ));
        lines.push(format!("• Daily Average: {}", money(num(insights.get("daily_average_cost")))));
        lines.push(format!("• Cost Impact: {}", show(insights.get("cost_impact"), "N/A")));
    } else if let Some(overall) = data.get("overall_summary").filter(|v| v.is_object()) {
        lines.push(format!("• Records: {}", show(overall.get("total_records"), "0")));
        lines.push(format!("• Total Cost: {}", money(num(overall.get("total_cost")))));
        lines.push(format!(
            "• Avg per Incident: {}",
            money(num(overall.get("average_cost_per_incident")))
        ));
        let products = items(data, "product_analysis");
        if !products.is_empty() {
            lines.push(String::new());
            lines.push("**TOP WASTED PRODUCTS:**".to_string());
            for p in products.iter().take(3) {
                lines.push(format!(
                    "• {}: {} ({})",
                    show(p.get("product_name"), "Unknown"),
                    money(num(p.get("total_cost"))),
                    show(p.get("primary_reason"), "unknown")
                ));
            }
        }
    } else if let Some(trend) = data.get("trend_summary").filter(|v| v.is_object()) {
        lines.push(format!("• Trend: {}", show(trend.get("overall_trend"), "Unknown")));
        lines.push(format!(
            "• Recent Monthly Average: {}",
            money(num(trend.get("recent_monthly_average")))
        ));
        lines.push(format!("• Change: {:.1}%", num(trend.get("trend_percentage"))));
        let insights = &data["insights"];
        if let Some(peak) = insights.get("peak_wastage_month").filter(|v| !v.is_null()) {
            lines.push(format!("• Peak Month: {}", show(Some(peak), "")));
        }
    }
    lines.join("\n")
}

pub fn tenants(data: &Value) -> String {
    if let Some(f) = failure("Tenant Overview", data) {
        return f;
    }
    let insights = &data["business_insights"];
    let mut lines = vec![
        "🏢 **TENANT OVERVIEW**".to_string(),
        format!("• Total Tenants: {}", show(insights.get("total_tenants"), "0")),
        format!("• Active Tenants: {}", show(insights.get("active_tenants"), "0")),
        format!("• Total Locations: {}", show(insights.get("total_locations"), "0")),
        format!(
            "• Multi-location Tenants: {}",
            show(insights.get("multi_location_tenants"), "0")
        ),
    ];
    let list = items(data, "tenant_information");
    if !list.is_empty() {
        lines.push(String::new());
        lines.push("**TENANT DETAILS:**".to_string());
        for t in list.iter().take(3) {
            lines.push(format!(
                "• {} ({}): {}",
                show(t.get("name"), "Unknown"),
                show(t.get("business_type"), "restaurant"),
                title_case(t["status"].as_str().unwrap_or("unknown"))
            ));
        }
    }
    lines.join("\n")
}

pub fn catalog(data: &Value) -> String {
    if let Some(f) = failure("Product Catalog", data) {
        return f;
    }
    let analysis = &data["catalog_analysis"];
    let insights = &data["business_insights"];
    let mut lines = vec![
        "📋 **PRODUCT CATALOG ANALYSIS**".to_string(),
        format!("• Total Products: {}", show(analysis.get("total_products"), "0")),
    ];
    if let Some(types) = analysis["product_types"].as_object().filter(|t| !t.is_empty()) {
        let parts: Vec<String> = types
            .iter()
            .map(|(t, n)| format!("{} {}", show(Some(n), "0"), title_case(t)))
            .collect();
        lines.push(format!("• Types: {}", parts.join(", ")));
    }
    let pricing = &analysis["price_analysis"];
    if pricing.get("total_catalog_value").is_some() {
        lines.push(format!("• Catalog Value: {}", money(num(pricing.get("total_catalog_value")))));
        lines.push(format!("• Average Price: {}", money(num(pricing.get("average_price")))));
    }
    lines.push(format!("• Completeness: {}", show(insights.get("catalog_completeness"), "N/A")));
    lines.push(format!("• Category Diversity: {}", show(insights.get("product_diversity"), "0")));
    lines.join("\n")
}

pub fn locations(data: &Value) -> String {
    if let Some(f) = failure("Location Overview", data) {
        return f;
    }
    let insights = &data["business_insights"];
    let mut lines = vec![
        "📍 **LOCATION OVERVIEW**".to_string(),
        format!("• Total Locations: {}", show(insights.get("total_locations"), "0")),
        format!("• Active Locations: {}", show(insights.get("active_locations"), "0")),
        format!("• Geographical Spread: {} areas", show(insights.get("geographical_spread"), "0")),
    ];
    let list = items(data, "location_overview");
    if !list.is_empty() {
        lines.push(String::new());
        lines.push("**LOCATION DETAILS:**".to_string());
        for loc in list.iter().take(3) {
            lines.push(format!(
                "• {} ({}): {}",
                show(loc.get("name"), "Unknown"),
                show(loc.get("city"), "Unknown"),
                title_case(loc["status"].as_str().unwrap_or("unknown"))
            ));
        }
    }
    lines.join("\n")
}

pub fn batch(data: &Value) -> String {
    if let Some(f) = failure("Batch History", data) {
        return f;
    }
    let metrics = &data["batch_metrics"];
    let analysis = &data["transaction_analysis"];
    let insights = &data["business_insights"];
    [
        format!("📦 **BATCH TRACKING ANALYSIS**: {}", show(data.get("batch_id"), "?")),
        format!("• Utilization: {:.1}%", num(metrics.get("batch_utilization"))),
        format!("• Waste: {:.1}%", num(metrics.get("waste_percentage"))),
        format!("• Value Consumed: {}", money(num(metrics.get("total_value_consumed")))),
        format!("• Value Wasted: {}", money(num(metrics.get("total_value_wasted")))),
        format!("• Transactions: {}", show(analysis.get("total_transactions"), "0")),
        format!(
            "• Current Balance: {}",
            show(analysis["quantity_flow"].get("current_balance"), "0")
        ),
        format!("• Efficiency: {}", show(insights.get("batch_efficiency"), "N/A")),
        format!("• Traceability: {}", show(insights.get("traceability"), "N/A")),
    ]
    .join("\n")
}

pub fn system_status(data: &Value) -> String {
    let status = data["status"].as_str().unwrap_or("unknown");
    let light = match status {
        "connected" | "healthy" => "🟢",
        "timeout" | "unreachable" => "🟡",
        _ => "🔴",
    };
    let mut lines = vec![
        "🔧 **SYSTEM STATUS**".to_string(),
        format!("• Status: {} {}", title_case(status), light),
    ];
    if let Some(ms) = data.get("response_time_ms").filter(|v| !v.is_null()) {
        lines.push(format!("• Response Time: {} ms", show(Some(ms), "")));
    }
    if let Some(msg) = data.get("message").filter(|v| !v.is_null()) {
        lines.push(format!("• Detail: {}", show(Some(msg), "")));
    }
    lines.join("\n")
}

pub fn endpoints(data: &Value) -> String {
    let mut lines = vec!["🌐 **AVAILABLE ENDPOINTS**".to_string()];
    let available = data["backend_status"]["backend_available"].as_bool().unwrap_or(false);
    lines.push(format!(
        "• Backend: {}",
        if available { "available 🟢" } else { "unavailable 🔴" }
    ));
    if let Some(groups) = data["available_endpoints"].as_object() {
        for (group, endpoints) in groups {
            let count = endpoints
                .as_object()
                .map(|m| m.keys().filter(|k| k.as_str() != "description").count())
                .unwrap_or(0);
            lines.push(format!(
                "• {}: {} endpoints ({})",
                title_case(group),
                count,
                show(endpoints.get("description"), "")
            ));
        }
    }
    lines.join("\n")
}
