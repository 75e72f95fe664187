//! 租户工具：租户概览、产品目录分析、门店概览
//!
//! 端点：/api/v1/tenancy/tenants、/api/v1/tenancy/locations?tenant_id、/api/v1/tenancy/products?tenant_id&type&category。
//! 列表端点可能返回数组，也可能返回单个对象。

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::backend::BackendClient;
use crate::core::ToolError;
use crate::tools::fields::{num, raw, records, text};
use crate::tools::ToolArgs;

pub const TENANTS_ENDPOINT: &str = "/api/v1/tenancy/tenants";
pub const LOCATIONS_ENDPOINT: &str = "/api/v1/tenancy/locations";
pub const PRODUCTS_ENDPOINT: &str = "/api/v1/tenancy/products";

fn count_map(counts: BTreeMap<String, usize>) -> Map<String, Value> {
    counts.into_iter().map(|(k, v)| (k, json!(v))).collect()
}

pub async fn get_tenant_information(backend: &BackendClient, args: &ToolArgs) -> Result<Value, ToolError> {
    let include_locations = args.bool_arg("include_locations", true)?;
    let include_products = args.bool_arg("include_products_summary", true)?;
    let tenants_data = backend.get_json(TENANTS_ENDPOINT, &[]).await?;

    let mut tenants = Vec::new();
    for tenant in records(&tenants_data, "tenants") {
        let tenant_id = text(tenant, "id", "").to_string();
        // 子查询失败只影响该租户的对应字段
        let locations = if include_locations {
            Some(
                backend
                    .get_json(LOCATIONS_ENDPOINT, &[("tenant_id", tenant_id.clone())])
                    .await
                    .map_err(|e| tracing::warn!(tenant = %tenant_id, error = %e, "location lookup failed")),
            )
        } else {
            None
        };
        let products = if include_products {
            Some(
                backend
                    .get_json(PRODUCTS_ENDPOINT, &[("tenant_id", tenant_id.clone())])
                    .await
                    .map_err(|e| tracing::warn!(tenant = %tenant_id, error = %e, "product lookup failed")),
            )
        } else {
            None
        };
        tenants.push(tenant_profile(tenant, locations.as_ref(), products.as_ref()));
    }
    Ok(tenant_overview(tenants))
}

/// locations / products：None 表示未请求，Some(Err) 表示请求失败
pub fn tenant_profile(
    tenant: &Value,
    locations: Option<&Result<Value, ()>>,
    products: Option<&Result<Value, ()>>,
) -> Value {
    let mut info = json!({
        "id": raw(tenant, "id"),
        "name": text(tenant, "name", "Unknown"),
        "currency": text(tenant, "currency", "USD"),
        "created_at": text(tenant, "created_at", ""),
        "status": text(tenant, "status", "active"),
        "business_type": text(tenant, "business_type", "restaurant"),
    });

    match locations {
        Some(Ok(data)) => {
            let list: Vec<Value> = records(data, "locations")
                .into_iter()
                .map(|loc| {
                    json!({
                        "id": raw(loc, "id"),
                        "name": text(loc, "name", "Unknown"),
                        "city": text(loc, "city", ""),
                        "state": text(loc, "state", ""),
                        "country": text(loc, "country", ""),
                        "status": text(loc, "status", "active"),
                    })
                })
                .collect();
            info["location_count"] = json!(list.len());
            info["locations"] = Value::Array(list);
        }
        Some(Err(())) => {
            info["locations"] = json!([]);
            info["location_count"] = json!(0);
        }
        None => {}
    }

    match products {
        Some(Ok(data)) => {
            let items = records(data, "products");
            let mut types = BTreeMap::new();
            let mut categories = BTreeMap::new();
            let mut total = 0.0;
            for p in &items {
                *types.entry(text(p, "type", "unknown").to_string()).or_insert(0) += 1;
                *categories.entry(text(p, "category", "uncategorized").to_string()).or_insert(0) += 1;
                total += num(p.get("price"));
            }
            info["product_catalog"] = json!({
                "total_products": items.len(),
                "product_types": count_map(types),
                "categories": count_map(categories),
                "total_catalog_value": total,
                "average_product_price": if items.is_empty() { 0.0 } else { total / items.len() as f64 },
            });
        }
        Some(Err(())) => {
            info["product_catalog"] = json!({
                "total_products": 0,
                "error": "Unable to fetch product data",
            });
        }
        None => {}
    }
    info
}

pub fn tenant_overview(tenants: Vec<Value>) -> Value {
    let active = tenants.iter().filter(|t| t["status"] == "active").count();
    let location_counts: Vec<u64> = tenants
        .iter()
        .map(|t| t.get("location_count").and_then(|v| v.as_u64()).unwrap_or(0))
        .collect();
    json!({
        "success": true,
        "business_insights": {
            "total_tenants": tenants.len(),
            "active_tenants": active,
            "total_locations": location_counts.iter().sum::<u64>(),
            "multi_location_tenants": location_counts.iter().filter(|n| **n > 1).count(),
        },
        "tenant_information": tenants,
        "generated_at": Utc::now().to_rfc3339(),
    })
}

pub async fn analyze_product_catalog(backend: &BackendClient, args: &ToolArgs) -> Result<Value, ToolError> {
    let tenant_id = args.str_arg("tenant_id");
    let product_type = args.str_arg("product_type");
    let category = args.str_arg("category");
    let include_pricing = args.bool_arg("include_pricing_analysis", true)?;

    let mut query = Vec::new();
    if let Some(t) = &tenant_id {
        query.push(("tenant_id", t.clone()));
    }
    if let Some(t) = &product_type {
        query.push(("type", t.clone()));
    }
    if let Some(c) = &category {
        query.push(("category", c.clone()));
    }
    let data = backend.get_json(PRODUCTS_ENDPOINT, &query).await?;
    let mut out = product_catalog(&data, include_pricing);
    out["filters_applied"] = json!({
        "tenant_id": tenant_id,
        "product_type": product_type,
        "category": category,
    });
    Ok(out)
}

pub fn product_catalog(data: &Value, include_pricing: bool) -> Value {
    let products = records(data, "products");
    let mut types: BTreeMap<String, usize> = BTreeMap::new();
    let mut categories: BTreeMap<String, usize> = BTreeMap::new();
    let mut prices_by_type: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut by_type: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    let mut total = 0.0;

    for p in &products {
        let ptype = text(p, "type", "unknown").to_string();
        let category = text(p, "category", "uncategorized");
        let price = num(p.get("price"));
        *types.entry(ptype.clone()).or_default() += 1;
        *categories.entry(category.to_string()).or_default() += 1;
        prices_by_type.entry(ptype.clone()).or_default().push(price);
        by_type.entry(ptype).or_default().push(json!({
            "id": raw(p, "id"),
            "name": text(p, "name", "Unknown"),
            "category": category,
            "price": price,
            "unit": text(p, "unit", ""),
        }));
        total += price;
    }

    let mut price_analysis = Map::new();
    if include_pricing && !products.is_empty() {
        let price_by_type: Map<String, Value> = prices_by_type
            .iter()
            .map(|(t, prices)| {
                let sum: f64 = prices.iter().sum();
                let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
                let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                (
                    t.clone(),
                    json!({
                        "count": prices.len(),
                        "min_price": min,
                        "max_price": max,
                        "average_price": sum / prices.len() as f64,
                        "total_value": sum,
                    }),
                )
            })
            .collect();
        let avg_of = |t: &str| {
            prices_by_type
                .get(t)
                .filter(|p| !p.is_empty())
                .map(|p| p.iter().sum::<f64>() / p.len() as f64)
                .unwrap_or(0.0)
        };
        price_analysis.insert("total_catalog_value".to_string(), json!(total));
        price_analysis.insert("average_price".to_string(), json!(total / products.len() as f64));
        price_analysis.insert("price_by_type".to_string(), Value::Object(price_by_type));
        price_analysis.insert(
            "pricing_insights".to_string(),
            json!({
                "menu_item_count": types.get("menu_item").copied().unwrap_or(0),
                "raw_material_count": types.get("raw_material").copied().unwrap_or(0),
                "avg_menu_price": avg_of("menu_item"),
                "avg_raw_material_cost": avg_of("raw_material"),
            }),
        );
    }

    let completeness = match products.len() {
        n if n > 50 => "Complete",
        n if n > 20 => "Moderate",
        _ => "Limited",
    };
    let menu_count = types.get("menu_item").copied().unwrap_or(0) as f64;
    let raw_count = types.get("raw_material").copied().unwrap_or(1).max(1) as f64;
    let most_common = categories
        .iter()
        .max_by_key(|(_, n)| **n)
        .map(|(c, _)| c.clone())
        .unwrap_or_else(|| "N/A".to_string());
    let diversity = categories.len();
    let by_type: Map<String, Value> = by_type.into_iter().map(|(k, v)| (k, Value::Array(v))).collect();

    json!({
        "success": true,
        "catalog_analysis": {
            "total_products": products.len(),
            "product_types": count_map(types),
            "categories": count_map(categories),
            "price_analysis": price_analysis,
            "products_by_type": by_type,
        },
        "business_insights": {
            "catalog_completeness": completeness,
            "product_diversity": diversity,
            "menu_vs_materials_ratio": menu_count / raw_count,
            "most_common_category": most_common,
        },
        "generated_at": Utc::now().to_rfc3339(),
    })
}

pub async fn get_location_overview(backend: &BackendClient, args: &ToolArgs) -> Result<Value, ToolError> {
    let tenant_id = args.str_arg("tenant_id");
    let query: Vec<(&str, String)> = tenant_id.iter().map(|t| ("tenant_id", t.clone())).collect();
    let data = backend.get_json(LOCATIONS_ENDPOINT, &query).await?;
    let mut out = location_overview(&data);
    out["filters_applied"] = json!({"tenant_id": tenant_id});
    Ok(out)
}

pub fn location_overview(data: &Value) -> Value {
    let locations = records(data, "locations");
    let mut geo: BTreeMap<String, usize> = BTreeMap::new();
    let overview: Vec<Value> = locations
        .iter()
        .map(|loc| {
            let key = format!(
                "{}, {}, {}",
                text(loc, "city", "Unknown"),
                text(loc, "state", "Unknown"),
                text(loc, "country", "Unknown")
            );
            *geo.entry(key).or_default() += 1;
            json!({
                "id": raw(loc, "id"),
                "name": text(loc, "name", "Unknown"),
                "address": text(loc, "address", ""),
                "city": text(loc, "city", ""),
                "state": text(loc, "state", ""),
                "country": text(loc, "country", ""),
                "postal_code": text(loc, "postal_code", ""),
                "status": text(loc, "status", "active"),
                "tenant_id": raw(loc, "tenant_id"),
            })
        })
        .collect();
    let active = locations.iter().filter(|l| text(l, "status", "") == "active").count();
    let spread = geo.len();
    let distribution = count_map(geo);

    json!({
        "success": true,
        "location_overview": overview,
        "geographical_distribution": distribution,
        "business_insights": {
            "total_locations": locations.len(),
            "active_locations": active,
            "geographical_spread": spread,
        },
        "recommendations": [
            "Monitor performance across all locations",
            "Standardize operations across locations",
            "Consider location-specific inventory strategies"
        ],
        "generated_at": Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_profile_with_failed_product_lookup() {
        let tenant = json!({"id": "t1", "name": "Spice Route"});
        let locations = Ok(json!([
            {"id": "l1", "name": "Indiranagar", "city": "Bengaluru"},
            {"id": "l2", "name": "Bandra", "city": "Mumbai"}
        ]));
        let info = tenant_profile(&tenant, Some(&locations), Some(&Err(())));
        assert_eq!(info["location_count"], 2);
        assert_eq!(info["status"], "active");
        assert_eq!(info["product_catalog"]["error"], "Unable to fetch product data");

        let overview = tenant_overview(vec![info, json!({"status": "suspended"})]);
        let insights = &overview["business_insights"];
        assert_eq!(insights["total_tenants"], 2);
        assert_eq!(insights["active_tenants"], 1);
        assert_eq!(insights["total_locations"], 2);
        assert_eq!(insights["multi_location_tenants"], 1);
    }

    #[test]
    fn test_product_catalog_insights() {
        let data = json!([
            {"id": "1", "name": "Thali", "type": "menu_item", "category": "Mains", "price": 400},
            {"id": "2", "name": "Chai", "type": "menu_item", "category": "Beverages", "price": 100},
            {"id": "3", "name": "Flour", "type": "raw_material", "category": "Mains", "price": 50}
        ]);
        let out = product_catalog(&data, true);
        let analysis = &out["catalog_analysis"];
        assert_eq!(analysis["total_products"], 3);
        assert_eq!(analysis["product_types"]["menu_item"], 2);
        assert_eq!(analysis["price_analysis"]["price_by_type"]["menu_item"]["max_price"], 400.0);
        assert_eq!(analysis["price_analysis"]["pricing_insights"]["avg_menu_price"], 250.0);
        assert_eq!(out["business_insights"]["catalog_completeness"], "Limited");
        assert_eq!(out["business_insights"]["most_common_category"], "Mains");
        assert_eq!(out["business_insights"]["menu_vs_materials_ratio"], 2.0);
    }

    #[test]
    fn test_location_overview_single_object() {
        let out = location_overview(&json!({"id": "l1", "name": "HQ", "city": "Pune", "status": "active"}));
        assert_eq!(out["business_insights"]["total_locations"], 1);
        assert_eq!(out["business_insights"]["active_locations"], 1);
        assert_eq!(out["geographical_distribution"]["Pune, Unknown, Unknown"], 1);
    }
}
