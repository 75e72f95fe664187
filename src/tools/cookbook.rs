//! 菜谱工具：菜谱总览、单个菜谱详情、菜单定价分析
//!
//! 数据来自 GET /api/v1/cookbook（`{data: [...]}`）与 GET /api/v1/cookbook/{id}。

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::backend::BackendClient;
use crate::core::ToolError;
use crate::tools::fields::{array, num, path_segment, raw, text};
use crate::tools::ToolArgs;

pub const COOKBOOK_ENDPOINT: &str = "/api/v1/cookbook";

pub async fn get_all_cookbook_items(backend: &BackendClient, args: &ToolArgs) -> Result<Value, ToolError> {
    let include_recipes = args.bool_arg("include_recipes", true)?;
    let include_pricing = args.bool_arg("include_pricing", true)?;
    let data = backend.get_json(COOKBOOK_ENDPOINT, &[]).await?;
    Ok(cookbook_overview(&data, include_recipes, include_pricing))
}

fn recipe_summary(recipe: &Value) -> Value {
    json!({
        "instructions": recipe.get("instructions").cloned().unwrap_or_else(|| json!([])),
        "prep_time": text(recipe, "prep_time", ""),
        "cook_time": text(recipe, "cook_time", ""),
        "serving_size": raw(recipe, "serving_size"),
        "ingredients": recipe.get("ingredients").cloned().unwrap_or_else(|| json!([])),
    })
}

fn sort_by_price_desc(items: &mut [Value]) {
    items.sort_by(|a, b| {
        num(b.get("price"))
            .partial_cmp(&num(a.get("price")))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

pub fn cookbook_overview(data: &Value, include_recipes: bool, include_pricing: bool) -> Value {
    let mut items = Vec::new();
    let mut menu_items = 0usize;
    let mut sub_products = 0usize;
    let mut total_value = 0.0;

    for entry in array(data, "data").into_iter().filter(|v| v.is_object()) {
        let price = num(entry.get("price"));
        let mut item = json!({
            "product_id": text(entry, "id", ""),
            "name": text(entry, "name", "Unknown"),
            "type": text(entry, "type", "unknown"),
            "category": text(entry, "category", "uncategorized"),
            "unit": text(entry, "unit", ""),
            "price": price,
            "description": text(entry, "description", ""),
        });
        if include_recipes {
            if let Some(recipe) = entry.get("recipe").filter(|r| r.is_object()) {
                item["recipe"] = recipe_summary(recipe);
                if include_pricing && recipe.get("ingredients").is_some() {
                    item["cost_analysis"] = json!({
                        "ingredient_count": array(recipe, "ingredients").len(),
                        "price": price,
                        "profit_margin": "N/A",
                    });
                }
            }
        }
        match text(entry, "type", "") {
            "menu_item" => menu_items += 1,
            "sub_product" => sub_products += 1,
            _ => {}
        }
        total_value += price;
        items.push(item);
    }

    let total = items.len();
    let mut most_expensive = items.clone();
    sort_by_price_desc(&mut most_expensive);
    most_expensive.truncate(5);

    json!({
        "success": true,
        "cookbook_items": items,
        "summary": {
            "total_items": total,
            "menu_items": menu_items,
            "sub_products": sub_products,
            "raw_materials": total - menu_items - sub_products,
            "total_menu_value": total_value,
            "average_item_price": if total > 0 { total_value / total as f64 } else { 0.0 },
        },
        "business_insights": {
            "most_expensive_items": most_expensive,
            "menu_complexity": match total {
                t if t > 20 => "High",
                t if t > 10 => "Medium",
                _ => "Low",
            },
            "recommendation": if include_pricing {
                "Analyze ingredient costs for better profit margins"
            } else {
                "Enable pricing analysis for cost insights"
            },
        },
        "source_endpoints": [COOKBOOK_ENDPOINT],
        "generated_at": Utc::now().to_rfc3339(),
    })
}

pub async fn get_recipe_details(backend: &BackendClient, args: &ToolArgs) -> Result<Value, ToolError> {
    let product_id = path_segment("product_id", &args.require_str("product_id")?)?;
    let include_ingredient_analysis = args.bool_arg("include_ingredient_analysis", true)?;
    let include_cost_breakdown = args.bool_arg("include_cost_breakdown", true)?;
    let endpoint = format!("{}/{}", COOKBOOK_ENDPOINT, product_id);
    let data = backend.get_json(&endpoint, &[]).await?;
    Ok(recipe_details(
        &product_id,
        &data,
        include_ingredient_analysis,
        include_cost_breakdown,
    ))
}

pub fn recipe_details(
    product_id: &str,
    data: &Value,
    include_ingredient_analysis: bool,
    include_cost_breakdown: bool,
) -> Value {
    // 单条详情可能直接是对象，也可能包在 data 里
    let entry = match data.get("data") {
        Some(Value::Object(_)) => &data["data"],
        Some(Value::Array(items)) => items.first().unwrap_or(data),
        _ => data,
    };
    let price = num(entry.get("price"));
    let mut details = json!({
        "product_id": product_id,
        "name": text(entry, "name", "Unknown"),
        "type": text(entry, "type", "unknown"),
        "category": text(entry, "category", ""),
        "unit": text(entry, "unit", ""),
        "price": price,
        "description": text(entry, "description", ""),
    });

    let mut ingredient_count = 0;
    if let Some(recipe) = entry.get("recipe").filter(|r| r.is_object()) {
        let ingredients = array(recipe, "ingredients");
        ingredient_count = ingredients.len();
        details["recipe"] = json!({
            "instructions": recipe.get("instructions").cloned().unwrap_or_else(|| json!([])),
            "prep_time": text(recipe, "prep_time", ""),
            "cook_time": text(recipe, "cook_time", ""),
            "total_time": text(recipe, "total_time", ""),
            "serving_size": raw(recipe, "serving_size"),
            "difficulty": text(recipe, "difficulty", "medium"),
            "ingredients": recipe.get("ingredients").cloned().unwrap_or_else(|| json!([])),
        });
        if include_ingredient_analysis && recipe.get("ingredients").is_some() {
            let mut types: Vec<&str> = ingredients.iter().map(|i| text(i, "type", "unknown")).collect();
            types.sort_unstable();
            types.dedup();
            let breakdown: Vec<Value> = ingredients
                .iter()
                .map(|i| {
                    json!({
                        "name": text(i, "name", "Unknown"),
                        "quantity": raw(i, "quantity"),
                        "unit": text(i, "unit", ""),
                        "type": text(i, "type", "unknown"),
                        "notes": text(i, "notes", ""),
                    })
                })
                .collect();
            details["ingredient_analysis"] = json!({
                "total_ingredients": ingredient_count,
                "ingredient_types": types,
                "complexity_score": ingredient_count as f64 * 1.5,
                "ingredients_breakdown": breakdown,
            });
            if include_cost_breakdown {
                details["cost_analysis"] = json!({
                    "estimated_ingredient_cost": "Requires inventory pricing data",
                    "selling_price": price,
                    "potential_margin": "Requires cost calculation",
                });
            }
        }
    }
    if let Some(images) = entry.get("images") {
        details["images"] = images.clone();
    }

    json!({
        "success": true,
        "recipe_details": details,
        "business_insights": {
            "menu_positioning": if price > 15.0 { "Premium" } else { "Standard" },
            "preparation_complexity": if ingredient_count > 10 { "High" } else { "Medium" },
        },
        "generated_at": Utc::now().to_rfc3339(),
    })
}

pub async fn analyze_menu_profitability(
    backend: &BackendClient,
    args: &ToolArgs,
) -> Result<Value, ToolError> {
    let category_filter = args.str_arg("category_filter");
    let price_range = args.str_arg("price_range").map(|s| s.to_lowercase());
    if let Some(range) = price_range.as_deref() {
        if !matches!(range, "low" | "medium" | "high") {
            return Err(ToolError::InvalidArgument {
                name: "price_range",
                reason: format!("expected low, medium or high, got '{}'", range),
            });
        }
    }
    let data = backend.get_json(COOKBOOK_ENDPOINT, &[]).await?;
    Ok(menu_profitability(&data, category_filter.as_deref(), price_range.as_deref()))
}

/// 价格分档（本地货币单位）：< 200 低，< 400 中，其余高
pub fn price_band(price: f64) -> &'static str {
    if price < 200.0 {
        "low"
    } else if price < 400.0 {
        "medium"
    } else {
        "high"
    }
}

pub fn menu_profitability(data: &Value, category_filter: Option<&str>, price_range: Option<&str>) -> Value {
    let mut analysis = Vec::new();
    let mut bands: BTreeMap<&str, usize> = BTreeMap::new();
    let mut categories: BTreeMap<String, usize> = BTreeMap::new();

    for entry in array(data, "data") {
        if text(entry, "type", "") != "menu_item" {
            continue;
        }
        let price = num(entry.get("price"));
        let category = text(entry, "category", "uncategorized");
        if category_filter.is_some_and(|c| !c.eq_ignore_ascii_case(category)) {
            continue;
        }
        let band = price_band(price);
        if price_range.is_some_and(|r| r != band) {
            continue;
        }
        let ingredient_count = entry
            .get("recipe")
            .map(|r| array(r, "ingredients").len())
            .unwrap_or(0);
        analysis.push(json!({
            "product_id": text(entry, "id", ""),
            "name": text(entry, "name", "Unknown"),
            "category": category,
            "price": price,
            "price_category": band,
            "ingredient_count": ingredient_count,
            "complexity": if ingredient_count > 8 { "High" } else { "Medium" },
        }));
        *bands.entry(band).or_default() += 1;
        *categories.entry(category.to_string()).or_default() += 1;
    }

    let average = if analysis.is_empty() {
        0.0
    } else {
        analysis.iter().map(|i| num(i.get("price"))).sum::<f64>() / analysis.len() as f64
    };
    let mut top = analysis.clone();
    sort_by_price_desc(&mut top);
    top.truncate(5);
    let category_breakdown: Map<String, Value> = categories.into_iter().map(|(k, v)| (k, json!(v))).collect();

    json!({
        "success": true,
        "menu_analysis": analysis,
        "pricing_insights": {
            "total_menu_items": analysis.len(),
            "average_price": (average * 100.0).round() / 100.0,
            "price_distribution": {
                "low_price_items": bands.get("low").copied().unwrap_or(0),
                "medium_price_items": bands.get("medium").copied().unwrap_or(0),
                "high_price_items": bands.get("high").copied().unwrap_or(0),
            },
            "category_breakdown": category_breakdown,
            "recommendations": [
                "Analyze ingredient costs for accurate profit margins",
                "Consider premium pricing for complex recipes",
                "Balance menu with items across all price ranges"
            ],
        },
        "top_priced_items": top,
        "generated_at": Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookbook() -> Value {
        json!({"data": [
            {"id": "m1", "name": "Paneer Tikka", "type": "menu_item", "category": "Starters", "price": 349,
             "recipe": {"prep_time": "20m", "ingredients": [{"name": "Paneer", "type": "raw_material"},
                                                             {"name": "Yogurt", "type": "raw_material"}]}},
            {"id": "m2", "name": "Masala Chai", "type": "menu_item", "category": "Beverages", "price": "99"},
            {"id": "m3", "name": "Thali", "type": "menu_item", "category": "Mains", "price": 499},
            {"id": "s1", "name": "Tikka Marinade", "type": "sub_product", "price": 50},
            {"id": "r1", "name": "Flour", "type": "raw_material", "price": 40},
            "garbage"
        ]})
    }

    #[test]
    fn test_cookbook_overview_counts_types() {
        let out = cookbook_overview(&cookbook(), true, true);
        let summary = &out["summary"];
        assert_eq!(summary["total_items"], 5);
        assert_eq!(summary["menu_items"], 3);
        assert_eq!(summary["sub_products"], 1);
        assert_eq!(summary["raw_materials"], 1);
        assert_eq!(summary["total_menu_value"], 1037.0);
        assert_eq!(out["business_insights"]["most_expensive_items"][0]["name"], "Thali");
        assert_eq!(out["cookbook_items"][0]["cost_analysis"]["ingredient_count"], 2);
    }

    #[test]
    fn test_menu_profitability_bands_and_filters() {
        let out = menu_profitability(&cookbook(), None, None);
        let dist = &out["pricing_insights"]["price_distribution"];
        assert_eq!(dist["low_price_items"], 1);
        assert_eq!(dist["medium_price_items"], 1);
        assert_eq!(dist["high_price_items"], 1);
        assert_eq!(out["pricing_insights"]["average_price"], 315.67);
        assert_eq!(out["top_priced_items"][0]["name"], "Thali");

        let starters = menu_profitability(&cookbook(), Some("starters"), None);
        assert_eq!(starters["pricing_insights"]["total_menu_items"], 1);
        let high = menu_profitability(&cookbook(), None, Some("high"));
        assert_eq!(high["menu_analysis"][0]["name"], "Thali");
    }

    #[test]
    fn test_recipe_details_complexity_score() {
        let entry = cookbook()["data"][0].clone();
        let out = recipe_details("m1", &entry, true, true);
        let analysis = &out["recipe_details"]["ingredient_analysis"];
        assert_eq!(analysis["total_ingredients"], 2);
        assert_eq!(analysis["complexity_score"], 3.0);
        assert_eq!(analysis["ingredient_types"], json!(["raw_material"]));
        assert_eq!(out["business_insights"]["menu_positioning"], "Premium");
    }
}
