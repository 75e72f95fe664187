//! 系统工具：后端健康检查与可用端点清单

use serde_json::{json, Value};

use crate::backend::{BackendClient, HEALTH_ENDPOINT};

pub async fn check_backend_status(backend: &BackendClient) -> Value {
    backend.probe_health().await
}

pub async fn get_available_endpoints(backend: &BackendClient) -> Value {
    let health = backend.probe_health().await;
    endpoint_catalog(backend.base_url(), backend.tenant_id(), health)
}

/// 只列出只读（GET）端点
pub fn endpoint_catalog(base_url: &str, tenant_id: &str, health: Value) -> Value {
    json!({
        "success": true,
        "backend_status": health,
        "available_endpoints": {
            "inventory_analysis": {
                "get_all_inventory": "GET /api/v1/inventory - All inventory with stock status",
                "get_product_inventory": "GET /api/v1/inventory/{product_id} - Specific product inventory details",
                "batch_history": "GET /api/v1/stock/batch/{batch_id}/history - Batch transaction history",
                "description": "Current stock levels, batch info and status"
            },
            "recipe_analysis": {
                "list_recipes": "GET /api/v1/cookbook - All cookbook entries",
                "get_recipe": "GET /api/v1/cookbook/{product_id} - Specific recipe details",
                "description": "Recipe and menu item data"
            },
            "wastage_analysis": {
                "wastage_summary": "GET /api/v1/wastage/summary - Wastage totals for a date range",
                "wastage_records": "GET /api/v1/wastage - Individual wastage records",
                "description": "Wastage costs, reasons and trends"
            },
            "tenancy": {
                "tenants": "GET /api/v1/tenancy/tenants - Tenants",
                "locations": "GET /api/v1/tenancy/locations - Business locations",
                "products": "GET /api/v1/tenancy/products - Product catalog",
                "description": "Tenant, location and catalog data"
            },
            "system_health": {
                "health_check": format!("GET {} - Backend health status", HEALTH_ENDPOINT),
                "description": "System health monitoring"
            }
        },
        "analytics_note": "Only GET endpoints are used; analytics never modifies backend data",
        "tenant_id": tenant_id,
        "base_url": base_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_embeds_health() {
        let out = endpoint_catalog("http://localhost:8000", "t-1", json!({"backend_available": false}));
        assert_eq!(out["backend_status"]["backend_available"], false);
        assert_eq!(out["tenant_id"], "t-1");
        assert!(out["available_endpoints"]["system_health"]["health_check"]
            .as_str()
            .unwrap()
            .contains("/api/v1/healthz"));
    }
}
