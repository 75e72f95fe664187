//! 工具注册表
//!
//! 工具集合是封闭的：ToolId 枚举列出全部工具，每个 ToolId 对应一份静态 ToolDescriptor（描述、参数、使用场景）。
//! 所有工具实现 Tool trait，由 ToolRegistry 在进程启动时注册；模型给出的名字先解析为 ToolId，
//! 无法解析或未注册的名字得到 UnregisteredTool，由 Step Executor 转为 Observation 而不中断运行。

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::core::ToolError;
use crate::tools::ToolArgs;

/// 全部已知工具（顺序即提示词与 all_names 中的顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolId {
    GetInventoryStatus,
    CheckStockAlerts,
    AnalyzeInventoryByProduct,
    GetExpiryAlerts,
    GetAllCookbookItems,
    GetRecipeDetails,
    AnalyzeMenuProfitability,
    GetWastageSummary,
    AnalyzeWastageByProduct,
    TrackWastageTrends,
    GetTenantInformation,
    AnalyzeProductCatalog,
    GetLocationOverview,
    GetBatchHistory,
    CheckBackendStatus,
    GetAvailableEndpoints,
}

/// 名字不属于封闭工具集，或工具未注册
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unregistered tool: {0}")]
pub struct UnregisteredTool(pub String);

impl ToolId {
    pub const ALL: [ToolId; 16] = [
        ToolId::GetInventoryStatus,
        ToolId::CheckStockAlerts,
        ToolId::AnalyzeInventoryByProduct,
        ToolId::GetExpiryAlerts,
        ToolId::GetAllCookbookItems,
        ToolId::GetRecipeDetails,
        ToolId::AnalyzeMenuProfitability,
        ToolId::GetWastageSummary,
        ToolId::AnalyzeWastageByProduct,
        ToolId::TrackWastageTrends,
        ToolId::GetTenantInformation,
        ToolId::AnalyzeProductCatalog,
        ToolId::GetLocationOverview,
        ToolId::GetBatchHistory,
        ToolId::CheckBackendStatus,
        ToolId::GetAvailableEndpoints,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolId::GetInventoryStatus => "get_inventory_status",
            ToolId::CheckStockAlerts => "check_stock_alerts",
            ToolId::AnalyzeInventoryByProduct => "analyze_inventory_by_product",
            ToolId::GetExpiryAlerts => "get_expiry_alerts",
            ToolId::GetAllCookbookItems => "get_all_cookbook_items",
            ToolId::GetRecipeDetails => "get_recipe_details",
            ToolId::AnalyzeMenuProfitability => "analyze_menu_profitability",
            ToolId::GetWastageSummary => "get_wastage_summary",
            ToolId::AnalyzeWastageByProduct => "analyze_wastage_by_product",
            ToolId::TrackWastageTrends => "track_wastage_trends",
            ToolId::GetTenantInformation => "get_tenant_information",
            ToolId::AnalyzeProductCatalog => "analyze_product_catalog",
            ToolId::GetLocationOverview => "get_location_overview",
            ToolId::GetBatchHistory => "get_batch_history",
            ToolId::CheckBackendStatus => "check_backend_status",
            ToolId::GetAvailableEndpoints => "get_available_endpoints",
        }
    }

    /// 静态描述：供提示词展示，帮助模型选择工具
    pub fn descriptor(self) -> ToolDescriptor {
        let (description, parameters, use_when): (
            &'static str,
            &'static [(&'static str, &'static str)],
            &'static str,
        ) = match self {
            ToolId::GetInventoryStatus => (
                "Get current inventory levels and stock status information with sales context",
                &[
                    ("filter_status", "str (low_stock, out_of_stock, expiring_soon, dead_stock)"),
                    ("product_id", "str (specific product)"),
                    ("include_batches", "bool (include batch details)"),
                    ("include_sales_context", "bool (include sales velocity recommendations)"),
                ],
                "User asks about stock levels, inventory status, what's in stock, stock alerts, current inventory",
            ),
            ToolId::CheckStockAlerts => (
                "Check for inventory alerts that need immediate attention",
                &[("alert_types", "list (low_stock, out_of_stock, expiring_soon, dead_stock)")],
                "User asks about inventory problems, critical stock issues, urgent inventory matters, alerts",
            ),
            ToolId::AnalyzeInventoryByProduct => (
                "Detailed inventory analysis for specific products including batch tracking",
                &[
                    ("product_id", "str (product ID to analyze - required)"),
                    ("include_batch_details", "bool (include batch information)"),
                    ("include_expiry_analysis", "bool (include expiry analysis)"),
                ],
                "User asks about specific product inventory, batch details, product-specific stock analysis",
            ),
            ToolId::GetExpiryAlerts => (
                "Get comprehensive expiry alerts across all inventory with prioritization",
                &[
                    ("days_ahead", "int (days to check ahead for expiring items)"),
                    ("include_expired", "bool (include already expired items)"),
                    ("severity_filter", "str (critical, high, warning, expired)"),
                ],
                "User asks about expiring items, items going bad, expiry dates, waste prevention",
            ),
            ToolId::GetAllCookbookItems => (
                "Get all cookbook items including recipes and menu analysis",
                &[
                    ("include_recipes", "bool (include recipe details)"),
                    ("include_pricing", "bool (include pricing analysis)"),
                ],
                "User asks about menu items, recipes, cookbook, what dishes are available, menu overview",
            ),
            ToolId::GetRecipeDetails => (
                "Get detailed recipe information for specific menu items",
                &[
                    ("product_id", "str (product ID for recipe - required)"),
                    ("include_ingredient_analysis", "bool (detailed ingredient breakdown)"),
                    ("include_cost_breakdown", "bool (cost analysis per ingredient)"),
                ],
                "User asks about specific recipe, ingredients, how to make something, recipe details",
            ),
            ToolId::AnalyzeMenuProfitability => (
                "Analyze menu profitability and pricing strategies",
                &[
                    ("category_filter", "str (filter by menu category)"),
                    ("price_range", "str (low, medium, high price range filter)"),
                ],
                "User asks about menu profitability, pricing strategy, most profitable items, menu analysis",
            ),
            ToolId::GetWastageSummary => (
                "Get comprehensive wastage summary with trends and cost analysis",
                &[
                    ("days_back", "int (days to analyze)"),
                    ("include_trends", "bool (include trend analysis)"),
                    ("include_cost_analysis", "bool (include cost breakdowns)"),
                ],
                "User asks about waste, wastage costs, food waste, loss analysis, waste trends",
            ),
            ToolId::AnalyzeWastageByProduct => (
                "Analyze wastage patterns for specific products or reasons",
                &[
                    ("product_id", "str (specific product to analyze)"),
                    ("reason_filter", "str (expired, damaged, theft, other)"),
                    ("days_back", "int (days to analyze)"),
                    ("limit", "int (max records to return)"),
                ],
                "User asks about waste for specific products, why items are wasted, wastage reasons",
            ),
            ToolId::TrackWastageTrends => (
                "Track wastage trends over time for pattern identification",
                &[("months_back", "int (months of history to analyze)")],
                "User asks about wastage trends over time, seasonal waste patterns, waste reduction progress",
            ),
            ToolId::GetTenantInformation => (
                "Get comprehensive tenant info including locations and products",
                &[
                    ("include_locations", "bool (include location details)"),
                    ("include_products_summary", "bool (include product overview)"),
                ],
                "User asks about business locations, tenant info, company overview, store locations",
            ),
            ToolId::AnalyzeProductCatalog => (
                "Analyze product catalog structure and pricing",
                &[
                    ("tenant_id", "str (specific tenant)"),
                    ("product_type", "str (raw_material, sub_product, menu_item)"),
                    ("category", "str (product category filter)"),
                    ("include_pricing_analysis", "bool (detailed pricing analysis)"),
                ],
                "User asks about product catalog, product types, pricing analysis, product categories",
            ),
            ToolId::GetLocationOverview => (
                "Get overview of all business locations with operational insights",
                &[("tenant_id", "str (specific tenant)")],
                "User asks about business locations, store performance, location analysis, multi-location insights",
            ),
            ToolId::GetBatchHistory => (
                "Get comprehensive batch history for traceability and quality analysis",
                &[
                    ("batch_id", "str (specific batch ID to track - required)"),
                    ("include_quality_metrics", "bool (include quality analysis)"),
                ],
                "User asks about batch tracking, traceability, batch history, quality issues for specific batches",
            ),
            ToolId::CheckBackendStatus => (
                "Check if the backend inventory API is available and responsive",
                &[],
                "System errors, connectivity issues, or when other tools fail, backend problems",
            ),
            ToolId::GetAvailableEndpoints => (
                "List all available API endpoints that can be used",
                &[],
                "User asks about capabilities, available data, what can be analyzed, system capabilities",
            ),
        };
        ToolDescriptor {
            id: self,
            description,
            parameters,
            use_when,
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolId {
    type Err = UnregisteredTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        ToolId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == name)
            .ok_or_else(|| UnregisteredTool(name.to_string()))
    }
}

/// 工具的静态描述（进程内只读）
#[derive(Debug, Clone, Copy)]
pub struct ToolDescriptor {
    pub id: ToolId,
    pub description: &'static str,
    /// (参数名, 类型与说明)
    pub parameters: &'static [(&'static str, &'static str)],
    pub use_when: &'static str,
}

impl ToolDescriptor {
    pub fn name(&self) -> &'static str {
        self.id.as_str()
    }

    pub fn to_json(&self) -> Value {
        let parameters: Map<String, Value> = self
            .parameters
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        json!({
            "name": self.name(),
            "description": self.description,
            "parameters": parameters,
            "use_when": self.use_when,
        })
    }
}

/// 工具 trait：以命名参数调用，成功返回 JSON，失败返回 ToolError（由 Step Executor 转为文本）
#[async_trait]
pub trait Tool: Send + Sync {
    fn id(&self) -> ToolId;

    fn descriptor(&self) -> ToolDescriptor {
        self.id().descriptor()
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<Value, ToolError>;
}

/// 工具注册表：按 ToolId 存储 Arc<dyn Tool>，支持 register / lookup / all_names / to_schema_json
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<ToolId, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.id(), Arc::new(tool));
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Tool>, UnregisteredTool> {
        let id: ToolId = name.parse()?;
        self.tools
            .get(&id)
            .cloned()
            .ok_or_else(|| UnregisteredTool(name.trim().to_string()))
    }

    pub fn all_names(&self) -> Vec<&'static str> {
        self.tools.keys().map(|id| id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// 已注册工具的完整描述（pretty JSON），每次推理提示词都会带上
    pub fn to_schema_json(&self) -> String {
        let tools: Vec<Value> = self.tools.values().map(|t| t.descriptor().to_json()).collect();
        serde_json::to_string_pretty(&tools).unwrap_or_else(|_| "[]".to_string())
    }
}
