//! 后端数据工具：每个 ToolId 对应一个处理函数，编译期确定分派

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::BackendClient;
use crate::core::ToolError;
use crate::tools::{batch, cookbook, inventory, system, tenancy, wastage};
use crate::tools::{Tool, ToolArgs, ToolId, ToolRegistry};

/// 共享同一个 BackendClient 的只读数据工具
pub struct BackendTool {
    id: ToolId,
    backend: Arc<BackendClient>,
}

impl BackendTool {
    pub fn new(id: ToolId, backend: Arc<BackendClient>) -> Self {
        Self { id, backend }
    }
}

#[async_trait]
impl Tool for BackendTool {
    fn id(&self) -> ToolId {
        self.id
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        let b = self.backend.as_ref();
        match self.id {
            ToolId::GetInventoryStatus => inventory::get_inventory_status(b, args).await,
            ToolId::CheckStockAlerts => inventory::check_stock_alerts(b, args).await,
            ToolId::AnalyzeInventoryByProduct => inventory::analyze_inventory_by_product(b, args).await,
            ToolId::GetExpiryAlerts => inventory::get_expiry_alerts(b, args).await,
            ToolId::GetAllCookbookItems => cookbook::get_all_cookbook_items(b, args).await,
            ToolId::GetRecipeDetails => cookbook::get_recipe_details(b, args).await,
            ToolId::AnalyzeMenuProfitability => cookbook::analyze_menu_profitability(b, args).await,
            ToolId::GetWastageSummary => wastage::get_wastage_summary(b, args).await,
            ToolId::AnalyzeWastageByProduct => wastage::analyze_wastage_by_product(b, args).await,
            ToolId::TrackWastageTrends => wastage::track_wastage_trends(b, args).await,
            ToolId::GetTenantInformation => tenancy::get_tenant_information(b, args).await,
            ToolId::AnalyzeProductCatalog => tenancy::analyze_product_catalog(b, args).await,
            ToolId::GetLocationOverview => tenancy::get_location_overview(b, args).await,
            ToolId::GetBatchHistory => batch::get_batch_history(b, args).await,
            ToolId::CheckBackendStatus => Ok(system::check_backend_status(b).await),
            ToolId::GetAvailableEndpoints => Ok(system::get_available_endpoints(b).await),
        }
    }
}

/// 注册全部后端工具
pub fn register_backend_tools(registry: &mut ToolRegistry, backend: Arc<BackendClient>) {
    for id in ToolId::ALL {
        registry.register(BackendTool::new(id, Arc::clone(&backend)));
    }
}

/// 默认工具集
pub fn default_registry(backend: Arc<BackendClient>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    register_backend_tools(&mut registry, backend);
    registry
}
