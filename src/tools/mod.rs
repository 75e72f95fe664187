pub mod args;
pub mod backend_tool;
pub mod batch;
pub mod cookbook;
pub mod executor;
pub mod fields;
pub mod inventory;
pub mod registry;
pub mod system;
pub mod tenancy;
pub mod wastage;

pub use args::ToolArgs;
pub use backend_tool::{default_registry, register_backend_tools, BackendTool};
pub use executor::ToolExecutor;
pub use registry::{Tool, ToolDescriptor, ToolId, ToolRegistry, UnregisteredTool};
