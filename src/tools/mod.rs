//! Tools module - agent capabilities
//!
//! Tools are the named callables an orchestration engine may invoke: the
//! Drive and Gmail gateway operations plus a handful of plain API lookups.
//! Each tool declares its parameters as [`ParamSpec`]s; the registry checks
//! arguments against them before the tool runs.

mod registry;
mod schema;
pub mod drive;
pub mod gmail;
pub mod weather;
pub mod clock;
pub mod translate;
pub mod speech;
pub mod summary;
pub mod reddit;
pub mod pdf;

pub use registry::{ToolDefinition, ToolOutcome, ToolRegistry};
pub use schema::{ParamKind, ParamSpec, ToolArgs};

use async_trait::async_trait;
use serde_json::Value;
use crate::Result;

/// Tool trait - interface for all agent tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name used in function calls
    fn name(&self) -> &str;

    /// Description the model reads to decide when to call the tool
    fn description(&self) -> &str;

    /// Declared parameters, in display order
    fn parameters(&self) -> Vec<ParamSpec>;

    /// Execute with arguments already validated against `parameters()`
    async fn execute(&self, args: ToolArgs) -> Result<Value>;

    /// Convert to tool definition for the orchestration engine
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: schema::json_schema(&self.parameters()),
        }
    }
}
