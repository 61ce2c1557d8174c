//! Tool registry - ordered, validated dispatch of named tools

use std::collections::HashMap;
use std::sync::Arc;
use serde::{Deserialize, Serialize, Serializer};
use serde::ser::SerializeMap;
use serde_json::Value;
use crate::Result;
use crate::error::Error;
use super::schema::validate;
use super::Tool;

/// Tool definition handed to the orchestration engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Result of an invocation, as reported back to the model
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(Value),
    Error { kind: &'static str, message: String },
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success(_))
    }

    pub fn to_json(&self) -> Value {
        // Serializing a Value-backed enum into a Value cannot fail
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl From<Result<Value>> for ToolOutcome {
    fn from(result: Result<Value>) -> Self {
        match result {
            Ok(value) => ToolOutcome::Success(value),
            Err(e) => ToolOutcome::Error { kind: e.kind(), message: e.to_string() },
        }
    }
}

/// `{"status": "success", ...payload}` or `{"status": "error", "error_kind", "error_message"}`.
/// Non-object payloads land under `result`.
impl Serialize for ToolOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            ToolOutcome::Success(Value::Object(fields)) => {
                map.serialize_entry("status", "success")?;
                for (k, v) in fields.iter().filter(|(k, _)| k.as_str() != "status") {
                    map.serialize_entry(k, v)?;
                }
            }
            ToolOutcome::Success(other) => {
                map.serialize_entry("status", "success")?;
                map.serialize_entry("result", other)?;
            }
            ToolOutcome::Error { kind, message } => {
                map.serialize_entry("status", "error")?;
                map.serialize_entry("error_kind", kind)?;
                map.serialize_entry("error_message", message)?;
            }
        }
        map.end()
    }
}

/// Tool registry keeps tools in registration order
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; a tool with the same name is replaced in place
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&i) => self.tools[i] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Get tool definitions, in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate and execute, propagating errors
    pub async fn try_invoke(&self, name: &str, args: Value) -> Result<Value> {
        let tool = self.index.get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| Error::Validation(format!("Unknown tool: {}", name)))?;

        let args = validate(name, &tool.parameters(), args)?;
        tracing::debug!("Dispatching tool {}", name);
        tool.execute(args).await
    }

    /// Validate and execute, folding any failure into a structured outcome
    pub async fn invoke(&self, name: &str, args: Value) -> ToolOutcome {
        let outcome = ToolOutcome::from(self.try_invoke(name, args).await);
        if let ToolOutcome::Error { kind, message } = &outcome {
            tracing::debug!("Tool {} failed ({}): {}", name, kind, message);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use async_trait::async_trait;
    use serde_json::json;
    use crate::tools::{ParamKind, ParamSpec, ToolArgs};
    use super::*;

    /// Counts executions so tests can tell whether dispatch happened
    struct SpyTool {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for SpyTool {
        fn name(&self) -> &str { self.name }
        fn description(&self) -> &str { "Spy tool for testing" }

        fn parameters(&self) -> Vec<ParamSpec> {
            vec![
                ParamSpec::required("file_id", ParamKind::String, "File id"),
                ParamSpec::optional("page_size", ParamKind::Integer, "Page size", json!(10)).with_range(1, 100),
            ]
        }

        async fn execute(&self, args: ToolArgs) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if args.str("file_id")? == "missing" {
                return Err(Error::NotFound("missing".to_string()));
            }
            Ok(json!({"file_id": args.str("file_id")?, "page_size": args.int("page_size")?}))
        }
    }

    fn registry() -> (ToolRegistry, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(SpyTool { name: "spy", calls: calls.clone() });
        (registry, calls)
    }

    #[tokio::test]
    async fn test_register_and_invoke() {
        let (registry, calls) = registry();
        assert!(registry.has("spy"));

        let outcome = registry.invoke("spy", json!({"file_id": "f1"})).await;
        assert_eq!(outcome.to_json(), json!({"status": "success", "file_id": "f1", "page_size": 10}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_required_never_dispatches() {
        let (registry, calls) = registry();
        let outcome = registry.invoke("spy", json!({"page_size": 5})).await;

        assert_eq!(outcome.to_json()["status"], "error");
        assert_eq!(outcome.to_json()["error_kind"], "validation_error");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_page_size_never_dispatches() {
        let (registry, calls) = registry();
        let outcome = registry.invoke("spy", json!({"file_id": "f", "page_size": 500})).await;
        assert!(!outcome.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (registry, _) = registry();
        let result = registry.try_invoke("unknown", json!({})).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_tool_errors_become_structured() {
        let (registry, _) = registry();
        let outcome = registry.invoke("spy", json!({"file_id": "missing"})).await;
        assert_eq!(outcome, ToolOutcome::Error {
            kind: "not_found",
            message: "Not found: missing".to_string(),
        });
    }

    #[test]
    fn test_order_and_replacement() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(SpyTool { name: "b", calls: calls.clone() });
        registry.register(SpyTool { name: "a", calls: calls.clone() });
        registry.register(SpyTool { name: "b", calls });

        assert_eq!(registry.tool_names(), vec!["b", "a"]);
        assert_eq!(registry.len(), 2);
        let defs = registry.definitions();
        assert_eq!(defs[0].parameters["required"], json!(["file_id"]));
    }

    #[test]
    fn test_non_object_success_payload() {
        let outcome = ToolOutcome::Success(json!("done"));
        assert_eq!(outcome.to_json(), json!({"status": "success", "result": "done"}));
    }
}
