//! Agent module - agent shells and the built-in catalog.
//!
//! An [`AgentShell`] is an immutable record binding a model identifier and an
//! instruction to an ordered set of tools. It has no reasoning loop of its
//! own: the orchestration engine reads the manifest, decides which tool to
//! call and hands the call back through [`AgentShell::invoke`].
//!
//! Tools come in two forms:
//! - in-process tools registered in the shell's [`ToolRegistry`]
//! - subprocess tool servers, declared as [`ToolsetSpec`]s for the engine to spawn

pub mod catalog;

pub use catalog::{build, AgentInfo, AGENTS};

use std::collections::BTreeMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use crate::tools::{ToolDefinition, ToolOutcome, ToolRegistry};

/// A tool server the orchestration engine launches as a child process
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum ToolsetSpec {
    Stdio {
        command: String,
        args: Vec<String>,
        /// Extra environment for the child; values are redacted when serialized
        #[serde(serialize_with = "redact_env")]
        env: BTreeMap<String, String>,
    },
}

impl ToolsetSpec {
    /// `npx -y <package> [extra args]`
    pub fn npx(package: &str, extra_args: &[String]) -> Self {
        let mut args = vec!["-y".to_string(), package.to_string()];
        args.extend(extra_args.iter().cloned());
        ToolsetSpec::Stdio {
            command: "npx".to_string(),
            args,
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        match &mut self {
            ToolsetSpec::Stdio { env, .. } => {
                env.insert(key.to_string(), value.to_string());
            }
        }
        self
    }
}

fn redact_env<S: Serializer>(env: &BTreeMap<String, String>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let redacted: BTreeMap<&str, &str> = env.keys().map(|k| (k.as_str(), "<redacted>")).collect();
    redacted.serialize(serializer)
}

/// Immutable agent configuration
pub struct AgentShell {
    name: String,
    model: String,
    description: String,
    instruction: String,
    tools: ToolRegistry,
    toolsets: Vec<ToolsetSpec>,
}

impl AgentShell {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        description: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            description: description.into(),
            instruction: instruction.into(),
            tools: ToolRegistry::new(),
            toolsets: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_toolset(mut self, toolset: ToolsetSpec) -> Self {
        self.toolsets.push(toolset);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn toolsets(&self) -> &[ToolsetSpec] {
        &self.toolsets
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.definitions()
    }

    /// Dispatch one tool call made by the orchestration engine
    pub async fn invoke(&self, tool: &str, args: Value) -> ToolOutcome {
        tracing::debug!("{} invoking {}", self.name, tool);
        self.tools.invoke(tool, args).await
    }

    /// Everything the orchestration engine needs to run this agent
    pub fn manifest(&self) -> Value {
        json!({
            "name": self.name,
            "model": self.model,
            "description": self.description,
            "instruction": self.instruction,
            "tools": self.tool_definitions(),
            "toolsets": self.toolsets,
        })
    }
}
