//! Tool adapters that expose the executor to an agent loop
//!
//! Agents call tools by name with JSON arguments and get a string back. The
//! code executor tool returns the serialized result envelope; the workspace
//! tool returns the allocated directory so the agent can stage input files.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::SandboxError;
use crate::executors::CodeExecutor;

pub mod code_executor;

pub use code_executor::{CodeExecutorTool, WorkspaceTool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

// Core Tool trait that all tools must implement
#[async_trait]
pub trait Tool: Send + Sync {
    fn metadata(&self) -> ToolMetadata;
    async fn execute(&self, arguments: Value) -> Result<String, SandboxError>;
}

// Tool registry for managing multiple tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.metadata().name.clone();
        self.tools.insert(name, tool);
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list_tools(&self) -> Vec<ToolMetadata> {
        let mut tools: Vec<ToolMetadata> = self.tools.values().map(|tool| tool.metadata()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Looks up `name` and runs it.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<String, SandboxError> {
        let tool = self.get_tool(name).ok_or_else(|| SandboxError::ToolError {
            tool_name: name.to_string(),
            message: "No such tool".to_string(),
        })?;
        tool.execute(arguments).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Tool factory for creating the execution tools
pub struct ToolFactory;

impl ToolFactory {
    pub fn create_code_executor(executor: Arc<dyn CodeExecutor>) -> Arc<dyn Tool> {
        Arc::new(CodeExecutorTool::new(executor))
    }

    pub fn create_workspace(executor: Arc<dyn CodeExecutor>) -> Arc<dyn Tool> {
        Arc::new(WorkspaceTool::new(executor))
    }

    pub fn create_default_registry(executor: Arc<dyn CodeExecutor>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register_tool(Self::create_code_executor(executor.clone()));
        registry.register_tool(Self::create_workspace(executor));
        registry
    }
}
