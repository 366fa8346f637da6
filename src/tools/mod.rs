use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::agents::AgentRun;
use crate::osm::OsmError;
use crate::providers::{Function, ToolCall};
use crate::sumo::SumoError;

pub mod convert;
pub mod delegate;
pub mod demand;
pub mod download;

pub use convert::ConvertOsmToSumo;
pub use delegate::AgentTool;
pub use demand::GenerateSumoDemand;
pub use download::DownloadOsmMap;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error(transparent)]
    Osm(#[from] OsmError),

    #[error(transparent)]
    Sumo(#[from] SumoError),

    #[error("{0}")]
    Failed(String),
}

/// What a tool hands back to the calling agent
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Text sent to the model as the tool result
    pub content: String,
    /// Set when the tool ran a sub-agent
    pub run: Option<AgentRun>,
}

impl From<String> for ToolOutput {
    fn from(content: String) -> Self {
        Self { content, run: None }
    }
}

/// A function the model can call
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the arguments object
    fn parameters(&self) -> serde_json::Value;

    async fn call(&self, arguments: serde_json::Value) -> Result<String, ToolError>;

    /// Like `call`, keeping the sub-agent run for tools backed by an agent
    async fn invoke(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        self.call(arguments).await.map(ToolOutput::from)
    }

    fn definition(&self) -> Function {
        Function {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Decode a tool's arguments object into its typed form
pub(crate) fn parse_args<T: DeserializeOwned>(
    tool: &str,
    arguments: serde_json::Value,
) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

/// Tools available to one agent, keyed by name
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn definitions(&self) -> Vec<Function> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    pub async fn dispatch(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;

        let raw = if call.arguments.trim().is_empty() {
            "{}"
        } else {
            call.arguments.as_str()
        };
        let arguments: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments {
                tool: call.name.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(tool = %call.name, %arguments, "calling tool");
        tool.invoke(arguments).await
    }
}
