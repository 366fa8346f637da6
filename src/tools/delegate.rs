use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{parse_args, Tool, ToolError, ToolOutput};
use crate::agents::Agent;

#[derive(Debug, Deserialize)]
struct Args {
    input: String,
}

/// Exposes a sub-agent as a tool: the input goes in as the user message,
/// the agent's final answer comes back as the tool result.
pub struct AgentTool {
    name: String,
    description: String,
    agent: Arc<dyn Agent>,
}

impl AgentTool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, agent: Arc<dyn Agent>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            agent,
        }
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "string",
                    "description": format!("Instruction for the {} agent", self.agent.name())
                }
            },
            "required": ["input"]
        })
    }

    async fn call(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        self.invoke(arguments).await.map(|out| out.content)
    }

    async fn invoke(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: Args = parse_args(&self.name, arguments)?;
        tracing::info!("Delegating to {}", self.agent.name());
        let run = self
            .agent
            .run(&args.input)
            .await
            .map_err(|e| ToolError::Failed(format!("{} failed: {:#}", self.agent.name(), e)))?;
        Ok(ToolOutput {
            content: run.output.clone(),
            run: Some(run),
        })
    }
}
