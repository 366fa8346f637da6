pub mod llm_agent;
pub mod orchestrator;

pub use llm_agent::LlmAgent;
pub use orchestrator::{Orchestrator, Topology};

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::providers::TokenUsage;

#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    /// Handle one instruction and return the final answer
    async fn run(&self, input: &str) -> Result<AgentRun>;
}

/// Outcome of one agent run
#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    pub agent: String,
    pub output: String,
    /// Model round trips
    pub turns: usize,
    pub tool_calls: Vec<ToolInvocation>,
    pub usage: TokenUsage,
}

impl AgentRun {
    pub fn new(agent: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            output: output.into(),
            turns: 0,
            tool_calls: Vec::new(),
            usage: TokenUsage::default(),
        }
    }

    /// Every tool call of this run and of the sub-agents it delegated to, depth first
    pub fn all_tool_calls(&self) -> Vec<&ToolInvocation> {
        let mut all = Vec::new();
        for call in &self.tool_calls {
            all.push(call);
            if let Some(nested) = &call.nested {
                all.extend(nested.all_tool_calls());
            }
        }
        all
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: String,
    pub success: bool,
    /// Run of the sub-agent behind the tool, when the tool is an agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nested: Option<AgentRun>,
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("{agent} gave no answer after {turns} turns")]
    MaxTurnsExceeded { agent: String, turns: usize },

    #[error("{0} returned an empty response")]
    EmptyResponse(String),
}
