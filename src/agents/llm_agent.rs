use super::{Agent, AgentError, AgentRun, ToolInvocation};
use crate::providers::{CompletionRequest, LLMProvider, Message, TokenUsage, ToolChoice};
use crate::tools::ToolRegistry;
use anyhow::Result;
use std::sync::Arc;

pub const DEFAULT_MAX_TURNS: usize = 12;

/// An agent powered by an LLM provider that may call tools until it has an answer
pub struct LlmAgent {
    name: String,
    provider: Arc<dyn LLMProvider>,
    model: String,
    instructions: String,
    tools: ToolRegistry,
    max_turns: usize,
}

impl LlmAgent {
    pub fn new(
        name: impl Into<String>,
        provider: Arc<dyn LLMProvider>,
        model: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            model: model.into(),
            instructions: instructions.into(),
            tools: ToolRegistry::new(),
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, messages: &[Message]) -> CompletionRequest {
        let tools = (!self.tools.is_empty()).then(|| self.tools.definitions());
        CompletionRequest {
            messages: messages.to_vec(),
            model: self.model.clone(),
            temperature: None,
            max_tokens: None,
            tool_choice: tools.as_ref().map(|_| ToolChoice::Auto),
            tools,
        }
    }
}

#[async_trait::async_trait]
impl Agent for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: &str) -> Result<AgentRun> {
        let mut messages = vec![Message::system(&self.instructions), Message::user(input)];
        let mut usage = TokenUsage::default();
        let mut invocations = Vec::new();

        for turn in 1..=self.max_turns {
            let response = self.provider.complete(self.request(&messages)).await?;
            if let Some(u) = &response.usage {
                usage.add(u);
            }

            if response.tool_calls.is_empty() {
                if response.content.trim().is_empty() {
                    return Err(AgentError::EmptyResponse(self.name.clone()).into());
                }
                tracing::debug!(agent = %self.name, turn, "final answer");
                return Ok(AgentRun {
                    agent: self.name.clone(),
                    output: response.content,
                    turns: turn,
                    tool_calls: invocations,
                    usage,
                });
            }

            messages.push(Message::assistant(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            // Calls from one reply run in order; each gets exactly one answer
            for call in &response.tool_calls {
                let (content, success, nested) = match self.tools.dispatch(call).await {
                    Ok(output) => (output.content, true, output.run),
                    Err(e) => {
                        tracing::warn!(agent = %self.name, tool = %call.name, "tool failed: {}", e);
                        (format!("Error: {}", e), false, None)
                    }
                };
                // Sub-agent model calls count towards this run
                if let Some(run) = &nested {
                    usage.add(&run.usage);
                }
                invocations.push(ToolInvocation {
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                    success,
                    nested,
                });
                messages.push(Message::tool(call.id.clone(), content));
            }
        }

        Err(AgentError::MaxTurnsExceeded {
            agent: self.name.clone(),
            turns: self.max_turns,
        }
        .into())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::providers::{CompletionResponse, ToolCall};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records every request it receives
    #[derive(Default)]
    pub struct ScriptedProvider {
        responses: Mutex<VecDeque<CompletionResponse>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        pub fn new(responses: Vec<CompletionResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    pub fn text(content: &str) -> CompletionResponse {
        CompletionResponse {
            content: content.to_string(),
            model: "scripted".to_string(),
            usage: Some(TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 2,
                total_tokens: 12,
            }),
            tool_calls: Vec::new(),
            finish_reason: Some("stop".to_string()),
        }
    }

    pub fn calls(calls: &[(&str, &str, &str)]) -> CompletionResponse {
        CompletionResponse {
            content: String::new(),
            model: "scripted".to_string(),
            usage: None,
            tool_calls: calls
                .iter()
                .map(|(id, name, arguments)| ToolCall {
                    id: id.to_string(),
                    name: name.to_string(),
                    arguments: arguments.to_string(),
                })
                .collect(),
            finish_reason: Some("tool_calls".to_string()),
        }
    }

    #[async_trait::async_trait]
    impl LLMProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("script exhausted"))
        }

        async fn validate_config(&self) -> Result<()> {
            Ok(())
        }
    }
}
