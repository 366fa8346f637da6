use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use super::{Agent, AgentRun, LlmAgent};
use crate::config::{AgentConfig, SumoAgentConfig};
use crate::osm::OsmFetcher;
use crate::providers::openai::OpenAIProvider;
use crate::providers::LLMProvider;
use crate::tools::{
    AgentTool, ConvertOsmToSumo, DownloadOsmMap, GenerateSumoDemand, Tool, ToolRegistry,
};

/// How the agents are wired together
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// An orchestrator delegating to one sub-agent per step
    #[default]
    Delegated,
    /// One agent holding every step tool
    Single,
}

const DOWNLOADER_PROMPT: &str = "You download OpenStreetMap maps. You receive the name of a place \
and call download_osm_map with it. Answer with ONLY the path of the generated .osm file.";

const CONVERTER_PROMPT: &str = "You convert .osm files into SUMO road networks (.net.xml) with \
osmBuild.py. You receive an .osm file and call convert_osm_to_sumo with it. Answer with ONLY the \
path of the generated .net.xml file.";

const DEMAND_PROMPT: &str = "You generate SUMO traffic demand with randomTrips.py. You receive a \
.net.xml file, optionally with a duration, period or seed, and call generate_sumo_demand. Answer \
with the summary the tool returns.";

const ORCHESTRATOR_PROMPT: &str = "You orchestrate a multi-agent system that prepares SUMO traffic \
simulations.\n\n\
ALWAYS run this flow:\n\
1. Call download_osm with the place the user names.\n\
2. Pass the resulting .osm file to convert_to_sumo.\n\
3. Pass the resulting .net.xml file to generate_demand, forwarding any duration, period or seed \
the user asked for.\n\n\
Never ask the user whether to continue. If a step fails, stop and explain which step failed and \
why. At the end, return a complete summary of the process with every generated file.";

const SINGLE_PROMPT: &str = "You prepare SUMO traffic simulations. Use download_osm_map to fetch \
the map of the place the user names, convert_osm_to_sumo to build the SUMO network from it, and \
generate_sumo_demand to create traffic demand for that network. Run only the steps the user asks \
for, in that order, passing each step the file produced by the previous one. Report clearly on \
every step.";

/// The three step tools the agents are built around
#[derive(Clone)]
pub struct StepTools {
    pub download: Arc<dyn Tool>,
    pub convert: Arc<dyn Tool>,
    pub demand: Arc<dyn Tool>,
}

impl StepTools {
    pub fn from_config(config: &SumoAgentConfig) -> Result<Self> {
        let fetcher = Arc::new(
            OsmFetcher::new(config.osm.clone()).context("Failed to build the OSM HTTP client")?,
        );
        Ok(Self {
            download: Arc::new(DownloadOsmMap::new(fetcher, config.sumo.output_dir.clone())),
            convert: Arc::new(ConvertOsmToSumo::new(config.sumo.clone())),
            demand: Arc::new(GenerateSumoDemand::new(
                config.sumo.clone(),
                config.demand.clone(),
            )),
        })
    }
}

pub struct Orchestrator {
    root: LlmAgent,
    topology: Topology,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn LLMProvider>, steps: StepTools, settings: &AgentConfig) -> Self {
        let root = match settings.topology {
            Topology::Delegated => Self::delegated(provider, steps, settings),
            Topology::Single => Self::single(provider, steps, settings),
        };
        Self {
            root,
            topology: settings.topology,
        }
    }

    /// Wire up the OpenAI provider and the real step tools from configuration
    pub fn from_config(config: &SumoAgentConfig) -> Result<Self> {
        let provider = Arc::new(OpenAIProvider::new(config.provider_config())?);
        let steps = StepTools::from_config(config)?;
        Ok(Self::new(provider, steps, &config.agent))
    }

    fn worker(
        name: &str,
        provider: &Arc<dyn LLMProvider>,
        settings: &AgentConfig,
        prompt: &str,
        tool: Arc<dyn Tool>,
    ) -> Arc<dyn Agent> {
        Arc::new(
            LlmAgent::new(name, provider.clone(), &settings.worker_model, prompt)
                .with_tools(ToolRegistry::new().with(tool))
                .with_max_turns(settings.max_turns),
        )
    }

    fn delegated(provider: Arc<dyn LLMProvider>, steps: StepTools, settings: &AgentConfig) -> LlmAgent {
        let downloader = Self::worker("OSM Downloader", &provider, settings, DOWNLOADER_PROMPT, steps.download);
        let converter = Self::worker("SUMO Converter", &provider, settings, CONVERTER_PROMPT, steps.convert);
        let generator = Self::worker("Demand Generator", &provider, settings, DEMAND_PROMPT, steps.demand);

        let tools = ToolRegistry::new()
            .with(Arc::new(AgentTool::new(
                "download_osm",
                "Download the OSM map of a town or city",
                downloader,
            )))
            .with(Arc::new(AgentTool::new(
                "convert_to_sumo",
                "Convert an .osm file into a SUMO network (.net.xml)",
                converter,
            )))
            .with(Arc::new(AgentTool::new(
                "generate_demand",
                "Generate SUMO traffic demand for a .net.xml network with randomTrips.py",
                generator,
            )));

        LlmAgent::new("SUMO Orchestrator", provider, &settings.model, ORCHESTRATOR_PROMPT)
            .with_tools(tools)
            .with_max_turns(settings.max_turns)
    }

    fn single(provider: Arc<dyn LLMProvider>, steps: StepTools, settings: &AgentConfig) -> LlmAgent {
        let tools = ToolRegistry::new()
            .with(steps.download)
            .with(steps.convert)
            .with(steps.demand);

        LlmAgent::new("OSM to SUMO Agent", provider, &settings.model, SINGLE_PROMPT)
            .with_tools(tools)
            .with_max_turns(settings.max_turns)
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn root(&self) -> &LlmAgent {
        &self.root
    }

    pub async fn process_request(&self, request: &str) -> Result<AgentRun> {
        let request_id = format!("req-{}", uuid::Uuid::new_v4());
        let span = tracing::info_span!("request", id = %request_id);

        async {
            let started = Instant::now();
            tracing::info!("Processing request with {:?} topology", self.topology);
            let run = self.root.run(request).await?;
            tracing::info!(
                turns = run.turns,
                tool_calls = run.all_tool_calls().len(),
                tokens = run.usage.total_tokens,
                "Request finished in {:.1}s",
                started.elapsed().as_secs_f64()
            );
            Ok(run)
        }
        .instrument(span)
        .await
    }
}

#[async_trait::async_trait]
impl Agent for Orchestrator {
    fn name(&self) -> &str {
        self.root.name()
    }

    async fn run(&self, input: &str) -> Result<AgentRun> {
        self.process_request(input).await
    }
}
