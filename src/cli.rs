use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::sumo::DemandParams;

#[derive(Debug, Parser)]
#[command(
    name = "sumo-agent",
    about = "Download OpenStreetMap maps and build SUMO networks and traffic demand, driven by an LLM agent",
    version
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (default: ~/.config/sumo-agent/config.toml)
    #[arg(long, global = true, env = "SUMO_AGENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for downloaded and generated files
    #[arg(short, long = "output-dir", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Model for the top-level agent
    #[arg(long, global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactive prompt (default)
    Repl {
        /// Use one agent holding every tool instead of delegating to sub-agents
        #[arg(long)]
        single: bool,
    },
    /// Run a single natural-language instruction
    Run {
        /// The instruction, e.g. "Download and convert to SUMO the map of Pamplona and generate demand"
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
        /// Use one agent holding every tool instead of delegating to sub-agents
        #[arg(long)]
        single: bool,
        /// Print the full run (tool calls, token usage) as JSON
        #[arg(long)]
        json: bool,
    },
    /// Download, convert and generate demand for a place without the LLM
    Build {
        /// Place name, e.g. "Pamplona, Spain"
        place: String,
        #[command(flatten)]
        demand: DemandArgs,
    },
    /// Download the OSM map of a place
    Fetch {
        /// Place name
        place: String,
    },
    /// Convert an .osm file into a SUMO network
    Convert {
        /// The .osm file
        osm_file: PathBuf,
    },
    /// Generate random traffic demand for a SUMO network
    Demand {
        /// The .net.xml file
        net_file: PathBuf,
        #[command(flatten)]
        demand: DemandArgs,
    },
    /// Check credentials, provider reachability and the SUMO installation
    Doctor,
}

#[derive(Debug, Clone, Default, Args)]
pub struct DemandArgs {
    /// Seconds of demand to generate
    #[arg(short = 'e', long)]
    pub duration: Option<u32>,
    /// Seconds between departures
    #[arg(short = 'p', long)]
    pub period: Option<f64>,
    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,
}

impl DemandArgs {
    pub fn apply(&self, defaults: &DemandParams) -> DemandParams {
        DemandParams {
            duration: self.duration.unwrap_or(defaults.duration),
            period: self.period.unwrap_or(defaults.period),
            seed: self.seed.or(defaults.seed),
        }
    }
}

impl Cli {
    /// Log filter directive for the requested verbosity
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
