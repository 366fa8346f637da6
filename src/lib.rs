pub mod agents;
pub mod cli;
pub mod commands;
pub mod config;
pub mod osm;
pub mod pipeline;
pub mod providers;
pub mod repl;
pub mod sumo;
pub mod tools;

#[cfg(test)]
pub(crate) mod http_stub;

use anyhow::Result;

use cli::{Cli, Commands};
use config::SumoAgentConfig;

pub async fn run(cli: Cli) -> Result<()> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => SumoAgentConfig::config_file_path()?,
    };
    let mut config = SumoAgentConfig::load(Some(&config_path))?;
    if let Some(dir) = cli.output_dir {
        config.sumo.output_dir = dir;
    }
    if let Some(model) = cli.model {
        config.agent.model = model;
    }

    match cli.command.unwrap_or(Commands::Repl { single: false }) {
        Commands::Repl { single } => commands::repl(&config, single).await,
        Commands::Run {
            prompt,
            single,
            json,
        } => commands::run_prompt(&config, &prompt.join(" "), single, json).await,
        Commands::Build { place, demand } => commands::build(&config, &place, &demand).await,
        Commands::Fetch { place } => commands::fetch(&config, &place).await,
        Commands::Convert { osm_file } => commands::convert(&config, &osm_file).await,
        Commands::Demand { net_file, demand } => {
            commands::demand(&config, &net_file, &demand).await
        }
        Commands::Doctor => commands::doctor(&config, &config_path).await,
    }
}
