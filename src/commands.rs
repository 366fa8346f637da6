use std::path::Path;

use anyhow::{Context, Result};
use crossterm::style::Stylize;

use crate::agents::{Orchestrator, Topology};
use crate::cli::DemandArgs;
use crate::config::{SumoAgentConfig, API_KEY_ENV};
use crate::osm::OsmFetcher;
use crate::pipeline::Pipeline;
use crate::sumo::{demand, network, SumoToolchain, OSM_BUILD, RANDOM_TRIPS};

fn with_topology(config: &SumoAgentConfig, single: bool) -> SumoAgentConfig {
    let mut config = config.clone();
    if single {
        config.agent.topology = Topology::Single;
    }
    config
}

pub async fn repl(config: &SumoAgentConfig, single: bool) -> Result<()> {
    let orchestrator = Orchestrator::from_config(&with_topology(config, single))?;
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    crate::repl::run(&orchestrator, stdin, &mut stdout).await
}

pub async fn run_prompt(config: &SumoAgentConfig, prompt: &str, single: bool, json: bool) -> Result<()> {
    let orchestrator = Orchestrator::from_config(&with_topology(config, single))?;
    let run = orchestrator.process_request(prompt).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        println!("{}", run.output);
    }
    Ok(())
}

pub async fn build(config: &SumoAgentConfig, place: &str, args: &DemandArgs) -> Result<()> {
    let pipeline = Pipeline::new(OsmFetcher::new(config.osm.clone())?, config.sumo.clone());
    tracing::info!("Writing files to {}", pipeline.output_dir().display());

    let report = pipeline.run(place, &args.apply(&config.demand)).await?;
    println!("{}", report.summary());
    Ok(())
}

pub async fn fetch(config: &SumoAgentConfig, place: &str) -> Result<()> {
    let fetcher = OsmFetcher::new(config.osm.clone())?;
    let extract = fetcher
        .fetch(place, &config.sumo.output_dir)
        .await
        .with_context(|| format!("Downloading the map of '{}' failed", place))?;
    println!("{}", extract.path.display());
    Ok(())
}

pub async fn convert(config: &SumoAgentConfig, osm_file: &Path) -> Result<()> {
    let toolchain = SumoToolchain::locate(&config.sumo).await?;
    let artifact = network::convert(&toolchain, osm_file).await?;
    println!("{}", artifact.net_file.display());
    Ok(())
}

pub async fn demand(config: &SumoAgentConfig, net_file: &Path, args: &DemandArgs) -> Result<()> {
    let toolchain = SumoToolchain::locate(&config.sumo).await?;
    let artifact = demand::generate(&toolchain, net_file, &args.apply(&config.demand)).await?;
    println!("{}", artifact.summary());
    Ok(())
}

fn check(ok: bool) -> String {
    if ok {
        "✔".green().to_string()
    } else {
        "✘".red().to_string()
    }
}

pub async fn doctor(config: &SumoAgentConfig, config_path: &Path) -> Result<()> {
    println!("{}", "sumo-agent doctor".bold());
    println!("  Config file: {}", config_path.display());
    println!("  Output directory: {}", config.sumo.output_dir.display());

    let provider = config.provider_config();
    println!("  {} {} set", check(provider.api_key.is_some()), API_KEY_ENV);

    let health = config.check_provider_health().await;
    print!("  {} LLM provider: {}", health.status.icon(), health.status.description());
    if let Some(elapsed) = health.response_time {
        print!(" ({} ms)", elapsed.as_millis());
    }
    println!();
    if !health.available_models.is_empty() {
        for model in [&config.agent.model, &config.agent.worker_model] {
            let listed = health.available_models.iter().any(|m| m == model);
            println!("    {} model {}", check(listed), model);
        }
    }

    match SumoToolchain::locate(&config.sumo).await {
        Ok(toolchain) => {
            println!("  {} Python: {}", check(true), toolchain.python().display());
            println!("  {} SUMO tools: {}", check(true), toolchain.tools_dir().display());
            for script in [OSM_BUILD, RANDOM_TRIPS] {
                println!("    {} {}", check(toolchain.script_path(script).is_ok()), script);
            }
        }
        Err(e) => println!("  {} SUMO toolchain: {}", check(false), e),
    }
    println!("  {} netconvert on PATH", check(which::which("netconvert").is_ok()));

    Ok(())
}
