//! The download → convert → demand flow without an LLM in the loop.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::osm::{OsmExtract, OsmFetcher};
use crate::sumo::{demand, network, DemandArtifact, DemandParams, NetworkArtifact, SumoConfig, SumoToolchain};

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub extract: OsmExtract,
    pub network: NetworkArtifact,
    pub demand: DemandArtifact,
}

impl PipelineReport {
    pub fn summary(&self) -> String {
        let elapsed = self.finished_at - self.started_at;
        format!(
            "Map of {}: {} ({} nodes, {} ways)\nSUMO network: {}\n{}\nFinished in {}s",
            self.extract.place,
            self.extract.path.display(),
            self.extract.nodes,
            self.extract.ways,
            self.network.net_file.display(),
            self.demand.summary(),
            elapsed.num_seconds()
        )
    }
}

pub struct Pipeline {
    fetcher: OsmFetcher,
    sumo: SumoConfig,
}

impl Pipeline {
    pub fn new(fetcher: OsmFetcher, sumo: SumoConfig) -> Self {
        Self { fetcher, sumo }
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.sumo.output_dir
    }

    /// Run every step in order, stopping at the first failure
    pub async fn run(&self, place: &str, params: &DemandParams) -> Result<PipelineReport> {
        // Fail on bad parameters and a missing toolchain before downloading anything
        params.validate()?;
        let toolchain = SumoToolchain::locate(&self.sumo).await?;

        let started_at = Utc::now();
        let extract = self
            .fetcher
            .fetch(place, &self.sumo.output_dir)
            .await
            .with_context(|| format!("Downloading the map of '{}' failed", place))?;

        let network = network::convert(&toolchain, &extract.path)
            .await
            .context("Converting the map to a SUMO network failed")?;

        let demand = demand::generate(&toolchain, &network.net_file, params)
            .await
            .context("Generating traffic demand failed")?;

        Ok(PipelineReport {
            started_at,
            finished_at: Utc::now(),
            extract,
            network,
            demand,
        })
    }
}
