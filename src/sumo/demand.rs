use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{artifact_base, SumoError, SumoResult, SumoToolchain, RANDOM_TRIPS};

/// Vehicles enter on the best lane at maximum speed
pub const TRIP_ATTRIBUTES: &str = r#"departLane="best" departSpeed="max""#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandParams {
    /// End time of trip generation, in seconds
    pub duration: u32,
    /// Seconds between generated trips
    pub period: f64,
    /// Random seed; randomTrips picks its own when unset
    pub seed: Option<u64>,
}

impl Default for DemandParams {
    fn default() -> Self {
        Self {
            duration: 1800,
            period: 1.0,
            seed: None,
        }
    }
}

impl DemandParams {
    pub fn validate(&self) -> SumoResult<()> {
        if self.duration == 0 {
            return Err(SumoError::InvalidParameter("duration must be positive".to_string()));
        }
        if !self.period.is_finite() || self.period <= 0.0 {
            return Err(SumoError::InvalidParameter(format!(
                "period must be a positive number, got {}",
                self.period
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandArtifact {
    pub net_file: PathBuf,
    pub trips_file: PathBuf,
    pub routes_file: PathBuf,
    pub duration: u32,
    pub period: f64,
    pub seed: Option<u64>,
}

impl DemandArtifact {
    pub fn summary(&self) -> String {
        let mut text = format!(
            "SUMO demand generated:\n- Network: {}\n- Trips: {}\n- Routes: {}\n- Duration: {}s\n- Period: {}s",
            self.net_file.display(),
            self.trips_file.display(),
            self.routes_file.display(),
            self.duration,
            self.period
        );
        if let Some(seed) = self.seed {
            text.push_str(&format!("\n- Seed: {seed}"));
        }
        text
    }
}

pub fn random_trips_args(
    net_file: &Path,
    trips_file: &Path,
    routes_file: &Path,
    params: &DemandParams,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-n".into(),
        net_file.as_os_str().to_owned(),
        "-e".into(),
        params.duration.to_string().into(),
        "-p".into(),
        params.period.to_string().into(),
        "--trip-attributes".into(),
        TRIP_ATTRIBUTES.into(),
        "-o".into(),
        trips_file.as_os_str().to_owned(),
        "--route-file".into(),
        routes_file.as_os_str().to_owned(),
    ];
    if let Some(seed) = params.seed {
        args.push("--seed".into());
        args.push(seed.to_string().into());
    }
    args
}

/// Generate random trips and routes for `net_file` with randomTrips.py
pub async fn generate(
    toolchain: &SumoToolchain,
    net_file: &Path,
    params: &DemandParams,
) -> SumoResult<DemandArtifact> {
    params.validate()?;
    if !net_file.is_file() {
        return Err(SumoError::InputMissing(net_file.to_path_buf()));
    }

    let (dir, base) = artifact_base(net_file);
    let trips_file = dir.join(format!("{base}.trips.xml"));
    let routes_file = dir.join(format!("{base}.rou.xml"));

    tracing::info!(
        "Generating demand for {} ({}s, one trip every {}s)",
        net_file.display(),
        params.duration,
        params.period
    );
    toolchain
        .run_script(
            RANDOM_TRIPS,
            random_trips_args(net_file, &trips_file, &routes_file, params),
        )
        .await?;

    if !routes_file.is_file() {
        return Err(SumoError::OutputMissing(routes_file));
    }
    tracing::info!("Demand written: {}", routes_file.display());

    Ok(DemandArtifact {
        net_file: net_file.to_path_buf(),
        trips_file,
        routes_file,
        duration: params.duration,
        period: params.period,
        seed: params.seed,
    })
}
