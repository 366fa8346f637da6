use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;

use super::{parse_args, Tool, ToolError};
use crate::sumo::{demand, DemandParams, SumoConfig, SumoToolchain};

#[derive(Debug, Deserialize)]
struct Args {
    net_file: PathBuf,
    duration: Option<u32>,
    period: Option<f64>,
    seed: Option<u64>,
}

/// Runs randomTrips.py on a `.net.xml` network
pub struct GenerateSumoDemand {
    sumo: SumoConfig,
    defaults: DemandParams,
}

impl GenerateSumoDemand {
    pub fn new(sumo: SumoConfig, defaults: DemandParams) -> Self {
        Self { sumo, defaults }
    }

    fn params(&self, args: &Args) -> DemandParams {
        DemandParams {
            duration: args.duration.unwrap_or(self.defaults.duration),
            period: args.period.unwrap_or(self.defaults.period),
            seed: args.seed.or(self.defaults.seed),
        }
    }
}

#[async_trait]
impl Tool for GenerateSumoDemand {
    fn name(&self) -> &str {
        "generate_sumo_demand"
    }

    fn description(&self) -> &str {
        "Generate random SUMO traffic demand (.rou.xml) for an existing .net.xml network \
         using randomTrips.py. Returns a summary of the generated files."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "net_file": {
                    "type": "string",
                    "description": "Path of the SUMO .net.xml network"
                },
                "duration": {
                    "type": "integer",
                    "minimum": 1,
                    "description": format!("Simulated seconds of demand (default {})", self.defaults.duration)
                },
                "period": {
                    "type": "number",
                    "exclusiveMinimum": 0,
                    "description": format!("Seconds between departures (default {})", self.defaults.period)
                },
                "seed": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Random seed for reproducible demand"
                }
            },
            "required": ["net_file"]
        })
    }

    async fn call(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let args: Args = parse_args(self.name(), arguments)?;
        let params = self.params(&args);
        params.validate()?;

        let toolchain = SumoToolchain::locate(&self.sumo).await?;
        let artifact = demand::generate(&toolchain, &args.net_file, &params).await?;
        Ok(artifact.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> GenerateSumoDemand {
        GenerateSumoDemand::new(
            SumoConfig::default(),
            DemandParams {
                duration: 900,
                period: 2.0,
                seed: Some(1),
            },
        )
    }

    #[test]
    fn test_defaults_fill_missing_arguments() {
        let args: Args = serde_json::from_value(serde_json::json!({ "net_file": "a.net.xml" })).unwrap();
        assert_eq!(
            tool().params(&args),
            DemandParams {
                duration: 900,
                period: 2.0,
                seed: Some(1)
            }
        );
    }

    #[test]
    fn test_arguments_override_defaults() {
        let args: Args = serde_json::from_value(serde_json::json!({
            "net_file": "a.net.xml",
            "duration": 3600,
            "period": 0.5,
            "seed": 9
        }))
        .unwrap();
        assert_eq!(
            tool().params(&args),
            DemandParams {
                duration: 3600,
                period: 0.5,
                seed: Some(9)
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_period_rejected_before_locating_sumo() {
        let err = tool()
            .call(serde_json::json!({ "net_file": "a.net.xml", "period": -1.0 }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("period"));
    }
}
