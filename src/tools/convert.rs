use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;

use super::{parse_args, Tool, ToolError};
use crate::sumo::{network, SumoConfig, SumoToolchain};

#[derive(Debug, Deserialize)]
struct Args {
    osm_file: PathBuf,
}

/// Runs osmBuild.py on an `.osm` file
pub struct ConvertOsmToSumo {
    sumo: SumoConfig,
}

impl ConvertOsmToSumo {
    pub fn new(sumo: SumoConfig) -> Self {
        Self { sumo }
    }
}

#[async_trait]
impl Tool for ConvertOsmToSumo {
    fn name(&self) -> &str {
        "convert_osm_to_sumo"
    }

    fn description(&self) -> &str {
        "Convert an .osm file into a SUMO road network (.net.xml) using osmBuild.py. \
         Returns ONLY the path of the generated .net.xml file."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "osm_file": {
                    "type": "string",
                    "description": "Path of the .osm file to convert"
                }
            },
            "required": ["osm_file"]
        })
    }

    async fn call(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let args: Args = parse_args(self.name(), arguments)?;
        let toolchain = SumoToolchain::locate(&self.sumo).await?;
        let artifact = network::convert(&toolchain, &args.osm_file).await?;
        Ok(artifact.net_file.display().to_string())
    }
}
