use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{parse_args, Tool, ToolError};
use crate::osm::OsmFetcher;

#[derive(Debug, Deserialize)]
struct Args {
    place_name: String,
}

/// Downloads the unsimplified drivable road network of a place as `.osm`
pub struct DownloadOsmMap {
    fetcher: Arc<OsmFetcher>,
    out_dir: PathBuf,
}

impl DownloadOsmMap {
    pub fn new(fetcher: Arc<OsmFetcher>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            out_dir: out_dir.into(),
        }
    }
}

#[async_trait]
impl Tool for DownloadOsmMap {
    fn name(&self) -> &str {
        "download_osm_map"
    }

    fn description(&self) -> &str {
        "Download the OpenStreetMap road network (drivable roads, not simplified) of a town or city \
         and save it as an .osm file. Returns ONLY the path of the generated file."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "place_name": {
                    "type": "string",
                    "description": "Name of the place, e.g. \"Pamplona, Spain\""
                }
            },
            "required": ["place_name"]
        })
    }

    async fn call(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let args: Args = parse_args(self.name(), arguments)?;
        let extract = self.fetcher.fetch(&args.place_name, &self.out_dir).await?;
        Ok(extract.path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::OsmConfig;

    #[tokio::test]
    async fn test_requires_place_name() {
        let fetcher = Arc::new(OsmFetcher::new(OsmConfig::default()).unwrap());
        let tool = DownloadOsmMap::new(fetcher, ".");

        let err = tool.call(serde_json::json!({ "place": "Pamplona" })).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[test]
    fn test_schema_requires_place_name() {
        let fetcher = Arc::new(OsmFetcher::new(OsmConfig::default()).unwrap());
        let tool = DownloadOsmMap::new(fetcher, ".");

        assert_eq!(tool.parameters()["required"][0], "place_name");
        assert_eq!(tool.definition().name, "download_osm_map");
    }
}
