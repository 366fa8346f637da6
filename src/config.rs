use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::agents::llm_agent::DEFAULT_MAX_TURNS;
use crate::agents::Topology;
use crate::osm::OsmConfig;
use crate::providers::{ProviderConfig, DEFAULT_BASE_URL};
use crate::sumo::{DemandParams, SumoConfig};

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SumoAgentConfig {
    pub provider: ProviderConfig,
    pub agent: AgentConfig,
    pub osm: OsmConfig,
    pub sumo: SumoConfig,
    pub demand: DemandParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model of the top-level agent
    pub model: String,
    /// Model of the per-step sub-agents
    pub worker_model: String,
    pub max_turns: usize,
    pub topology: Topology,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1".to_string(),
            worker_model: "gpt-4.1-mini".to_string(),
            max_turns: DEFAULT_MAX_TURNS,
            topology: Topology::Delegated,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderStatus {
    Online,
    Offline(String),
    ConfigError(String),
}

impl ProviderStatus {
    pub fn icon(&self) -> &'static str {
        match self {
            ProviderStatus::Online => "🟢",
            ProviderStatus::Offline(_) => "🔴",
            ProviderStatus::ConfigError(_) => "🟡",
        }
    }

    pub fn description(&self) -> String {
        match self {
            ProviderStatus::Online => "Available".to_string(),
            ProviderStatus::Offline(msg) => format!("Not available: {}", msg),
            ProviderStatus::ConfigError(msg) => format!("Configuration issue: {}", msg),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderHealth {
    pub status: ProviderStatus,
    pub response_time: Option<Duration>,
    pub available_models: Vec<String>,
}

/// Environment wins over the config file; blank values count as unset
fn resolve_setting(env: Option<String>, file: Option<&String>) -> Option<String> {
    env.filter(|v| !v.trim().is_empty())
        .or_else(|| file.filter(|v| !v.trim().is_empty()).cloned())
}

impl SumoAgentConfig {
    /// Load the config file, writing the defaults there first if it does not exist
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_file_path()?,
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            let config: Self = toml::from_str(&content)
                .with_context(|| format!("Invalid config file {}", config_path.display()))?;
            Ok(config)
        } else {
            let default_config = Self::default();
            default_config.save_to(&config_path)?;
            tracing::info!("Wrote default configuration to {}", config_path.display());
            Ok(default_config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".config").join("sumo-agent").join("config.toml"))
    }

    /// Provider settings with the credential and base URL taken from the environment when set
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            api_key: resolve_setting(std::env::var(API_KEY_ENV).ok(), self.provider.api_key.as_ref()),
            base_url: resolve_setting(std::env::var(BASE_URL_ENV).ok(), self.provider.base_url.as_ref()),
            timeout_secs: self.provider.timeout_secs,
        }
    }

    pub async fn check_provider_health(&self) -> ProviderHealth {
        let start_time = std::time::Instant::now();
        let provider = self.provider_config();

        let Some(api_key) = provider.api_key else {
            return ProviderHealth {
                status: ProviderStatus::ConfigError(format!("{} is not set", API_KEY_ENV)),
                response_time: None,
                available_models: vec![],
            };
        };
        let base_url = provider.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);

        match list_models(base_url, &api_key).await {
            Ok(models) => ProviderHealth {
                status: ProviderStatus::Online,
                response_time: Some(start_time.elapsed()),
                available_models: models,
            },
            Err(e) => ProviderHealth {
                status: ProviderStatus::Offline(e.to_string()),
                response_time: Some(start_time.elapsed()),
                available_models: vec![],
            },
        }
    }
}

async fn list_models(base_url: &str, api_key: &str) -> Result<Vec<String>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let url = format!("{}/models", base_url.trim_end_matches('/'));
    let response = client.get(&url).bearer_auth(api_key).send().await?;

    if response.status().is_success() {
        let models_response: serde_json::Value = response.json().await?;
        let models = models_response["data"]
            .as_array()
            .map(|data| {
                data.iter()
                    .filter_map(|model| model["id"].as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(models)
    } else {
        Err(anyhow::anyhow!("HTTP {}", response.status()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SumoAgentConfig::default();

        assert_eq!(config.agent.model, "gpt-4.1");
        assert_eq!(config.agent.worker_model, "gpt-4.1-mini");
        assert_eq!(config.agent.topology, Topology::Delegated);
        assert_eq!(config.demand.duration, 1800);
        assert_eq!(config.demand.period, 1.0);
        assert_eq!(config.sumo.output_dir, PathBuf::from("."));
        assert_eq!(config.provider.base_url.as_deref(), Some(DEFAULT_BASE_URL));
    }

    #[test]
    fn test_load_writes_defaults_then_reads_them_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let first = SumoAgentConfig::load(Some(&path)).unwrap();
        assert!(path.exists());

        let second = SumoAgentConfig::load(Some(&path)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[agent]
topology = "single"

[demand]
duration = 3600
seed = 42

[sumo]
tools_dir = "/opt/sumo/tools"
"#,
        )
        .unwrap();

        let config = SumoAgentConfig::load(Some(&path)).unwrap();

        assert_eq!(config.agent.topology, Topology::Single);
        assert_eq!(config.agent.model, "gpt-4.1");
        assert_eq!(config.demand.duration, 3600);
        assert_eq!(config.demand.period, 1.0);
        assert_eq!(config.demand.seed, Some(42));
        assert_eq!(config.sumo.tools_dir, Some(PathBuf::from("/opt/sumo/tools")));
        assert_eq!(config.osm, OsmConfig::default());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[demand]\nduration = \"long\"\n").unwrap();

        assert!(SumoAgentConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_env_overrides_file_setting() {
        let file = Some("sk-file".to_string());

        assert_eq!(
            resolve_setting(Some("sk-env".to_string()), file.as_ref()),
            Some("sk-env".to_string())
        );
        assert_eq!(resolve_setting(None, file.as_ref()), Some("sk-file".to_string()));
        assert_eq!(
            resolve_setting(Some("  ".to_string()), file.as_ref()),
            Some("sk-file".to_string())
        );
        assert_eq!(resolve_setting(None, Some(&String::new())), None);
    }

    #[test]
    fn test_status_descriptions() {
        assert_eq!(ProviderStatus::Online.icon(), "🟢");
        assert!(ProviderStatus::ConfigError("no key".into())
            .description()
            .contains("no key"));
    }
}
