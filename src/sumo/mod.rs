//! Locating and running the SUMO python tools (`osmBuild.py`, `randomTrips.py`).

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use serde::{Deserialize, Serialize};
use tokio::process::Command;

pub mod demand;
pub mod network;

pub use demand::{DemandArtifact, DemandParams};
pub use network::NetworkArtifact;

pub const OSM_BUILD: &str = "osmBuild.py";
pub const RANDOM_TRIPS: &str = "randomTrips.py";

#[derive(Debug, thiserror::Error)]
pub enum SumoError {
    #[error("Python interpreter not found: {0}")]
    InterpreterNotFound(String),
    #[error("SUMO tools directory not found (set SUMO_HOME or sumo.tools_dir)")]
    ToolsNotFound,
    #[error("SUMO script not found: {0}")]
    ScriptNotFound(PathBuf),
    #[error("Input file does not exist: {0}")]
    InputMissing(PathBuf),
    #[error("Expected output was not produced: {0}")]
    OutputMissing(PathBuf),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("{script} failed with exit code {code:?}: {stderr}")]
    ScriptFailed {
        script: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SumoResult<T> = Result<T, SumoError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SumoConfig {
    /// Interpreter used to run the SUMO tools; `python3` then `python` when unset
    pub python: Option<String>,
    /// Directory holding `osmBuild.py` and `randomTrips.py`
    pub tools_dir: Option<PathBuf>,
    /// Where downloaded and generated files are written
    pub output_dir: PathBuf,
}

impl Default for SumoConfig {
    fn default() -> Self {
        Self {
            python: None,
            tools_dir: None,
            output_dir: PathBuf::from("."),
        }
    }
}

/// Output from a SUMO script
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone)]
pub struct SumoToolchain {
    python: PathBuf,
    tools_dir: PathBuf,
}

impl SumoToolchain {
    pub fn new(python: impl Into<PathBuf>, tools_dir: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            tools_dir: tools_dir.into(),
        }
    }

    /// Find the interpreter and the tools directory.
    ///
    /// The tools directory is searched in this order: `sumo.tools_dir`,
    /// `$SUMO_HOME/tools`, then `sumo/tools` inside the interpreter's
    /// site-packages (the `eclipse-sumo` pip package).
    pub async fn locate(config: &SumoConfig) -> SumoResult<Self> {
        let python = find_python(config.python.as_deref())?;

        if let Some(dir) = &config.tools_dir {
            return Ok(Self::new(python, dir));
        }

        if let Some(home) = std::env::var_os("SUMO_HOME") {
            let dir = PathBuf::from(home).join("tools");
            if dir.is_dir() {
                return Ok(Self::new(python, dir));
            }
            tracing::warn!("SUMO_HOME is set but {} does not exist", dir.display());
        }

        match site_packages_tools(&python).await {
            Some(dir) => Ok(Self::new(python, dir)),
            None => Err(SumoError::ToolsNotFound),
        }
    }

    pub fn python(&self) -> &Path {
        &self.python
    }

    pub fn tools_dir(&self) -> &Path {
        &self.tools_dir
    }

    pub fn script_path(&self, script: &str) -> SumoResult<PathBuf> {
        let path = self.tools_dir.join(script);
        if path.is_file() {
            Ok(path)
        } else {
            Err(SumoError::ScriptNotFound(path))
        }
    }

    /// `SUMO_HOME` as seen by the scripts: the installation owning the resolved tools directory
    fn sumo_home(&self) -> Option<&Path> {
        self.tools_dir.parent().filter(|p| !p.as_os_str().is_empty())
    }

    /// Run `python <tools_dir>/<script> args...` and fail on a non-zero exit
    pub async fn run_script<I, A>(&self, script: &str, args: I) -> SumoResult<CommandOutput>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        let script_path = self.script_path(script)?;

        let mut cmd = Command::new(&self.python);
        cmd.arg(&script_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(home) = self.sumo_home() {
            cmd.env("SUMO_HOME", home);
        }

        tracing::debug!(?cmd, "running SUMO script");
        let output = cmd.output().await?;

        let result = CommandOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !result.status.success() {
            return Err(SumoError::ScriptFailed {
                script: script.to_string(),
                code: result.status.code(),
                stderr: tail(&result.stderr, 20),
            });
        }
        Ok(result)
    }
}

fn find_python(configured: Option<&str>) -> SumoResult<PathBuf> {
    if let Some(python) = configured {
        return which::which(python).map_err(|_| SumoError::InterpreterNotFound(python.to_string()));
    }
    ["python3", "python"]
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or_else(|| SumoError::InterpreterNotFound("python3 or python".to_string()))
}

async fn site_packages_tools(python: &Path) -> Option<PathBuf> {
    let output = Command::new(python)
        .args(["-c", "import sysconfig; print(sysconfig.get_paths()['purelib'])"])
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let purelib = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let dir = Path::new(&purelib).join("sumo").join("tools");
    dir.is_dir().then_some(dir)
}

/// Last `lines` lines of a script's stderr
fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.trim_end().lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

/// Directory and extension-less stem of an artifact
/// (`out/pamplona.net.xml` -> (`out`, `pamplona`))
pub fn artifact_base(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    for suffix in [".net.xml", ".osm.xml", ".osm", ".xml"] {
        if let Some(stem) = name.strip_suffix(suffix) {
            if !stem.is_empty() {
                return (dir, stem.to_string());
            }
        }
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or(name);
    (dir, stem)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// A toolchain whose "python" is `sh`, running stand-in scripts from `dir`
    pub fn shell_toolchain(dir: &Path, scripts: &[(&str, &str)]) -> SumoToolchain {
        for (name, body) in scripts {
            std::fs::write(dir.join(name), body).unwrap();
        }
        let sh = which::which("sh").unwrap();
        SumoToolchain::new(sh, dir)
    }
}
