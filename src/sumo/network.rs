use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{artifact_base, SumoError, SumoResult, SumoToolchain, OSM_BUILD};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkArtifact {
    pub osm_file: PathBuf,
    pub net_file: PathBuf,
}

pub fn osm_build_args(osm_file: &Path, out_dir: &Path, prefix: &str) -> Vec<OsString> {
    vec![
        "--osm-file".into(),
        osm_file.as_os_str().to_owned(),
        "--prefix".into(),
        prefix.into(),
        "--output-directory".into(),
        out_dir.as_os_str().to_owned(),
    ]
}

/// Convert an OSM extract into `<dir>/<stem>.net.xml` next to it
pub async fn convert(toolchain: &SumoToolchain, osm_file: &Path) -> SumoResult<NetworkArtifact> {
    if !osm_file.is_file() {
        return Err(SumoError::InputMissing(osm_file.to_path_buf()));
    }

    let (out_dir, prefix) = artifact_base(osm_file);
    let net_file = out_dir.join(format!("{prefix}.net.xml"));

    tracing::info!("Converting {} to a SUMO network", osm_file.display());
    let output = toolchain
        .run_script(OSM_BUILD, osm_build_args(osm_file, &out_dir, &prefix))
        .await?;
    if !output.stderr.trim().is_empty() {
        tracing::debug!(stderr = %output.stderr.trim(), "osmBuild warnings");
    }

    if !net_file.is_file() {
        return Err(SumoError::OutputMissing(net_file));
    }
    tracing::info!("SUMO network written: {}", net_file.display());

    Ok(NetworkArtifact {
        osm_file: osm_file.to_path_buf(),
        net_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_osm_build_args() {
        let args = osm_build_args(Path::new("out/pamplona.osm"), Path::new("out"), "pamplona");
        let args: Vec<String> = args.into_iter().map(|a| a.to_string_lossy().to_string()).collect();

        assert_eq!(
            args,
            vec!["--osm-file", "out/pamplona.osm", "--prefix", "pamplona", "--output-directory", "out"]
        );
    }

    #[tokio::test]
    async fn test_convert_requires_input() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = SumoToolchain::new("python3", dir.path());

        let err = convert(&toolchain, &dir.path().join("nowhere.osm")).await.unwrap_err();
        assert!(matches!(err, SumoError::InputMissing(_)));
    }

    #[cfg(unix)]
    mod with_scripts {
        use super::*;
        use crate::sumo::testing::shell_toolchain;

        const FAKE_OSM_BUILD: &str = r#"
while [ $# -gt 0 ]; do
  case "$1" in
    --prefix) prefix="$2"; shift ;;
    --output-directory) dir="$2"; shift ;;
  esac
  shift
done
echo '<net/>' > "$dir/$prefix.net.xml"
"#;

        #[tokio::test]
        async fn test_convert_produces_network() {
            let tools = tempfile::tempdir().unwrap();
            let data = tempfile::tempdir().unwrap();
            let toolchain = shell_toolchain(tools.path(), &[(OSM_BUILD, FAKE_OSM_BUILD)]);
            let osm = data.path().join("pamplona.osm");
            std::fs::write(&osm, "<osm/>").unwrap();

            let artifact = convert(&toolchain, &osm).await.unwrap();

            assert_eq!(artifact.net_file, data.path().join("pamplona.net.xml"));
            assert!(artifact.net_file.is_file());
        }

        #[tokio::test]
        async fn test_convert_detects_missing_output() {
            let tools = tempfile::tempdir().unwrap();
            let data = tempfile::tempdir().unwrap();
            let toolchain = shell_toolchain(tools.path(), &[(OSM_BUILD, "exit 0\n")]);
            let osm = data.path().join("pamplona.osm");
            std::fs::write(&osm, "<osm/>").unwrap();

            let err = convert(&toolchain, &osm).await.unwrap_err();
            assert!(matches!(err, SumoError::OutputMissing(p) if p.ends_with("pamplona.net.xml")));
        }
    }
}
