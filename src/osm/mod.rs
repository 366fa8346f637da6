//! OpenStreetMap extract download: Nominatim for the place, Overpass for the roads.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub mod nominatim;
pub mod overpass;

pub use nominatim::GeocodedPlace;
pub use overpass::SearchArea;

#[derive(Debug, thiserror::Error)]
pub enum OsmError {
    #[error("Place name is empty")]
    EmptyPlaceName,
    #[error("No OpenStreetMap place matches '{0}'")]
    PlaceNotFound(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} returned HTTP {status}")]
    HttpStatus { service: &'static str, status: u16 },
    #[error("Invalid OSM response: {0}")]
    InvalidResponse(String),
    #[error("The extract for '{0}' contains no drivable roads")]
    EmptyExtract(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type OsmResult<T> = Result<T, OsmError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsmConfig {
    pub nominatim_url: String,
    pub overpass_url: String,
    /// Server-side Overpass timeout; the HTTP timeout adds a margin on top
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for OsmConfig {
    fn default() -> Self {
        Self {
            nominatim_url: "https://nominatim.openstreetmap.org".to_string(),
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            timeout_secs: 180,
            user_agent: concat!("sumo-agent/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// File name stem for a place: lower-case, spaces to underscores, ASCII only
pub fn place_slug(place: &str) -> String {
    let lowered = place.trim().to_lowercase().replace([' ', '/', '\\'], "_");
    deunicode::deunicode(&lowered)
}

/// Summary of a downloaded extract
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OsmExtract {
    pub place: String,
    pub path: PathBuf,
    pub nodes: usize,
    pub ways: usize,
    pub bytes: usize,
}

fn element_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<(node|way)[\s>/]").expect("static regex"))
}

/// Check an Overpass body is OSM XML and count its nodes and ways
pub fn summarize(body: &str) -> OsmResult<(usize, usize)> {
    if !body.contains("<osm") {
        let head: String = body.chars().take(200).collect();
        return Err(OsmError::InvalidResponse(format!("not OSM XML: {}", head.trim())));
    }
    if let Some(start) = body.find("<remark>") {
        let remark = &body[start + "<remark>".len()..];
        let remark = remark.split("</remark>").next().unwrap_or_default().trim();
        if remark.contains("error") {
            return Err(OsmError::InvalidResponse(remark.to_string()));
        }
    }

    let (mut nodes, mut ways) = (0, 0);
    for caps in element_regex().captures_iter(body) {
        match &caps[1] {
            "node" => nodes += 1,
            _ => ways += 1,
        }
    }
    Ok((nodes, ways))
}

pub struct OsmFetcher {
    config: OsmConfig,
    client: reqwest::Client,
}

impl OsmFetcher {
    pub fn new(config: OsmConfig) -> OsmResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(config.timeout_secs + 60))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OsmConfig {
        &self.config
    }

    pub async fn geocode(&self, place: &str) -> OsmResult<GeocodedPlace> {
        let url = format!("{}/search", self.config.nominatim_url.trim_end_matches('/'));
        tracing::debug!(%place, %url, "geocoding");

        let response = self
            .client
            .get(&url)
            .query(&[("q", place), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(OsmError::HttpStatus {
                service: "Nominatim",
                status: response.status().as_u16(),
            });
        }

        let hits: Vec<nominatim::SearchHit> = response.json().await?;
        nominatim::first_place(hits).ok_or_else(|| OsmError::PlaceNotFound(place.to_string()))
    }

    /// Run the drivable-network query and return the raw OSM XML
    pub async fn download(&self, area: &SearchArea) -> OsmResult<String> {
        let query = overpass::overpass_query(area, self.config.timeout_secs);
        tracing::debug!(?area, "querying Overpass");

        let response = self
            .client
            .post(&self.config.overpass_url)
            .form(&[("data", query)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(OsmError::HttpStatus {
                service: "Overpass",
                status: response.status().as_u16(),
            });
        }
        Ok(response.text().await?)
    }

    /// Download the drivable road network of `place` into `<out_dir>/<slug>.osm`
    pub async fn fetch(&self, place: &str, out_dir: &Path) -> OsmResult<OsmExtract> {
        let place = place.trim();
        if place.is_empty() {
            return Err(OsmError::EmptyPlaceName);
        }

        tracing::info!("Downloading OSM map for '{}'", place);
        let geocoded = self.geocode(place).await?;
        tracing::info!("Resolved '{}' to {}", place, geocoded.display_name);

        let body = self.download(&geocoded.area).await?;
        let (nodes, ways) = summarize(&body)?;
        if ways == 0 {
            return Err(OsmError::EmptyExtract(place.to_string()));
        }

        tokio::fs::create_dir_all(out_dir).await?;
        let path = out_dir.join(format!("{}.osm", place_slug(place)));
        tokio::fs::write(&path, body.as_bytes()).await?;
        tracing::info!("OSM file written: {} ({} nodes, {} ways)", path.display(), nodes, ways);

        Ok(OsmExtract {
            place: place.to_string(),
            path,
            nodes,
            ways,
            bytes: body.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_slug() {
        assert_eq!(place_slug("Pamplona"), "pamplona");
        assert_eq!(place_slug("San Sebastián"), "san_sebastian");
        assert_eq!(place_slug("  A Coruña "), "a_coruna");
        assert_eq!(place_slug("Köln/Bonn"), "koln_bonn");
    }

    #[test]
    fn test_summarize_counts_elements() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="Overpass API">
  <node id="1" lat="42.8" lon="-1.6"/>
  <node id="2" lat="42.9" lon="-1.6">
    <tag k="highway" v="traffic_signals"/>
  </node>
  <way id="10">
    <nd ref="1"/>
    <nd ref="2"/>
    <tag k="highway" v="residential"/>
  </way>
</osm>"#;

        assert_eq!(summarize(body).unwrap(), (2, 1));
    }

    #[test]
    fn test_summarize_rejects_html() {
        let err = summarize("<html><body>Too Many Requests</body></html>").unwrap_err();
        assert!(matches!(err, OsmError::InvalidResponse(_)));
    }

    #[test]
    fn test_summarize_rejects_runtime_error_remark() {
        let body = r#"<osm version="0.6">
<remark> runtime error: Query timed out in "query" at line 3 after 181 seconds. </remark>
</osm>"#;
        let err = summarize(body).unwrap_err();
        assert!(matches!(err, OsmError::InvalidResponse(msg) if msg.contains("timed out")));
    }

    mod against_stub_server {
        use super::*;
        use crate::http_stub::{Reply, StubServer};

        const RELATION_HIT: &str = r#"[{
            "osm_type": "relation",
            "osm_id": 1683104,
            "display_name": "Donostia/San Sebastián, Gipuzkoa, España",
            "boundingbox": ["43.2", "43.34", "-2.09", "-1.87"]
        }]"#;

        const ONE_WAY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="Overpass API">
  <node id="1" lat="43.31" lon="-1.98"/>
  <node id="2" lat="43.32" lon="-1.97"/>
  <way id="10"><nd ref="1"/><nd ref="2"/><tag k="highway" v="primary"/></way>
</osm>"#;

        fn fetcher_for(server: &StubServer) -> OsmFetcher {
            OsmFetcher::new(OsmConfig {
                nominatim_url: server.url.clone(),
                overpass_url: format!("{}/api/interpreter", server.url),
                timeout_secs: 5,
                ..OsmConfig::default()
            })
            .unwrap()
        }

        #[tokio::test]
        async fn test_fetch_writes_slugged_file() {
            let server = StubServer::start(vec![Reply::json(RELATION_HIT), Reply::xml(ONE_WAY)]).await;
            let dir = tempfile::tempdir().unwrap();

            let extract = fetcher_for(&server)
                .fetch("San Sebastián", dir.path())
                .await
                .unwrap();

            assert_eq!(extract.path, dir.path().join("san_sebastian.osm"));
            assert_eq!((extract.nodes, extract.ways), (2, 1));
            assert_eq!(std::fs::read_to_string(&extract.path).unwrap(), ONE_WAY);

            let requests = server.requests();
            assert!(requests[0].starts_with("GET /search?"));
            assert!(requests[0].contains("format=jsonv2"));
            assert!(requests[1].starts_with("POST /api/interpreter"));
            assert!(requests[1].contains("data="));
        }

        #[tokio::test]
        async fn test_fetch_rejects_empty_extract() {
            let server = StubServer::start(vec![
                Reply::json(RELATION_HIT),
                Reply::xml(r#"<osm version="0.6"></osm>"#),
            ])
            .await;
            let dir = tempfile::tempdir().unwrap();

            let err = fetcher_for(&server).fetch("Pamplona", dir.path()).await.unwrap_err();

            assert!(matches!(err, OsmError::EmptyExtract(ref place) if place == "Pamplona"));
            assert!(!dir.path().join("pamplona.osm").exists());
        }

        #[tokio::test]
        async fn test_overpass_error_status() {
            let server = StubServer::start(vec![
                Reply::json(RELATION_HIT),
                Reply::status(504, "Gateway Timeout"),
            ])
            .await;
            let dir = tempfile::tempdir().unwrap();

            let err = fetcher_for(&server).fetch("Pamplona", dir.path()).await.unwrap_err();

            assert!(matches!(err, OsmError::HttpStatus { service: "Overpass", status: 504 }));
        }

        #[tokio::test]
        async fn test_nominatim_error_status() {
            let server = StubServer::start(vec![Reply::status(503, "Service Unavailable")]).await;
            let dir = tempfile::tempdir().unwrap();

            let err = fetcher_for(&server).fetch("Pamplona", dir.path()).await.unwrap_err();

            assert!(matches!(err, OsmError::HttpStatus { service: "Nominatim", status: 503 }));
            assert_eq!(server.requests().len(), 1);
        }

        #[tokio::test]
        async fn test_unknown_place() {
            let server = StubServer::start(vec![Reply::json("[]")]).await;
            let dir = tempfile::tempdir().unwrap();

            let err = fetcher_for(&server).fetch("Atlantis", dir.path()).await.unwrap_err();

            assert!(matches!(err, OsmError::PlaceNotFound(ref place) if place == "Atlantis"));
        }
    }

    #[tokio::test]
    async fn test_fetch_rejects_blank_place() {
        let fetcher = OsmFetcher::new(OsmConfig::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let err = fetcher.fetch("   ", dir.path()).await.unwrap_err();
        assert!(matches!(err, OsmError::EmptyPlaceName));
    }
}
