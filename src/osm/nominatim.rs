use serde::Deserialize;

use super::overpass::SearchArea;

/// Offset Overpass adds to a relation id to name its area
pub const RELATION_AREA_OFFSET: u64 = 3_600_000_000;

/// One hit from the Nominatim `/search` endpoint (`format=jsonv2`)
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub osm_type: Option<String>,
    pub osm_id: Option<u64>,
    pub display_name: String,
    /// `[min_lat, max_lat, min_lon, max_lon]` as strings
    pub boundingbox: Vec<String>,
}

/// A place name resolved to something Overpass can search in
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub display_name: String,
    pub area: SearchArea,
}

impl SearchHit {
    pub fn into_place(self) -> Option<GeocodedPlace> {
        let area = match (self.osm_type.as_deref(), self.osm_id) {
            (Some("relation"), Some(id)) => SearchArea::Area(RELATION_AREA_OFFSET + id),
            _ => self.bounding_box()?,
        };
        Some(GeocodedPlace {
            display_name: self.display_name,
            area,
        })
    }

    fn bounding_box(&self) -> Option<SearchArea> {
        let [min_lat, max_lat, min_lon, max_lon] = self.boundingbox.as_slice() else {
            return None;
        };
        Some(SearchArea::BoundingBox {
            south: min_lat.parse().ok()?,
            north: max_lat.parse().ok()?,
            west: min_lon.parse().ok()?,
            east: max_lon.parse().ok()?,
        })
    }
}

/// Pick the first usable hit of a search response
pub fn first_place(hits: Vec<SearchHit>) -> Option<GeocodedPlace> {
    hits.into_iter().find_map(SearchHit::into_place)
}
