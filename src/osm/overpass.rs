use std::fmt::Write;

/// Road types a car cannot use
const EXCLUDED_HIGHWAYS: &str = "abandoned|bridleway|bus_guideway|construction|corridor|cycleway|elevator|escalator|footway|no|path|pedestrian|planned|platform|proposed|raceway|razed|service|steps|track";

const EXCLUDED_SERVICES: &str = "alley|driveway|emergency_access|parking|parking_aisle|private";

/// Where to look for ways
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchArea {
    /// Overpass area id (relation id + 3600000000)
    Area(u64),
    BoundingBox {
        south: f64,
        west: f64,
        north: f64,
        east: f64,
    },
}

/// Tag filter selecting the drivable road network
pub fn drive_filter() -> String {
    format!(
        r#"["highway"]["area"!~"yes"]["access"!~"private"]["highway"!~"{EXCLUDED_HIGHWAYS}"]["motor_vehicle"!~"no"]["motorcar"!~"no"]["service"!~"{EXCLUDED_SERVICES}"]"#
    )
}

/// Overpass QL returning every drivable way in `area` plus all of its nodes, as OSM XML
pub fn overpass_query(area: &SearchArea, timeout_secs: u64) -> String {
    let filter = drive_filter();
    let mut query = format!("[out:xml][timeout:{timeout_secs}];\n");

    // write! into a String cannot fail
    match area {
        SearchArea::Area(id) => {
            let _ = write!(
                query,
                "area({id})->.searchArea;\n(way{filter}(area.searchArea);>;);\n"
            );
        }
        SearchArea::BoundingBox {
            south,
            west,
            north,
            east,
        } => {
            let _ = write!(query, "(way{filter}({south},{west},{north},{east});>;);\n");
        }
    }
    query.push_str("out body;\n");
    query
}
