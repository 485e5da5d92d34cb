/// A single distance search, adding edges of type `edge_type` between all
/// vertices at `distance` of each other.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DistanceSearch {
    /// Type given to the new edges
    #[serde(rename = "type")]
    pub edge_type: usize,
    /// Cartesian distance between vertices to search for
    pub distance: f64,
    /// Accepted relative error on the distance, in percent
    #[serde(default = "serde_default_tolerance")]
    pub tolerance: f64,
    /// Should this search run?
    #[serde(default = "serde_default_enabled")]
    pub enabled: bool,
}

fn serde_default_tolerance() -> f64 { 1.0 }
fn serde_default_enabled() -> bool { true }

/// Parameters for searching edges by distance: all existing edges are
/// removed, and each enabled search is run in turn.
#[derive(Debug, Clone, Default, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DistanceSearchParameters {
    /// List of searches to run
    pub searches: Vec<DistanceSearch>,
}

impl DistanceSearchParameters {
    /// Get the JSON representation of these parameters
    pub fn parameters(&self) -> String {
        serde_json::to_string(self).expect("failed to serialize to JSON")
    }
}

impl std::str::FromStr for DistanceSearchParameters {
    type Err = crate::Error;

    fn from_str(json: &str) -> Result<DistanceSearchParameters, crate::Error> {
        Ok(serde_json::from_str(json)?)
    }
}
