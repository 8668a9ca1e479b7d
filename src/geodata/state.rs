use std::sync::Arc;

use serde::Serialize;

use crate::filters::FilterCriteria;
use crate::models::{FeatureCollection, ScoreSummary};

/// What the map and statistics pages read.
#[derive(Debug, Clone, Default)]
pub struct GeoDataState {
    pub geojson: Option<Arc<FeatureCollection>>,
    pub scores: Option<Arc<ScoreSummary>>,
    pub loading: bool,
    pub error: Option<String>,
    /// Generation of the fetch that produced the current data.
    pub applied_generation: u64,
}

impl GeoDataState {
    pub fn payload(&self) -> GeoDataPayload<'_> {
        GeoDataPayload {
            geojson: self.geojson.as_deref(),
            scores: self.scores.as_deref(),
            loading: self.loading,
            error: self.error.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GeoDataPayload<'a> {
    pub geojson: Option<&'a FeatureCollection>,
    pub scores: Option<&'a ScoreSummary>,
    pub loading: bool,
    pub error: Option<&'a str>,
}

/// Everything a fetch depends on. Compared by value: setting the same inputs
/// twice does not refetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct GeoInputs {
    pub filters: FilterCriteria,
    pub token: Option<String>,
}
