pub mod geo;
pub mod scores;
pub mod segment;

pub use geo::{Feature, FeatureCollection, FeatureId, FeatureProperties, Geometry, LngLat};
pub use scores::{ScoreSummary, SummaryCounts, TimeseriesPoint};
pub use segment::{Defect, ScoreHistoryPoint, Segment};
