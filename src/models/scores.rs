use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryCounts {
    #[serde(default, alias = "segmentCount")]
    pub segment_count: Option<i64>,
    #[serde(default, alias = "defectCount")]
    pub defect_count: Option<i64>,
    #[serde(default, alias = "highPriorityCount")]
    pub high_priority_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesPoint {
    pub date: String,
    #[serde(default)]
    pub count: Option<f64>,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Body of `/scores`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    #[serde(default)]
    pub summary: SummaryCounts,
    #[serde(default)]
    pub timeseries: Vec<TimeseriesPoint>,
}
