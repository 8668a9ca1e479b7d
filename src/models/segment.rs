use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::geo::{Feature, FeatureId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: FeatureId,
    pub geojson: Feature,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defect {
    pub id: FeatureId,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Whole number; `85.0` and `"85"` arrive from some backends.
    #[serde(default, deserialize_with = "lenient_priority")]
    pub priority: i64,
}

fn lenient_priority<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let priority = match &value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        Value::Null => Some(0),
        _ => None,
    };
    priority.ok_or_else(|| serde::de::Error::custom(format!("invalid priority {value}")))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreHistoryPoint {
    pub date: String,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Stable sort by date. Dates are ISO-8601 strings so lexical order is
/// chronological.
pub fn sort_history(history: &mut [ScoreHistoryPoint]) {
    history.sort_by(|a, b| a.date.cmp(&b.date));
}
