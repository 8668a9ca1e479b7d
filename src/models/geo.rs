use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Feature and segment identifiers arrive as numbers or strings depending on
/// the backend table they come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    Number(i64),
    Text(String),
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureId::Number(n) => write!(f, "{n}"),
            FeatureId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lon: f64,
    pub lat: f64,
}

impl LngLat {
    fn from_position(value: &Value) -> Option<Self> {
        let position = value.as_array()?;
        let lon = position.first()?.as_f64()?;
        let lat = position.get(1)?.as_f64()?;
        if !lon.is_finite() || !lat.is_finite() {
            return None;
        }
        Some(Self { lon, lat })
    }
}

/// Geometry kept as received; only the kinds the map draws get typed accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Geometry {
    pub fn is_point(&self) -> bool {
        self.kind == "Point"
    }

    pub fn point(&self) -> Option<LngLat> {
        if !self.is_point() {
            return None;
        }
        LngLat::from_position(&self.coordinates)
    }

    pub fn line(&self) -> Option<Vec<LngLat>> {
        if self.kind != "LineString" {
            return None;
        }
        self.coordinates
            .as_array()?
            .iter()
            .map(LngLat::from_position)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    #[serde(default)]
    pub id: Option<FeatureId>,
    #[serde(default)]
    pub score: Option<Value>,
    #[serde(default, alias = "defectCount")]
    pub defect_count: Option<Value>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeatureProperties {
    /// Defect count as shown in popups; anything that is not a count reads as 0.
    pub fn defect_count(&self) -> i64 {
        match &self.defect_count {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_kind")]
    pub kind: String,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: FeatureProperties,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Feature {
    pub fn geometry_kind(&self) -> Option<&str> {
        self.geometry.as_ref().map(|g| g.kind.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "collection_kind")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: Vec<Feature>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn feature_kind() -> String {
    "Feature".to_string()
}

fn collection_kind() -> String {
    "FeatureCollection".to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
