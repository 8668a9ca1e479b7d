use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;

use crate::models::{Feature, FeatureCollection, FeatureId};

use super::cluster::{cluster_positions, Cluster, CLUSTER_RADIUS_PX};
use super::symbology::{resolve_style_for, Style};

const PLACEHOLDER: &str = "—";

/// A non-point feature drawn by the GeoJSON layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineEntry {
    /// Index of the feature in the source collection.
    pub index: usize,
    pub id: Option<FeatureId>,
    pub style: Style,
    pub popup: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub index: usize,
    pub id: Option<FeatureId>,
    /// `[lat, lon]`, the order Leaflet expects.
    pub position: [f64; 2],
    pub popup: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapLayers {
    pub lines: Vec<LineEntry>,
    pub markers: Vec<Marker>,
    pub clusters: Vec<Cluster>,
}

/// Point extraction memoized on the identity of the collection `Arc`.
#[derive(Default)]
pub struct PointLayerCache {
    source: Option<Arc<FeatureCollection>>,
    markers: Arc<Vec<Marker>>,
    computations: u64,
}

impl PointLayerCache {
    pub fn markers(&mut self, collection: &Arc<FeatureCollection>) -> Arc<Vec<Marker>> {
        if let Some(source) = &self.source {
            if Arc::ptr_eq(source, collection) {
                return Arc::clone(&self.markers);
            }
        }

        self.markers = Arc::new(extract_markers(collection));
        self.source = Some(Arc::clone(collection));
        self.computations += 1;
        Arc::clone(&self.markers)
    }

    /// How many times the point list was actually rebuilt.
    #[cfg(test)]
    pub fn computations(&self) -> u64 {
        self.computations
    }
}

/// Builds the render model of the main map.
#[derive(Default)]
pub struct MapRenderer {
    points: Mutex<PointLayerCache>,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&self, collection: Option<&Arc<FeatureCollection>>, zoom: u8) -> MapLayers {
        let Some(collection) = collection else {
            return MapLayers::default();
        };

        let markers = {
            let mut cache = match self.points.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            cache.markers(collection)
        };

        let positions: Vec<[f64; 2]> = markers.iter().map(|m| m.position).collect();
        MapLayers {
            lines: line_entries(collection),
            clusters: cluster_positions(&positions, zoom, CLUSTER_RADIUS_PX),
            markers: markers.as_ref().clone(),
        }
    }

    #[cfg(test)]
    pub fn point_computations(&self) -> u64 {
        match self.points.lock() {
            Ok(guard) => guard.computations(),
            Err(poisoned) => poisoned.into_inner().computations(),
        }
    }
}

/// Every feature that is not a point goes to the GeoJSON layer, including
/// geometry kinds the map does not know about.
pub fn line_entries(collection: &FeatureCollection) -> Vec<LineEntry> {
    collection
        .features
        .iter()
        .enumerate()
        .filter(|(_, feature)| feature.geometry_kind() != Some("Point"))
        .map(|(index, feature)| LineEntry {
            index,
            id: feature.properties.id.clone(),
            style: resolve_style_for(feature.properties.score.as_ref()),
            popup: segment_popup(feature),
        })
        .collect()
}

pub fn extract_markers(collection: &FeatureCollection) -> Vec<Marker> {
    collection
        .features
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| {
            let position = feature.geometry.as_ref()?.point()?;
            Some(Marker {
                index,
                id: feature.properties.id.clone(),
                position: [position.lat, position.lon],
                popup: defect_popup(feature),
            })
        })
        .collect()
}

/// `[[south, west], [north, east]]` of a LineString feature.
pub fn line_bounds(feature: &Feature) -> Option<[[f64; 2]; 2]> {
    let line = feature.geometry.as_ref()?.line()?;
    let first = line.first()?;
    let mut bounds = [[first.lat, first.lon], [first.lat, first.lon]];
    for point in &line[1..] {
        bounds[0][0] = bounds[0][0].min(point.lat);
        bounds[0][1] = bounds[0][1].min(point.lon);
        bounds[1][0] = bounds[1][0].max(point.lat);
        bounds[1][1] = bounds[1][1].max(point.lon);
    }
    Some(bounds)
}

fn segment_popup(feature: &Feature) -> String {
    let props = &feature.properties;
    let id = props
        .id
        .as_ref()
        .map(|id| escape_html(&id.to_string()))
        .unwrap_or_else(|| PLACEHOLDER.to_string());
    let score = display_value(props.score.as_ref());

    format!(
        "<div><strong>ID:</strong> {id}<br/><strong>Score:</strong> {score}<br/><strong>Défauts:</strong> {}</div>",
        props.defect_count()
    )
}

fn defect_popup(feature: &Feature) -> String {
    let props = &feature.properties;
    let kind = non_empty(props.kind.as_deref()).unwrap_or("Défaut");
    let description = non_empty(props.description.as_deref()).unwrap_or("Aucune description");
    format!(
        "<div><strong>{}</strong><br/>{}</div>",
        escape_html(kind),
        escape_html(description)
    )
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => escape_html(s),
        _ => PLACEHOLDER.to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
