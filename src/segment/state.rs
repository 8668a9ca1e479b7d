use serde::{Deserialize, Serialize};

use crate::charts::{score_chart, ChartSeries};
use crate::map::{line_bounds, Style, DETAIL_STYLE};
use crate::models::{Defect, ScoreHistoryPoint, Segment};

/// How the three detail requests are issued.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SegmentFetchMode {
    /// All three at once; each result lands on its own.
    #[default]
    Parallel,
    /// One after the other, stopping at the first failure.
    Sequential,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentDetailState {
    pub segment_id: Option<String>,
    pub segment: Option<Segment>,
    pub defects: Vec<Defect>,
    pub history: Vec<ScoreHistoryPoint>,
    pub loading: bool,
    pub not_found: bool,
}

impl SegmentDetailState {
    /// Empty state for a newly selected segment.
    pub fn for_segment(segment_id: Option<String>) -> Self {
        Self {
            segment_id,
            ..Self::default()
        }
    }

    pub fn view(&self) -> SegmentDetailView {
        SegmentDetailView {
            bounds: self
                .segment
                .as_ref()
                .and_then(|segment| line_bounds(&segment.geojson)),
            highlight: DETAIL_STYLE,
            score_chart: score_chart(&self.history),
            detail: self.clone(),
        }
    }
}

/// What the detail page draws: the raw state plus its map and chart models.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentDetailView {
    #[serde(flatten)]
    pub detail: SegmentDetailState,
    pub bounds: Option<[[f64; 2]; 2]>,
    pub highlight: Style,
    pub score_chart: Option<ChartSeries>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SegmentInputs {
    pub segment_id: Option<String>,
    pub token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn view_adds_bounds_and_chart() {
        let segment: Segment = serde_json::from_value(json!({
            "id": 3,
            "geojson": {
                "type": "Feature",
                "geometry": {"type": "LineString", "coordinates": [[-7.6, 33.5], [-7.5, 33.6]]},
                "properties": {}
            }
        }))
        .unwrap();
        let state = SegmentDetailState {
            segment_id: Some("3".into()),
            segment: Some(segment),
            history: vec![ScoreHistoryPoint {
                date: "2024-01-01".into(),
                score: Some(40.0),
            }],
            ..SegmentDetailState::default()
        };

        let view = serde_json::to_value(state.view()).unwrap();
        assert_eq!(view["segmentId"], "3");
        assert_eq!(view["bounds"], json!([[33.5, -7.6], [33.6, -7.5]]));
        assert_eq!(view["highlight"]["weight"], 5);
        assert_eq!(view["scoreChart"]["data"], json!([40.0]));
        assert_eq!(view["notFound"], false);
    }

    #[test]
    fn empty_history_has_no_chart() {
        let view = SegmentDetailState::for_segment(Some("9".into())).view();
        assert!(view.score_chart.is_none());
        assert!(view.bounds.is_none());
    }
}
