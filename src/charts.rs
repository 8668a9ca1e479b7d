use serde::Serialize;

use crate::models::{ScoreHistoryPoint, ScoreSummary, SummaryCounts, TimeseriesPoint};

pub const SCORE_SERIES_LABEL: &str = "Score du tronçon";
pub const TREND_SERIES_LABEL: &str = "Nombre de défauts";
const TREND_TENSION: f64 = 0.3;

/// One line series, ready for the chart widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub label: &'static str,
    pub labels: Vec<String>,
    /// Gaps stay `None` so the widget can break the line.
    pub data: Vec<Option<f64>>,
    pub tension: f64,
}

/// Score history of one segment. `None` when there is nothing to draw.
pub fn score_chart(history: &[ScoreHistoryPoint]) -> Option<ChartSeries> {
    if history.is_empty() {
        return None;
    }
    Some(ChartSeries {
        label: SCORE_SERIES_LABEL,
        labels: history.iter().map(|point| point.date.clone()).collect(),
        data: history.iter().map(|point| point.score).collect(),
        tension: 0.0,
    })
}

/// Defect counts over time. Missing counts plot as zero.
pub fn trend_chart(timeseries: &[TimeseriesPoint]) -> ChartSeries {
    ChartSeries {
        label: TREND_SERIES_LABEL,
        labels: timeseries.iter().map(|point| point.date.clone()).collect(),
        data: timeseries
            .iter()
            .map(|point| Some(point.count.unwrap_or(0.0)))
            .collect(),
        tension: TREND_TENSION,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    pub summary: SummaryCounts,
    pub trend: ChartSeries,
}

pub fn stats_view(scores: &ScoreSummary) -> StatsView {
    StatsView {
        summary: scores.summary.clone(),
        trend: trend_chart(&scores.timeseries),
    }
}
