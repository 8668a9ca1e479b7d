use serde::Serialize;
use serde_json::Value;

pub const HIGH_SEVERITY_COLOR: &str = "#e74c3c";
pub const MEDIUM_SEVERITY_COLOR: &str = "#f1c40f";
pub const LOW_SEVERITY_COLOR: &str = "#2ecc71";

const HIGH_THRESHOLD: f64 = 70.0;
const MEDIUM_THRESHOLD: f64 = 40.0;
const LINE_WEIGHT: u32 = 4;
const LINE_OPACITY: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Bands are checked from the top down: above 70 is high, above 40 medium.
    pub fn for_score(score: f64) -> Self {
        if score > HIGH_THRESHOLD {
            Severity::High
        } else if score > MEDIUM_THRESHOLD {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Severity::High => HIGH_SEVERITY_COLOR,
            Severity::Medium => MEDIUM_SEVERITY_COLOR,
            Severity::Low => LOW_SEVERITY_COLOR,
        }
    }
}

/// Leaflet path options for one feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Style {
    pub color: &'static str,
    pub weight: u32,
    pub opacity: f64,
}

/// Style of the single highlighted segment on the detail page.
pub const DETAIL_STYLE: Style = Style {
    color: "red",
    weight: 5,
    opacity: 1.0,
};

pub fn resolve_style(score: Option<f64>) -> Style {
    let score = score.filter(|s| !s.is_nan()).unwrap_or(0.0);
    Style {
        color: Severity::for_score(score).color(),
        weight: LINE_WEIGHT,
        opacity: LINE_OPACITY,
    }
}

/// Reads a score property. Numbers and numeric strings count; anything else
/// is treated as missing.
pub fn score_from_value(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

pub fn resolve_style_for(value: Option<&Value>) -> Style {
    resolve_style(score_from_value(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bands_follow_thresholds() {
        let high = resolve_style(Some(85.0));
        assert_eq!(high.color, HIGH_SEVERITY_COLOR);
        assert_eq!(high.weight, 4);
        assert_eq!(high.opacity, 0.9);

        assert_eq!(resolve_style(Some(70.0001)).color, HIGH_SEVERITY_COLOR);
        assert_eq!(resolve_style(Some(70.0)).color, MEDIUM_SEVERITY_COLOR);
        assert_eq!(resolve_style(Some(40.5)).color, MEDIUM_SEVERITY_COLOR);
        assert_eq!(resolve_style(Some(40.0)).color, LOW_SEVERITY_COLOR);
        assert_eq!(resolve_style(Some(-3.0)).color, LOW_SEVERITY_COLOR);
        assert_eq!(resolve_style(None).color, LOW_SEVERITY_COLOR);
        assert_eq!(resolve_style(Some(f64::NAN)).color, LOW_SEVERITY_COLOR);
    }

    #[test]
    fn every_band_shares_weight_and_opacity() {
        for score in [0.0, 50.0, 99.0] {
            let style = resolve_style(Some(score));
            assert_eq!((style.weight, style.opacity), (4, 0.9));
        }
    }

    #[test]
    fn property_values_are_coerced() {
        assert_eq!(resolve_style_for(Some(&json!(71))).color, HIGH_SEVERITY_COLOR);
        assert_eq!(resolve_style_for(Some(&json!("55"))).color, MEDIUM_SEVERITY_COLOR);
        assert_eq!(resolve_style_for(Some(&json!("n/a"))).color, LOW_SEVERITY_COLOR);
        assert_eq!(resolve_style_for(Some(&json!(null))).color, LOW_SEVERITY_COLOR);
        assert_eq!(resolve_style_for(Some(&json!(true))).color, LOW_SEVERITY_COLOR);
        assert_eq!(resolve_style_for(None).color, LOW_SEVERITY_COLOR);
    }
}
