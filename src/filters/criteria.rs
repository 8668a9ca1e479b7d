use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const MIN_PRIORITY: u8 = 0;
pub const MAX_PRIORITY: u8 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DefectType {
    #[default]
    Any,
    Crack,
    Pothole,
    Deformation,
}

impl DefectType {
    pub const ALL: [DefectType; 4] = [
        DefectType::Any,
        DefectType::Crack,
        DefectType::Pothole,
        DefectType::Deformation,
    ];

    /// Value the backend filters on. `Any` sends nothing.
    pub fn wire_value(self) -> Option<&'static str> {
        match self {
            DefectType::Any => None,
            DefectType::Crack => Some("fissure"),
            DefectType::Pothole => Some("nid"),
            DefectType::Deformation => Some("deformation"),
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim() {
            "" => Some(DefectType::Any),
            "fissure" => Some(DefectType::Crack),
            "nid" => Some(DefectType::Pothole),
            "deformation" => Some(DefectType::Deformation),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DefectType::Any => "Tous",
            DefectType::Crack => "Fissure",
            DefectType::Pothole => "Nid de poule",
            DefectType::Deformation => "Déformation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    #[serde(default)]
    pub defect_type: DefectType,
    #[serde(default = "default_min_priority")]
    pub min_priority: u8,
    #[serde(default = "default_max_priority")]
    pub max_priority: u8,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            date_from: None,
            date_to: None,
            defect_type: DefectType::Any,
            min_priority: MIN_PRIORITY,
            max_priority: MAX_PRIORITY,
        }
    }
}

fn default_min_priority() -> u8 {
    MIN_PRIORITY
}

fn default_max_priority() -> u8 {
    MAX_PRIORITY
}

impl FilterCriteria {
    /// Pulls both priorities into 0..=100. Does not reorder them.
    pub fn clamped(mut self) -> Self {
        self.min_priority = self.min_priority.min(MAX_PRIORITY);
        self.max_priority = self.max_priority.min(MAX_PRIORITY);
        self
    }

    /// Inconsistencies worth surfacing. The criteria are used as given
    /// regardless; an inverted range simply matches nothing server-side.
    pub fn warnings(&self) -> Vec<FilterWarning> {
        let mut warnings = Vec::new();
        if self.min_priority > self.max_priority {
            warnings.push(FilterWarning::PriorityRangeInverted {
                min: self.min_priority,
                max: self.max_priority,
            });
        }
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                warnings.push(FilterWarning::DateRangeInverted { from, to });
            }
        }
        warnings
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FilterWarning {
    #[serde(rename_all = "camelCase")]
    InvalidParam { param: String, value: String },
    PriorityRangeInverted { min: u8, max: u8 },
    DateRangeInverted { from: NaiveDate, to: NaiveDate },
}

impl fmt::Display for FilterWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterWarning::InvalidParam { param, value } => {
                write!(f, "ignored invalid '{param}' value '{value}'")
            }
            FilterWarning::PriorityRangeInverted { min, max } => {
                write!(f, "minimum priority {min} is above maximum {max}")
            }
            FilterWarning::DateRangeInverted { from, to } => {
                write!(f, "start date {from} is after end date {to}")
            }
        }
    }
}
