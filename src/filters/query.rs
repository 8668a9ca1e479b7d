use chrono::NaiveDate;
use serde::Serialize;
use url::form_urlencoded;

use crate::api::QueryParams;

use super::criteria::{DefectType, FilterCriteria, FilterWarning, MAX_PRIORITY, MIN_PRIORITY};

pub const PARAM_FROM: &str = "from";
pub const PARAM_TO: &str = "to";
pub const PARAM_TYPE: &str = "type";
pub const PARAM_MIN_PRIORITY: &str = "pmin";
pub const PARAM_MAX_PRIORITY: &str = "pmax";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Filter criteria rebuilt from a query string, with whatever had to be
/// ignored on the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedFilters {
    pub criteria: FilterCriteria,
    pub warnings: Vec<FilterWarning>,
}

/// Parameters shared by the page URL and the `/geojson` and `/scores`
/// requests. Empty dates and `Any` are left out; priorities always go out.
pub fn to_query_pairs(criteria: &FilterCriteria) -> QueryParams {
    let mut pairs = Vec::with_capacity(5);
    if let Some(from) = criteria.date_from {
        pairs.push((PARAM_FROM.to_string(), from.format(DATE_FORMAT).to_string()));
    }
    if let Some(to) = criteria.date_to {
        pairs.push((PARAM_TO.to_string(), to.format(DATE_FORMAT).to_string()));
    }
    if let Some(kind) = criteria.defect_type.wire_value() {
        pairs.push((PARAM_TYPE.to_string(), kind.to_string()));
    }
    pairs.push((PARAM_MIN_PRIORITY.to_string(), criteria.min_priority.to_string()));
    pairs.push((PARAM_MAX_PRIORITY.to_string(), criteria.max_priority.to_string()));
    pairs
}

pub fn to_query_string(criteria: &FilterCriteria) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(to_query_pairs(criteria))
        .finish()
}

/// Lenient decode: unknown keys are ignored, unparsable values fall back to
/// the default and are reported, priorities are clamped into 0..=100.
pub fn from_query_pairs<I, K, V>(pairs: I) -> DecodedFilters
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut criteria = FilterCriteria::default();
    let mut warnings = Vec::new();

    for (key, value) in pairs {
        let (key, value) = (key.as_ref(), value.as_ref().trim());
        let mut reject = || {
            warnings.push(FilterWarning::InvalidParam {
                param: key.to_string(),
                value: value.to_string(),
            })
        };

        match key {
            PARAM_FROM => match parse_date(value) {
                Ok(date) => criteria.date_from = date,
                Err(()) => reject(),
            },
            PARAM_TO => match parse_date(value) {
                Ok(date) => criteria.date_to = date,
                Err(()) => reject(),
            },
            PARAM_TYPE => match DefectType::from_wire(value) {
                Some(kind) => criteria.defect_type = kind,
                None => reject(),
            },
            PARAM_MIN_PRIORITY => match parse_priority(value, MIN_PRIORITY) {
                Some(priority) => criteria.min_priority = priority,
                None => reject(),
            },
            PARAM_MAX_PRIORITY => match parse_priority(value, MAX_PRIORITY) {
                Some(priority) => criteria.max_priority = priority,
                None => reject(),
            },
            _ => {}
        }
    }

    DecodedFilters { criteria, warnings }
}

pub fn from_query_string(query: &str) -> DecodedFilters {
    let query = query.trim().trim_start_matches('?');
    from_query_pairs(form_urlencoded::parse(query.as_bytes()))
}

fn parse_date(value: &str) -> Result<Option<NaiveDate>, ()> {
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(Some)
        .map_err(|_| ())
}

fn parse_priority(value: &str, empty_default: u8) -> Option<u8> {
    if value.is_empty() {
        return Some(empty_default);
    }
    let parsed: i64 = value.parse().ok()?;
    Some(parsed.clamp(i64::from(MIN_PRIORITY), i64::from(MAX_PRIORITY)) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn encodes_the_documented_scenario() {
        let criteria = FilterCriteria {
            date_from: ymd(2024, 1, 1),
            date_to: ymd(2024, 1, 31),
            defect_type: DefectType::Crack,
            min_priority: 50,
            max_priority: 100,
        };

        assert_eq!(
            to_query_string(&criteria),
            "from=2024-01-01&to=2024-01-31&type=fissure&pmin=50&pmax=100"
        );
    }

    #[test]
    fn default_criteria_only_carry_priorities() {
        assert_eq!(to_query_string(&FilterCriteria::default()), "pmin=0&pmax=100");
    }

    #[test]
    fn round_trips_every_field_combination() {
        let dates = [None, ymd(2023, 12, 31), ymd(2024, 2, 29)];
        let priorities = [0u8, 1, 50, 99, 100];

        for date_from in dates {
            for date_to in dates {
                for defect_type in DefectType::ALL {
                    for min_priority in priorities {
                        for max_priority in priorities {
                            let criteria = FilterCriteria {
                                date_from,
                                date_to,
                                defect_type,
                                min_priority,
                                max_priority,
                            };
                            let decoded = from_query_string(&to_query_string(&criteria));
                            assert_eq!(decoded.criteria, criteria);
                            assert!(decoded.warnings.is_empty());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn decodes_urls_written_by_the_filter_bar() {
        // The filter bar writes every key, empty or not.
        let decoded = from_query_string("?from=&to=2024-05-01&type=&pmin=10&pmax=");
        assert_eq!(
            decoded.criteria,
            FilterCriteria {
                date_to: ymd(2024, 5, 1),
                min_priority: 10,
                ..FilterCriteria::default()
            }
        );
        assert!(decoded.warnings.is_empty());
    }

    #[test]
    fn bad_values_fall_back_and_are_reported() {
        let decoded = from_query_string("from=yesterday&type=crack&pmin=abc&pmax=300&zoom=4");

        assert_eq!(
            decoded.criteria,
            FilterCriteria {
                max_priority: 100,
                ..FilterCriteria::default()
            }
        );
        let params: Vec<&str> = decoded
            .warnings
            .iter()
            .map(|w| match w {
                FilterWarning::InvalidParam { param, .. } => param.as_str(),
                _ => "other",
            })
            .collect();
        assert_eq!(params, vec!["from", "type", "pmin"]);
    }

    #[test]
    fn inverted_priorities_survive_the_url() {
        let decoded = from_query_string("pmin=90&pmax=10");
        assert_eq!(decoded.criteria.min_priority, 90);
        assert_eq!(decoded.criteria.max_priority, 10);
    }
}
