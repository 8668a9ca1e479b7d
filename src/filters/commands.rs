use serde::Serialize;
use tauri::State;

use crate::AppState;

use super::{from_query_string, to_query_string, FilterCriteria, FilterWarning};

/// Returned to the filter bar after every change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFilters {
    pub criteria: FilterCriteria,
    /// Shareable query string for the page URL.
    pub query: String,
    pub warnings: Vec<FilterWarning>,
}

/// Makes `criteria` the active filters: the map refetches, the query string is
/// remembered for the next start. Warnings are reported, never fatal.
pub(crate) async fn apply(
    state: &AppState,
    criteria: FilterCriteria,
    mut warnings: Vec<FilterWarning>,
) -> AppliedFilters {
    let criteria = criteria.clamped();
    warnings.extend(criteria.warnings());
    for warning in &warnings {
        log::warn!("filters: {warning}");
    }

    let query = to_query_string(&criteria);
    if let Err(err) = state.settings.set_last_filters_query(Some(query.clone())) {
        log::warn!("Failed to remember filters: {err:#}");
    }

    // Detached: the result is published as `geodata-changed`.
    let _fetch = state.geodata.set_filters(criteria.clone()).await;

    AppliedFilters {
        criteria,
        query,
        warnings,
    }
}

#[tauri::command]
pub async fn apply_filters(
    state: State<'_, AppState>,
    criteria: FilterCriteria,
) -> Result<AppliedFilters, String> {
    Ok(apply(&state, criteria, Vec::new()).await)
}

/// Restores the filters encoded in a page URL query string.
#[tauri::command]
pub async fn filters_from_query(
    state: State<'_, AppState>,
    query: String,
) -> Result<AppliedFilters, String> {
    let decoded = from_query_string(&query);
    Ok(apply(&state, decoded.criteria, decoded.warnings).await)
}

#[tauri::command]
pub async fn get_filters(state: State<'_, AppState>) -> Result<AppliedFilters, String> {
    let criteria = state.geodata.filters().await;
    Ok(AppliedFilters {
        query: to_query_string(&criteria),
        warnings: criteria.warnings(),
        criteria,
    })
}
