use std::time::Instant;

use serde_json::Value;
use tauri::State;

use crate::charts::{stats_view, StatsView};
use crate::map::MapLayers;
use crate::AppState;

#[tauri::command]
pub async fn get_geo_data(state: State<'_, AppState>) -> Result<Value, String> {
    let data = state.geodata.state().await;
    serde_json::to_value(data.payload()).map_err(|e| e.to_string())
}

/// Render model of the main map at `zoom`.
#[tauri::command]
pub async fn get_map_layers(state: State<'_, AppState>, zoom: u8) -> Result<MapLayers, String> {
    let data = state.geodata.state().await;

    let started = Instant::now();
    let layers = state.renderer.render(data.geojson.as_ref(), zoom);
    state
        .metrics
        .record_timing("Component Render Time map".to_string(), started.elapsed())
        .await;

    Ok(layers)
}

/// `None` until the first `/scores` response lands.
#[tauri::command]
pub async fn get_stats(state: State<'_, AppState>) -> Result<Option<StatsView>, String> {
    let data = state.geodata.state().await;
    Ok(data.scores.as_deref().map(stats_view))
}
