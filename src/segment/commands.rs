use tauri::State;

use crate::AppState;

use super::SegmentDetailView;

/// Selects the segment shown on the detail page. The detail arrives through
/// `segment-changed`; the returned view is the freshly reset state.
#[tauri::command]
pub async fn open_segment(
    state: State<'_, AppState>,
    segment_id: String,
) -> Result<SegmentDetailView, String> {
    let segment_id = segment_id.trim().to_string();
    if segment_id.is_empty() {
        return Err("segment id is required".to_string());
    }
    // Detached: results are published as they land.
    let _fetch = state.segment.open(segment_id).await;
    Ok(state.segment.state().await.view())
}

#[tauri::command]
pub async fn close_segment(state: State<'_, AppState>) -> Result<(), String> {
    state.segment.close().await;
    Ok(())
}

#[tauri::command]
pub async fn get_segment_detail(state: State<'_, AppState>) -> Result<SegmentDetailView, String> {
    Ok(state.segment.state().await.view())
}

#[tauri::command]
pub async fn mark_segment_repaired(
    state: State<'_, AppState>,
    segment_id: String,
) -> Result<(), String> {
    let token = state.auth.access_token();
    state
        .actions
        .mark_repaired(token.as_deref(), &segment_id)
        .await
        .map_err(|e| e.to_string())?;

    // Scores change server-side; pull fresh data for both views.
    let _geodata = state.geodata.reload().await;
    let _segment = state.segment.reload().await;
    Ok(())
}

#[tauri::command]
pub async fn add_segment_note(
    state: State<'_, AppState>,
    segment_id: String,
    note: String,
) -> Result<(), String> {
    let token = state.auth.access_token();
    state
        .actions
        .add_note(token.as_deref(), &segment_id, &note)
        .await
        .map_err(|e| e.to_string())
}
