use tauri::State;

use crate::AppState;

use super::SessionView;

#[tauri::command]
pub async fn login(
    state: State<'_, AppState>,
    email: String,
    password: String,
) -> Result<SessionView, String> {
    state
        .auth
        .login(&email, &password)
        .await
        .map(|session| session.view())
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn refresh_session(state: State<'_, AppState>) -> Result<SessionView, String> {
    state.auth.refresh().await.map_err(|e| e.to_string())?;
    Ok(state.auth.snapshot().view())
}

#[tauri::command]
pub async fn logout(state: State<'_, AppState>) -> Result<(), String> {
    // Fire-and-forget: the backend notification finishes on its own.
    let _notify = state.auth.logout();
    Ok(())
}

#[tauri::command]
pub fn get_session(state: State<'_, AppState>) -> SessionView {
    state.auth.snapshot().view()
}
