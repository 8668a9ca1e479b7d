mod api;
mod auth;
mod charts;
mod events;
mod filters;
mod geodata;
mod map;
mod metrics;
mod models;
mod segment;
mod settings;
mod utils;

use std::sync::Arc;

use api::{ApiClient, ApiConfig};
use auth::{
    commands::{get_session, login, logout, refresh_session},
    AuthController,
};
use events::EventSink;
use filters::commands::{apply_filters, filters_from_query, get_filters};
use geodata::{
    commands::{get_geo_data, get_map_layers, get_stats},
    GeoDataPipeline,
};
use log::warn;
use map::MapRenderer;
use metrics::{MetricsCollector, PerformanceReport};
use segment::{
    commands::{
        add_segment_note, close_segment, get_segment_detail, mark_segment_repaired, open_segment,
    },
    SegmentActions, SegmentPipeline,
};
use settings::{SettingsStore, UserSettings};
use tauri::{Manager, State};

pub(crate) struct AppState {
    pub(crate) auth: AuthController,
    pub(crate) geodata: GeoDataPipeline,
    pub(crate) segment: SegmentPipeline,
    pub(crate) actions: SegmentActions,
    pub(crate) renderer: MapRenderer,
    pub(crate) settings: SettingsStore,
    pub(crate) metrics: MetricsCollector,
}

#[tauri::command]
fn get_settings(state: State<AppState>) -> UserSettings {
    state.settings.get()
}

/// Saves the settings and applies them to the running controllers. The
/// remembered filter query is owned by `apply_filters` and kept as stored.
#[tauri::command]
fn update_settings(settings: UserSettings, state: State<AppState>) -> Result<UserSettings, String> {
    let settings = UserSettings {
        last_filters_query: state.settings.get().last_filters_query,
        ..settings
    };
    state
        .settings
        .update(settings.clone())
        .map_err(|e| e.to_string())?;

    state
        .auth
        .set_refresh_failure_policy(settings.refresh_failure_policy);
    state.segment.set_fetch_mode(settings.segment_fetch_mode);

    Ok(settings)
}

#[tauri::command]
async fn get_performance_report(state: State<'_, AppState>) -> Result<PerformanceReport, String> {
    Ok(PerformanceReport {
        snapshot: state.metrics.get_snapshot().await,
        targets: state.metrics.check_targets().await,
    })
}

#[tauri::command]
async fn start_performance_measure(state: State<'_, AppState>, name: String) -> Result<(), String> {
    state.metrics.start_measure(name).await;
    Ok(())
}

/// Elapsed milliseconds, or `None` if `name` was never started.
#[tauri::command]
async fn end_performance_measure(
    state: State<'_, AppState>,
    name: String,
) -> Result<Option<f64>, String> {
    Ok(state
        .metrics
        .end_measure(&name)
        .await
        .map(|elapsed| elapsed.as_secs_f64() * 1000.0))
}

#[tauri::command]
async fn export_performance_metrics(state: State<'_, AppState>) -> Result<String, String> {
    state.metrics.export_json().await.map_err(|e| e.to_string())
}

#[tauri::command]
async fn clear_performance_metrics(state: State<'_, AppState>) -> Result<(), String> {
    state.metrics.reset().await;
    Ok(())
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    utils::logging::init_logging();

    log::info!("PaveMap starting up...");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let result = (|| -> anyhow::Result<()> {
                let app_data_dir = app
                    .path()
                    .app_data_dir()
                    .map_err(|err| anyhow::anyhow!(err))?;
                std::fs::create_dir_all(&app_data_dir)?;

                let settings_path = app_data_dir.join("settings.json");
                let settings_store = SettingsStore::new(settings_path)?;
                let initial = settings_store.get();

                let metrics = MetricsCollector::new();
                let api = ApiClient::new(ApiConfig::from_env()?, metrics.clone())?;
                log::info!(
                    "API at {} (auth {}, actions {})",
                    api.config().api_base,
                    api.config().auth_base,
                    api.config().actions_base
                );

                let sink: Arc<dyn EventSink> = Arc::new(app.handle().clone());
                let auth =
                    AuthController::new(api.clone(), initial.refresh_failure_policy, sink.clone());
                let geodata = GeoDataPipeline::new(api.clone(), sink.clone());
                let segment = SegmentPipeline::new(api.clone(), initial.segment_fetch_mode, sink);

                // Reopen the map on the last shared filters. No session yet, so
                // nothing is fetched until sign-in.
                tauri::async_runtime::block_on(async {
                    if let Some(query) = initial.last_filters_query.as_deref() {
                        let decoded = filters::from_query_string(query);
                        for warning in &decoded.warnings {
                            warn!("Restored filters: {warning}");
                        }
                        let _ = geodata.set_filters(decoded.criteria.clamped()).await;
                    }
                    geodata.follow_session(auth.subscribe());
                    segment.follow_session(auth.subscribe());
                });

                app.manage(AppState {
                    auth,
                    geodata,
                    segment,
                    actions: SegmentActions::new(api),
                    renderer: MapRenderer::new(),
                    settings: settings_store,
                    metrics,
                });

                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .invoke_handler(tauri::generate_handler![
            login,
            refresh_session,
            logout,
            get_session,
            apply_filters,
            filters_from_query,
            get_filters,
            get_geo_data,
            get_map_layers,
            get_stats,
            open_segment,
            close_segment,
            get_segment_detail,
            mark_segment_repaired,
            add_segment_note,
            get_settings,
            update_settings,
            get_performance_report,
            start_performance_measure,
            end_performance_measure,
            export_performance_metrics,
            clear_performance_metrics,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
