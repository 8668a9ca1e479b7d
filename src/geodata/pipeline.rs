use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::api::{ApiClient, ApiResult, Endpoint, RequestOptions};
use crate::auth::SessionSnapshot;
use crate::events::{self, EventSink, GEODATA_CHANGED};
use crate::filters::{query::to_query_pairs, FilterCriteria};
use crate::models::{FeatureCollection, ScoreSummary};

use super::state::{GeoDataState, GeoInputs};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Fetches `/geojson` and `/scores` for the current filters.
///
/// Every input change starts a new generation. A fetch only writes its result
/// if its generation is still the latest when it lands, so a slow response to
/// an old filter can never overwrite a newer one.
#[derive(Clone)]
pub struct GeoDataPipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    api: ApiClient,
    sink: Arc<dyn EventSink>,
    generation: AtomicU64,
    inputs: Mutex<GeoInputs>,
    state: Mutex<GeoDataState>,
}

impl GeoDataPipeline {
    pub fn new(api: ApiClient, sink: Arc<dyn EventSink>) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                api,
                sink,
                generation: AtomicU64::new(0),
                inputs: Mutex::new(GeoInputs::default()),
                state: Mutex::new(GeoDataState::default()),
            }),
        }
    }

    pub async fn state(&self) -> GeoDataState {
        self.inner.state.lock().await.clone()
    }

    pub async fn filters(&self) -> FilterCriteria {
        self.inner.inputs.lock().await.filters.clone()
    }

    #[cfg(test)]
    pub fn current_generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Returns the spawned fetch, if one was started.
    pub async fn set_filters(&self, filters: FilterCriteria) -> Option<JoinHandle<()>> {
        self.update(false, |inputs| inputs.filters = filters).await
    }

    pub async fn set_token(&self, token: Option<String>) -> Option<JoinHandle<()>> {
        self.update(false, |inputs| inputs.token = token).await
    }

    /// Refetches with unchanged inputs.
    pub async fn reload(&self) -> Option<JoinHandle<()>> {
        self.update(true, |_| {}).await
    }

    /// Stops honoring anything in flight. Data already shown stays.
    pub async fn teardown(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.settle_idle(generation).await;
    }

    /// Keeps the token input in step with the session until the session
    /// channel closes.
    pub fn follow_session(&self, mut session: watch::Receiver<SessionSnapshot>) -> JoinHandle<()> {
        let pipeline = self.clone();
        tokio::spawn(async move {
            loop {
                let token = session.borrow_and_update().access_token.clone();
                pipeline.set_token(token).await;
                if session.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    async fn update(
        &self,
        force: bool,
        apply: impl FnOnce(&mut GeoInputs),
    ) -> Option<JoinHandle<()>> {
        // The generation is taken under the inputs lock so generations and
        // inputs advance in the same order.
        let (generation, inputs) = {
            let mut inputs = self.inner.inputs.lock().await;
            let before = inputs.clone();
            apply(&mut inputs);
            if !force && *inputs == before {
                return None;
            }
            let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            (generation, inputs.clone())
        };

        let Some(token) = inputs.token else {
            log_debug!("geodata generation {generation}: no token, staying idle");
            self.inner.settle_idle(generation).await;
            return None;
        };

        if !self.inner.mark_loading(generation).await {
            log_debug!("geodata generation {generation}: superseded before dispatch");
            return None;
        }
        log_info!("geodata generation {generation}: fetching");

        let inner = Arc::clone(&self.inner);
        Some(tokio::spawn(inner.fetch(generation, inputs.filters, token)))
    }
}

impl PipelineInner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Returns false if a newer update already took over.
    async fn mark_loading(&self, generation: u64) -> bool {
        let mut state = self.state.lock().await;
        if !self.is_current(generation) {
            return false;
        }
        state.loading = true;
        state.error = None;
        self.publish(&state);
        true
    }

    async fn settle_idle(&self, generation: u64) {
        let mut state = self.state.lock().await;
        if !self.is_current(generation) || !state.loading {
            return;
        }
        state.loading = false;
        self.publish(&state);
    }

    async fn fetch(self: Arc<Self>, generation: u64, filters: FilterCriteria, token: String) {
        let params = to_query_pairs(&filters);
        let geojson = self.api.fetch_json::<FeatureCollection>(
            &Endpoint::GeoJson,
            RequestOptions::authed(&token).with_params(params.clone()),
        );
        let scores = self.api.fetch_json::<ScoreSummary>(
            &Endpoint::Scores,
            RequestOptions::authed(&token).with_params(params),
        );

        let (geojson, scores) = tokio::join!(geojson, scores);
        let outcome: ApiResult<(FeatureCollection, ScoreSummary)> =
            geojson.and_then(|geojson| scores.map(|scores| (geojson, scores)));

        let mut state = self.state.lock().await;
        if !self.is_current(generation) {
            log_debug!("geodata generation {generation}: stale response discarded");
            return;
        }

        match outcome {
            Ok((geojson, scores)) => {
                log_info!(
                    "geodata generation {generation}: {} features",
                    geojson.features.len()
                );
                state.geojson = Some(Arc::new(geojson));
                state.scores = Some(Arc::new(scores));
                state.error = None;
                state.applied_generation = generation;
            }
            Err(err) if err.is_timeout() => {
                log_warn!("geodata generation {generation} timed out");
                state.error = Some(err.to_string());
            }
            Err(err) => {
                log_warn!("geodata generation {generation} failed: {err}");
                state.error = Some(err.to_string());
            }
        }
        state.loading = false;
        self.publish(&state);
    }

    fn publish(&self, state: &GeoDataState) {
        events::publish(self.sink.as_ref(), GEODATA_CHANGED, &state.payload());
    }
}
