use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::api::{ApiClient, Endpoint, RequestOptions};
use crate::auth::SessionSnapshot;
use crate::events::{self, EventSink, SEGMENT_CHANGED};
use crate::models::{segment::sort_history, Defect, ScoreHistoryPoint, Segment};

use super::state::{SegmentDetailState, SegmentFetchMode, SegmentInputs};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

/// Loads one segment, its defects and its score history.
///
/// Failures never surface to the caller: they are logged and whatever did
/// load stays. Changing the segment or the token resets the state and
/// retires any fetch still in flight.
#[derive(Clone)]
pub struct SegmentPipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    api: ApiClient,
    sink: Arc<dyn EventSink>,
    mode: RwLock<SegmentFetchMode>,
    generation: AtomicU64,
    inputs: Mutex<SegmentInputs>,
    state: Mutex<SegmentDetailState>,
}

impl SegmentPipeline {
    pub fn new(api: ApiClient, mode: SegmentFetchMode, sink: Arc<dyn EventSink>) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                api,
                sink,
                mode: RwLock::new(mode),
                generation: AtomicU64::new(0),
                inputs: Mutex::new(SegmentInputs::default()),
                state: Mutex::new(SegmentDetailState::default()),
            }),
        }
    }

    pub async fn state(&self) -> SegmentDetailState {
        self.inner.state.lock().await.clone()
    }

    pub fn fetch_mode(&self) -> SegmentFetchMode {
        match self.inner.mode.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Takes effect on the next dispatch.
    pub fn set_fetch_mode(&self, mode: SegmentFetchMode) {
        match self.inner.mode.write() {
            Ok(mut guard) => *guard = mode,
            Err(poisoned) => *poisoned.into_inner() = mode,
        }
    }

    pub async fn open(&self, segment_id: impl Into<String>) -> Option<JoinHandle<()>> {
        let segment_id = segment_id.into();
        self.update(false, |inputs| inputs.segment_id = Some(segment_id))
            .await
    }

    pub async fn close(&self) {
        self.update(false, |inputs| inputs.segment_id = None).await;
    }

    pub async fn set_token(&self, token: Option<String>) -> Option<JoinHandle<()>> {
        self.update(false, |inputs| inputs.token = token).await
    }

    pub async fn reload(&self) -> Option<JoinHandle<()>> {
        self.update(true, |_| {}).await
    }

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
        apply: impl FnOnce(&mut SegmentInputs),
    ) -> Option<JoinHandle<()>> {
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

        let ready = match (&inputs.segment_id, &inputs.token) {
            (Some(id), Some(token)) => Some((id.clone(), token.clone())),
            _ => None,
        };
        if !self.inner.reset(generation, inputs.segment_id, ready.is_some()).await {
            return None;
        }

        let (segment_id, token) = ready?;
        let mode = self.fetch_mode();
        log_info!("segment {segment_id}: fetching ({mode:?}, generation {generation})");

        let inner = Arc::clone(&self.inner);
        Some(tokio::spawn(inner.fetch(generation, segment_id, token, mode)))
    }
}

impl PipelineInner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Returns false if a newer update already took over.
    async fn reset(&self, generation: u64, segment_id: Option<String>, loading: bool) -> bool {
        let mut state = self.state.lock().await;
        if !self.is_current(generation) {
            return false;
        }
        *state = SegmentDetailState::for_segment(segment_id);
        state.loading = loading;
        self.publish(&state);
        true
    }

    async fn fetch(
        self: Arc<Self>,
        generation: u64,
        segment_id: String,
        token: String,
        mode: SegmentFetchMode,
    ) {
        let segment = self.load(
            generation,
            Endpoint::Segment(segment_id.clone()),
            &token,
            |state, segment: Segment| state.segment = Some(segment),
        );
        let defects = self.load(
            generation,
            Endpoint::SegmentDefects(segment_id.clone()),
            &token,
            |state, defects: Vec<Defect>| state.defects = defects,
        );
        let history = self.load(
            generation,
            Endpoint::SegmentHistory(segment_id.clone()),
            &token,
            |state, mut history: Vec<ScoreHistoryPoint>| {
                sort_history(&mut history);
                state.history = history;
            },
        );

        match mode {
            SegmentFetchMode::Parallel => {
                tokio::join!(segment, defects, history);
            }
            SegmentFetchMode::Sequential => {
                if segment.await && defects.await {
                    history.await;
                }
            }
        }

        let mut state = self.state.lock().await;
        if self.is_current(generation) {
            state.loading = false;
            self.publish(&state);
        }
    }

    /// Fetches one part and applies it if still current. Returns whether the
    /// part loaded.
    async fn load<T: DeserializeOwned>(
        &self,
        generation: u64,
        endpoint: Endpoint,
        token: &str,
        apply: impl FnOnce(&mut SegmentDetailState, T),
    ) -> bool {
        let outcome = self
            .api
            .fetch_json::<T>(&endpoint, RequestOptions::authed(token))
            .await;

        let mut state = self.state.lock().await;
        if !self.is_current(generation) {
            log_debug!("{}: stale response discarded", endpoint.path());
            return false;
        }

        match outcome {
            Ok(value) => {
                apply(&mut state, value);
                self.publish(&state);
                true
            }
            Err(err) => {
                if err.is_not_found() && matches!(endpoint, Endpoint::Segment(_)) {
                    state.not_found = true;
                    self.publish(&state);
                }
                log_error!("{} failed: {err}", endpoint.path());
                false
            }
        }
    }

    fn publish(&self, state: &SegmentDetailState) {
        events::publish(self.sink.as_ref(), SEGMENT_CHANGED, &state.view());
    }
}
