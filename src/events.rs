use log::warn;
use serde::Serialize;
use serde_json::Value;
use tauri::{AppHandle, Emitter, Runtime};

pub const SESSION_CHANGED: &str = "session-changed";
pub const GEODATA_CHANGED: &str = "geodata-changed";
pub const SEGMENT_CHANGED: &str = "segment-changed";

/// Where state changes are pushed. The app hands the pipelines its
/// `AppHandle`; tests hand them a recorder.
pub trait EventSink: Send + Sync + 'static {
    fn publish(&self, event: &str, payload: Value);
}

impl<R: Runtime> EventSink for AppHandle<R> {
    fn publish(&self, event: &str, payload: Value) {
        if let Err(err) = self.emit(event, payload) {
            warn!("failed to emit {event}: {err}");
        }
    }
}

/// Serializes and publishes; serialization failures are logged and dropped.
pub fn publish<T: Serialize>(sink: &dyn EventSink, event: &str, payload: &T) {
    match serde_json::to_value(payload) {
        Ok(value) => sink.publish(event, value),
        Err(err) => warn!("failed to serialize {event} payload: {err}"),
    }
}
