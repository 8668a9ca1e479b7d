mod types;

pub use types::{
    ApiTiming, MetricsSnapshot, PerformanceReport, SystemMetrics, TargetReport, TargetStatus,
};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use log::{info, warn};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::sync::Mutex;

const MAX_RECENT_TIMINGS: usize = 100;

/// Average budgets, in milliseconds, for timings whose name contains the key.
pub const PERFORMANCE_TARGETS: [(&str, f64); 3] = [
    ("API Response Time", 2000.0),
    ("Component Render Time", 100.0),
    ("Page Load Time", 2000.0),
];

pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

struct MetricsState {
    recent_timings: Vec<ApiTiming>,
    marks: HashMap<String, Instant>,
    timing_count: u64,
    system: System,
    pid: Pid,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut system = System::new();
        let pid = Pid::from_u32(std::process::id());

        // Initial refresh to establish baseline for CPU calculation
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        Self {
            inner: Arc::new(Mutex::new(MetricsState {
                recent_timings: Vec::with_capacity(MAX_RECENT_TIMINGS),
                marks: HashMap::new(),
                timing_count: 0,
                system,
                pid,
            })),
        }
    }

    pub async fn start_measure(&self, name: impl Into<String>) {
        let mut state = self.inner.lock().await;
        state.marks.insert(name.into(), Instant::now());
    }

    /// Closes a measurement opened with `start_measure` and records it.
    pub async fn end_measure(&self, name: &str) -> Option<Duration> {
        let started = {
            let mut state = self.inner.lock().await;
            state.marks.remove(name)
        };

        let Some(started) = started else {
            warn!("No start mark found for {name}");
            return None;
        };

        let elapsed = started.elapsed();
        self.record_timing(name.to_string(), elapsed).await;
        Some(elapsed)
    }

    pub async fn record_timing(&self, name: String, duration: Duration) {
        let duration_ms = duration.as_secs_f64() * 1000.0;
        if cfg!(debug_assertions) {
            log::debug!("{name}: {duration_ms:.2}ms");
        }

        let mut state = self.inner.lock().await;
        state.timing_count += 1;
        state.recent_timings.push(ApiTiming {
            name,
            duration_ms,
            timestamp: Utc::now(),
        });

        if state.recent_timings.len() > MAX_RECENT_TIMINGS {
            state.recent_timings.remove(0);
        }
    }

    pub async fn get_snapshot(&self) -> MetricsSnapshot {
        let mut state = self.inner.lock().await;
        let pid = state.pid;

        // Refresh to get current CPU/RAM
        state.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        let system_metrics = if let Some(process) = state.system.process(pid) {
            SystemMetrics {
                cpu_percent: process.cpu_usage(),
                memory_mb: process.memory() as f64 / 1024.0 / 1024.0,
            }
        } else {
            SystemMetrics {
                cpu_percent: 0.0,
                memory_mb: 0.0,
            }
        };

        MetricsSnapshot {
            system: system_metrics,
            recent_timings: state.recent_timings.clone(),
            timing_count: state.timing_count,
        }
    }

    /// Averages the retained timings against `PERFORMANCE_TARGETS`. Targets
    /// without any matching timing are left out.
    pub async fn check_targets(&self) -> Vec<TargetReport> {
        let state = self.inner.lock().await;

        PERFORMANCE_TARGETS
            .iter()
            .filter_map(|(metric, target_ms)| {
                let values: Vec<f64> = state
                    .recent_timings
                    .iter()
                    .filter(|timing| timing.name.contains(metric))
                    .map(|timing| timing.duration_ms)
                    .collect();
                if values.is_empty() {
                    return None;
                }

                let average_ms = values.iter().sum::<f64>() / values.len() as f64;
                Some(TargetReport {
                    metric: metric.to_string(),
                    average_ms,
                    target_ms: *target_ms,
                    status: if average_ms <= *target_ms {
                        TargetStatus::Pass
                    } else {
                        TargetStatus::Fail
                    },
                })
            })
            .collect()
    }

    pub async fn export_json(&self) -> Result<String> {
        let state = self.inner.lock().await;
        Ok(serde_json::to_string_pretty(&state.recent_timings)?)
    }

    pub async fn reset(&self) {
        let mut state = self.inner.lock().await;
        let pid = state.pid;
        state.recent_timings.clear();
        state.marks.clear();
        state.timing_count = 0;
        // Re-establish baseline for CPU after reset
        state.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));
        info!("Performance metrics cleared");
    }
}

impl Clone for MetricsCollector {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keeps_only_recent_timings() {
        let metrics = MetricsCollector::new();
        for i in 0..(MAX_RECENT_TIMINGS + 5) {
            metrics
                .record_timing(format!("API Response Time /t{i}"), Duration::from_millis(1))
                .await;
        }

        let snapshot = metrics.get_snapshot().await;
        assert_eq!(snapshot.recent_timings.len(), MAX_RECENT_TIMINGS);
        assert_eq!(snapshot.timing_count, (MAX_RECENT_TIMINGS + 5) as u64);
        assert_eq!(snapshot.recent_timings[0].name, "API Response Time /t5");
    }

    #[tokio::test]
    async fn targets_report_pass_and_fail() {
        let metrics = MetricsCollector::new();
        metrics
            .record_timing("API Response Time /geojson".into(), Duration::from_millis(500))
            .await;
        metrics
            .record_timing("API Response Time /scores".into(), Duration::from_millis(1500))
            .await;
        metrics
            .record_timing("Component Render Time map".into(), Duration::from_millis(250))
            .await;

        let report = metrics.check_targets().await;
        assert_eq!(report.len(), 2);

        let api = &report[0];
        assert_eq!(api.metric, "API Response Time");
        assert!((api.average_ms - 1000.0).abs() < 1.0);
        assert_eq!(api.status, TargetStatus::Pass);

        assert_eq!(report[1].metric, "Component Render Time");
        assert_eq!(report[1].status, TargetStatus::Fail);
    }

    #[tokio::test]
    async fn end_without_start_records_nothing() {
        let metrics = MetricsCollector::new();
        assert!(metrics.end_measure("Page Load Time").await.is_none());

        metrics.start_measure("Page Load Time").await;
        assert!(metrics.end_measure("Page Load Time").await.is_some());
        assert!(metrics.end_measure("Page Load Time").await.is_none());

        let exported = metrics.export_json().await.unwrap();
        assert!(exported.contains("Page Load Time"));

        metrics.reset().await;
        assert_eq!(metrics.get_snapshot().await.timing_count, 0);
    }
}
