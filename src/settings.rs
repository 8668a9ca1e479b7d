use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::auth::RefreshFailurePolicy;
use crate::segment::SegmentFetchMode;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub refresh_failure_policy: RefreshFailurePolicy,
    pub segment_fetch_mode: SegmentFetchMode,
    /// Query string of the last applied filters, restored on start.
    pub last_filters_query: Option<String>,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring unreadable settings file {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> UserSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: UserSettings) -> Result<()> {
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    pub fn set_last_filters_query(&self, query: Option<String>) -> Result<()> {
        let mut guard = self.write();
        if guard.last_filters_query == query {
            return Ok(());
        }
        guard.last_filters_query = query;
        self.persist(&guard)
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();

        assert_eq!(store.get(), UserSettings::default());
        assert_eq!(store.get().refresh_failure_policy, RefreshFailurePolicy::ForceLogout);
        assert_eq!(store.get().segment_fetch_mode, SegmentFetchMode::Parallel);
    }

    #[test]
    fn updates_are_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        store
            .update(UserSettings {
                refresh_failure_policy: RefreshFailurePolicy::KeepSession,
                segment_fetch_mode: SegmentFetchMode::Sequential,
                last_filters_query: None,
            })
            .unwrap();
        store
            .set_last_filters_query(Some("type=nid&pmin=0&pmax=100".into()))
            .unwrap();

        let reopened = SettingsStore::new(path).unwrap().get();
        assert_eq!(reopened.refresh_failure_policy, RefreshFailurePolicy::KeepSession);
        assert_eq!(reopened.segment_fetch_mode, SegmentFetchMode::Sequential);
        assert_eq!(
            reopened.last_filters_query.as_deref(),
            Some("type=nid&pmin=0&pmax=100")
        );
    }

    #[test]
    fn unreadable_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.get(), UserSettings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"segmentFetchMode": "sequential"}"#).unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.get().segment_fetch_mode, SegmentFetchMode::Sequential);
        assert_eq!(store.get().refresh_failure_policy, RefreshFailurePolicy::ForceLogout);
    }
}
