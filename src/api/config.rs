use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Method;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://api:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const ENV_API_BASE: &str = "PAVEMAP_API_BASE_URL";
const ENV_AUTH_BASE: &str = "PAVEMAP_AUTH_BASE_URL";
const ENV_ACTIONS_BASE: &str = "PAVEMAP_ACTIONS_BASE_URL";
const ENV_TIMEOUT: &str = "PAVEMAP_HTTP_TIMEOUT_SECS";

/// Which configured base URL an endpoint is resolved against.
///
/// The backend does not serve everything from one root: the segment actions
/// live under an extra `/api` prefix and the auth service may sit on another
/// origin entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseKind {
    Api,
    Auth,
    Actions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Login,
    Refresh,
    Logout,
    GeoJson,
    Scores,
    Segment(String),
    SegmentDefects(String),
    SegmentHistory(String),
    SegmentRepair(String),
    SegmentNote(String),
}

impl Endpoint {
    pub fn method(&self) -> Method {
        match self {
            Endpoint::Login
            | Endpoint::Refresh
            | Endpoint::Logout
            | Endpoint::SegmentNote(_) => Method::POST,
            Endpoint::SegmentRepair(_) => Method::PUT,
            Endpoint::GeoJson
            | Endpoint::Scores
            | Endpoint::Segment(_)
            | Endpoint::SegmentDefects(_)
            | Endpoint::SegmentHistory(_) => Method::GET,
        }
    }

    pub fn base(&self) -> BaseKind {
        match self {
            Endpoint::Login | Endpoint::Refresh | Endpoint::Logout => BaseKind::Auth,
            Endpoint::SegmentRepair(_) | Endpoint::SegmentNote(_) => BaseKind::Actions,
            _ => BaseKind::Api,
        }
    }

    /// Bearer token required. The auth endpoints rely on the refresh cookie instead.
    pub fn requires_token(&self) -> bool {
        self.base() != BaseKind::Auth
    }

    fn segments(&self) -> Vec<&str> {
        match self {
            Endpoint::Login => vec!["auth", "login"],
            Endpoint::Refresh => vec!["auth", "refresh"],
            Endpoint::Logout => vec!["auth", "logout"],
            Endpoint::GeoJson => vec!["geojson"],
            Endpoint::Scores => vec!["scores"],
            Endpoint::Segment(id) => vec!["segments", id],
            Endpoint::SegmentDefects(id) => vec!["segments", id, "defects"],
            Endpoint::SegmentHistory(id) => vec!["segments", id, "score-history"],
            Endpoint::SegmentRepair(id) => vec!["segments", id, "repair"],
            Endpoint::SegmentNote(id) => vec!["segments", id, "note"],
        }
    }

    /// Path relative to the endpoint's base, used for logging and timings.
    pub fn path(&self) -> String {
        let mut path = String::new();
        for segment in self.segments() {
            path.push('/');
            path.push_str(segment);
        }
        path
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_base: Url,
    pub auth_base: Url,
    pub actions_base: Url,
    pub timeout: Duration,
}

impl ApiConfig {
    /// Every endpoint served from `base`; actions under `{base}/api`.
    pub fn with_base(base: &str) -> Result<Self> {
        let api_base = parse_base(base)?;
        let actions_base = parse_base(&format!("{}/api", base.trim_end_matches('/')))?;
        Ok(Self {
            auth_base: api_base.clone(),
            api_base,
            actions_base,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn from_env() -> Result<Self> {
        let api_base = env_or(ENV_API_BASE).unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let mut config = Self::with_base(&api_base)?;

        if let Some(auth) = env_or(ENV_AUTH_BASE) {
            config.auth_base = parse_base(&auth)?;
        }
        if let Some(actions) = env_or(ENV_ACTIONS_BASE) {
            config.actions_base = parse_base(&actions)?;
        }
        if let Some(raw) = env_or(ENV_TIMEOUT) {
            let secs: u64 = raw
                .parse()
                .with_context(|| format!("{ENV_TIMEOUT} must be a whole number of seconds, got '{raw}'"))?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn base_for(&self, kind: BaseKind) -> &Url {
        match kind {
            BaseKind::Api => &self.api_base,
            BaseKind::Auth => &self.auth_base,
            BaseKind::Actions => &self.actions_base,
        }
    }

    pub fn url_for(&self, endpoint: &Endpoint) -> Url {
        let mut url = self.base_for(endpoint.base()).clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(endpoint.segments());
        }
        url
    }
}

fn env_or(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_base(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim_end_matches('/'))
        .with_context(|| format!("invalid base URL '{raw}'"))?;
    if url.cannot_be_a_base() {
        anyhow::bail!("'{raw}' cannot be used as a base URL");
    }
    Ok(url)
}
