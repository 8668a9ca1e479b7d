use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated,
    Refreshing,
}

/// What happens to the session when `/auth/refresh` fails.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RefreshFailurePolicy {
    /// Drop the session; the user has to sign in again.
    #[default]
    ForceLogout,
    /// Keep the current token until the backend starts rejecting it.
    KeepSession,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub user: Option<UserInfo>,
    pub access_token: Option<String>,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Web-view projection. The token stays on the Rust side.
    pub fn view(&self) -> SessionView {
        SessionView {
            status: self.status,
            user: self.user.clone(),
            authenticated: self.is_authenticated(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub status: SessionStatus,
    pub user: Option<UserInfo>,
    pub authenticated: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub user: Option<UserInfo>,
    #[serde(rename = "accessToken", alias = "access_token")]
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RefreshResponse {
    #[serde(rename = "accessToken", alias = "access_token")]
    pub access_token: String,
}
