use std::sync::{Arc, RwLock};

use log::{info, warn};
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::{ApiClient, ApiError, ApiResult, Endpoint, RequestOptions};
use crate::events::{self, EventSink, SESSION_CHANGED};

use super::state::{
    LoginResponse, RefreshFailurePolicy, RefreshResponse, SessionSnapshot, SessionStatus,
};

/// Owns the session. Cloned into every consumer; consumers that react to
/// token changes subscribe to the watch channel.
#[derive(Clone)]
pub struct AuthController {
    session: Arc<watch::Sender<SessionSnapshot>>,
    api: ApiClient,
    policy: Arc<RwLock<RefreshFailurePolicy>>,
    sink: Arc<dyn EventSink>,
}

impl AuthController {
    pub fn new(api: ApiClient, policy: RefreshFailurePolicy, sink: Arc<dyn EventSink>) -> Self {
        let (session, _) = watch::channel(SessionSnapshot::default());
        Self {
            session: Arc::new(session),
            api,
            policy: Arc::new(RwLock::new(policy)),
            sink,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.borrow().clone()
    }

    /// Token as of now. In-flight requests keep whatever they were sent with.
    pub fn access_token(&self) -> Option<String> {
        self.session.borrow().access_token.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.session.subscribe()
    }

    pub fn refresh_failure_policy(&self) -> RefreshFailurePolicy {
        match self.policy.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn set_refresh_failure_policy(&self, policy: RefreshFailurePolicy) {
        match self.policy.write() {
            Ok(mut guard) => *guard = policy,
            Err(poisoned) => *poisoned.into_inner() = policy,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<SessionSnapshot> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ApiError::InvalidInput("email and password are required".into()));
        }

        let began = self.session.send_if_modified(|session| {
            if session.status == SessionStatus::Authenticating {
                return false;
            }
            *session = SessionSnapshot {
                status: SessionStatus::Authenticating,
                ..SessionSnapshot::default()
            };
            true
        });
        if !began {
            return Err(ApiError::InvalidInput("a sign-in is already in progress".into()));
        }
        self.publish();

        let body = json!({ "email": email.trim(), "password": password });
        let outcome = self
            .api
            .fetch_json::<LoginResponse>(&Endpoint::Login, RequestOptions::default().with_body(body))
            .await
            .map_err(|err| match err {
                ApiError::Unauthorized(_) => {
                    ApiError::AuthenticationFailure("invalid email or password".into())
                }
                ApiError::Status { status, body } if status.is_client_error() => {
                    ApiError::AuthenticationFailure(if body.is_empty() {
                        status.to_string()
                    } else {
                        body
                    })
                }
                other => other,
            });

        // A logout while the sign-in was in flight wins.
        match outcome {
            Ok(response) => {
                let committed = self.session.send_if_modified(|session| {
                    if session.status != SessionStatus::Authenticating {
                        return false;
                    }
                    *session = SessionSnapshot {
                        status: SessionStatus::Authenticated,
                        user: response.user,
                        access_token: Some(response.access_token),
                    };
                    true
                });
                if !committed {
                    warn!("sign-in response dropped: signed out meanwhile");
                    return Err(ApiError::AuthenticationFailure(
                        "signed out during sign-in".into(),
                    ));
                }
                info!("signed in as {}", email.trim());
                self.publish();
                Ok(self.snapshot())
            }
            Err(err) => {
                let reset = self.session.send_if_modified(|session| {
                    if session.status != SessionStatus::Authenticating {
                        return false;
                    }
                    *session = SessionSnapshot::default();
                    true
                });
                warn!("sign-in failed: {err}");
                if reset {
                    self.publish();
                }
                Err(err)
            }
        }
    }

    /// Swaps the access token using the refresh cookie held by the client.
    pub async fn refresh(&self) -> ApiResult<()> {
        let began = self.session.send_if_modified(|session| {
            if session.status != SessionStatus::Authenticated {
                return false;
            }
            session.status = SessionStatus::Refreshing;
            true
        });
        if !began {
            return Err(ApiError::RefreshFailure("no active session to refresh".into()));
        }
        self.publish();

        let outcome = self
            .api
            .fetch_json::<RefreshResponse>(&Endpoint::Refresh, RequestOptions::default())
            .await;

        match outcome {
            Ok(response) => {
                // A logout while the refresh was in flight wins.
                self.session.send_if_modified(|session| {
                    if session.status != SessionStatus::Refreshing {
                        return false;
                    }
                    session.status = SessionStatus::Authenticated;
                    session.access_token = Some(response.access_token);
                    true
                });
                self.publish();
                Ok(())
            }
            Err(err) => {
                let policy = self.refresh_failure_policy();
                warn!("token refresh failed ({policy:?}): {err}");
                self.session.send_if_modified(|session| {
                    if session.status != SessionStatus::Refreshing {
                        return false;
                    }
                    match policy {
                        RefreshFailurePolicy::ForceLogout => *session = SessionSnapshot::default(),
                        RefreshFailurePolicy::KeepSession => {
                            session.status = SessionStatus::Authenticated
                        }
                    }
                    true
                });
                self.publish();
                Err(ApiError::RefreshFailure(err.to_string()))
            }
        }
    }

    /// Clears the local session immediately, then tells the backend to drop
    /// the refresh cookie without waiting for the answer.
    pub fn logout(&self) -> JoinHandle<()> {
        self.session
            .send_modify(|session| *session = SessionSnapshot::default());
        self.publish();
        info!("signed out");

        let api = self.api.clone();
        tokio::spawn(async move {
            if let Err(err) = api.send(&Endpoint::Logout, RequestOptions::default()).await {
                warn!("logout notification failed: {err}");
            }
        })
    }

    fn publish(&self) {
        let view = self.session.borrow().view();
        events::publish(self.sink.as_ref(), SESSION_CHANGED, &view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiConfig;
    use crate::events::testing::RecordingSink;
    use crate::metrics::MetricsCollector;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn controller(server: &MockServer, policy: RefreshFailurePolicy) -> (AuthController, Arc<RecordingSink>) {
        let api = ApiClient::new(
            ApiConfig::with_base(&server.uri()).unwrap(),
            MetricsCollector::new(),
        )
        .unwrap();
        let sink = Arc::new(RecordingSink::default());
        (AuthController::new(api, policy, sink.clone()), sink)
    }

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({"email": "ops@example.com", "password": "s3cret"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "refresh=r-1; Path=/")
                    .set_body_json(json!({
                        "user": {"id": 7, "email": "ops@example.com", "role": "inspector"},
                        "accessToken": "tok-1"
                    })),
            )
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn login_populates_the_session() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        let (auth, sink) = controller(&server, RefreshFailurePolicy::ForceLogout);

        let session = auth.login("ops@example.com", "s3cret").await.unwrap();

        assert_eq!(session.status, SessionStatus::Authenticated);
        assert_eq!(session.access_token.as_deref(), Some("tok-1"));
        let user = session.user.unwrap();
        assert_eq!(user.email.as_deref(), Some("ops@example.com"));
        assert_eq!(user.extra["role"], json!("inspector"));

        let statuses: Vec<String> = sink
            .named(SESSION_CHANGED)
            .iter()
            .map(|v| v["status"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(statuses, vec!["authenticating", "authenticated"]);
        assert!(sink.named(SESSION_CHANGED)[1].get("accessToken").is_none());
    }

    #[tokio::test]
    async fn bad_credentials_leave_the_session_anonymous() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        let (auth, _) = controller(&server, RefreshFailurePolicy::ForceLogout);

        let err = auth.login("ops@example.com", "wrong").await.unwrap_err();

        assert!(matches!(err, ApiError::AuthenticationFailure(_)));
        assert_eq!(auth.snapshot(), SessionSnapshot::default());
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_credentials_are_rejected_locally() {
        let server = MockServer::start().await;
        let (auth, _) = controller(&server, RefreshFailurePolicy::ForceLogout);

        assert!(matches!(
            auth.login("  ", "x").await,
            Err(ApiError::InvalidInput(_))
        ));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn refresh_rotates_the_token_using_the_cookie() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .and(header("cookie", "refresh=r-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "tok-2"})))
            .expect(1)
            .mount(&server)
            .await;
        let (auth, _) = controller(&server, RefreshFailurePolicy::ForceLogout);
        auth.login("ops@example.com", "s3cret").await.unwrap();

        auth.refresh().await.unwrap();

        let session = auth.snapshot();
        assert_eq!(session.status, SessionStatus::Authenticated);
        assert_eq!(session.access_token.as_deref(), Some("tok-2"));
        assert!(session.user.is_some());
    }

    #[tokio::test]
    async fn refresh_failure_follows_the_policy() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let (auth, _) = controller(&server, RefreshFailurePolicy::KeepSession);
        auth.login("ops@example.com", "s3cret").await.unwrap();
        assert!(matches!(auth.refresh().await, Err(ApiError::RefreshFailure(_))));
        assert_eq!(auth.snapshot().status, SessionStatus::Authenticated);
        assert_eq!(auth.access_token().as_deref(), Some("tok-1"));

        auth.set_refresh_failure_policy(RefreshFailurePolicy::ForceLogout);
        assert!(auth.refresh().await.is_err());
        assert_eq!(auth.snapshot(), SessionSnapshot::default());
    }

    #[tokio::test]
    async fn refresh_requires_a_session() {
        let server = MockServer::start().await;
        let (auth, _) = controller(&server, RefreshFailurePolicy::ForceLogout);
        assert!(matches!(auth.refresh().await, Err(ApiError::RefreshFailure(_))));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn logout_clears_locally_before_the_backend_answers() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(500).set_delay(std::time::Duration::from_millis(200)))
            .expect(1)
            .mount(&server)
            .await;
        let (auth, _) = controller(&server, RefreshFailurePolicy::ForceLogout);
        auth.login("ops@example.com", "s3cret").await.unwrap();
        let mut updates = auth.subscribe();

        let notify = auth.logout();
        assert_eq!(auth.snapshot(), SessionSnapshot::default());
        assert!(updates.has_changed().unwrap());
        assert!(updates.borrow_and_update().access_token.is_none());

        // A failing backend acknowledgement is only logged.
        notify.await.unwrap();
        assert_eq!(auth.snapshot(), SessionSnapshot::default());
    }

    #[tokio::test]
    async fn logout_during_sign_in_wins() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"user": {"id": 7}, "accessToken": "tok-late"}))
                    .set_delay(std::time::Duration::from_millis(200)),
            )
            .mount(&server)
            .await;
        let (auth, sink) = controller(&server, RefreshFailurePolicy::ForceLogout);

        let pending = {
            let auth = auth.clone();
            tokio::spawn(async move { auth.login("ops@example.com", "s3cret").await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(auth.snapshot().status, SessionStatus::Authenticating);
        let _ = auth.logout();

        let outcome = pending.await.unwrap();
        assert!(matches!(outcome, Err(ApiError::AuthenticationFailure(_))));
        assert_eq!(auth.snapshot(), SessionSnapshot::default());
        let last = sink.named(SESSION_CHANGED).pop().unwrap();
        assert_eq!(last["status"], "anonymous");
        assert_eq!(last["authenticated"], false);
    }

    #[tokio::test]
    async fn logout_during_failed_sign_in_stays_anonymous() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_delay(std::time::Duration::from_millis(200)))
            .mount(&server)
            .await;
        let (auth, _) = controller(&server, RefreshFailurePolicy::ForceLogout);

        let pending = {
            let auth = auth.clone();
            tokio::spawn(async move { auth.login("ops@example.com", "s3cret").await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let _ = auth.logout();

        assert!(pending.await.unwrap().is_err());
        assert_eq!(auth.snapshot(), SessionSnapshot::default());
    }

    async fn sign_in_then_logout_during_refresh(
        refresh: ResponseTemplate,
        policy: RefreshFailurePolicy,
    ) -> (AuthController, ApiResult<()>) {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(refresh.set_delay(std::time::Duration::from_millis(200)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        let (auth, _) = controller(&server, policy);
        auth.login("ops@example.com", "s3cret").await.unwrap();

        let pending = {
            let auth = auth.clone();
            tokio::spawn(async move { auth.refresh().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(auth.snapshot().status, SessionStatus::Refreshing);
        auth.logout().await.unwrap();

        let outcome = pending.await.unwrap();
        (auth, outcome)
    }

    #[tokio::test]
    async fn logout_during_successful_refresh_wins() {
        let (auth, outcome) = sign_in_then_logout_during_refresh(
            ResponseTemplate::new(200).set_body_json(json!({"accessToken": "tok-2"})),
            RefreshFailurePolicy::ForceLogout,
        )
        .await;

        assert!(outcome.is_ok());
        assert_eq!(auth.snapshot(), SessionSnapshot::default());
    }

    #[tokio::test]
    async fn logout_during_failed_refresh_wins_over_keep_session() {
        let (auth, outcome) = sign_in_then_logout_during_refresh(
            ResponseTemplate::new(401),
            RefreshFailurePolicy::KeepSession,
        )
        .await;

        assert!(matches!(outcome, Err(ApiError::RefreshFailure(_))));
        assert_eq!(auth.snapshot(), SessionSnapshot::default());
    }
}
