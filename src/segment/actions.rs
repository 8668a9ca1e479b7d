use serde_json::json;

use crate::api::{ApiClient, ApiError, ApiResult, Endpoint, RequestOptions};

/// Write operations on a segment. These live under the actions base
/// (`{api}/api` unless configured otherwise), not the read API root.
#[derive(Clone)]
pub struct SegmentActions {
    api: ApiClient,
}

impl SegmentActions {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn mark_repaired(&self, token: Option<&str>, segment_id: &str) -> ApiResult<()> {
        let segment_id = require_id(segment_id)?;
        self.api
            .send(
                &Endpoint::SegmentRepair(segment_id),
                RequestOptions {
                    token,
                    ..RequestOptions::default()
                },
            )
            .await?;
        log::info!("segment marked repaired");
        Ok(())
    }

    /// Blank notes are rejected without a request.
    pub async fn add_note(&self, token: Option<&str>, segment_id: &str, note: &str) -> ApiResult<()> {
        let segment_id = require_id(segment_id)?;
        let note = note.trim();
        if note.is_empty() {
            return Err(ApiError::InvalidInput("note must not be empty".into()));
        }

        self.api
            .send(
                &Endpoint::SegmentNote(segment_id),
                RequestOptions {
                    token,
                    ..RequestOptions::default()
                }
                .with_body(json!({ "note": note })),
            )
            .await?;
        Ok(())
    }
}

fn require_id(segment_id: &str) -> ApiResult<String> {
    let segment_id = segment_id.trim();
    if segment_id.is_empty() {
        return Err(ApiError::InvalidInput("segment id is required".into()));
    }
    Ok(segment_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiConfig;
    use crate::metrics::MetricsCollector;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn actions(server: &MockServer) -> SegmentActions {
        SegmentActions::new(
            ApiClient::new(
                ApiConfig::with_base(&server.uri()).unwrap(),
                MetricsCollector::new(),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn repair_goes_to_the_actions_base() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/segments/7/repair"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        actions(&server).mark_repaired(Some("tok"), "7").await.unwrap();
    }

    #[tokio::test]
    async fn note_posts_the_trimmed_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/segments/7/note"))
            .and(body_json(json!({"note": "rebouché le 3 mars"})))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        actions(&server)
            .add_note(Some("tok"), "7", "  rebouché le 3 mars ")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejects_bad_input_locally() {
        let server = MockServer::start().await;
        let actions = actions(&server);

        assert!(matches!(
            actions.add_note(Some("tok"), "7", "   ").await,
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            actions.mark_repaired(Some("tok"), " ").await,
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            actions.mark_repaired(None, "7").await,
            Err(ApiError::MissingToken)
        ));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn backend_errors_are_returned() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = actions(&server).mark_repaired(Some("tok"), "99").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
