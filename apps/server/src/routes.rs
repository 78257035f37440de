//! Route definitions and request handlers.
//!
//! The process endpoint never surfaces a pipeline failure as an HTTP error:
//! any `FunnelError` is caught once and rendered as a JSON error body, so
//! the caller always gets a well-formed response. Artifact downloads are the
//! only handlers that speak in status codes.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Json, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use contextfunnel_core::{Pipeline, SilentProgress};
use contextfunnel_shared::{FunnelError, RunId};

/// Shared handler state.
#[derive(Clone)]
pub(crate) struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// Build the application router.
pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/process", post(process_handler))
        .route("/api/artifacts/:run_id/:name", get(artifact_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ProcessRequest {
    input: String,
}

#[derive(Serialize)]
struct ProcessResponse {
    run_id: String,
    kind: &'static str,
    rule: &'static str,
    uncompressed_tokens: usize,
    compressed_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    url_count: Option<usize>,
    text: String,
    artifacts: Vec<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Process one reference through the pipeline.
async fn process_handler(
    State(state): State<AppState>,
    Json(request): Json<ProcessRequest>,
) -> Response {
    match state.pipeline.process(&request.input, &SilentProgress).await {
        Ok(outcome) => {
            info!(run_id = %outcome.run_id, kind = %outcome.kind, "request processed");
            Json(ProcessResponse {
                run_id: outcome.run_id.to_string(),
                kind: outcome.kind.as_str(),
                rule: outcome.rule,
                uncompressed_tokens: outcome.uncompressed_tokens,
                compressed_tokens: outcome.compressed_tokens,
                url_count: outcome.url_count,
                text: outcome.text,
                artifacts: outcome
                    .artifacts
                    .iter()
                    .map(|artifact| artifact.name.clone())
                    .collect(),
            })
            .into_response()
        }
        Err(e) => Json(ErrorResponse {
            error: ErrorBody {
                kind: e.kind_tag(),
                message: e.to_string(),
            },
        })
        .into_response(),
    }
}

/// Download one artifact of a previous run.
async fn artifact_handler(
    State(state): State<AppState>,
    Path((run_id, name)): Path<(String, String)>,
) -> Response {
    let run: RunId = match run_id.parse() {
        Ok(run) => run,
        Err(_) => return (StatusCode::NOT_FOUND, "unknown run\n").into_response(),
    };

    match state.pipeline.store().get(run, &name) {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            bytes,
        )
            .into_response(),
        Err(FunnelError::ArtifactNotFound { name }) => {
            (StatusCode::NOT_FOUND, format!("artifact not found: {name}\n")).into_response()
        }
        Err(FunnelError::Validation { message }) => {
            (StatusCode::BAD_REQUEST, format!("{message}\n")).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Liveness check.
async fn health_handler() -> Response {
    Json(json!({"status": "ok"})).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use contextfunnel_artifacts::ArtifactStore;
    use contextfunnel_core::DB_FILE_NAME;
    use contextfunnel_shared::{AppConfig, Result, SourceKind};
    use contextfunnel_sources::{Dispatcher, SourceExtractor};
    use contextfunnel_storage::Storage;
    use std::path::PathBuf;
    use tower::ServiceExt;

    struct FakeExtractor {
        kind: SourceKind,
        result: std::result::Result<&'static str, &'static str>,
    }

    #[async_trait]
    impl SourceExtractor for FakeExtractor {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn name(&self) -> &str {
            "fake"
        }

        async fn extract(&self, _reference: &str) -> Result<String> {
            match self.result {
                Ok(text) => Ok(text.to_string()),
                Err(message) => Err(FunnelError::source(self.kind, message)),
            }
        }
    }

    async fn test_app(extractors: Vec<Box<dyn SourceExtractor>>) -> (Router, PathBuf) {
        let dir = std::env::temp_dir().join(format!("cf-server-test-{}", uuid::Uuid::now_v7()));
        let dispatcher = Dispatcher::from_config(&AppConfig::default())
            .unwrap()
            .with_extractors(extractors);
        let pipeline = Pipeline::new(
            dispatcher,
            ArtifactStore::open(&dir).unwrap(),
            Storage::open(&dir.join(DB_FILE_NAME)).await.unwrap(),
        );
        let state = AppState {
            pipeline: Arc::new(pipeline),
        };
        (router(state), dir)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn process_request(input: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/process")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::to_vec(&json!({"input": input})).unwrap(),
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let (app, dir) = test_app(vec![]).await;

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok"}));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn process_then_download_roundtrip() {
        let (app, dir) = test_app(vec![Box::new(FakeExtractor {
            kind: SourceKind::Repo,
            result: Ok("extracted repo text\n"),
        })])
        .await;

        let response = app
            .clone()
            .oneshot(process_request("https://github.com/acme/widget"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["kind"], "repo");
        assert_eq!(body["rule"], "github-host");
        assert_eq!(body["text"], "extracted repo text\n");
        assert!(body["uncompressed_tokens"].as_u64().unwrap() > 0);
        assert!(body.get("url_count").is_none());
        assert_eq!(
            body["artifacts"],
            json!(["uncompressed_output.txt", "compressed_output.txt"])
        );

        let run_id = body["run_id"].as_str().unwrap();
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/artifacts/{run_id}/uncompressed_output.txt"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), b"extracted repo text\n");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn pipeline_failure_renders_json_error_not_5xx() {
        let (app, dir) = test_app(vec![Box::new(FakeExtractor {
            kind: SourceKind::Repo,
            result: Err("upstream said no"),
        })])
        .await;

        let response = app
            .oneshot(process_request("https://github.com/acme/widget"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["error"]["kind"], "source");
        assert!(
            body["error"]["message"]
                .as_str()
                .unwrap()
                .contains("upstream said no")
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn blank_input_renders_validation_error() {
        let (app, dir) = test_app(vec![]).await;

        let response = app.oneshot(process_request("   ")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["error"]["kind"], "validation");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn unknown_run_download_is_404() {
        let (app, dir) = test_app(vec![]).await;

        let run_id = uuid::Uuid::now_v7();
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/artifacts/{run_id}/uncompressed_output.txt"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn off_trio_artifact_name_is_400() {
        let (app, dir) = test_app(vec![]).await;

        let run_id = uuid::Uuid::now_v7();
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/artifacts/{run_id}/secrets.txt"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn malformed_run_id_is_404() {
        let (app, dir) = test_app(vec![]).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/artifacts/not-a-uuid/uncompressed_output.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
