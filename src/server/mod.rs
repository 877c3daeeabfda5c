//! HTTP server setup and routing.
//!
//! The server is a thin wrapper: it deserializes the request, hands it to the
//! pipeline, and maps the pipeline's failure classification onto status codes.

use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::pipeline::{ExtractionRequest, Pipeline, PipelineError};

/// Message returned when a failure cannot be classified
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred on the server.";

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub pipeline: Arc<Pipeline>,
}

/// JSON error body for every non-200 response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Build the application router
pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/api/extract-recipe", post(extract_recipe))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Run the HTTP server until shutdown
pub async fn run(ctx: AppContext, addr: SocketAddr) -> crate::Result<()> {
    let app = router(ctx);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn extract_recipe(
    State(ctx): State<AppContext>,
    body: Result<Json<ExtractionRequest>, JsonRejection>,
) -> Response {
    // malformed body or missing url: report the first deserialization error
    let Json(request) = match body {
        Ok(json) => json,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    message: rejection.body_text(),
                }),
            )
                .into_response();
        }
    };

    let pipeline = ctx.pipeline.clone();
    let outcome = tokio::spawn(async move { pipeline.run(request).await }).await;

    match outcome {
        Ok(Ok(recipe)) => (StatusCode::OK, Json(recipe)).into_response(),
        Ok(Err(PipelineError::BadRequest(message))) => {
            (StatusCode::BAD_REQUEST, Json(ErrorBody { message })).into_response()
        }
        Ok(Err(PipelineError::ServerError(message))) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody { message }),
        )
            .into_response(),
        // panic inside the task: log the detail, return the generic message
        Err(join_error) => {
            tracing::error!(error = %join_error, "extraction task failed unexpectedly");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    message: GENERIC_ERROR_MESSAGE.to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AiConfig;
    use crate::extract::{ExtractionEngine, MockGenerativeModel};
    use crate::transcript::{MockTranscriptSource, Transcript, TranscriptError, TranscriptSegment};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const MODEL_PAYLOAD: &str = r#"{
        "title": "Kimchi Stew",
        "ingredients": [{"name": "kimchi"}, {"name": "tofu"}, {"name": "scallions"}],
        "instructions": [
            {"step": 1, "description": "Saute kimchi."},
            {"step": 2, "description": "Add water."},
            {"step": 3, "description": "Add tofu."},
            {"step": 4, "description": "Simmer."}
        ]
    }"#;

    fn app(transcripts: MockTranscriptSource, model: MockGenerativeModel) -> Router {
        let pipeline = Pipeline::new(
            Arc::new(transcripts),
            ExtractionEngine::new(
                Arc::new(model),
                AiConfig {
                    model: "gemini-2.0-flash".to_string(),
                    api_key: Some("test-key".to_string()),
                    request_timeout_secs: 60,
                },
            ),
        );
        router(AppContext {
            pipeline: Arc::new(pipeline),
        })
    }

    fn transcript() -> Transcript {
        Transcript {
            segments: (0..5)
                .map(|i| TranscriptSegment {
                    start_ms: i * 1000,
                    duration_ms: 1000,
                    text: format!("segment {}", i),
                })
                .collect(),
            language: "en".to_string(),
            auto_generated: false,
        }
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/extract-recipe")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_url_returns_400_with_first_violation() {
        let app = app(MockTranscriptSource::new(), MockGenerativeModel::new());
        let response = app
            .oneshot(post_json(r#"{"locale": "en"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["message"].as_str().unwrap().contains("url"));
    }

    #[tokio::test]
    async fn test_invalid_locale_returns_400_without_collaborator_calls() {
        let mut transcripts = MockTranscriptSource::new();
        transcripts.expect_fetch_transcript().times(0);
        let mut model = MockGenerativeModel::new();
        model.expect_generate().times(0);

        let response = app(transcripts, model)
            .oneshot(post_json(
                r#"{"url": "https://www.youtube.com/watch?v=abc123", "locale": "de"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_captionless_video_returns_400_transcript_error() {
        let mut transcripts = MockTranscriptSource::new();
        transcripts
            .expect_fetch_transcript()
            .times(1)
            .returning(|_, _| Err(TranscriptError::Unavailable));
        let mut model = MockGenerativeModel::new();
        model.expect_generate().times(0);

        let response = app(transcripts, model)
            .oneshot(post_json(
                r#"{"url": "https://www.youtube.com/watch?v=abc123"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("Transcript Error"));
    }

    #[tokio::test]
    async fn test_schema_violation_returns_500_ai_error() {
        let mut transcripts = MockTranscriptSource::new();
        transcripts
            .expect_fetch_transcript()
            .times(1)
            .returning(|_, _| Ok(transcript()));
        let mut model = MockGenerativeModel::new();
        model.expect_generate().times(1).returning(|_, _| {
            Ok(r#"{"title": "missing everything else entirely"}"#.to_string())
        });

        let response = app(transcripts, model)
            .oneshot(post_json(
                r#"{"url": "https://www.youtube.com/watch?v=abc123"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        let message = body["message"].as_str().unwrap();
        assert!(message.contains("AI Processing Error"));
        assert!(!message.contains("missing everything else entirely"));
    }

    #[tokio::test]
    async fn test_end_to_end_happy_path() {
        let input_url = "https://www.youtube.com/watch?v=abc123";

        let mut transcripts = MockTranscriptSource::new();
        transcripts
            .expect_fetch_transcript()
            .times(1)
            .returning(|_, _| Ok(transcript()));
        let mut model = MockGenerativeModel::new();
        model
            .expect_generate()
            .times(1)
            .returning(|_, _| Ok(MODEL_PAYLOAD.to_string()));

        let response = app(transcripts, model)
            .oneshot(post_json(
                r#"{"url": "https://www.youtube.com/watch?v=abc123", "locale": "en"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["sourceUrl"], input_url);
        assert_eq!(body["title"], "Kimchi Stew");
        assert_eq!(body["ingredients"].as_array().unwrap().len(), 3);
        assert_eq!(body["instructions"].as_array().unwrap().len(), 4);
        assert!(body.get("videoTitle").is_none());
    }

    #[tokio::test]
    async fn test_panicking_collaborator_yields_generic_500() {
        // a panic inside the request task must surface as the generic 500,
        // not tear down the server; this relies on panics unwinding, so the
        // release profile must not set panic = "abort"
        struct PanickingTranscripts;

        #[async_trait::async_trait]
        impl crate::transcript::TranscriptSource for PanickingTranscripts {
            async fn fetch_transcript(
                &self,
                _video: &crate::transcript::VideoId,
                _locale: crate::recipe::Locale,
            ) -> Result<Transcript, TranscriptError> {
                panic!("collaborator blew up");
            }
        }

        let pipeline = Pipeline::new(
            Arc::new(PanickingTranscripts),
            ExtractionEngine::new(
                Arc::new(MockGenerativeModel::new()),
                AiConfig {
                    model: "gemini-2.0-flash".to_string(),
                    api_key: Some("test-key".to_string()),
                    request_timeout_secs: 60,
                },
            ),
        );
        let app = router(AppContext {
            pipeline: Arc::new(pipeline),
        });
        let response = app
            .clone()
            .oneshot(post_json(
                r#"{"url": "https://www.youtube.com/watch?v=abc123"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], GENERIC_ERROR_MESSAGE);

        // the router is still serviceable after the panic
        let health = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = app(MockTranscriptSource::new(), MockGenerativeModel::new());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
