//! Routes - proxy の 3 エンドポイント
//!
//! | Method | Path                        | Upstream                     |
//! |--------|-----------------------------|------------------------------|
//! | POST   | `/api/generate-video`       | `create_task`                |
//! | GET    | `/api/video-status/:task_id`| `task_status`                |
//! | GET    | `/api/videos/:task_id`      | `fetch_video` (streamed)     |
//!
//! upstream が失敗したらエンドポイントごとの固定メッセージで `500 {"error": ...}` を返す。
//! upstream の詳細はログにだけ出す。

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use vidgen_core::domain::{StatusReport, TaskId};
use vidgen_core::ports::{GenerateRequest, GenerateResponse, VideoService, VideoServiceError};

const VIDEO_CONTENT_TYPE: &str = "video/mp4";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn VideoService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate-video", post(generate_video))
        .route("/api/video-status/:task_id", get(video_status))
        .route("/api/videos/:task_id", get(video))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApiError {
    Generate,
    Status,
    Fetch,
}

impl ApiError {
    fn message(self) -> &'static str {
        match self {
            Self::Generate => "Failed to generate video",
            Self::Status => "Failed to check video status",
            Self::Fetch => "Failed to fetch video",
        }
    }

    fn logged(self, err: &VideoServiceError) -> Self {
        error!(error = %err, "{}", self.message());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.message() })),
        )
            .into_response()
    }
}

async fn generate_video(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let created = state
        .service
        .create_task(&request.prompt)
        .await
        .map_err(|e| ApiError::Generate.logged(&e))?;

    info!(task_id = %created.task_id, "video task created");
    Ok(Json(created))
}

async fn video_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<StatusReport>, ApiError> {
    let report = state
        .service
        .task_status(&TaskId::new(task_id))
        .await
        .map_err(|e| ApiError::Status.logged(&e))?;

    Ok(Json(report))
}

async fn video(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // チャットは `/api/videos/{id}.mp4` でリンクする
    let task_id = TaskId::new(task_id.strip_suffix(".mp4").unwrap_or(&task_id));

    let stream = state
        .service
        .fetch_video(&task_id)
        .await
        .map_err(|e| ApiError::Fetch.logged(&e))?;

    let headers = [
        (header::CONTENT_TYPE, VIDEO_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"video-{task_id}.mp4\""),
        ),
    ];
    Ok((headers, Body::from_stream(stream)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;
    use vidgen_core::impls::{HttpVideoService, InMemoryVideoService, ScriptStep};

    fn app(service: Arc<InMemoryVideoService>) -> Router {
        router(AppState { service })
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn generate_request(prompt: &str) -> Request<Body> {
        Request::post("/api/generate-video")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "prompt": prompt }).to_string()))
            .unwrap()
    }

    /// `backend` を loopback で起動し、API ルートを返す
    async fn spawn_backend(backend: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, backend).await.unwrap();
        });
        format!("http://{addr}/api")
    }

    #[tokio::test]
    async fn generate_video_forwards_prompt() {
        let service = Arc::new(InMemoryVideoService::new());

        let (status, body) = send(app(service.clone()), generate_request("a cat playing piano")).await;

        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["task_id"], "T1");
        assert_eq!(body["status"], "processing");
        assert_eq!(
            service.prompt(&TaskId::new("T1")).await.as_deref(),
            Some("a cat playing piano")
        );
    }

    #[tokio::test]
    async fn generate_video_failure_is_generic() {
        let service = Arc::new(InMemoryVideoService::new());
        service.fail_next_create().await;

        let (status, body) = send(app(service), generate_request("x")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({ "error": "Failed to generate video" }));
    }

    #[tokio::test]
    async fn video_status_passes_report_through() {
        let service = Arc::new(InMemoryVideoService::new());
        service
            .script(
                "T1",
                [ScriptStep::Report(StatusReport::completed(
                    "/api/videos/T1.mp4",
                ))],
            )
            .await;
        service.create_task("x").await.unwrap();

        let (status, body) = get_json(app(service), "/api/video-status/T1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "status": "completed", "video_url": "/api/videos/T1.mp4" })
        );
    }

    #[tokio::test]
    async fn video_status_for_unknown_task_is_generic_error() {
        let (status, body) = get_json(
            app(Arc::new(InMemoryVideoService::new())),
            "/api/video-status/unknown-id",
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to check video status" }));
    }

    #[tokio::test]
    async fn upstream_404_becomes_500() {
        // 空の router は全てに 404 を返す
        let base_url = spawn_backend(Router::new()).await;
        let service = Arc::new(HttpVideoService::new(base_url));
        let app = router(AppState { service });

        let (status, body) = get_json(app, "/api/video-status/unknown-id").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to check video status" }));
    }

    #[tokio::test]
    async fn fallback_fields_survive_the_round_trip() {
        let backend = Router::new().route(
            "/api/video-status/:task_id",
            get(|| async {
                Json(json!({
                    "status": "completed",
                    "video_url": "/api/videos/T9.mp4",
                    "is_fallback": true,
                    "message": "Used a fallback video"
                }))
            }),
        );
        let base_url = spawn_backend(backend).await;
        let app = router(AppState {
            service: Arc::new(HttpVideoService::new(base_url)),
        });

        let (status, body) = get_json(app, "/api/video-status/T9").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_fallback"], true);
        assert_eq!(body["message"], "Used a fallback video");
    }

    #[tokio::test]
    async fn video_is_streamed_with_fixed_headers() {
        let service = Arc::new(InMemoryVideoService::new());
        service.put_video("T1", &b"not really an mp4"[..]).await;

        for uri in ["/api/videos/T1", "/api/videos/T1.mp4"] {
            let request = Request::get(uri).body(Body::empty()).unwrap();
            let response = app(service.clone()).oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
            assert_eq!(
                response.headers()[header::CONTENT_DISPOSITION],
                "inline; filename=\"video-T1.mp4\""
            );
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&body[..], b"not really an mp4");
        }
    }

    #[tokio::test]
    async fn upstream_video_body_is_relayed() {
        let backend = Router::new().route(
            "/api/videos/:task_id",
            get(|| async { ([(header::CONTENT_TYPE, "application/octet-stream")], "frames") }),
        );
        let base_url = spawn_backend(backend).await;
        let app = router(AppState {
            service: Arc::new(HttpVideoService::new(base_url)),
        });

        let request = Request::get("/api/videos/T3.mp4").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"frames");
    }

    #[tokio::test]
    async fn missing_video_is_generic_error() {
        let (status, body) = get_json(
            app(Arc::new(InMemoryVideoService::new())),
            "/api/videos/T7.mp4",
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to fetch video" }));
    }
}
