//! HTTP API over a [`Navigator`].
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | GET  | `/` | | health message |
//! | POST | `/run-analysis` | `{ "pdf_path": "..." }` | `{ status, result }` |
//! | POST | `/upload-pdf/` | multipart field `file` | `{ status, result, pdf_used }` |
//! | GET  | `/artifacts` | | directory listing |
//! | GET  | `/artifacts/file?path=...` | | raw file |
//!
//! Errors are JSON: `{ "status": "failed", "error": { "code", "message" } }`.
//! No authentication; bind to a trusted interface.

use crate::error::NavigatorError;
use crate::navigator::Navigator;
use crate::output::AnalysisOutput;
use crate::pipeline::artifacts::{resolve_artifact_path, scan_artifacts, ArtifactListing};
use crate::pipeline::input::{ensure_pdf_bytes, has_pdf_extension, sanitize_upload_name};
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),
    /// Carries the engine's fault text unchanged.
    #[error("{0}")]
    EngineFailed(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail),
            ApiError::PayloadTooLarge(detail) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", detail)
            }
            ApiError::EngineFailed(detail) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ENGINE_FAILED", detail)
            }
            ApiError::Internal(detail) => {
                error!(detail = %detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            status: "failed",
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<NavigatorError> for ApiError {
    fn from(err: NavigatorError) -> Self {
        let message = err.to_string();
        match err {
            NavigatorError::FileNotFound { .. } => ApiError::NotFound(message),
            NavigatorError::PermissionDenied { .. }
            | NavigatorError::InvalidInput { .. }
            | NavigatorError::DownloadFailed { .. }
            | NavigatorError::DownloadTimeout { .. }
            | NavigatorError::NotAPdf { .. }
            | NavigatorError::UnreadableDocument { .. } => ApiError::BadRequest(message),
            NavigatorError::EngineFailed { .. } | NavigatorError::ProviderNotConfigured { .. } => {
                ApiError::EngineFailed(message)
            }
            NavigatorError::UploadFailed { .. }
            | NavigatorError::OutputWriteFailed { .. }
            | NavigatorError::InvalidConfig(_)
            | NavigatorError::Internal(_) => ApiError::Internal(message),
        }
    }
}

// ── Bodies ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RunAnalysisRequest {
    pub pdf_path: String,
}

#[derive(Debug, Serialize)]
pub struct RunAnalysisResponse {
    pub status: &'static str,
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_used: Option<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ArtifactQuery {
    pub path: String,
}

fn completed(output: AnalysisOutput, pdf_used: Option<String>) -> Result<RunAnalysisResponse, ApiError> {
    let warnings = output.warnings.clone();
    let output = output.into_result()?;
    Ok(RunAnalysisResponse {
        status: "completed",
        result: output.final_output().unwrap_or_default().to_string(),
        pdf_used,
        warnings,
    })
}

// ── Handlers ─────────────────────────────────────────────────────────────────

type AppState = Arc<Navigator>;

async fn home() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Knowledge Navigator API is running" }))
}

async fn run_analysis(
    State(nav): State<AppState>,
    Json(req): Json<RunAnalysisRequest>,
) -> Result<Json<RunAnalysisResponse>, ApiError> {
    info!("run-analysis: {}", req.pdf_path);
    let output = nav.analyze_path(&PathBuf::from(&req.pdf_path)).await?;
    Ok(Json(completed(output, None)?))
}

async fn upload_pdf(
    State(nav): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<RunAnalysisResponse>, ApiError> {
    let max = nav.config().max_upload_bytes;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some((file_name, bytes.to_vec()));
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("multipart field 'file' is required".into()))?;
    if bytes.len() > max {
        return Err(ApiError::PayloadTooLarge(format!(
            "'{file_name}' is {} bytes; the limit is {max}",
            bytes.len()
        )));
    }
    if !has_pdf_extension(&file_name) {
        return Err(ApiError::BadRequest(format!(
            "'{file_name}' is not a PDF; only .pdf uploads are accepted"
        )));
    }

    let stored_name = sanitize_upload_name(&file_name);
    let upload_dir = &nav.config().upload_dir;
    let path = upload_dir.join(&stored_name);
    ensure_pdf_bytes(&path, &bytes)?;

    let store_err = |e: std::io::Error| {
        ApiError::from(NavigatorError::UploadFailed {
            name: stored_name.clone(),
            reason: e.to_string(),
        })
    };
    tokio::fs::create_dir_all(upload_dir).await.map_err(store_err)?;
    tokio::fs::write(&path, &bytes).await.map_err(store_err)?;
    info!("Stored upload {} ({} bytes)", path.display(), bytes.len());

    let output = nav.analyze_path(&path).await?;
    Ok(Json(completed(output, Some(stored_name))?))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        warn!("Malformed upload: {}", e);
        ApiError::BadRequest(e.body_text())
    }
}

async fn list_artifacts(State(nav): State<AppState>) -> Result<Json<ArtifactListing>, ApiError> {
    let layout = nav.config().layout.clone();
    let max = nav.config().max_read_bytes;
    let listing = tokio::task::spawn_blocking(move || scan_artifacts(&layout, &[], max))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(listing))
}

async fn download_artifact(
    State(nav): State<AppState>,
    Query(query): Query<ArtifactQuery>,
) -> Result<Response, ApiError> {
    let path = resolve_artifact_path(&nav.config().layout, &query.path)
        .ok_or_else(|| ApiError::NotFound(format!("no artifact at '{}'", query.path)))?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::NotFound(format!("{}: {}", query.path, e)))?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().replace('"', "_"))
        .unwrap_or_else(|| "artifact".to_string());
    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

// ── Router ───────────────────────────────────────────────────────────────────

/// Build the API router.
pub fn router(navigator: Navigator) -> Router {
    let body_limit = navigator.config().max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);
    Router::new()
        .route("/", get(home))
        .route("/run-analysis", post(run_analysis))
        .route("/upload-pdf/", post(upload_pdf))
        .route("/artifacts", get(list_artifacts))
        .route("/artifacts/file", get(download_artifact))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(Arc::new(navigator))
}

/// Serve the API on `addr` until the process is stopped.
pub async fn serve(navigator: Navigator, addr: SocketAddr) -> Result<(), NavigatorError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| NavigatorError::Internal(format!("failed to bind {addr}: {e}")))?;
    info!(addr = %addr, "Knowledge Navigator API listening");
    axum::serve(listener, router(navigator))
        .await
        .map_err(|e| NavigatorError::Internal(format!("server error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NavigatorConfig, OutputLayout};
    use crate::engine::Toolbox;
    use crate::test_support::{make_test_pdf, EchoEngine};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    const BOUNDARY: &str = "----navigator-test-boundary";

    fn test_navigator(root: &std::path::Path, fail_at: Option<usize>) -> Navigator {
        let config = NavigatorConfig::builder()
            .layout(OutputLayout::under(root))
            .upload_dir(root.join("uploads"))
            .max_upload_bytes(64 * 1024)
            .engine(Arc::new(EchoEngine { fail_at }))
            .toolbox(Toolbox::default())
            .build()
            .unwrap();
        Navigator::new(config).unwrap()
    }

    fn multipart_request(file_name: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri("/upload-pdf/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_message() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(test_navigator(tmp.path(), None));
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["message"].as_str().unwrap().contains("running"));
    }

    #[tokio::test]
    async fn upload_runs_analysis_and_reports_pdf_used() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(test_navigator(tmp.path(), None));
        let pdf = make_test_pdf(&["Build a recommender"]);

        let response = app.oneshot(multipart_request("My Plan.pdf", &pdf)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "completed");
        assert_eq!(body["result"], "# test_generation\n");
        assert_eq!(body["pdf_used"], "My_Plan.pdf");
        assert!(tmp.path().join("uploads/My_Plan.pdf").is_file());
    }

    #[tokio::test]
    async fn upload_rejects_non_pdf() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(test_navigator(tmp.path(), None));

        let response = app
            .clone()
            .oneshot(multipart_request("notes.txt", b"%PDF-1.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(multipart_request("fake.pdf", b"PK\x03\x04zip"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["status"], "failed");
        assert!(!tmp.path().join("uploads/fake.pdf").exists());
    }

    #[tokio::test]
    async fn oversized_upload_is_413() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(test_navigator(tmp.path(), None));
        let mut big = b"%PDF-1.4\n".to_vec();
        big.resize(65 * 1024, b'x');
        let response = app.oneshot(multipart_request("big.pdf", &big)).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn engine_fault_is_reported_verbatim() {
        let tmp = tempfile::tempdir().unwrap();
        let pdf_path = tmp.path().join("plan.pdf");
        std::fs::write(&pdf_path, make_test_pdf(&["Plan"])).unwrap();
        let app = router(test_navigator(tmp.path(), Some(3)));

        let req = Request::builder()
            .method("POST")
            .uri("/run-analysis")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "pdf_path": pdf_path }).to_string(),
            ))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "ENGINE_FAILED");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("step 'resource_estimation' failed: provider returned 500"));
    }

    #[tokio::test]
    async fn missing_pdf_path_is_404() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(test_navigator(tmp.path(), None));
        let req = Request::builder()
            .method("POST")
            .uri("/run-analysis")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"pdf_path":"/no/such/file.pdf"}"#))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn artifacts_can_be_listed_and_downloaded() {
        let tmp = tempfile::tempdir().unwrap();
        let nav = test_navigator(tmp.path(), None);
        let layout = nav.config().layout.clone();
        layout.ensure().unwrap();
        let report = layout.analysis_dir.join("project_goals.md");
        std::fs::write(&report, "# Goals\n").unwrap();
        let app = router(nav);

        let req = Request::builder().uri("/artifacts").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["groups"][0]["label"], "Project Analysis Output");

        let uri = format!("/artifacts/file?path={}", report.display());
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/markdown"));
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&bytes[..], b"# Goals\n");

        let req = Request::builder()
            .uri("/artifacts/file?path=/etc/passwd")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
