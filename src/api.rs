//! HTTP surface for the analyzer.
//!
//! - `GET /` – Liveness probe.
//! - `POST /analyze` – Multipart upload with a `file` part (PDF) and an optional `query` part.
//!   Returns `{ status, query, analysis, file_processed }`.
//! - `GET /metrics` – Request counters.
//! - `GET /commands` – Machine-readable endpoint catalog.
//!
//! Client mistakes (wrong file type, empty file) come back as `400` with the validation message
//! in `detail`. Everything that fails after validation is a `500` whose `detail` embeds the
//! underlying cause.

use crate::pipeline::{AnalysisApi, AnalysisResult, DocumentUpload, PipelineError};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router, rejecting request bodies larger than `max_upload_bytes`.
pub fn create_router<S>(service: Arc<S>, max_upload_bytes: usize) -> Router
where
    S: AnalysisApi + 'static,
{
    Router::new()
        .route("/", get(health))
        .route("/analyze", post(analyze_document::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(service)
}

/// Response body for `GET /`.
#[derive(Serialize)]
struct HealthResponse {
    message: &'static str,
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "Financial Document Analyzer API is running",
        status: "healthy",
    })
}

/// Analyze an uploaded financial document.
///
/// Unknown multipart parts are ignored. When `query` is absent or blank the default query is
/// used and echoed back.
async fn analyze_document<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResult>, AppError>
where
    S: AnalysisApi,
{
    let mut upload = None;
    let mut query = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content = field.bytes().await?;
                upload = Some(DocumentUpload {
                    filename,
                    content: content.to_vec(),
                });
            }
            Some("query") => query = Some(field.text().await?),
            _ => {}
        }
    }

    let upload = upload.ok_or(AppError::MissingFile)?;
    let result = service.analyze_document(upload, query).await?;
    Ok(Json(result))
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> impl IntoResponse
where
    S: AnalysisApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/",
                description: "Report that the service is running.",
                request_example: None,
            },
            CommandDescriptor {
                name: "analyze",
                method: "POST",
                path: "/analyze",
                description: "Upload a PDF as multipart field 'file' with an optional 'query' field. Response returns { \"status\", \"query\", \"analysis\", \"file_processed\" }.",
                request_example: Some(json!({
                    "file": "report.pdf",
                    "query": "What is the revenue trend?"
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return request counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    Pipeline(PipelineError),
    Multipart(MultipartError),
    MissingFile,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::Pipeline(PipelineError::Validation(error)) => {
                tracing::info!(error = %error, "Upload rejected");
                (StatusCode::BAD_REQUEST, error.to_string())
            }
            Self::Pipeline(error) => {
                tracing::error!(error = %error, "Document analysis failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Error processing financial document: {error}"),
                )
            }
            Self::Multipart(error) => {
                tracing::info!(error = %error, "Malformed multipart request");
                (error.status(), error.body_text())
            }
            Self::MissingFile => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Field 'file' is required.".to_string(),
            ),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self::Pipeline(inner)
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::Multipart(inner)
    }
}
