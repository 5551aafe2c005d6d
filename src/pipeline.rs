//! Per-request document pipeline: validate, persist, extract, analyze, respond, clean up.
//!
//! Each request gets its own temp file named with a fresh UUID, so concurrent requests share
//! nothing but the upload directory. The temp file is owned by a [`TempDocument`] guard that
//! deletes it when the pipeline returns, whichever step it stopped at.

use crate::analysis::{AnalysisError, Analyzer, AnalyzerSettings};
use crate::config::Config;
use crate::extraction::{ExtractionError, extract_text};
use crate::llm::{LlmClientError, get_llm_client};
use crate::metrics::{AnalysisMetrics, MetricsSnapshot};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Query used when the caller supplies none or only whitespace.
pub const DEFAULT_QUERY: &str = "Analyze this financial document for investment insights";

/// Client input rejected before any work is done.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Filename does not end in `.pdf`.
    #[error("Only PDF files are supported.")]
    UnsupportedFileType,
    /// Upload carried zero bytes.
    #[error("Uploaded file is empty.")]
    EmptyFile,
}

/// Errors emitted by the document pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The upload was rejected by validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The upload could not be written to the temp directory.
    #[error("Failed to store uploaded file: {0}")]
    Persist(#[source] std::io::Error),
    /// The PDF could not be read.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// The extraction worker panicked or was cancelled.
    #[error("Extraction worker failed: {0}")]
    Worker(String),
    /// The analysis backend failed or had nothing to analyze.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// File received from the caller.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    /// Filename as sent by the client.
    pub filename: String,
    /// Raw file bytes.
    pub content: Vec<u8>,
}

impl DocumentUpload {
    /// Size of the upload in bytes.
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Successful analysis returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    /// Always `"success"`.
    pub status: String,
    /// Query the analysis answered, after trimming and defaulting.
    pub query: String,
    /// Backend-generated analysis text.
    pub analysis: String,
    /// Original filename of the upload.
    pub file_processed: String,
}

/// Validated inputs for one pipeline run.
#[derive(Debug, Clone)]
struct AnalysisRequest {
    query: String,
    path: PathBuf,
}

/// Temporary on-disk copy of an upload, removed on drop.
#[derive(Debug)]
pub struct TempDocument {
    id: Uuid,
    path: PathBuf,
}

impl TempDocument {
    /// Write `content` to a fresh, uniquely named file under `dir`.
    ///
    /// The guard exists before the write starts, so a partially written file is removed too.
    pub async fn persist(dir: &Path, content: &[u8]) -> Result<Self, std::io::Error> {
        let id = Uuid::new_v4();
        let document = Self {
            id,
            path: dir.join(format!("financial_document_{id}.pdf")),
        };
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&document.path, content).await?;
        Ok(document)
    }

    /// Unique identifier embedded in the file name.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Location of the temp file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDocument {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(file_id = %self.id, "Removed temporary upload"),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => tracing::warn!(
                file_id = %self.id,
                path = %self.path.display(),
                error = %error,
                "Failed to remove temporary upload"
            ),
        }
    }
}

/// Abstraction over the pipeline used by the HTTP surface.
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// Run the full pipeline for one upload.
    async fn analyze_document(
        &self,
        upload: DocumentUpload,
        query: Option<String>,
    ) -> Result<AnalysisResult, PipelineError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Coordinates validation, temp-file handling, extraction, and analysis.
///
/// Construct once at startup and share through an `Arc`; requests do not mutate it beyond the
/// atomic counters.
pub struct AnalysisService {
    analyzer: Analyzer,
    upload_dir: PathBuf,
    metrics: Arc<AnalysisMetrics>,
}

impl AnalysisService {
    /// Build a service over an existing analyzer.
    pub fn new(analyzer: Analyzer, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            analyzer,
            upload_dir: upload_dir.into(),
            metrics: Arc::new(AnalysisMetrics::new()),
        }
    }

    /// Build the production service: throttled OpenAI-compatible client plus configured analyzer.
    pub fn from_config(config: &Config) -> Result<Self, LlmClientError> {
        let client = get_llm_client(config)?;
        let analyzer = Analyzer::new(client, AnalyzerSettings::from_config(config));
        Ok(Self::new(analyzer, config.upload_dir.clone()))
    }

    /// Run the pipeline for one upload and record its outcome.
    pub async fn analyze_document(
        &self,
        upload: DocumentUpload,
        query: Option<String>,
    ) -> Result<AnalysisResult, PipelineError> {
        self.metrics.record_received();
        let result = self.run_pipeline(upload, query).await;
        match &result {
            Ok(_) => self.metrics.record_completed(),
            Err(PipelineError::Validation(_)) => self.metrics.record_rejected(),
            Err(_) => self.metrics.record_failed(),
        }
        result
    }

    async fn run_pipeline(
        &self,
        upload: DocumentUpload,
        query: Option<String>,
    ) -> Result<AnalysisResult, PipelineError> {
        tracing::info!(filename = %upload.filename, bytes = upload.size(), "Analysis request received");
        validate_upload(&upload)?;

        let document = TempDocument::persist(&self.upload_dir, &upload.content)
            .await
            .map_err(PipelineError::Persist)?;
        let request = AnalysisRequest {
            query: resolve_query(query),
            path: document.path().to_path_buf(),
        };
        tracing::debug!(file_id = %document.id(), path = %request.path.display(), "Upload persisted");

        let path = request.path.clone();
        let text = tokio::task::spawn_blocking(move || extract_text(&path))
            .await
            .map_err(|error| PipelineError::Worker(error.to_string()))??;
        tracing::debug!(file_id = %document.id(), chars = text.len(), "Text extracted");

        let analysis = self.analyzer.analyze(&request.query, &text).await?;
        tracing::info!(
            file_id = %document.id(),
            filename = %upload.filename,
            analysis_chars = analysis.len(),
            "Analysis completed"
        );

        Ok(AnalysisResult {
            status: "success".to_string(),
            query: request.query,
            analysis,
            file_processed: upload.filename,
        })
    }

    /// Return the current request counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl AnalysisApi for AnalysisService {
    async fn analyze_document(
        &self,
        upload: DocumentUpload,
        query: Option<String>,
    ) -> Result<AnalysisResult, PipelineError> {
        AnalysisService::analyze_document(self, upload, query).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        AnalysisService::metrics_snapshot(self)
    }
}

/// Check the filename extension, then the content length.
pub fn validate_upload(upload: &DocumentUpload) -> Result<(), ValidationError> {
    if !upload.filename.to_lowercase().ends_with(".pdf") {
        return Err(ValidationError::UnsupportedFileType);
    }
    if upload.content.is_empty() {
        return Err(ValidationError::EmptyFile);
    }
    Ok(())
}

/// Trim the caller's query, substituting [`DEFAULT_QUERY`] when nothing remains.
pub fn resolve_query(query: Option<String>) -> String {
    query
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_QUERY)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisMode;
    use crate::llm::{CompletionRequest, LlmClient, LlmClientError};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        prompts: Mutex<Vec<String>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl LlmClient for RecordingClient {
        async fn complete(&self, request: CompletionRequest) -> Result<String, LlmClientError> {
            self.prompts.lock().unwrap().push(request.prompt);
            match &self.fail_with {
                Some(message) => Err(LlmClientError::GenerationFailed(message.clone())),
                None => Ok("Executive Summary: revenue rose.".into()),
            }
        }
    }

    fn service(dir: &Path, client: Arc<RecordingClient>) -> AnalysisService {
        let analyzer = Analyzer::new(
            client,
            AnalyzerSettings {
                model: "test-model".into(),
                temperature: 0.0,
                document_char_budget: 10_000,
                mode: AnalysisMode::Single,
            },
        );
        AnalysisService::new(analyzer, dir)
    }

    fn upload(filename: &str, content: &[u8]) -> DocumentUpload {
        DocumentUpload {
            filename: filename.into(),
            content: content.to_vec(),
        }
    }

    fn dir_is_empty(dir: &Path) -> bool {
        match std::fs::read_dir(dir) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }

    #[test]
    fn validation_checks_extension_case_insensitively() {
        assert_eq!(validate_upload(&upload("Report.PDF", b"%PDF")), Ok(()));
        assert_eq!(
            validate_upload(&upload("image.png", b"data")),
            Err(ValidationError::UnsupportedFileType)
        );
        assert_eq!(
            validate_upload(&upload("report.pdf.exe", b"data")),
            Err(ValidationError::UnsupportedFileType)
        );
        assert_eq!(
            validate_upload(&upload("empty.pdf", b"")),
            Err(ValidationError::EmptyFile)
        );
        // Extension is checked before size.
        assert_eq!(
            validate_upload(&upload("empty.txt", b"")),
            Err(ValidationError::UnsupportedFileType)
        );
    }

    #[test]
    fn blank_queries_fall_back_to_default() {
        assert_eq!(resolve_query(None), DEFAULT_QUERY);
        assert_eq!(resolve_query(Some("   \t".into())), DEFAULT_QUERY);
        assert_eq!(
            resolve_query(Some("  What is the revenue trend? ".into())),
            "What is the revenue trend?"
        );
    }

    #[tokio::test]
    async fn temp_document_is_removed_on_drop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let document = TempDocument::persist(dir.path(), b"%PDF-1.5")
            .await
            .expect("persist");
        let path = document.path().to_path_buf();
        assert!(path.exists());
        assert!(
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name == format!("financial_document_{}.pdf", document.id()))
        );

        drop(document);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn rejected_uploads_never_touch_disk_or_backend() {
        let dir = tempfile::tempdir().expect("tempdir");
        let uploads = dir.path().join("uploads");
        let client = Arc::new(RecordingClient::default());
        let service = service(&uploads, client.clone());

        let error = service
            .analyze_document(upload("image.png", b"png bytes"), None)
            .await
            .expect_err("wrong type");
        assert!(matches!(error, PipelineError::Validation(ValidationError::UnsupportedFileType)));

        let error = service
            .analyze_document(upload("empty.pdf", b""), None)
            .await
            .expect_err("empty");
        assert!(matches!(error, PipelineError::Validation(ValidationError::EmptyFile)));

        assert!(!uploads.exists());
        assert!(client.prompts.lock().unwrap().is_empty());
        let snapshot = service.metrics_snapshot();
        assert_eq!(snapshot.requests_received, 2);
        assert_eq!(snapshot.requests_rejected, 2);
    }

    #[tokio::test]
    async fn corrupt_pdf_fails_and_cleans_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = Arc::new(RecordingClient::default());
        let service = service(dir.path(), client.clone());

        let error = service
            .analyze_document(upload("broken.pdf", b"not really a pdf"), Some("q".into()))
            .await
            .expect_err("corrupt pdf");

        assert!(matches!(error, PipelineError::Extraction(ExtractionError::Parse { .. })));
        assert!(dir_is_empty(dir.path()));
        assert!(client.prompts.lock().unwrap().is_empty());
        assert_eq!(service.metrics_snapshot().analyses_failed, 1);
    }
}
