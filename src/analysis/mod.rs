//! Turns a query plus extracted document text into a narrative financial analysis.
//!
//! [`Analyzer`] owns a backend client and the immutable settings derived from configuration.
//! In single mode it issues one prompt; in crew mode it runs the verifier, analyst, advisor, and
//! risk-assessor steps in order, gated on the verifier's verdict.
//!
//! Document text longer than the configured character budget is truncated before prompting, and
//! the prompt tells the model when that happened.

mod crew;
mod prompts;

use crate::config::{AnalysisMode, Config};
use crate::llm::{CompletionRequest, LlmClient, LlmClientError};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while requesting an analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The document produced no text, so no backend call was made.
    #[error("No text could be extracted from the document")]
    NoContent,
    /// The verifier step judged the document not to be a financial report.
    #[error("Document failed financial verification: {0}")]
    NotFinancial(String),
    /// The backend call failed.
    #[error(transparent)]
    Backend(#[from] LlmClientError),
}

/// Backend settings fixed at startup.
#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    /// Model identifier sent with each request.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum number of document characters placed in a prompt.
    pub document_char_budget: usize,
    /// Single prompt or sequential crew.
    pub mode: AnalysisMode,
}

impl AnalyzerSettings {
    /// Derive analyzer settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.openai_model_name.clone(),
            temperature: config.llm_temperature,
            document_char_budget: config.document_char_budget,
            mode: config.analysis_mode,
        }
    }
}

/// Builds prompts from a query and document text and sends them to the backend.
pub struct Analyzer {
    client: Arc<dyn LlmClient>,
    settings: AnalyzerSettings,
}

impl Analyzer {
    /// Create an analyzer over the given backend client.
    pub fn new(client: Arc<dyn LlmClient>, settings: AnalyzerSettings) -> Self {
        Self { client, settings }
    }

    /// Settings this analyzer was built with.
    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    /// Produce an analysis of `extracted_text` that addresses `query`.
    ///
    /// The backend's text is returned unmodified in single mode. Empty documents fail with
    /// [`AnalysisError::NoContent`] before any backend call.
    pub async fn analyze(&self, query: &str, extracted_text: &str) -> Result<String, AnalysisError> {
        if extracted_text.trim().is_empty() {
            return Err(AnalysisError::NoContent);
        }

        let (document, truncated) = truncate_chars(extracted_text, self.settings.document_char_budget);
        if truncated {
            tracing::warn!(
                budget = self.settings.document_char_budget,
                original_chars = extracted_text.chars().count(),
                "Document text truncated to fit the prompt budget"
            );
        }

        match self.settings.mode {
            AnalysisMode::Single => self.analyze_single(query, document, truncated).await,
            AnalysisMode::Crew => {
                crew::run(&*self.client, &self.settings, query, document, truncated).await
            }
        }
    }

    async fn analyze_single(
        &self,
        query: &str,
        document: &str,
        truncated: bool,
    ) -> Result<String, AnalysisError> {
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            system_prompt: prompts::FINANCIAL_ANALYST.system_prompt(query),
            prompt: prompts::render_task(&prompts::ANALYSIS_TASK, query, document, truncated, &[]),
            temperature: self.settings.temperature,
        };
        let analysis = self.client.complete(request).await?;
        tracing::debug!(chars = analysis.len(), "Analysis generated");
        Ok(analysis)
    }
}

/// Keep at most `budget` characters, never splitting a UTF-8 sequence.
fn truncate_chars(text: &str, budget: usize) -> (&str, bool) {
    match text.char_indices().nth(budget) {
        Some((cut, _)) => (&text[..cut], true),
        None => (text, false),
    }
}
