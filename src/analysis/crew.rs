//! Sequential multi-role analysis.
//!
//! The chain is a fixed list of steps. Each step renders its task over the document plus every
//! earlier step's output and makes one backend call. The verifier step gates the rest: an
//! explicit `FAIL` verdict stops the chain before any analysis call is made.

use super::prompts::{
    ANALYSIS_TASK, AgentProfile, DOCUMENT_VERIFIER, FINANCIAL_ANALYST, INVESTMENT_ADVISOR,
    INVESTMENT_TASK, RISK_ASSESSOR, RISK_TASK, TaskTemplate, VERIFICATION_TASK, render_task,
};
use super::{AnalysisError, AnalyzerSettings};
use crate::llm::{CompletionRequest, LlmClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepKind {
    /// Output is parsed as a verification verdict and not included in the report.
    Gate,
    /// Output becomes a section of the final report.
    Section,
}

#[derive(Debug, Clone, Copy)]
struct Step {
    heading: &'static str,
    agent: &'static AgentProfile,
    task: &'static TaskTemplate,
    kind: StepKind,
}

const CREW_STEPS: [Step; 4] = [
    Step {
        heading: "Document Verification",
        agent: &DOCUMENT_VERIFIER,
        task: &VERIFICATION_TASK,
        kind: StepKind::Gate,
    },
    Step {
        heading: "Financial Analysis",
        agent: &FINANCIAL_ANALYST,
        task: &ANALYSIS_TASK,
        kind: StepKind::Section,
    },
    Step {
        heading: "Investment Analysis",
        agent: &INVESTMENT_ADVISOR,
        task: &INVESTMENT_TASK,
        kind: StepKind::Section,
    },
    Step {
        heading: "Risk Assessment",
        agent: &RISK_ASSESSOR,
        task: &RISK_TASK,
        kind: StepKind::Section,
    },
];

/// Outcome reported by the verifier step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VerificationStatus {
    Pass,
    Fail,
    Unknown,
}

/// Fields parsed from the verifier's summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Verdict {
    pub status: VerificationStatus,
    pub document_type: Option<String>,
    pub company: Option<String>,
    pub period: Option<String>,
    pub notes: Option<String>,
}

impl Verdict {
    /// Read `Key: value` lines, tolerating markdown bullets and bold markers.
    pub(crate) fn parse(output: &str) -> Self {
        let mut verdict = Self {
            status: VerificationStatus::Unknown,
            document_type: None,
            company: None,
            period: None,
            notes: None,
        };

        for line in output.lines() {
            let cleaned = line
                .trim()
                .trim_start_matches(['-', '*', '#', '>'])
                .replace("**", "");
            let Some((key, value)) = cleaned.split_once(':') else {
                continue;
            };
            let value = clean_value(value);
            match key.trim().to_lowercase().as_str() {
                "verification status" | "status" => {
                    let upper = value.as_deref().unwrap_or_default().to_uppercase();
                    // An echoed "PASS / FAIL" template line is not a verdict.
                    verdict.status = match (upper.contains("PASS"), upper.contains("FAIL")) {
                        (true, false) => VerificationStatus::Pass,
                        (false, true) => VerificationStatus::Fail,
                        _ => VerificationStatus::Unknown,
                    };
                }
                "document type" => verdict.document_type = value,
                "company/issuer" | "company" | "issuer" => verdict.company = value,
                "reporting period" | "period" => verdict.period = value,
                "notes" => verdict.notes = value,
                _ => {}
            }
        }

        verdict
    }

    fn summary_line(&self) -> String {
        let status = match self.status {
            VerificationStatus::Pass => "PASS",
            VerificationStatus::Fail => "FAIL",
            VerificationStatus::Unknown => "UNVERIFIED",
        };
        let details: Vec<String> = [
            ("type", &self.document_type),
            ("company", &self.company),
            ("period", &self.period),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.as_ref().map(|value| format!("{label}: {value}")))
        .collect();

        if details.is_empty() {
            format!("Document verification: {status}")
        } else {
            format!("Document verification: {status} ({})", details.join("; "))
        }
    }

    fn rejection_reason(&self) -> String {
        self.notes
            .clone()
            .or_else(|| self.document_type.clone())
            .unwrap_or_else(|| "verifier reported FAIL".to_string())
    }
}

fn clean_value(value: &str) -> Option<String> {
    let trimmed = value
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Run every step in order and assemble the sections into one report.
pub(crate) async fn run(
    client: &dyn LlmClient,
    settings: &AnalyzerSettings,
    query: &str,
    document: &str,
    truncated: bool,
) -> Result<String, AnalysisError> {
    let mut verdict = None;
    let mut outputs: Vec<(&'static str, String)> = Vec::with_capacity(CREW_STEPS.len());

    for step in &CREW_STEPS {
        let prompt = {
            let context: Vec<(&str, &str)> = outputs
                .iter()
                .map(|(heading, output)| (*heading, output.as_str()))
                .collect();
            render_task(step.task, query, document, truncated, &context)
        };
        tracing::info!(step = step.heading, role = step.agent.role, "Running analysis step");

        let output = client
            .complete(CompletionRequest {
                model: settings.model.clone(),
                system_prompt: step.agent.system_prompt(query),
                prompt,
                temperature: settings.temperature,
            })
            .await?;

        if step.kind == StepKind::Gate {
            let parsed = Verdict::parse(&output);
            match parsed.status {
                VerificationStatus::Fail => {
                    tracing::warn!(
                        document_type = ?parsed.document_type,
                        "Document failed financial verification"
                    );
                    return Err(AnalysisError::NotFinancial(parsed.rejection_reason()));
                }
                VerificationStatus::Unknown => {
                    tracing::warn!("Verifier did not report a status; continuing analysis");
                }
                VerificationStatus::Pass => {
                    tracing::debug!(company = ?parsed.company, period = ?parsed.period, "Document verified");
                }
            }
            verdict = Some(parsed);
        }

        outputs.push((step.heading, output));
    }

    let mut report = verdict
        .map(|verdict| format!("{}\n\n", verdict.summary_line()))
        .unwrap_or_default();
    let sections = CREW_STEPS
        .iter()
        .zip(&outputs)
        .filter(|(step, _)| step.kind == StepKind::Section)
        .map(|(_, (heading, output))| format!("## {heading}\n\n{}", output.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");
    report.push_str(&sections);
    Ok(report)
}
