// Run pipeline: resume parse → job parse → match scoring → tailoring.
// All model calls go through llm_client::CompletionService, never the API directly.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::llm_client::LlmError;

pub mod agents;
pub mod audit;
pub mod budget;
pub mod cache;
pub mod extract;
pub mod guardrails;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod schema;
pub mod stub;
pub mod tailoring;
#[cfg(test)]
pub mod testing;
pub mod tone;

/// The six narrow-purpose agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    ResumeParser,
    JobParser,
    MatchScorer,
    ResumeTailor,
    CoverLetterWriter,
    TruthGuard,
}

impl AgentKind {
    pub fn label(self) -> &'static str {
        match self {
            AgentKind::ResumeParser => "resume_parser",
            AgentKind::JobParser => "job_parser",
            AgentKind::MatchScorer => "match_scorer",
            AgentKind::ResumeTailor => "resume_tailor",
            AgentKind::CoverLetterWriter => "cover_letter_writer",
            AgentKind::TruthGuard => "truth_guard",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Budget exceeded: {reason}")]
    BudgetExceeded { reason: String },

    #[error("{agent} output failed validation at `{path}`{}: {message}", job_suffix(.job_id))]
    SchemaValidation {
        agent: AgentKind,
        job_id: Option<String>,
        path: String,
        message: String,
    },

    #[error("{agent} output was not parseable JSON{}: {detail}", job_suffix(.job_id))]
    Unparseable {
        agent: AgentKind,
        job_id: Option<String>,
        detail: String,
    },

    #[error("{agent} call failed{}: {source}", job_suffix(.job_id))]
    Completion {
        agent: AgentKind,
        job_id: Option<String>,
        #[source]
        source: LlmError,
    },

    #[error("Failed to encode {agent} input: {source}")]
    Encode {
        agent: AgentKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("Run deadline reached before {stage}")]
    Cancelled { stage: String },
}

fn job_suffix(job_id: &Option<String>) -> String {
    job_id
        .as_deref()
        .map(|id| format!(" for job {id}"))
        .unwrap_or_default()
}

impl PipelineError {
    pub fn is_budget_exceeded(&self) -> bool {
        matches!(self, PipelineError::BudgetExceeded { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled { .. })
    }
}

/// Caller-level deadline, checked between model calls (never mid-call).
#[derive(Debug, Clone, Copy, Default)]
pub struct RunDeadline {
    at: Option<Instant>,
}

impl RunDeadline {
    pub fn none() -> Self {
        Self { at: None }
    }

    pub fn after(duration: std::time::Duration) -> Self {
        Self {
            at: Some(Instant::now() + duration),
        }
    }

    pub fn expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    pub fn check(&self, stage: &str) -> Result<(), PipelineError> {
        if self.expired() {
            return Err(PipelineError::Cancelled {
                stage: stage.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_schema_error_message_includes_job_and_path() {
        let err = PipelineError::SchemaValidation {
            agent: AgentKind::JobParser,
            job_id: Some("job-2".to_string()),
            path: "eligible_countries[0]".to_string(),
            message: "expected ISO-3166 alpha-2 code".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("job_parser"));
        assert!(text.contains("job-2"));
        assert!(text.contains("eligible_countries[0]"));
    }

    #[test]
    fn test_deadline_none_never_expires() {
        assert!(RunDeadline::none().check("resume parse").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires_after_duration() {
        let deadline = RunDeadline::after(Duration::from_secs(5));
        assert!(!deadline.expired());
        tokio::time::advance(Duration::from_secs(6)).await;
        let err = deadline.check("job parse").unwrap_err();
        assert!(err.is_cancelled());
    }
}
