use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::run::PipelineRunRow;
use crate::pipeline::audit::get_run;
use crate::pipeline::cache::{merge_cache, stable_job_ids};
use crate::pipeline::models::{RunInput, RunOutput};
use crate::pipeline::RunDeadline;
use crate::state::AppState;

pub const MAX_RESUME_CHARS: usize = 50_000;
pub const MAX_JOBS_PER_REQUEST: usize = 100;

/// Rejects requests the pipeline should never see.
pub fn validate_run_request(input: &RunInput) -> Result<(), AppError> {
    if input.resume_text.trim().is_empty() {
        return Err(AppError::Validation("resume_text must not be empty".to_string()));
    }
    let resume_chars = input.resume_text.chars().count();
    if resume_chars > MAX_RESUME_CHARS {
        return Err(AppError::Validation(format!(
            "resume_text is {resume_chars} characters; the limit is {MAX_RESUME_CHARS}"
        )));
    }
    if input.jobs.len() > MAX_JOBS_PER_REQUEST {
        return Err(AppError::Validation(format!(
            "{} jobs submitted; the limit is {MAX_JOBS_PER_REQUEST}",
            input.jobs.len()
        )));
    }
    if let Some(index) = input.jobs.iter().position(|j| j.text.trim().is_empty()) {
        return Err(AppError::Validation(format!("jobs[{index}].text must not be empty")));
    }
    Ok(())
}

/// POST /api/v1/runs
pub async fn handle_create_run(
    State(state): State<AppState>,
    Json(mut input): Json<RunInput>,
) -> Result<Json<RunOutput>, AppError> {
    validate_run_request(&input)?;

    match state.cache.load(&input).await {
        Ok(found) => merge_cache(&mut input.cache, found),
        Err(e) => warn!("structure cache lookup failed, running uncached: {e:#}"),
    }

    let resume_text = input.resume_text.clone();
    let stable_ids = stable_job_ids(&input);
    let deadline = RunDeadline::after(Duration::from_secs(state.config.run_timeout_secs));

    let output = state.orchestrator.run(input, deadline).await?;
    info!(
        "[run {}] responding with status {:?}",
        output.run_id, output.status
    );

    let cache = state.cache.clone();
    let stored = output.clone();
    tokio::spawn(async move {
        if let Err(e) = cache.store(&resume_text, &stable_ids, &stored).await {
            warn!("[run {}] failed to cache structures: {e:#}", stored.run_id);
        }
    });

    Ok(Json(output))
}

/// GET /api/v1/runs/:id
pub async fn handle_get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<PipelineRunRow>, AppError> {
    get_run(&state.db, &run_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Run {run_id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::models::{JobInput, RunType};

    fn request(resume_text: &str, job_texts: &[&str]) -> RunInput {
        RunInput {
            run_type: RunType::ResumeMatch,
            resume_text: resume_text.to_string(),
            hints: Default::default(),
            jobs: job_texts
                .iter()
                .map(|text| JobInput {
                    id: None,
                    source: None,
                    url: None,
                    text: text.to_string(),
                })
                .collect(),
            limits: Default::default(),
            run_id: None,
            cache: Default::default(),
        }
    }

    #[test]
    fn test_accepts_well_formed_request() {
        assert!(validate_run_request(&request("Jane Doe, Rust engineer", &["Rust role"])).is_ok());
    }

    #[test]
    fn test_rejects_blank_resume() {
        let err = validate_run_request(&request("   \n", &[])).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_rejects_oversized_resume() {
        let long = "a".repeat(MAX_RESUME_CHARS + 1);
        assert!(validate_run_request(&request(&long, &[])).is_err());
    }

    #[test]
    fn test_rejects_empty_job_text_with_index() {
        let err = validate_run_request(&request("resume", &["ok", " "])).unwrap_err();
        assert!(err.to_string().contains("jobs[1]"));
    }

    #[test]
    fn test_rejects_too_many_jobs() {
        let texts = vec!["posting"; MAX_JOBS_PER_REQUEST + 1];
        assert!(validate_run_request(&request("resume", &texts)).is_err());
    }

    #[test]
    fn test_request_body_defaults() {
        let input: RunInput = serde_json::from_value(serde_json::json!({
            "run_type": "resume_only",
            "resume_text": "Jane Doe"
        }))
        .unwrap();
        assert!(input.jobs.is_empty());
        assert!(input.cache.resume.is_none());
        assert!(validate_run_request(&input).is_ok());
    }
}
