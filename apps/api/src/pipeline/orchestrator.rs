//! Run orchestrator: resume → jobs → scoring → tailoring.
//!
//! Only a resume-parse failure fails the run. Every later failure is scoped to
//! one job, recorded as a note, and the run continues (budget failures also
//! downgrade the status to `partial`). Deadline expiry after the resume stage
//! halts the run and returns what was completed.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::llm_client::CompletionService;
use crate::pipeline::agents::{parse_job, parse_resume, score_match, AgentRuntime};
use crate::pipeline::audit::{self, RunRecorder};
use crate::pipeline::budget::Budget;
use crate::pipeline::guardrails::apply_output_guardrails;
use crate::pipeline::models::{
    CandidateHints, JobProfile, RankedJob, ResumeProfile, RunInput, RunOutput, RunStatus,
    TailoredOutput, STRETCH_THRESHOLD,
};
use crate::pipeline::tailoring::tailor_job;
use crate::pipeline::{PipelineError, RunDeadline};

/// Must-have coverage (percent) a job needs before it is worth tailoring for.
pub const MIN_MUST_HAVE_COVERAGE: f64 = 60.0;

pub struct Orchestrator {
    completion: Arc<dyn CompletionService>,
    recorder: Arc<dyn RunRecorder>,
}

/// Mutable state of one run.
struct RunContext {
    budget: Budget,
    status: RunStatus,
    notes: Vec<String>,
    halted: bool,
}

impl RunContext {
    fn note(&mut self, message: String) {
        self.notes.push(message);
    }

    fn downgrade(&mut self) {
        self.status = RunStatus::Partial;
    }

    fn halt(&mut self, run_id: &str, err: &PipelineError) {
        warn!("[run {}] halting: {}", run_id, err);
        self.downgrade();
        self.halted = true;
        self.note(format!("{err}; remaining work was skipped."));
    }
}

/// Job structures available to a run, keyed by job id, with input order kept.
/// Owned by the run and discarded with it.
#[derive(Default)]
struct JobStructures {
    by_id: HashMap<String, JobProfile>,
    order: Vec<String>,
}

impl JobStructures {
    fn insert(&mut self, job_id: String, job: JobProfile) {
        self.order.push(job_id.clone());
        self.by_id.insert(job_id, job);
    }

    fn contains(&self, job_id: &str) -> bool {
        self.by_id.contains_key(job_id)
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &JobProfile)> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id).map(|job| (id.as_str(), job)))
    }
}

impl Orchestrator {
    pub fn new(completion: Arc<dyn CompletionService>, recorder: Arc<dyn RunRecorder>) -> Self {
        Self {
            completion,
            recorder,
        }
    }

    pub async fn run(
        &self,
        input: RunInput,
        deadline: RunDeadline,
    ) -> Result<RunOutput, PipelineError> {
        let run_id = input
            .run_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let limits = input.limits.resolve();

        info!(
            "[run {}] starting {:?} run: {} job(s), budget {} tokens",
            run_id,
            input.run_type,
            input.jobs.len(),
            limits.token_budget
        );
        audit::spawn_start(&self.recorder, &run_id, input.run_type, input.jobs.len());

        let rt = AgentRuntime {
            completion: self.completion.as_ref(),
            deadline,
            run_id: &run_id,
        };
        let mut ctx = RunContext {
            budget: Budget::new(limits.token_budget),
            status: RunStatus::Ok,
            notes: Vec::new(),
            halted: false,
        };

        // ─── Resume ─────────────────────────────────────────────────────────
        let resume = match input.cache.resume.clone() {
            Some(cached) => {
                info!("[run {}] using cached resume structure", run_id);
                cached
            }
            None => match parse_resume(&rt, &mut ctx.budget, &input.resume_text).await {
                Ok(resume) => resume,
                Err(err) => {
                    error!("[run {}] resume parse failed: {}", run_id, err);
                    audit::spawn_failure(&self.recorder, &run_id, &err.to_string());
                    return Err(err);
                }
            },
        };

        let mut ranked = Vec::new();
        let mut tailored = Vec::new();

        if input.run_type.includes_matching() {
            let structures = parse_jobs(&rt, &mut ctx, &input, limits.max_jobs).await;
            ranked = score_jobs(&rt, &mut ctx, &resume, &structures, &input.hints).await;

            if input.run_type.includes_tailoring() && !ctx.halted {
                tailored =
                    tailor_jobs(&rt, &mut ctx, &resume, &ranked, limits.max_tailored_jobs).await;
            }
        }

        let mut output = RunOutput {
            run_id: run_id.clone(),
            status: ctx.status,
            budget: ctx.budget.to_info(),
            resume,
            ranked_jobs: ranked,
            tailored,
            notes: ctx.notes,
            error: None,
        };
        apply_output_guardrails(&mut output);

        info!(
            "[run {}] finished {:?}: {} ranked, {} tailored, {}/{} tokens",
            run_id,
            output.status,
            output.ranked_jobs.len(),
            output.tailored.len(),
            output.budget.used,
            output.budget.total
        );
        audit::spawn_completion(&self.recorder, &output);
        Ok(output)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stages
// ────────────────────────────────────────────────────────────────────────────

async fn parse_jobs(
    rt: &AgentRuntime<'_>,
    ctx: &mut RunContext,
    input: &RunInput,
    max_jobs: usize,
) -> JobStructures {
    let mut structures = JobStructures::default();

    if input.jobs.len() > max_jobs {
        ctx.note(format!(
            "Only the first {max_jobs} of {} jobs were considered.",
            input.jobs.len()
        ));
    }

    // Set once a parse is refused for budget. Later jobs are admitted only
    // from the cache, which costs nothing.
    let mut parsing_stopped = false;
    let mut unparsed = Vec::new();

    for (index, job) in input.jobs.iter().enumerate().take(max_jobs) {
        let job_id = job.effective_id(index);

        if structures.contains(&job_id) {
            ctx.note(format!("Skipped duplicate job id {job_id}."));
            continue;
        }

        if let Some(cached) = input.cache.jobs.get(&job_id) {
            info!("[run {}] using cached structure for {}", rt.run_id, job_id);
            structures.insert(job_id, cached.clone());
            continue;
        }

        if parsing_stopped {
            unparsed.push(job_id);
            continue;
        }

        match parse_job(rt, &mut ctx.budget, &job_id, job).await {
            Ok(profile) => structures.insert(job_id, profile),
            Err(err) if err.is_budget_exceeded() => {
                warn!("[run {}] stopping job parsing at {}: {}", rt.run_id, job_id, err);
                ctx.downgrade();
                ctx.note(format!("Stopped parsing jobs at {job_id}: {err}"));
                parsing_stopped = true;
            }
            Err(err) if err.is_cancelled() => {
                ctx.halt(rt.run_id, &err);
                break;
            }
            Err(err) => {
                warn!("[run {}] job parse failed for {}: {}", rt.run_id, job_id, err);
                ctx.note(format!("Skipped {job_id}: {err}"));
            }
        }
    }

    if !unparsed.is_empty() {
        ctx.note(format!(
            "Not parsed after the budget stop: {}.",
            unparsed.join(", ")
        ));
    }

    structures
}

async fn score_jobs(
    rt: &AgentRuntime<'_>,
    ctx: &mut RunContext,
    resume: &ResumeProfile,
    structures: &JobStructures,
    hints: &CandidateHints,
) -> Vec<RankedJob> {
    let mut ranked = Vec::new();

    for (job_id, job) in structures.iter() {
        if ctx.halted {
            break;
        }
        match score_match(rt, &mut ctx.budget, job_id, resume, job, hints).await {
            Ok(match_result) => ranked.push(RankedJob {
                job_id: job_id.to_string(),
                job: job.clone(),
                match_result,
            }),
            Err(err) if err.is_budget_exceeded() => {
                warn!("[run {}] scoring skipped for {}: {}", rt.run_id, job_id, err);
                ctx.downgrade();
                ctx.note(format!("Skipped scoring {job_id}: {err}"));
            }
            Err(err) if err.is_cancelled() => ctx.halt(rt.run_id, &err),
            Err(err) => {
                warn!("[run {}] scoring failed for {}: {}", rt.run_id, job_id, err);
                ctx.note(format!("Could not score {job_id}: {err}"));
            }
        }
    }

    // Stable sort: equal scores keep input order.
    ranked.sort_by(|a, b| b.match_result.score.total_cmp(&a.match_result.score));
    ranked
}

async fn tailor_jobs(
    rt: &AgentRuntime<'_>,
    ctx: &mut RunContext,
    resume: &ResumeProfile,
    ranked: &[RankedJob],
    max_tailored_jobs: usize,
) -> Vec<TailoredOutput> {
    let mut eligible = Vec::new();
    for job in ranked {
        let m = &job.match_result;
        if m.score < STRETCH_THRESHOLD {
            ctx.note(format!(
                "Skipped tailoring for {}: score {} is below {}.",
                job.job_id, m.score, STRETCH_THRESHOLD
            ));
        } else if m.must_have_coverage < MIN_MUST_HAVE_COVERAGE {
            ctx.note(format!(
                "Skipped tailoring for {}: must-have coverage {}% is below {}%.",
                job.job_id, m.must_have_coverage, MIN_MUST_HAVE_COVERAGE
            ));
        } else {
            eligible.push(job);
        }
    }

    if eligible.len() > max_tailored_jobs {
        ctx.note(format!(
            "{} eligible job(s) beyond the top {max_tailored_jobs} were not tailored.",
            eligible.len() - max_tailored_jobs
        ));
    }

    let mut outputs = Vec::new();
    for job in eligible.into_iter().take(max_tailored_jobs) {
        if ctx.halted {
            break;
        }
        if ctx.budget.exhausted() {
            ctx.budget
                .mark_stopped(format!("Token budget exhausted before tailoring {}", job.job_id));
            ctx.downgrade();
            ctx.note(format!(
                "Stopped tailoring before {}: token budget exhausted.",
                job.job_id
            ));
            break;
        }

        match tailor_job(
            rt,
            &mut ctx.budget,
            &job.job_id,
            resume,
            &job.job,
            &mut ctx.notes,
        )
        .await
        {
            Ok(output) => outputs.push(output),
            Err(err) if err.is_budget_exceeded() => {
                warn!("[run {}] tailoring stopped for {}: {}", rt.run_id, job.job_id, err);
                ctx.downgrade();
                ctx.note(format!("Tailoring for {} stopped: {err}", job.job_id));
            }
            Err(err) if err.is_cancelled() => ctx.halt(rt.run_id, &err),
            Err(err) => {
                warn!("[run {}] tailoring failed for {}: {}", rt.run_id, job.job_id, err);
                ctx.note(format!("Tailoring for {} failed: {err}", job.job_id));
            }
        }
    }

    outputs
}
