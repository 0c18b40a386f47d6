//! Agent invocation layer — one function per agent, all funnelled through `invoke`.
//!
//! `invoke` is the only place that talks to the completion service:
//! deadline check → budget pre-flight → completion → usage accounting →
//! JSON extraction → schema validation. There is no retry at this layer;
//! an unparseable or invalid output fails the call.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::llm_client::{CompletionRequest, CompletionService, ModelTier};
use crate::pipeline::budget::{estimate_tokens, Budget};
use crate::pipeline::extract::extract_json_object;
use crate::pipeline::models::{
    CandidateHints, CoverLetter, CoverLetterTone, GuardReport, JobInput, JobProfile, MatchResult,
    Recommendation, ResumeProfile, TailoredResume,
};
use crate::pipeline::schema::{
    find_placeholders, validate_cover_letter, validate_guard_report, validate_job, validate_match,
    validate_resume, validate_tailored, SchemaViolation,
};
use crate::pipeline::{prompts, AgentKind, PipelineError, RunDeadline};

const COVER_LETTER_MIN_WORDS: usize = 200;
const COVER_LETTER_MAX_WORDS: usize = 300;

/// Per-agent call parameters.
#[derive(Debug, Clone, Copy)]
struct AgentSpec {
    tier: ModelTier,
    max_output_tokens: u32,
    /// Output allowance added to the input estimate for the pre-flight check.
    output_reserve: u64,
}

impl AgentSpec {
    fn for_kind(kind: AgentKind) -> Self {
        let (tier, max_output_tokens, output_reserve) = match kind {
            AgentKind::ResumeParser => (ModelTier::Fast, 2_000, 300),
            AgentKind::JobParser => (ModelTier::Fast, 1_500, 300),
            AgentKind::MatchScorer => (ModelTier::Fast, 800, 200),
            AgentKind::ResumeTailor => (ModelTier::Quality, 2_500, 600),
            AgentKind::CoverLetterWriter => (ModelTier::Quality, 1_200, 400),
            AgentKind::TruthGuard => (ModelTier::Fast, 1_000, 300),
        };
        Self {
            tier,
            max_output_tokens,
            output_reserve,
        }
    }
}

/// What every agent call needs besides the budget: the collaborator, the
/// caller's deadline, and the run id for log correlation.
#[derive(Clone, Copy)]
pub struct AgentRuntime<'a> {
    pub completion: &'a dyn CompletionService,
    pub deadline: RunDeadline,
    pub run_id: &'a str,
}

/// Pre-flight estimate for a call: instruction + content + output reserve.
pub fn estimate_call_cost(kind: AgentKind, content: &str) -> u64 {
    estimate_tokens(&prompts::instruction(kind))
        + estimate_tokens(content)
        + AgentSpec::for_kind(kind).output_reserve
}

fn call_label(kind: AgentKind, job_id: Option<&str>) -> String {
    match job_id {
        Some(id) => format!("{kind} ({id})"),
        None => kind.to_string(),
    }
}

async fn invoke<T>(
    rt: &AgentRuntime<'_>,
    budget: &mut Budget,
    kind: AgentKind,
    job_id: Option<&str>,
    content: &str,
    validate: fn(&Value) -> Result<T, SchemaViolation>,
) -> Result<T, PipelineError> {
    let label = call_label(kind, job_id);
    rt.deadline.check(&label)?;

    let spec = AgentSpec::for_kind(kind);
    let instruction = prompts::instruction(kind);
    let estimated = estimate_call_cost(kind, content);
    budget.assert_available(estimated, &label)?;

    let completion = rt
        .completion
        .complete(CompletionRequest {
            instruction: &instruction,
            content,
            tier: spec.tier,
            max_output_tokens: spec.max_output_tokens,
        })
        .await
        .map_err(|source| PipelineError::Completion {
            agent: kind,
            job_id: job_id.map(str::to_string),
            source,
        })?;

    let tokens = match completion.usage {
        Some(usage) => usage.total(),
        None => {
            estimate_tokens(&instruction)
                + estimate_tokens(content)
                + estimate_tokens(&completion.text)
        }
    };
    budget.consume(tokens);
    debug!(
        "[run {}] {} used {} tokens (estimated {})",
        rt.run_id, label, tokens, estimated
    );

    let value = extract_json_object(&completion.text).map_err(|e| PipelineError::Unparseable {
        agent: kind,
        job_id: job_id.map(str::to_string),
        detail: e.to_string(),
    })?;

    validate(&value).map_err(|v| PipelineError::SchemaValidation {
        agent: kind,
        job_id: job_id.map(str::to_string),
        path: v.path,
        message: v.message,
    })
}

fn encode<T: Serialize>(kind: AgentKind, payload: &T) -> Result<String, PipelineError> {
    serde_json::to_string(payload).map_err(|source| PipelineError::Encode {
        agent: kind,
        source,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Agents
// ────────────────────────────────────────────────────────────────────────────

pub async fn parse_resume(
    rt: &AgentRuntime<'_>,
    budget: &mut Budget,
    resume_text: &str,
) -> Result<ResumeProfile, PipelineError> {
    let content = format!("RESUME:\n{resume_text}");
    invoke(rt, budget, AgentKind::ResumeParser, None, &content, validate_resume).await
}

pub async fn parse_job(
    rt: &AgentRuntime<'_>,
    budget: &mut Budget,
    job_id: &str,
    job: &JobInput,
) -> Result<JobProfile, PipelineError> {
    let mut content = String::new();
    if let Some(source) = &job.source {
        content.push_str(&format!("SOURCE: {source}\n"));
    }
    if let Some(url) = &job.url {
        content.push_str(&format!("URL: {url}\n"));
    }
    content.push_str("JOB POSTING:\n");
    content.push_str(&job.text);
    invoke(rt, budget, AgentKind::JobParser, Some(job_id), &content, validate_job).await
}

#[derive(Serialize)]
struct ScoreInput<'a> {
    resume: &'a ResumeProfile,
    job: &'a JobProfile,
    hints: &'a CandidateHints,
}

pub async fn score_match(
    rt: &AgentRuntime<'_>,
    budget: &mut Budget,
    job_id: &str,
    resume: &ResumeProfile,
    job: &JobProfile,
    hints: &CandidateHints,
) -> Result<MatchResult, PipelineError> {
    let content = encode(
        AgentKind::MatchScorer,
        &ScoreInput { resume, job, hints },
    )?;
    let mut result = invoke(
        rt,
        budget,
        AgentKind::MatchScorer,
        Some(job_id),
        &content,
        validate_match,
    )
    .await?;

    // The recommendation is a pure function of the score.
    let expected = Recommendation::from_score(result.score);
    if result.recommendation != expected {
        warn!(
            "[run {}] match_scorer ({}) said {:?} for score {}; using {:?}",
            rt.run_id, job_id, result.recommendation, result.score, expected
        );
        result.recommendation = expected;
    }
    Ok(result)
}

#[derive(Serialize)]
struct TailorInput<'a> {
    resume: &'a ResumeProfile,
    job: &'a JobProfile,
}

pub async fn tailor_resume(
    rt: &AgentRuntime<'_>,
    budget: &mut Budget,
    job_id: &str,
    resume: &ResumeProfile,
    job: &JobProfile,
) -> Result<TailoredResume, PipelineError> {
    let content = encode(AgentKind::ResumeTailor, &TailorInput { resume, job })?;
    invoke(
        rt,
        budget,
        AgentKind::ResumeTailor,
        Some(job_id),
        &content,
        validate_tailored,
    )
    .await
}

#[derive(Serialize)]
struct CoverLetterInput<'a> {
    resume: &'a ResumeProfile,
    job: &'a JobProfile,
    tailored_resume: &'a TailoredResume,
    tone: CoverLetterTone,
}

pub async fn write_cover_letter(
    rt: &AgentRuntime<'_>,
    budget: &mut Budget,
    job_id: &str,
    resume: &ResumeProfile,
    job: &JobProfile,
    tailored_resume: &TailoredResume,
    tone: CoverLetterTone,
) -> Result<CoverLetter, PipelineError> {
    let content = encode(
        AgentKind::CoverLetterWriter,
        &CoverLetterInput {
            resume,
            job,
            tailored_resume,
            tone,
        },
    )?;
    let letter = invoke(
        rt,
        budget,
        AgentKind::CoverLetterWriter,
        Some(job_id),
        &content,
        validate_cover_letter,
    )
    .await?;

    let words = letter.body.split_whitespace().count();
    if !(COVER_LETTER_MIN_WORDS..=COVER_LETTER_MAX_WORDS).contains(&words) {
        warn!(
            "[run {}] cover letter for {} has {} words (expected {}-{})",
            rt.run_id, job_id, words, COVER_LETTER_MIN_WORDS, COVER_LETTER_MAX_WORDS
        );
    }
    if letter.tone != tone {
        warn!(
            "[run {}] cover letter for {} came back {:?}, requested {:?}",
            rt.run_id, job_id, letter.tone, tone
        );
    }
    Ok(letter)
}

#[derive(Serialize)]
struct GuardInput<'a> {
    original_resume: &'a ResumeProfile,
    tailored_resume: &'a TailoredResume,
    cover_letter: &'a CoverLetter,
}

pub async fn check_truth(
    rt: &AgentRuntime<'_>,
    budget: &mut Budget,
    job_id: &str,
    original_resume: &ResumeProfile,
    tailored_resume: &TailoredResume,
    cover_letter: &CoverLetter,
) -> Result<GuardReport, PipelineError> {
    let content = encode(
        AgentKind::TruthGuard,
        &GuardInput {
            original_resume,
            tailored_resume,
            cover_letter,
        },
    )?;
    let mut report = invoke(
        rt,
        budget,
        AgentKind::TruthGuard,
        Some(job_id),
        &content,
        validate_guard_report,
    )
    .await?;

    // Every placeholder in the materials needs confirmation, whether or not
    // the guard listed it.
    for placeholder in collect_placeholders(tailored_resume, cover_letter) {
        if !report.placeholders.contains(&placeholder) {
            report.placeholders.push(placeholder);
        }
    }
    Ok(report)
}

fn collect_placeholders(tailored: &TailoredResume, letter: &CoverLetter) -> Vec<String> {
    let mut texts: Vec<&str> = vec![tailored.summary.as_str(), letter.body.as_str()];
    if let Some(headline) = &tailored.headline {
        texts.push(headline);
    }
    texts.extend(
        tailored
            .experience
            .iter()
            .flat_map(|e| e.bullets.iter().map(String::as_str)),
    );
    texts.into_iter().flat_map(find_placeholders).collect()
}
