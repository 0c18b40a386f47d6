//! Run input/output shapes and the six agent output structures.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Run input
// ────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_MAX_JOBS: usize = 20;
pub const DEFAULT_MAX_TAILORED_JOBS: usize = 5;
pub const DEFAULT_TOKEN_BUDGET: u64 = 60_000;

const MAX_JOBS_CEILING: usize = 50;
const MAX_TAILORED_CEILING: usize = 10;
const MIN_TOKEN_BUDGET: u64 = 1_000;
const MAX_TOKEN_BUDGET: u64 = 500_000;

/// The three run tiers. Each one is a prefix of the full pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    ResumeOnly,
    ResumeMatch,
    ResumeMatchTailor,
}

impl RunType {
    pub fn includes_matching(self) -> bool {
        !matches!(self, RunType::ResumeOnly)
    }

    pub fn includes_tailoring(self) -> bool {
        matches!(self, RunType::ResumeMatchTailor)
    }
}

/// Optional facts the candidate supplied outside the resume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateHints {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub target_roles: Vec<String>,
    #[serde(default)]
    pub work_authorization: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub text: String,
}

impl JobInput {
    /// Stable id if the caller gave one, otherwise `job-<n>` by input position.
    pub fn effective_id(&self, index: usize) -> String {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("job-{}", index + 1),
        }
    }
}

/// Caller overrides. `None` or zero means "use the default".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunLimits {
    #[serde(default)]
    pub max_jobs: Option<usize>,
    #[serde(default)]
    pub max_tailored_jobs: Option<usize>,
    #[serde(default)]
    pub token_budget: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLimits {
    pub max_jobs: usize,
    pub max_tailored_jobs: usize,
    pub token_budget: u64,
}

impl RunLimits {
    pub fn resolve(&self) -> ResolvedLimits {
        ResolvedLimits {
            max_jobs: self
                .max_jobs
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_JOBS)
                .min(MAX_JOBS_CEILING),
            max_tailored_jobs: self
                .max_tailored_jobs
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_TAILORED_JOBS)
                .min(MAX_TAILORED_CEILING),
            token_budget: self
                .token_budget
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_TOKEN_BUDGET)
                .clamp(MIN_TOKEN_BUDGET, MAX_TOKEN_BUDGET),
        }
    }
}

/// Structures computed on an earlier run. Read-only for the whole run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunCache {
    #[serde(default)]
    pub resume: Option<ResumeProfile>,
    #[serde(default)]
    pub jobs: HashMap<String, JobProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInput {
    pub run_type: RunType,
    pub resume_text: String,
    #[serde(default)]
    pub hints: CandidateHints,
    #[serde(default)]
    pub jobs: Vec<JobInput>,
    #[serde(default)]
    pub limits: RunLimits,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub cache: RunCache,
}

// ────────────────────────────────────────────────────────────────────────────
// Resume structure
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

/// Facts extracted from the resume text. Nothing here is inferred.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub years_experience: Option<f64>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub work_authorization: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Job structure
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisaSponsorship {
    Yes,
    No,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobProfile {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub employment_type: Option<String>,
    #[serde(default)]
    pub seniority: Option<String>,
    #[serde(default)]
    pub salary_min: Option<f64>,
    #[serde(default)]
    pub salary_max: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub must_have_skills: Vec<String>,
    #[serde(default)]
    pub nice_to_have_skills: Vec<String>,
    #[serde(default)]
    pub visa_sponsorship: VisaSponsorship,
    #[serde(default)]
    pub relocation_assistance: Option<bool>,
    /// ISO-3166 alpha-2 codes; empty when the posting does not restrict.
    #[serde(default)]
    pub eligible_countries: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Match result
// ────────────────────────────────────────────────────────────────────────────

pub const APPLY_THRESHOLD: f64 = 70.0;
pub const STRETCH_THRESHOLD: f64 = 55.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Apply,
    Stretch,
    Skip,
}

impl Recommendation {
    /// apply ≥ 70, stretch 55–69, skip < 55
    pub fn from_score(score: f64) -> Self {
        if score >= APPLY_THRESHOLD {
            Recommendation::Apply
        } else if score >= STRETCH_THRESHOLD {
            Recommendation::Stretch
        } else {
            Recommendation::Skip
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeniorityFit {
    Match,
    Over,
    Under,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// 0–100. skills 50%, seniority 20%, location/authorization 20%, other 10%.
    pub score: f64,
    pub must_have_coverage: f64,
    pub nice_to_have_coverage: f64,
    #[serde(default)]
    pub matched_skills: Vec<String>,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub location_fit: Option<bool>,
    #[serde(default)]
    pub authorization_fit: Option<bool>,
    #[serde(default)]
    pub visa_fit: Option<bool>,
    #[serde(default)]
    pub seniority_fit: SeniorityFit,
    pub recommendation: Recommendation,
    #[serde(default)]
    pub explanation: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Tailored materials
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TailoredExperience {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TailoredResume {
    #[serde(default)]
    pub headline: Option<String>,
    pub summary: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<TailoredExperience>,
    /// Posting keywords the rewrite surfaced.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub change_log: Vec<String>,
    /// One entry per bracketed placeholder the candidate must confirm.
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverLetterTone {
    #[default]
    Professional,
    Enthusiastic,
    Direct,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverLetter {
    pub tone: CoverLetterTone,
    /// Three paragraphs separated by blank lines.
    pub body: String,
    #[serde(default)]
    pub warnings: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Guard report
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardVerdict {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Fabrication,
    Inconsistency,
    Exaggeration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardIssue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub field: String,
    #[serde(default)]
    pub original: Option<String>,
    #[serde(default)]
    pub generated: Option<String>,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardReport {
    pub verdict: GuardVerdict,
    #[serde(default)]
    pub issues: Vec<GuardIssue>,
    /// Bracketed placeholders awaiting the candidate's confirmation.
    #[serde(default)]
    pub placeholders: Vec<String>,
    pub confidence: f64,
}

impl GuardReport {
    /// Pass only when the guard said so and no high/medium issue remains.
    pub fn passed(&self) -> bool {
        self.verdict == GuardVerdict::Pass && self.blocking_issues() == 0
    }

    pub fn blocking_issues(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| matches!(i.severity, Severity::High | Severity::Medium))
            .count()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Run output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedJob {
    pub job_id: String,
    pub job: JobProfile,
    #[serde(rename = "match")]
    pub match_result: MatchResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailoredOutput {
    pub job_id: String,
    pub resume: TailoredResume,
    pub cover_letter: CoverLetter,
    pub guard: GuardReport,
    pub attempts: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetInfo {
    pub total: u64,
    pub used: u64,
    pub stopped_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    Partial,
    /// Caller-facing only (misconfiguration, invalid input).
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub run_id: String,
    pub status: RunStatus,
    pub budget: BudgetInfo,
    pub resume: ResumeProfile,
    pub ranked_jobs: Vec<RankedJob>,
    pub tailored: Vec<TailoredOutput>,
    pub notes: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}
