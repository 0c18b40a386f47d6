//! Deterministic stand-in for the completion service — no model calls.
//!
//! Enabled with `PIPELINE_STUB_MODE=true` for integration environments. Each
//! agent instruction is recognised and answered with keyword-driven JSON, so
//! the full extraction/validation/budget path still runs. Usage is never
//! reported, which exercises the character-count estimate.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;

use crate::llm_client::{Completion, CompletionRequest, CompletionService, LlmError};
use crate::pipeline::models::{
    CandidateHints, ContactInfo, CoverLetter, CoverLetterTone, ExperienceEntry, GuardIssue, GuardReport,
    GuardVerdict, IssueKind, JobProfile, MatchResult, Recommendation, ResumeProfile, SeniorityFit,
    Severity, TailoredExperience, TailoredResume, VisaSponsorship,
};
use crate::pipeline::schema::find_placeholders;
use crate::pipeline::{prompts, AgentKind};

/// Canonical spelling of every skill the stand-in recognises.
const SKILL_VOCABULARY: &[&str] = &[
    "Rust", "Go", "Python", "Java", "Kotlin", "Scala", "TypeScript", "JavaScript", "C++", "C#",
    "Ruby", "PHP", "Swift", "SQL", "PostgreSQL", "MySQL", "MongoDB", "Redis", "Kafka",
    "RabbitMQ", "Elasticsearch", "GraphQL", "REST", "gRPC", "Docker", "Kubernetes", "Terraform",
    "AWS", "GCP", "Azure", "Linux", "CI/CD", "Git", "React", "Vue", "Angular", "Node.js",
    "Django", "Flask", "Spring", "Tokio", "Axum", "Spark", "Airflow", "Pandas", "PyTorch",
    "TensorFlow", "Machine Learning", "Distributed Systems", "Microservices", "Observability",
    "Prometheus", "Grafana", "Agile", "Scrum",
];

const NICE_MARKERS: &[&str] = &["preferred", "bonus", "nice to have", "a plus", "plus:"];
const MUST_MARKERS: &[&str] = &["required", "must", "requirements"];
const SENIORITY_LEVELS: &[&str] = &["intern", "junior", "mid", "senior", "staff", "principal", "lead"];

#[derive(Debug, Clone, Copy, Default)]
pub struct StubCompletion;

#[async_trait]
impl CompletionService for StubCompletion {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, LlmError> {
        let kind = prompts::identify(request.instruction).ok_or_else(|| LlmError::Api {
            status: 400,
            message: "stub completion received an unknown instruction".to_string(),
        })?;

        let text = match kind {
            AgentKind::ResumeParser => {
                let body = request
                    .content
                    .strip_prefix("RESUME:\n")
                    .unwrap_or(request.content);
                serde_json::to_string(&stub_resume(body))?
            }
            AgentKind::JobParser => serde_json::to_string(&stub_job(posting_body(request.content)))?,
            AgentKind::MatchScorer => {
                let input: ScoreInput = serde_json::from_str(request.content)?;
                serde_json::to_string(&stub_match(&input.resume, &input.job, &input.hints))?
            }
            AgentKind::ResumeTailor => {
                let input: TailorInput = serde_json::from_str(request.content)?;
                serde_json::to_string(&stub_tailor(&input.resume, &input.job))?
            }
            AgentKind::CoverLetterWriter => {
                let input: CoverLetterInput = serde_json::from_str(request.content)?;
                serde_json::to_string(&stub_cover_letter(
                    &input.resume,
                    &input.job,
                    &input.tailored_resume,
                    input.tone,
                ))?
            }
            AgentKind::TruthGuard => {
                let input: GuardInput = serde_json::from_str(request.content)?;
                serde_json::to_string(&stub_guard(
                    &input.original_resume,
                    &input.tailored_resume,
                    &input.cover_letter,
                ))?
            }
        };

        Ok(Completion { text, usage: None })
    }
}

#[derive(Deserialize)]
struct ScoreInput {
    resume: ResumeProfile,
    job: JobProfile,
    #[serde(default)]
    hints: CandidateHints,
}

#[derive(Deserialize)]
struct TailorInput {
    resume: ResumeProfile,
    job: JobProfile,
}

#[derive(Deserialize)]
struct CoverLetterInput {
    resume: ResumeProfile,
    job: JobProfile,
    tailored_resume: TailoredResume,
    tone: CoverLetterTone,
}

#[derive(Deserialize)]
struct GuardInput {
    original_resume: ResumeProfile,
    tailored_resume: TailoredResume,
    cover_letter: CoverLetter,
}

// ────────────────────────────────────────────────────────────────────────────
// Text helpers
// ────────────────────────────────────────────────────────────────────────────

/// Case-insensitive whole-term match; `go` does not match inside `good`.
fn mentions(haystack_lower: &str, term: &str) -> bool {
    let needle = term.to_lowercase();
    let mut offset = 0;
    while let Some(pos) = haystack_lower[offset..].find(&needle) {
        let start = offset + pos;
        let end = start + needle.len();
        let before_ok = haystack_lower[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack_lower[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric() && c != '+' && c != '#');
        if before_ok && after_ok {
            return true;
        }
        offset = start + needle.len().max(1);
    }
    false
}

fn skills_in(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    SKILL_VOCABULARY
        .iter()
        .filter(|skill| mentions(&lower, skill))
        .map(|skill| skill.to_string())
        .collect()
}

fn labelled_value(text: &str, label: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let line = line.trim();
        let (key, value) = line.split_once(':')?;
        (key.trim().eq_ignore_ascii_case(label) && !value.trim().is_empty())
            .then(|| value.trim().to_string())
    })
}

fn years_mentioned(text: &str) -> Option<f64> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    tokens
        .windows(2)
        .filter(|pair| pair[1].to_lowercase().starts_with("year"))
        .filter_map(|pair| pair[0].trim_end_matches('+').parse::<f64>().ok())
        .filter(|years| (0.0..=70.0).contains(years))
        .reduce(f64::max)
}

fn posting_body(content: &str) -> &str {
    content
        .split_once("JOB POSTING:\n")
        .map(|(_, body)| body)
        .unwrap_or(content)
}

fn lower_set(items: &[String]) -> HashSet<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Parsers
// ────────────────────────────────────────────────────────────────────────────

fn stub_resume(text: &str) -> ResumeProfile {
    let name = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .filter(|l| l.len() <= 60 && !l.contains('@') && !l.chars().any(|c| c.is_ascii_digit()))
        .map(str::to_string);

    let email = text
        .split_whitespace()
        .find(|t| t.contains('@') && t.contains('.'))
        .map(|t| t.trim_matches(|c: char| c == ',' || c == ';').to_string());

    let bullets: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter_map(|l| l.strip_prefix("- ").or_else(|| l.strip_prefix("• ")))
        .map(str::to_string)
        .collect();

    let experience = if bullets.is_empty() {
        vec![]
    } else {
        vec![ExperienceEntry {
            title: labelled_value(text, "title"),
            company: labelled_value(text, "company"),
            bullets,
            ..Default::default()
        }]
    };

    ResumeProfile {
        name,
        contact: ContactInfo {
            email,
            ..Default::default()
        },
        location: labelled_value(text, "location"),
        headline: labelled_value(text, "headline"),
        summary: labelled_value(text, "summary"),
        years_experience: years_mentioned(text),
        skills: skills_in(text),
        experience,
        education: vec![],
        languages: vec![],
        certifications: vec![],
        // Only an explicit statement counts.
        work_authorization: labelled_value(text, "work authorization"),
    }
}

fn stub_job(text: &str) -> JobProfile {
    let title = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string);
    let title_lower = title.as_deref().unwrap_or_default().to_lowercase();
    let seniority = SENIORITY_LEVELS
        .iter()
        .find(|level| mentions(&title_lower, level))
        .map(|level| level.to_string());

    let mut must: Vec<String> = Vec::new();
    let mut nice: Vec<String> = Vec::new();
    let mut unmarked: Vec<String> = Vec::new();
    let mut requirements = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let lower = line.to_lowercase();
        let found = skills_in(line);
        let bucket = if NICE_MARKERS.iter().any(|m| lower.contains(m)) {
            &mut nice
        } else if MUST_MARKERS.iter().any(|m| lower.contains(m)) {
            requirements.push(line.to_string());
            &mut must
        } else {
            &mut unmarked
        };
        for skill in found {
            if !bucket.contains(&skill) {
                bucket.push(skill);
            }
        }
    }

    // No explicit requirements: everything the posting names is required.
    if must.is_empty() {
        must = unmarked;
    }
    nice.retain(|s| !must.contains(s));

    let lower = text.to_lowercase();
    let visa_sponsorship = if !lower.contains("sponsor") {
        VisaSponsorship::Unknown
    } else if ["no visa", "not sponsor", "unable to sponsor", "cannot sponsor"]
        .iter()
        .any(|p| lower.contains(p))
    {
        VisaSponsorship::No
    } else {
        VisaSponsorship::Yes
    };
    let relocation_assistance = lower
        .contains("relocation")
        .then(|| !lower.contains("no relocation"));

    JobProfile {
        title,
        company: labelled_value(text, "company"),
        location: labelled_value(text, "location"),
        employment_type: labelled_value(text, "type"),
        seniority,
        must_have_skills: must,
        nice_to_have_skills: nice,
        visa_sponsorship,
        relocation_assistance,
        description: Some(text.trim().to_string()),
        requirements,
        ..Default::default()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scoring: skills 50%, seniority 20%, location/authorization 20%, other 10%
// ────────────────────────────────────────────────────────────────────────────

fn coverage(required: &[String], have: &HashSet<String>) -> (f64, Vec<String>, Vec<String>) {
    if required.is_empty() {
        return (100.0, vec![], vec![]);
    }
    let (matched, missing): (Vec<String>, Vec<String>) = required
        .iter()
        .cloned()
        .partition(|s| have.contains(&s.to_lowercase()));
    let pct = (matched.len() as f64 / required.len() as f64 * 100.0).round();
    (pct, matched, missing)
}

fn min_years_for(seniority: &str) -> Option<(f64, f64)> {
    match seniority {
        "intern" | "junior" => Some((0.0, 2.0)),
        "mid" => Some((2.0, 5.0)),
        "senior" | "lead" => Some((5.0, 8.0)),
        "staff" | "principal" => Some((8.0, 70.0)),
        _ => None,
    }
}

fn seniority_fit(resume: &ResumeProfile, job: &JobProfile) -> SeniorityFit {
    let (Some(years), Some(level)) = (resume.years_experience, job.seniority.as_deref()) else {
        return SeniorityFit::Unknown;
    };
    match min_years_for(&level.to_lowercase()) {
        Some((min, _)) if years < min => SeniorityFit::Under,
        Some((_, max)) if years > max + 4.0 => SeniorityFit::Over,
        Some(_) => SeniorityFit::Match,
        None => SeniorityFit::Unknown,
    }
}

fn flag_points(flag: Option<bool>) -> f64 {
    match flag {
        Some(true) => 100.0,
        Some(false) => 0.0,
        None => 60.0,
    }
}

fn stub_match(resume: &ResumeProfile, job: &JobProfile, hints: &CandidateHints) -> MatchResult {
    let have = lower_set(&resume.skills);
    let (must_cov, mut matched, mut missing) = coverage(&job.must_have_skills, &have);
    let (nice_cov, nice_matched, nice_missing) = coverage(&job.nice_to_have_skills, &have);
    matched.extend(nice_matched);
    missing.extend(nice_missing);
    let skills_points = 0.75 * must_cov + 0.25 * nice_cov;

    let seniority = seniority_fit(resume, job);
    let seniority_points = match seniority {
        SeniorityFit::Match => 100.0,
        SeniorityFit::Over => 70.0,
        SeniorityFit::Under => 30.0,
        SeniorityFit::Unknown => 50.0,
    };

    let candidate_location = hints.location.as_ref().or(resume.location.as_ref());
    let location_fit = match (candidate_location, job.location.as_ref()) {
        (Some(mine), Some(theirs)) => {
            let (mine, theirs) = (mine.to_lowercase(), theirs.to_lowercase());
            Some(theirs.contains("remote") || theirs.contains(&mine) || mine.contains(&theirs))
        }
        _ => None,
    };
    let authorization_stated = hints.work_authorization.is_some() || resume.work_authorization.is_some();
    let authorization_fit = authorization_stated.then_some(true);
    let visa_fit = match job.visa_sponsorship {
        VisaSponsorship::Yes => Some(true),
        VisaSponsorship::No => authorization_stated.then_some(true).or(Some(false)),
        VisaSponsorship::Unknown => None,
    };
    let location_points = (flag_points(location_fit) + flag_points(authorization_fit)) / 2.0;

    let title = job.title.as_deref().unwrap_or_default().to_lowercase();
    let other_points = if hints.target_roles.is_empty() {
        50.0
    } else if hints
        .target_roles
        .iter()
        .any(|role| title.contains(&role.to_lowercase()))
    {
        100.0
    } else {
        0.0
    };

    let score = (0.5 * skills_points
        + 0.2 * seniority_points
        + 0.2 * location_points
        + 0.1 * other_points)
        .round()
        .clamp(0.0, 100.0);

    let explanation = format!(
        "Covers {} of {} must-have skills; seniority {:?}.",
        job.must_have_skills
            .iter()
            .filter(|s| have.contains(&s.to_lowercase()))
            .count(),
        job.must_have_skills.len(),
        seniority
    );

    MatchResult {
        score,
        must_have_coverage: must_cov,
        nice_to_have_coverage: nice_cov,
        matched_skills: matched,
        missing_skills: missing,
        location_fit,
        authorization_fit,
        visa_fit,
        seniority_fit: seniority,
        recommendation: Recommendation::from_score(score),
        explanation,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tailoring
// ────────────────────────────────────────────────────────────────────────────

fn stub_tailor(resume: &ResumeProfile, job: &JobProfile) -> TailoredResume {
    let wanted = lower_set(
        &job.must_have_skills
            .iter()
            .chain(job.nice_to_have_skills.iter())
            .cloned()
            .collect::<Vec<_>>(),
    );
    let (mut skills, rest): (Vec<String>, Vec<String>) = resume
        .skills
        .iter()
        .cloned()
        .partition(|s| wanted.contains(&s.to_lowercase()));
    let keywords = skills.clone();
    skills.extend(rest);

    let summary = resume
        .summary
        .clone()
        .or_else(|| resume.headline.clone())
        .unwrap_or_else(|| {
            if skills.is_empty() {
                "Professional profile as stated in the resume.".to_string()
            } else {
                format!("Professional with experience in {}.", skills.join(", "))
            }
        });

    TailoredResume {
        headline: resume.headline.clone(),
        summary,
        skills,
        experience: resume
            .experience
            .iter()
            .map(|e| TailoredExperience {
                title: e.title.clone(),
                company: e.company.clone(),
                start: e.start.clone(),
                end: e.end.clone(),
                bullets: e.bullets.clone(),
            })
            .collect(),
        keywords,
        change_log: vec!["Reordered skills to lead with the posting's requirements.".to_string()],
        warnings: vec![],
    }
}

fn stub_cover_letter(
    resume: &ResumeProfile,
    job: &JobProfile,
    tailored: &TailoredResume,
    tone: CoverLetterTone,
) -> CoverLetter {
    let role = job.title.as_deref().unwrap_or("this role");
    let company = job.company.as_deref().unwrap_or("your team");
    let name = resume.name.as_deref().unwrap_or("the candidate");
    let opener = match tone {
        CoverLetterTone::Professional => "I am writing to apply for",
        CoverLetterTone::Enthusiastic => "I am excited to apply for",
        CoverLetterTone::Direct => "I am applying for",
    };
    let skills = if tailored.keywords.is_empty() {
        "the skills listed in my resume".to_string()
    } else {
        tailored.keywords.join(", ")
    };
    let highlight = tailored
        .experience
        .iter()
        .flat_map(|e| e.bullets.iter())
        .next()
        .unwrap_or(&tailored.summary)
        .trim_end_matches('.');

    let first = format!(
        "{opener} the {role} position at {company}. My name is {name}, and my background lines up \
         with what the posting describes. I have read the role carefully and believe the overlap \
         between what you need and what I have done is concrete rather than aspirational, which is \
         why I am reaching out directly with this application."
    );
    let second = format!(
        "The posting emphasises {skills}. These are areas I have worked in directly, as my resume \
         shows. One example from my recent work: {highlight}. I approach problems by understanding \
         the constraints first, agreeing on what success looks like with the people affected, and \
         then delivering in small, verifiable steps so that progress is visible and risks surface \
         early instead of late."
    );
    let third = format!(
        "I would welcome the chance to discuss how this experience could support {company}. Thank \
         you for considering my application; I am happy to share more detail on any of the work \
         mentioned here, and I look forward to hearing from you about the next steps for the {role} \
         position."
    );

    CoverLetter {
        tone,
        body: [first, second, third].join("\n\n"),
        warnings: vec![],
    }
}

fn stub_guard(
    original: &ResumeProfile,
    tailored: &TailoredResume,
    letter: &CoverLetter,
) -> GuardReport {
    let known_skills = lower_set(&original.skills);
    let known_companies: HashSet<String> = original
        .experience
        .iter()
        .filter_map(|e| e.company.as_ref().map(|c| c.to_lowercase()))
        .collect();

    let mut issues = Vec::new();
    for skill in &tailored.skills {
        if !known_skills.contains(&skill.to_lowercase()) {
            issues.push(GuardIssue {
                kind: IssueKind::Fabrication,
                field: "skills".to_string(),
                original: None,
                generated: Some(skill.clone()),
                severity: Severity::High,
            });
        }
    }
    for (i, entry) in tailored.experience.iter().enumerate() {
        if let Some(company) = &entry.company {
            if !known_companies.contains(&company.to_lowercase()) {
                issues.push(GuardIssue {
                    kind: IssueKind::Fabrication,
                    field: format!("experience[{i}].company"),
                    original: None,
                    generated: Some(company.clone()),
                    severity: Severity::High,
                });
            }
        }
    }

    let mut placeholders = find_placeholders(&tailored.summary);
    placeholders.extend(find_placeholders(&letter.body));

    GuardReport {
        verdict: if issues.is_empty() {
            GuardVerdict::Pass
        } else {
            GuardVerdict::Fail
        },
        confidence: if issues.is_empty() { 0.9 } else { 0.7 },
        issues,
        placeholders,
    }
}
