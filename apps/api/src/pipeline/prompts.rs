// Fixed instructions for the six agents. Shared fragments come from
// llm_client::prompts and are appended by `instruction()`.

use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, JSON_ONLY_SYSTEM, PLACEHOLDER_INSTRUCTION};
use crate::pipeline::AgentKind;

pub const RESUME_PARSE_SYSTEM: &str = r#"You extract structured facts from a candidate's resume.
Return an object with keys: name, contact {email, phone, links}, location, headline, summary,
years_experience (number), skills [string], experience [{title, company, location, start, end, bullets}],
education [{institution, degree, field, start, end}], languages [string], certifications [string],
work_authorization.
Rules: extract only what is written. Absent fields are null or []. NEVER derive work_authorization
from nationality, citizenship of a school, or location; set it only when the resume states it."#;

pub const JOB_PARSE_SYSTEM: &str = r#"You extract structured facts from a job posting.
Return an object with keys: title, company, location, employment_type, seniority, salary_min, salary_max,
currency, must_have_skills [string], nice_to_have_skills [string], visa_sponsorship ("yes"|"no"|"unknown"),
relocation_assistance (bool|null), eligible_countries [ISO-3166 alpha-2], description, requirements [string],
responsibilities [string].
Rules: a skill is must-have only when the posting says "required", "must", or lists it under requirements;
"preferred", "bonus", "nice to have", "a plus" mean nice-to-have. eligible_countries holds two-letter
uppercase codes or is empty when the posting does not restrict. Unknown visa sponsorship is "unknown"."#;

pub const MATCH_SCORE_SYSTEM: &str = r#"You score how well a parsed resume fits a parsed job.
Input: {"resume": ..., "job": ..., "hints": ...}.
Return: score (0-100), must_have_coverage (0-100), nice_to_have_coverage (0-100), matched_skills,
missing_skills, location_fit, authorization_fit, visa_fit (bool|null), seniority_fit
("match"|"over"|"under"|"unknown"), recommendation ("apply"|"stretch"|"skip"), explanation (max 2 sentences).
Scoring: skills 50%, seniority 20%, location/authorization 20%, other 10%.
recommendation is "apply" when score >= 70, "stretch" when 55-69, "skip" below 55."#;

pub const TAILOR_SYSTEM: &str = r#"You tailor a parsed resume to one job.
Input: {"resume": ..., "job": ...}.
Return: headline, summary, skills [string], experience [{title, company, start, end, bullets}],
keywords [posting keywords you surfaced], change_log [what you changed], warnings [string].
Rules: you may only reorder, select, and rephrase facts already in the resume. Keep every employer,
title, and date exactly as given."#;

pub const COVER_LETTER_SYSTEM: &str = r#"You write a cover letter for one job.
Input: {"resume": ..., "job": ..., "tailored_resume": ..., "tone": "professional"|"enthusiastic"|"direct"}.
Return: tone (echo the requested tone), body, warnings [string].
Rules: body is exactly three paragraphs separated by a blank line, 200-300 words in total. Use only facts
from the resume and tailored resume."#;

pub const TRUTH_GUARD_SYSTEM: &str = r#"You audit generated application materials against the original resume.
Input: {"original_resume": ..., "tailored_resume": ..., "cover_letter": ...}.
Return: verdict ("pass"|"fail"), issues [{type: "fabrication"|"inconsistency"|"exaggeration", field,
original, generated, severity: "low"|"medium"|"high"}], placeholders [string], confidence (0-1).
Rules: any employer, date, tool, certification, or metric absent from the original is a fabrication.
Bracketed placeholders such as [X%] are NOT violations; list them under placeholders. verdict is "pass"
only when no high or medium severity issue remains."#;

pub fn system_for(kind: AgentKind) -> &'static str {
    match kind {
        AgentKind::ResumeParser => RESUME_PARSE_SYSTEM,
        AgentKind::JobParser => JOB_PARSE_SYSTEM,
        AgentKind::MatchScorer => MATCH_SCORE_SYSTEM,
        AgentKind::ResumeTailor => TAILOR_SYSTEM,
        AgentKind::CoverLetterWriter => COVER_LETTER_SYSTEM,
        AgentKind::TruthGuard => TRUTH_GUARD_SYSTEM,
    }
}

/// The full instruction sent for an agent: its system text plus shared rules.
pub fn instruction(kind: AgentKind) -> String {
    let mut text = String::from(system_for(kind));
    match kind {
        AgentKind::ResumeParser | AgentKind::JobParser | AgentKind::TruthGuard => {
            text.push_str("\n\n");
            text.push_str(GROUNDING_INSTRUCTION);
        }
        AgentKind::ResumeTailor | AgentKind::CoverLetterWriter => {
            text.push_str("\n\n");
            text.push_str(PLACEHOLDER_INSTRUCTION);
        }
        AgentKind::MatchScorer => {}
    }
    text.push_str("\n\n");
    text.push_str(JSON_ONLY_SYSTEM);
    text
}

/// Reverse lookup used by the stand-in completion service.
pub fn identify(instruction: &str) -> Option<AgentKind> {
    [
        AgentKind::ResumeParser,
        AgentKind::JobParser,
        AgentKind::MatchScorer,
        AgentKind::ResumeTailor,
        AgentKind::CoverLetterWriter,
        AgentKind::TruthGuard,
    ]
    .into_iter()
    .find(|kind| instruction.starts_with(system_for(*kind)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_round_trips_every_agent() {
        for kind in [
            AgentKind::ResumeParser,
            AgentKind::JobParser,
            AgentKind::MatchScorer,
            AgentKind::ResumeTailor,
            AgentKind::CoverLetterWriter,
            AgentKind::TruthGuard,
        ] {
            assert_eq!(identify(&instruction(kind)), Some(kind));
        }
        assert_eq!(identify("You are a helpful assistant."), None);
    }

    #[test]
    fn test_every_instruction_demands_json() {
        assert!(instruction(AgentKind::MatchScorer).ends_with(JSON_ONLY_SYSTEM));
        assert!(instruction(AgentKind::ResumeTailor).contains("bracketed placeholder"));
    }
}
