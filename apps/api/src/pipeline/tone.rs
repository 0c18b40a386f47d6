//! Cover-letter tone calibration — picks one of the three tones from the
//! posting's own language. The writer is asked to echo the requested tone.

use crate::pipeline::models::{CoverLetterTone, JobProfile};

/// Fast-paced, ownership-heavy language.
const STARTUP_SIGNALS: &[&str] = &[
    "move fast",
    "fast-paced",
    "startup",
    "own ",
    "ownership",
    "spearhead",
    "disrupt",
    "scrappy",
    "zero to one",
];

/// Senior / leadership / regulated-environment language.
const DIRECT_SIGNALS: &[&str] = &[
    "staff",
    "principal",
    "director",
    "head of",
    "lead",
    "architect",
];

/// Returns the tone to request for a job's cover letter.
///
/// Startup language wins over seniority; everything else is professional.
pub fn select_tone(job: &JobProfile) -> CoverLetterTone {
    let text = posting_text(job);

    if STARTUP_SIGNALS.iter().any(|s| text.contains(s)) {
        return CoverLetterTone::Enthusiastic;
    }

    let seniority = job.seniority.as_deref().unwrap_or_default().to_lowercase();
    let title = job.title.as_deref().unwrap_or_default().to_lowercase();
    if DIRECT_SIGNALS
        .iter()
        .any(|s| seniority.contains(s) || title.contains(s))
    {
        return CoverLetterTone::Direct;
    }

    CoverLetterTone::Professional
}

fn posting_text(job: &JobProfile) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(description) = &job.description {
        parts.push(description);
    }
    parts.extend(job.responsibilities.iter().map(String::as_str));
    parts.extend(job.requirements.iter().map(String::as_str));
    parts.join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(title: &str, seniority: Option<&str>, description: &str) -> JobProfile {
        JobProfile {
            title: Some(title.to_string()),
            seniority: seniority.map(str::to_string),
            description: Some(description.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_startup_language_is_enthusiastic() {
        let job = job(
            "Backend Engineer",
            Some("senior"),
            "We move fast and you will own the payments stack.",
        );
        assert_eq!(select_tone(&job), CoverLetterTone::Enthusiastic);
    }

    #[test]
    fn test_staff_role_is_direct() {
        let job = job(
            "Staff Platform Engineer",
            Some("staff"),
            "Partner with teams across the org.",
        );
        assert_eq!(select_tone(&job), CoverLetterTone::Direct);
    }

    #[test]
    fn test_default_is_professional() {
        let job = job("Software Engineer", Some("mid"), "Join our platform team.");
        assert_eq!(select_tone(&job), CoverLetterTone::Professional);
        assert_eq!(select_tone(&JobProfile::default()), CoverLetterTone::Professional);
    }
}
