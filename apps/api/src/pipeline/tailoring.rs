//! Tailor sub-machine for one job: tailor → cover letter → truth guard,
//! at most two attempts.
//!
//! A passing guard returns immediately. A failing guard on the first attempt
//! reruns the whole triple once. A failing guard on the last attempt still
//! returns the materials, with the guard report attached and a note. Any
//! error (budget, schema, transport) abandons this job only.

use tracing::{info, warn};

use crate::pipeline::agents::{check_truth, tailor_resume, write_cover_letter, AgentRuntime};
use crate::pipeline::budget::Budget;
use crate::pipeline::models::{GuardReport, JobProfile, ResumeProfile, TailoredOutput};
use crate::pipeline::tone::select_tone;
use crate::pipeline::PipelineError;

pub const MAX_TAILOR_ATTEMPTS: u8 = 2;

/// Why a report did not pass, for notes and logs.
fn guard_summary(report: &GuardReport) -> String {
    if report.issues.is_empty() {
        return "verdict fail with no issues listed".to_string();
    }
    format!(
        "{} issue(s), {} high/medium",
        report.issues.len(),
        report.blocking_issues()
    )
}

pub async fn tailor_job(
    rt: &AgentRuntime<'_>,
    budget: &mut Budget,
    job_id: &str,
    resume: &ResumeProfile,
    job: &JobProfile,
    notes: &mut Vec<String>,
) -> Result<TailoredOutput, PipelineError> {
    let tone = select_tone(job);

    let mut attempt = 1;
    loop {
        let tailored = tailor_resume(rt, budget, job_id, resume, job).await?;
        let letter = write_cover_letter(rt, budget, job_id, resume, job, &tailored, tone).await?;
        let guard = check_truth(rt, budget, job_id, resume, &tailored, &letter).await?;

        let output = TailoredOutput {
            job_id: job_id.to_string(),
            resume: tailored,
            cover_letter: letter,
            guard,
            attempts: attempt,
        };

        if output.guard.passed() {
            info!(
                "[run {}] tailoring for {} passed the guard on attempt {}",
                rt.run_id, job_id, attempt
            );
            return Ok(output);
        }

        let summary = guard_summary(&output.guard);
        if attempt < MAX_TAILOR_ATTEMPTS {
            warn!(
                "[run {}] guard rejected {} on attempt {} ({}); retrying",
                rt.run_id, job_id, attempt, summary
            );
            notes.push(format!(
                "Guard rejected materials for {job_id} on attempt {attempt} ({summary}); retrying tailoring."
            ));
            attempt += 1;
            continue;
        }

        warn!(
            "[run {}] guard still failing for {} after {} attempts; returning best effort",
            rt.run_id, job_id, attempt
        );
        notes.push(format!(
            "Unresolved guard issues for {job_id} after {attempt} attempts ({summary}); review before use."
        ));
        return Ok(output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::models::{GuardIssue, GuardVerdict, IssueKind, Severity};

    fn report(severities: &[Severity]) -> GuardReport {
        GuardReport {
            verdict: GuardVerdict::Fail,
            issues: severities
                .iter()
                .map(|&severity| GuardIssue {
                    kind: IssueKind::Exaggeration,
                    field: "summary".to_string(),
                    original: None,
                    generated: None,
                    severity,
                })
                .collect(),
            placeholders: vec![],
            confidence: 0.7,
        }
    }

    #[test]
    fn test_summary_for_bare_fail_verdict() {
        let summary = guard_summary(&report(&[]));
        assert_eq!(summary, "verdict fail with no issues listed");
        assert!(!summary.contains("0 issue"));
    }

    #[test]
    fn test_summary_counts_all_and_blocking_issues() {
        let summary = guard_summary(&report(&[Severity::Low, Severity::High]));
        assert_eq!(summary, "2 issue(s), 1 high/medium");
    }
}
