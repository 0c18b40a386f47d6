//! Output guardrails — one pass over the assembled run output that caps
//! every independently-bounded field before it leaves the service.
//!
//! Truncated strings end with `…` and stay within their cap, so a second pass
//! changes nothing. Truncations are logged, not reported to the caller.

use tracing::warn;

use crate::pipeline::models::RunOutput;

pub const MAX_JOB_DESCRIPTION_CHARS: usize = 2_000;
pub const MAX_MATCH_EXPLANATION_CHARS: usize = 600;
pub const MAX_COVER_LETTER_CHARS: usize = 3_000;
pub const MAX_TAILORED_SUMMARY_CHARS: usize = 800;
pub const MAX_BULLET_CHARS: usize = 300;
pub const MAX_KEYWORDS: usize = 30;
pub const MAX_CHANGE_LOG_ENTRIES: usize = 20;

pub const ELLIPSIS: char = '…';

/// Caps `text` at `max_chars` characters, ellipsis included.
/// Returns true when the string was shortened.
pub fn truncate_with_ellipsis(text: &mut String, max_chars: usize) -> bool {
    if max_chars == 0 || text.chars().count() <= max_chars {
        return false;
    }
    let cut = text
        .char_indices()
        .nth(max_chars - 1)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text.truncate(cut);
    let trimmed = text.trim_end().len();
    text.truncate(trimmed);
    text.push(ELLIPSIS);
    true
}

fn cap_string(text: &mut String, max_chars: usize, run_id: &str, job_id: &str, field: &str) {
    let before = text.chars().count();
    if truncate_with_ellipsis(text, max_chars) {
        warn!(
            "[run {}] guardrail truncated {} for {} ({} → {} chars)",
            run_id, field, job_id, before, max_chars
        );
    }
}

fn cap_list(items: &mut Vec<String>, max_items: usize, run_id: &str, job_id: &str, field: &str) {
    if items.len() > max_items {
        warn!(
            "[run {}] guardrail dropped {} {} entries for {}",
            run_id,
            items.len() - max_items,
            field,
            job_id
        );
        items.truncate(max_items);
    }
}

pub fn apply_output_guardrails(output: &mut RunOutput) {
    let run_id = output.run_id.clone();

    for ranked in &mut output.ranked_jobs {
        let job_id = ranked.job_id.as_str();
        if let Some(description) = ranked.job.description.as_mut() {
            cap_string(
                description,
                MAX_JOB_DESCRIPTION_CHARS,
                &run_id,
                job_id,
                "job.description",
            );
        }
        cap_string(
            &mut ranked.match_result.explanation,
            MAX_MATCH_EXPLANATION_CHARS,
            &run_id,
            job_id,
            "match.explanation",
        );
    }

    for tailored in &mut output.tailored {
        let job_id = tailored.job_id.as_str();
        cap_string(
            &mut tailored.cover_letter.body,
            MAX_COVER_LETTER_CHARS,
            &run_id,
            job_id,
            "cover_letter.body",
        );
        cap_string(
            &mut tailored.resume.summary,
            MAX_TAILORED_SUMMARY_CHARS,
            &run_id,
            job_id,
            "resume.summary",
        );
        for (i, entry) in tailored.resume.experience.iter_mut().enumerate() {
            for (j, bullet) in entry.bullets.iter_mut().enumerate() {
                cap_string(
                    bullet,
                    MAX_BULLET_CHARS,
                    &run_id,
                    job_id,
                    &format!("resume.experience[{i}].bullets[{j}]"),
                );
            }
        }
        cap_list(
            &mut tailored.resume.keywords,
            MAX_KEYWORDS,
            &run_id,
            job_id,
            "resume.keywords",
        );
        cap_list(
            &mut tailored.resume.change_log,
            MAX_CHANGE_LOG_ENTRIES,
            &run_id,
            job_id,
            "resume.change_log",
        );
    }
}
