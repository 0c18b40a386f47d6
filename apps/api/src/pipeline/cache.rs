//! Redis-backed structure cache used by the HTTP layer.
//!
//! The orchestrator never touches Redis: the handler loads known structures
//! into `RunInput::cache` before a run and stores fresh ones after it. Resume
//! structures are keyed by a UUIDv5 of the resume text. Job structures are
//! cached only for jobs the caller gave a stable id, and never once the output
//! guardrails have cut their description.

use std::collections::HashSet;

use anyhow::Result;
use redis::AsyncCommands;
use tracing::{debug, info};
use uuid::Uuid;

use crate::pipeline::guardrails::ELLIPSIS;
use crate::pipeline::models::{JobProfile, ResumeProfile, RunCache, RunInput, RunOutput};

const KEY_PREFIX: &str = "jobmatch";

#[derive(Clone)]
pub struct StructureCache {
    client: redis::Client,
    ttl_secs: u64,
}

pub fn resume_key(resume_text: &str) -> String {
    let digest = Uuid::new_v5(&Uuid::NAMESPACE_OID, resume_text.trim().as_bytes());
    format!("{KEY_PREFIX}:resume:{digest}")
}

pub fn job_key(job_id: &str) -> String {
    format!("{KEY_PREFIX}:job:{job_id}")
}

/// Ids of jobs the caller identified explicitly. Positional `job-<n>` ids are
/// not stable across runs and are never cached.
pub fn stable_job_ids(input: &RunInput) -> HashSet<String> {
    input
        .jobs
        .iter()
        .filter_map(|job| job.id.as_deref().map(str::trim))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fills gaps in the caller's cache. Entries the caller supplied win.
pub fn merge_cache(target: &mut RunCache, found: RunCache) {
    if target.resume.is_none() {
        target.resume = found.resume;
    }
    for (job_id, job) in found.jobs {
        target.jobs.entry(job_id).or_insert(job);
    }
}

/// Ranked job structures worth storing. A description ending in `…` was cut
/// by the guardrails; caching it would feed the cut text to later runs.
pub fn cacheable_jobs<'a>(
    stable_ids: &HashSet<String>,
    output: &'a RunOutput,
) -> Vec<(&'a str, &'a JobProfile)> {
    output
        .ranked_jobs
        .iter()
        .filter(|r| stable_ids.contains(&r.job_id))
        .filter(|r| {
            let truncated = r
                .job
                .description
                .as_deref()
                .is_some_and(|d| d.ends_with(ELLIPSIS));
            if truncated {
                debug!("not caching {}: description was truncated", r.job_id);
            }
            !truncated
        })
        .map(|r| (r.job_id.as_str(), &r.job))
        .collect()
}

impl StructureCache {
    pub fn new(client: redis::Client, ttl_secs: u64) -> Self {
        Self { client, ttl_secs }
    }

    pub async fn load(&self, input: &RunInput) -> Result<RunCache> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let mut found = RunCache::default();

        if input.cache.resume.is_none() {
            let raw: Option<String> = conn.get(resume_key(&input.resume_text)).await?;
            if let Some(raw) = raw {
                found.resume = Some(serde_json::from_str::<ResumeProfile>(&raw)?);
            }
        }

        for job_id in stable_job_ids(input) {
            if input.cache.jobs.contains_key(&job_id) {
                continue;
            }
            let raw: Option<String> = conn.get(job_key(&job_id)).await?;
            if let Some(raw) = raw {
                found.jobs.insert(job_id, serde_json::from_str::<JobProfile>(&raw)?);
            }
        }

        debug!(
            "structure cache: resume hit {}, {} job hit(s)",
            found.resume.is_some(),
            found.jobs.len()
        );
        Ok(found)
    }

    pub async fn store(
        &self,
        resume_text: &str,
        stable_ids: &HashSet<String>,
        output: &RunOutput,
    ) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let resume = serde_json::to_string(&output.resume)?;
        conn.set_ex::<_, _, ()>(resume_key(resume_text), resume, self.ttl_secs)
            .await?;

        let jobs = cacheable_jobs(stable_ids, output);
        for (job_id, job) in &jobs {
            let job = serde_json::to_string(job)?;
            conn.set_ex::<_, _, ()>(job_key(job_id), job, self.ttl_secs)
                .await?;
        }

        info!(
            "[run {}] cached resume and {} job structure(s) for {}s",
            output.run_id,
            jobs.len(),
            self.ttl_secs
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::guardrails::{apply_output_guardrails, MAX_JOB_DESCRIPTION_CHARS};
    use crate::pipeline::models::{
        BudgetInfo, JobInput, MatchResult, RankedJob, Recommendation, RunStatus, RunType,
        SeniorityFit,
    };

    fn input_with_ids(ids: &[Option<&str>]) -> RunInput {
        RunInput {
            run_type: RunType::ResumeMatch,
            resume_text: "resume".to_string(),
            hints: Default::default(),
            jobs: ids
                .iter()
                .map(|id| JobInput {
                    id: id.map(str::to_string),
                    source: None,
                    url: None,
                    text: "posting".to_string(),
                })
                .collect(),
            limits: Default::default(),
            run_id: None,
            cache: RunCache::default(),
        }
    }

    #[test]
    fn test_resume_key_is_deterministic() {
        assert_eq!(resume_key("Jane Doe"), resume_key("  Jane Doe \n"));
        assert_ne!(resume_key("Jane Doe"), resume_key("John Doe"));
        assert!(resume_key("Jane Doe").starts_with("jobmatch:resume:"));
    }

    #[test]
    fn test_only_explicit_ids_are_stable() {
        let input = input_with_ids(&[Some("acme-1"), None, Some("  "), Some("globex-7")]);
        let ids = stable_job_ids(&input);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("acme-1"));
        assert!(ids.contains("globex-7"));
    }

    #[test]
    fn test_merge_keeps_caller_entries() {
        let caller_job = JobProfile {
            title: Some("Caller".to_string()),
            ..Default::default()
        };
        let mut target = RunCache::default();
        target.jobs.insert("a".to_string(), caller_job.clone());

        let mut found = RunCache {
            resume: Some(ResumeProfile::default()),
            ..Default::default()
        };
        found.jobs.insert(
            "a".to_string(),
            JobProfile {
                title: Some("Redis".to_string()),
                ..Default::default()
            },
        );
        found.jobs.insert("b".to_string(), JobProfile::default());

        merge_cache(&mut target, found);

        assert!(target.resume.is_some());
        assert_eq!(target.jobs["a"], caller_job);
        assert!(target.jobs.contains_key("b"));
    }

    fn ranked(job_id: &str, description: &str) -> RankedJob {
        RankedJob {
            job_id: job_id.to_string(),
            job: JobProfile {
                description: Some(description.to_string()),
                ..Default::default()
            },
            match_result: MatchResult {
                score: 75.0,
                must_have_coverage: 80.0,
                nice_to_have_coverage: 50.0,
                matched_skills: vec![],
                missing_skills: vec![],
                location_fit: None,
                authorization_fit: None,
                visa_fit: None,
                seniority_fit: SeniorityFit::Match,
                recommendation: Recommendation::Apply,
                explanation: String::new(),
            },
        }
    }

    fn output_with(ranked_jobs: Vec<RankedJob>) -> RunOutput {
        RunOutput {
            run_id: "run-1".to_string(),
            status: RunStatus::Ok,
            budget: BudgetInfo {
                total: 60_000,
                used: 1_000,
                stopped_reason: None,
            },
            resume: ResumeProfile::default(),
            ranked_jobs,
            tailored: vec![],
            notes: vec![],
            error: None,
        }
    }

    #[test]
    fn test_guardrail_cut_descriptions_are_not_cached() {
        let long = "platform work ".repeat(MAX_JOB_DESCRIPTION_CHARS);
        let mut output = output_with(vec![
            ranked("acme-1", &long),
            ranked("globex-7", "Build payment services in Rust."),
            ranked("job-3", "Positional id."),
        ]);
        apply_output_guardrails(&mut output);

        let stable: HashSet<String> = ["acme-1", "globex-7"].iter().map(|s| s.to_string()).collect();
        let jobs = cacheable_jobs(&stable, &output);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].0, "globex-7");
        assert_eq!(
            jobs[0].1.description.as_deref(),
            Some("Build payment services in Rust.")
        );
    }
}
