//! Run audit trail. Writes happen on spawned tasks: a slow or failing store
//! never delays or fails a run.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::models::run::PipelineRunRow;
use crate::pipeline::models::{RunOutput, RunStatus, RunType};

#[async_trait]
pub trait RunRecorder: Send + Sync {
    async fn record_start(&self, run_id: &str, run_type: RunType, job_count: usize) -> Result<()>;
    async fn record_completion(&self, output: &RunOutput) -> Result<()>;
    async fn record_failure(&self, run_id: &str, error: &str) -> Result<()>;
}

/// Discards every record.
pub struct NoopRecorder;

#[async_trait]
impl RunRecorder for NoopRecorder {
    async fn record_start(&self, _: &str, _: RunType, _: usize) -> Result<()> {
        Ok(())
    }

    async fn record_completion(&self, _: &RunOutput) -> Result<()> {
        Ok(())
    }

    async fn record_failure(&self, _: &str, _: &str) -> Result<()> {
        Ok(())
    }
}

pub fn spawn_start(recorder: &Arc<dyn RunRecorder>, run_id: &str, run_type: RunType, job_count: usize) {
    let recorder = Arc::clone(recorder);
    let run_id = run_id.to_string();
    tokio::spawn(async move {
        if let Err(e) = recorder.record_start(&run_id, run_type, job_count).await {
            warn!("[run {}] failed to record run start: {e:#}", run_id);
        }
    });
}

pub fn spawn_completion(recorder: &Arc<dyn RunRecorder>, output: &RunOutput) {
    let recorder = Arc::clone(recorder);
    let output = output.clone();
    tokio::spawn(async move {
        if let Err(e) = recorder.record_completion(&output).await {
            warn!("[run {}] failed to record run completion: {e:#}", output.run_id);
        }
    });
}

pub fn spawn_failure(recorder: &Arc<dyn RunRecorder>, run_id: &str, error: &str) {
    let recorder = Arc::clone(recorder);
    let run_id = run_id.to_string();
    let error = error.to_string();
    tokio::spawn(async move {
        if let Err(e) = recorder.record_failure(&run_id, &error).await {
            warn!("[run {}] failed to record run failure: {e:#}", run_id);
        }
    });
}

fn run_type_label(run_type: RunType) -> &'static str {
    match run_type {
        RunType::ResumeOnly => "resume_only",
        RunType::ResumeMatch => "resume_match",
        RunType::ResumeMatchTailor => "resume_match_tailor",
    }
}

fn status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Ok => "ok",
        RunStatus::Partial => "partial",
        RunStatus::Blocked => "blocked",
    }
}

pub fn archive_key(run_id: &str) -> String {
    format!("runs/{run_id}.json")
}

/// Postgres row per run plus the full output archived to S3.
pub struct PgRunRecorder {
    pool: PgPool,
    s3: aws_sdk_s3::Client,
    bucket: String,
}

impl PgRunRecorder {
    pub fn new(pool: PgPool, s3: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { pool, s3, bucket }
    }
}

#[async_trait]
impl RunRecorder for PgRunRecorder {
    async fn record_start(&self, run_id: &str, run_type: RunType, job_count: usize) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pipeline_runs (id, run_type, status, job_count)
            VALUES ($1, $2, 'running', $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(run_id)
        .bind(run_type_label(run_type))
        .bind(i32::try_from(job_count).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_completion(&self, output: &RunOutput) -> Result<()> {
        let s3_key = archive_key(&output.run_id);
        let body = serde_json::to_vec(output)?;
        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(&s3_key)
            .body(ByteStream::from(body))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 upload failed: {e}"))?;

        // Upsert: the start row is written by a separate task and may land later.
        sqlx::query(
            r#"
            INSERT INTO pipeline_runs
                (id, status, tokens_used, token_budget, ranked_count, tailored_count,
                 s3_key, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                tokens_used = EXCLUDED.tokens_used,
                token_budget = EXCLUDED.token_budget,
                ranked_count = EXCLUDED.ranked_count,
                tailored_count = EXCLUDED.tailored_count,
                s3_key = EXCLUDED.s3_key,
                completed_at = EXCLUDED.completed_at
            "#,
        )
        .bind(&output.run_id)
        .bind(status_label(output.status))
        .bind(i64::try_from(output.budget.used).unwrap_or(i64::MAX))
        .bind(i64::try_from(output.budget.total).unwrap_or(i64::MAX))
        .bind(i32::try_from(output.ranked_jobs.len()).unwrap_or(i32::MAX))
        .bind(i32::try_from(output.tailored.len()).unwrap_or(i32::MAX))
        .bind(&s3_key)
        .execute(&self.pool)
        .await?;

        info!(
            "[run {}] archived output to s3://{}/{}",
            output.run_id, self.bucket, s3_key
        );
        Ok(())
    }

    async fn record_failure(&self, run_id: &str, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pipeline_runs (id, status, error, completed_at)
            VALUES ($1, 'failed', $2, NOW())
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                error = EXCLUDED.error,
                completed_at = EXCLUDED.completed_at
            "#,
        )
        .bind(run_id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

pub async fn get_run(pool: &PgPool, run_id: &str) -> Result<Option<PipelineRunRow>, sqlx::Error> {
    sqlx::query_as::<_, PipelineRunRow>("SELECT * FROM pipeline_runs WHERE id = $1")
        .bind(run_id)
        .fetch_optional(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryRecorder {
        events: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RunRecorder for MemoryRecorder {
        async fn record_start(&self, run_id: &str, run_type: RunType, _: usize) -> Result<()> {
            self.events
                .lock()
                .unwrap()
                .push(format!("start {run_id} {}", run_type_label(run_type)));
            Ok(())
        }

        async fn record_completion(&self, output: &RunOutput) -> Result<()> {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {} {}", output.run_id, status_label(output.status)));
            Ok(())
        }

        async fn record_failure(&self, run_id: &str, _: &str) -> Result<()> {
            anyhow::bail!("store unavailable for {run_id}")
        }
    }

    #[test]
    fn test_archive_key_layout() {
        assert_eq!(archive_key("abc"), "runs/abc.json");
    }

    #[tokio::test]
    async fn test_spawned_records_reach_recorder() {
        let memory = Arc::new(MemoryRecorder::default());
        let recorder: Arc<dyn RunRecorder> = memory.clone();

        spawn_start(&recorder, "run-1", RunType::ResumeMatch, 2);
        // Failures are logged, never surfaced.
        spawn_failure(&recorder, "run-1", "boom");

        for _ in 0..10 {
            if !memory.events.lock().unwrap().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(
            *memory.events.lock().unwrap(),
            vec!["start run-1 resume_match".to_string()]
        );
    }
}
