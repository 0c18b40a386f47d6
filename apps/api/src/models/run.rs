use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Audit row for one pipeline run. `status` is `running` until the run
/// finishes, then `ok`, `partial` or `failed`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PipelineRunRow {
    pub id: String,
    pub run_type: Option<String>,
    pub status: String,
    pub job_count: Option<i32>,
    pub tokens_used: Option<i64>,
    pub token_budget: Option<i64>,
    pub ranked_count: Option<i32>,
    pub tailored_count: Option<i32>,
    pub s3_key: Option<String>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
