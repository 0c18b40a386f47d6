use std::str::FromStr;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    /// Empty when `pipeline_stub_mode` is on.
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Wall-clock limit for one run, checked between model calls.
    pub run_timeout_secs: u64,
    /// Serve runs from the deterministic stub instead of the model API.
    pub pipeline_stub_mode: bool,
    pub cache_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let pipeline_stub_mode = parse_flag(std::env::var("PIPELINE_STUB_MODE").ok().as_deref());
        let anthropic_api_key = if pipeline_stub_mode {
            std::env::var("ANTHROPIC_API_KEY").unwrap_or_default()
        } else {
            require_env("ANTHROPIC_API_KEY")?
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            run_timeout_secs: env_or("RUN_TIMEOUT_SECS", 120)?,
            pipeline_stub_mode,
            cache_ttl_secs: env_or("CACHE_TTL_SECS", 7 * 24 * 60 * 60)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}
