mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod pipeline;
mod routes;
mod state;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::{CompletionService, LlmClient, FAST_MODEL, QUALITY_MODEL};
use crate::pipeline::audit::{PgRunRecorder, RunRecorder};
use crate::pipeline::cache::StructureCache;
use crate::pipeline::orchestrator::Orchestrator;
use crate::pipeline::stub::StubCompletion;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting jobmatch API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (pipeline_runs audit table)
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    let cache = StructureCache::new(redis, config.cache_ttl_secs);
    info!("Redis structure cache initialized (ttl {}s)", config.cache_ttl_secs);

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Completion service: model API, or the deterministic stub
    let completion: Arc<dyn CompletionService> = if config.pipeline_stub_mode {
        warn!("PIPELINE_STUB_MODE is on: agents answer from the deterministic stub");
        Arc::new(StubCompletion)
    } else {
        let llm = LlmClient::new(config.anthropic_api_key.clone())?;
        info!("LLM client initialized (fast: {FAST_MODEL}, quality: {QUALITY_MODEL})");
        Arc::new(llm)
    };

    let recorder: Arc<dyn RunRecorder> = Arc::new(PgRunRecorder::new(
        db.clone(),
        s3,
        config.s3_bucket.clone(),
    ));
    let orchestrator = Arc::new(Orchestrator::new(completion, recorder));

    // Build app state
    let state = AppState {
        db,
        config: config.clone(),
        orchestrator,
        cache,
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()), // TODO: restrict origins once the web client domain is fixed
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "jobmatch-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
