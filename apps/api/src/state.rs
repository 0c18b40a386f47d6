use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::pipeline::cache::StructureCache;
use crate::pipeline::orchestrator::Orchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Owns the completion service and run recorder. Model client or stub per `PIPELINE_STUB_MODE`.
    pub orchestrator: Arc<Orchestrator>,
    pub cache: StructureCache,
}
