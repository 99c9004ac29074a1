//! Shared application state

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::{JwtCodec, PgAuthStore, SessionService};
use crate::config::Config;

/// State shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub sessions: SessionService<PgAuthStore>,
    /// Hit counter for the static fileserver, exposed at /admin/metrics
    pub fileserver_hits: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let codec = JwtCodec::new(&config.jwt_secret, config.access_token_ttl_secs);
        let sessions = SessionService::new(
            PgAuthStore::new(pool.clone()),
            codec,
            config.webhook_api_key.clone(),
            config.refresh_token_ttl_days,
        );

        Self {
            pool,
            config: Arc::new(config),
            sessions,
            fileserver_hits: Arc::new(AtomicU64::new(0)),
        }
    }
}
