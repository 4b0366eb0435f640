//! Repository backend selection

use std::sync::Arc;

use crate::apikey::{ApiKeyRepository, MemoryApiKeyRepository, PostgresApiKeyRepository};
use crate::config::DatabaseConfig;
use crate::email::{MemorySendRecordRepository, PostgresSendRecordRepository, SendRecordRepository};
use crate::template::{MemoryTemplateRepository, PostgresTemplateRepository, TemplateRepository};

use super::pool::{PostgresPool, PostgresPoolError};

/// The three repositories the services are built on.
#[derive(Clone)]
pub struct Repositories {
    pub templates: Arc<dyn TemplateRepository>,
    pub api_keys: Arc<dyn ApiKeyRepository>,
    pub send_records: Arc<dyn SendRecordRepository>,
}

impl Repositories {
    pub fn memory() -> Self {
        Self {
            templates: Arc::new(MemoryTemplateRepository::new()),
            api_keys: Arc::new(MemoryApiKeyRepository::new()),
            send_records: Arc::new(MemorySendRecordRepository::new()),
        }
    }

    pub fn postgres(pool: &PostgresPool) -> Self {
        let pg = pool.pool().clone();
        Self {
            templates: Arc::new(PostgresTemplateRepository::new(pg.clone())),
            api_keys: Arc::new(PostgresApiKeyRepository::new(pg.clone())),
            send_records: Arc::new(PostgresSendRecordRepository::new(pg)),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.templates.backend_name()
    }
}

/// Create repositories based on configuration.
///
/// - `"postgres"`: connects, applies the schema and returns the pool so it can
///   be closed on shutdown. Connection failures are fatal.
/// - `"memory"` (default): process-local maps, lost on restart
pub async fn create_repositories(
    config: &DatabaseConfig,
) -> Result<(Repositories, Option<PostgresPool>), PostgresPoolError> {
    match config.backend.as_str() {
        "postgres" => {
            let pool = PostgresPool::new(config).await?;
            pool.migrate().await?;
            tracing::info!(backend = "postgres", "Creating PostgreSQL repositories");
            Ok((Repositories::postgres(&pool), Some(pool)))
        }
        "memory" => {
            tracing::info!(backend = "memory", "Creating in-memory repositories");
            Ok((Repositories::memory(), None))
        }
        other => {
            tracing::warn!(backend = %other, "Unknown database backend, using memory");
            Ok((Repositories::memory(), None))
        }
    }
}
