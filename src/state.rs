use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::AppConfig;
use crate::users::{MemoryUserRepo, PgUserRepo, UserRepo};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepo>,
    pub config: Arc<AppConfig>,
}

/// Apply pending migrations; startup aborts if they fail.
pub async fn run_migrations(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    tracing::info!("migrations applied");
    Ok(())
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let users = match &config.database_url {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                run_migrations(&db).await?;
                Arc::new(PgUserRepo::new(db)) as Arc<dyn UserRepo>
            }
            None => {
                tracing::warn!("DATABASE_URL not set; users are kept in memory and lost on restart");
                Arc::new(MemoryUserRepo::new()) as Arc<dyn UserRepo>
            }
        };

        Ok(Self { users, config })
    }

    pub fn from_parts(users: Arc<dyn UserRepo>, config: Arc<AppConfig>) -> Self {
        Self { users, config }
    }

    /// State backed by the in-process store. Used by tests and local runs.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::from_parts(Arc::new(MemoryUserRepo::new()), Arc::new(config))
    }
}
