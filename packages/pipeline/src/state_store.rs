//! Harvest state in the `harvest_state` table.

use heritage_harvester::harvest::StateStore;
use heritage_harvester::HarvesterError;
use sqlx::PgPool;
use tokio::runtime::Handle;

use crate::error::Result;
use crate::models::StateEntry;

/// Read a state value.
pub async fn get_state<'e, E>(executor: E, key: &str) -> Result<Option<String>>
where
    E: sqlx::PgExecutor<'e>,
{
    let value = sqlx::query_scalar::<_, String>(r#"SELECT value FROM harvest_state WHERE id = $1"#)
        .bind(key)
        .fetch_optional(executor)
        .await?;

    Ok(value)
}

/// Insert or overwrite a state value.
#[tracing::instrument(skip(executor))]
pub async fn save_state<'e, E>(executor: E, key: &str, value: &str) -> Result<StateEntry>
where
    E: sqlx::PgExecutor<'e>,
{
    let entry = sqlx::query_as::<_, StateEntry>(
        r#"
        INSERT INTO harvest_state (id, value)
        VALUES ($1, $2)
        ON CONFLICT (id) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
        RETURNING *
        "#,
    )
    .bind(key)
    .bind(value)
    .fetch_one(executor)
    .await?;

    tracing::info!("harvest state saved");
    Ok(entry)
}

/// [`StateStore`] over PostgreSQL for harvests running on blocking threads.
///
/// Calls block on `handle`, so they must not be made from async code.
#[derive(Debug, Clone)]
pub struct PgStateStore {
    pool: PgPool,
    handle: Handle,
}

impl PgStateStore {
    pub fn new(pool: PgPool, handle: Handle) -> Self {
        Self { pool, handle }
    }
}

impl StateStore for PgStateStore {
    fn get_state(&self, key: &str) -> heritage_harvester::Result<Option<String>> {
        self.handle
            .block_on(get_state(&self.pool, key))
            .map_err(|e| e.into_harvester(HarvesterError::State))
    }

    fn save_state(&self, key: &str, value: &str) -> heritage_harvester::Result<()> {
        self.handle
            .block_on(save_state(&self.pool, key, value))
            .map(|_| ())
            .map_err(|e| e.into_harvester(HarvesterError::State))
    }
}
