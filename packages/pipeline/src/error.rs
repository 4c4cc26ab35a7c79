use heritage_harvester::HarvesterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("harvest error: {0}")]
    Harvest(#[from] HarvesterError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("worker error: {0}")]
    Worker(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Convert into the harvester's error type for use behind its traits.
    pub fn into_harvester(self, wrap: fn(String) -> HarvesterError) -> HarvesterError {
        match self {
            PipelineError::Harvest(e) => e,
            other => wrap(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
