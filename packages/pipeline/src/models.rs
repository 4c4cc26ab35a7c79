use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the `harvest_state` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StateEntry {
    pub id: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// A stored index document, one per source record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub source_id: String,
    pub oai_id: String,
    pub record_id: Option<String>,
    pub datestamp: Option<String>,
    pub deleted: bool,
    pub content_hash: Option<String>,
    pub fields: Option<serde_json::Value>,
    pub warnings: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
