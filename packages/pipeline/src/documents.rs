//! Normalized documents in the `documents` table.
//!
//! Each document carries a SHA-256 hash of its field map so a re-harvested
//! record whose normalized content did not change is left alone.

use heritage_harvester::types::{FieldMap, SinkOutcome};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::models::Document;

/// A normalized record ready to be stored.
#[derive(Debug, Clone)]
pub struct NewDocument<'a> {
    pub source_id: &'a str,
    pub oai_id: &'a str,
    pub datestamp: Option<&'a str>,
    pub fields: &'a FieldMap,
    pub warnings: Vec<&'a str>,
}

/// Hex SHA-256 of the field map's JSON form.
///
/// The field map is sorted by name, so equal maps always hash equally.
pub fn content_hash(fields: &FieldMap) -> Result<String> {
    let bytes = serde_json::to_vec(fields)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Store a document unless an identical live copy exists.
///
/// Returns [`SinkOutcome::Unchanged`] when the stored hash matches.
#[tracing::instrument(skip(executor, doc), fields(source_id = %doc.source_id, oai_id = %doc.oai_id))]
pub async fn upsert_document<'e, E>(executor: E, doc: &NewDocument<'_>) -> Result<SinkOutcome>
where
    E: sqlx::PgExecutor<'e>,
{
    let hash = content_hash(doc.fields)?;
    let record_id = doc.fields.first("id");

    let written = sqlx::query_scalar::<_, String>(
        r#"
        INSERT INTO documents (source_id, oai_id, record_id, datestamp, deleted, content_hash, fields, warnings)
        VALUES ($1, $2, $3, $4, FALSE, $5, $6, $7)
        ON CONFLICT (source_id, oai_id) DO UPDATE SET
            record_id = EXCLUDED.record_id,
            datestamp = EXCLUDED.datestamp,
            deleted = FALSE,
            content_hash = EXCLUDED.content_hash,
            fields = EXCLUDED.fields,
            warnings = EXCLUDED.warnings,
            updated_at = now()
        WHERE documents.deleted OR documents.content_hash IS DISTINCT FROM EXCLUDED.content_hash
        RETURNING oai_id
        "#,
    )
    .bind(doc.source_id)
    .bind(doc.oai_id)
    .bind(record_id)
    .bind(doc.datestamp)
    .bind(&hash)
    .bind(serde_json::to_value(doc.fields)?)
    .bind(serde_json::to_value(&doc.warnings)?)
    .fetch_optional(executor)
    .await?;

    Ok(match written {
        Some(_) => SinkOutcome::Changed,
        None => SinkOutcome::Unchanged,
    })
}

/// Flag a document deleted, creating a tombstone if it was never stored.
///
/// Returns [`SinkOutcome::Unchanged`] when it was already deleted.
#[tracing::instrument(skip(executor))]
pub async fn mark_deleted<'e, E>(
    executor: E,
    source_id: &str,
    oai_id: &str,
    datestamp: Option<&str>,
) -> Result<SinkOutcome>
where
    E: sqlx::PgExecutor<'e>,
{
    let written = sqlx::query_scalar::<_, String>(
        r#"
        INSERT INTO documents (source_id, oai_id, datestamp, deleted)
        VALUES ($1, $2, $3, TRUE)
        ON CONFLICT (source_id, oai_id) DO UPDATE SET
            datestamp = EXCLUDED.datestamp,
            deleted = TRUE,
            content_hash = NULL,
            fields = NULL,
            warnings = '[]'::jsonb,
            updated_at = now()
        WHERE NOT documents.deleted
        RETURNING oai_id
        "#,
    )
    .bind(source_id)
    .bind(oai_id)
    .bind(datestamp)
    .fetch_optional(executor)
    .await?;

    Ok(match written {
        Some(_) => SinkOutcome::Changed,
        None => SinkOutcome::Unchanged,
    })
}

/// Get a document by source and OAI identifier.
pub async fn get_document<'e, E>(executor: E, source_id: &str, oai_id: &str) -> Result<Option<Document>>
where
    E: sqlx::PgExecutor<'e>,
{
    let doc = sqlx::query_as::<_, Document>(
        r#"SELECT * FROM documents WHERE source_id = $1 AND oai_id = $2"#,
    )
    .bind(source_id)
    .bind(oai_id)
    .fetch_optional(executor)
    .await?;

    Ok(doc)
}

/// List a source's documents, optionally only live or only deleted ones.
pub async fn list_documents<'e, E>(
    executor: E,
    source_id: &str,
    deleted: Option<bool>,
) -> Result<Vec<Document>>
where
    E: sqlx::PgExecutor<'e>,
{
    let docs = sqlx::query_as::<_, Document>(
        r#"
        SELECT * FROM documents
        WHERE source_id = $1 AND ($2::BOOLEAN IS NULL OR deleted = $2)
        ORDER BY oai_id
        "#,
    )
    .bind(source_id)
    .bind(deleted)
    .fetch_all(executor)
    .await?;

    Ok(docs)
}
