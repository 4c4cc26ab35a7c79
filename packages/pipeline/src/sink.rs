use heritage_harvester::harvest::RecordSink;
use heritage_harvester::normalize::{RecordNormalizer, SchemaMapping};
use heritage_harvester::types::{RawRecord, SinkOutcome};
use heritage_harvester::HarvesterError;
use sqlx::PgPool;
use tokio::runtime::Handle;

use crate::documents::{self, NewDocument};

/// Normalizes records and stores them in the `documents` table.
///
/// Like [`crate::PgStateStore`] it blocks on `handle`, so it is driven from
/// a blocking harvest thread.
pub struct IndexSink<M> {
    pool: PgPool,
    handle: Handle,
    source_id: String,
    normalizer: RecordNormalizer<M>,
}

impl<M: SchemaMapping> IndexSink<M> {
    pub fn new(
        pool: PgPool,
        handle: Handle,
        source_id: impl Into<String>,
        normalizer: RecordNormalizer<M>,
    ) -> Self {
        Self {
            pool,
            handle,
            source_id: source_id.into(),
            normalizer,
        }
    }
}

impl<M: SchemaMapping> RecordSink for IndexSink<M> {
    fn put(&mut self, record: &RawRecord) -> heritage_harvester::Result<SinkOutcome> {
        if record.is_deleted() {
            return self
                .handle
                .block_on(documents::mark_deleted(
                    &self.pool,
                    &self.source_id,
                    &record.identifier,
                    record.datestamp.as_deref(),
                ))
                .map_err(|e| e.into_harvester(HarvesterError::Sink));
        }

        let (fields, warnings) = match self
            .normalizer
            .normalize_xml(&record.payload, &self.source_id)
        {
            Ok(normalized) => normalized,
            Err(e) => {
                tracing::warn!(
                    source = %self.source_id,
                    record = %record.identifier,
                    error = %e,
                    "rejecting record"
                );
                return Ok(SinkOutcome::Rejected);
            }
        };

        let doc = NewDocument {
            source_id: &self.source_id,
            oai_id: &record.identifier,
            datestamp: record.datestamp.as_deref(),
            fields: &fields,
            warnings: warnings.iter().collect(),
        };
        self.handle
            .block_on(documents::upsert_document(&self.pool, &doc))
            .map_err(|e| e.into_harvester(HarvesterError::Sink))
    }
}
