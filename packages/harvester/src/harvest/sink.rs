//! Destinations for harvested records.

use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::normalize::{RecordNormalizer, SchemaMapping};
use crate::types::{FieldMap, RawRecord, SinkOutcome};

/// Receives every record of a harvest run, in arrival order.
pub trait RecordSink {
    fn put(&mut self, record: &RawRecord) -> Result<SinkOutcome>;
}

impl<F> RecordSink for F
where
    F: FnMut(&RawRecord) -> Result<SinkOutcome>,
{
    fn put(&mut self, record: &RawRecord) -> Result<SinkOutcome> {
        self(record)
    }
}

#[derive(Serialize)]
struct DocumentLine<'a> {
    oai_id: &'a str,
    deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a FieldMap>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<&'a str>,
}

/// Normalizes records and writes one JSON document per line.
///
/// Records that fail to parse or lack an identifier are rejected and not
/// written.
pub struct JsonLinesSink<W, M> {
    writer: W,
    source_id: String,
    normalizer: RecordNormalizer<M>,
}

impl<W: Write, M: SchemaMapping> JsonLinesSink<W, M> {
    pub fn new(writer: W, source_id: impl Into<String>, normalizer: RecordNormalizer<M>) -> Self {
        Self {
            writer,
            source_id: source_id.into(),
            normalizer,
        }
    }

    /// Flush and return the writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn write_line(&mut self, line: &DocumentLine<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.writer, line)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write, M: SchemaMapping> RecordSink for JsonLinesSink<W, M> {
    fn put(&mut self, record: &RawRecord) -> Result<SinkOutcome> {
        if record.is_deleted() {
            self.write_line(&DocumentLine {
                oai_id: &record.identifier,
                deleted: true,
                fields: None,
                warnings: Vec::new(),
            })?;
            return Ok(SinkOutcome::Changed);
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
                    "Rejecting record"
                );
                return Ok(SinkOutcome::Rejected);
            }
        };

        self.write_line(&DocumentLine {
            oai_id: &record.identifier,
            deleted: false,
            fields: Some(&fields),
            warnings: warnings.iter().collect(),
        })?;
        Ok(SinkOutcome::Changed)
    }
}
