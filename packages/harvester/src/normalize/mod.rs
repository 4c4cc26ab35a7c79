//! Record normalization into canonical index fields.
//!
//! A [`RecordNormalizer`] is generic over a [`SchemaMapping`] that knows one
//! metadata schema. The normalizer adds the fields every record shares and
//! drives the mapping's static extraction table and computed fields.

mod authority;
mod lido;
mod params;

use std::cell::OnceCell;

use roxmltree::{Document, Node};

use crate::dates::DateRangeResolver;
use crate::error::{HarvesterError, Result};
use crate::events::{Event, EventPriorities};
use crate::types::{FieldMap, Warnings};
use crate::xml::{text_at, texts_at};

pub use authority::{typed_id, AuthorityMapper, NamespaceMapper, GEOGRAPHIC, TOPIC};
pub use lido::LidoMapping;
pub use params::DriverParams;

/// Version of the produced field set, bumped when field semantics change.
pub const FIELD_SET_VERSION: &str = "1";

/// How many values a static field takes from its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extract {
    First,
    All,
}

/// One entry of a static extraction table.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    /// Slash-separated path relative to the record root.
    pub path: &'static str,
    pub extract: Extract,
}

impl FieldRule {
    pub const fn first(field: &'static str, path: &'static str) -> Self {
        Self {
            field,
            path,
            extract: Extract::First,
        }
    }

    pub const fn all(field: &'static str, path: &'static str) -> Self {
        Self {
            field,
            path,
            extract: Extract::All,
        }
    }

    fn apply(&self, root: Node<'_, '_>, fields: &mut FieldMap) {
        match self.extract {
            Extract::First => {
                if let Some(value) = text_at(root, self.path) {
                    fields.set(self.field, value);
                }
            }
            Extract::All => fields.extend(self.field, texts_at(root, self.path)),
        }
    }
}

/// Values computed once per record and shared between computed fields.
#[derive(Debug, Default)]
pub struct RecordMemo {
    pub work_type: OnceCell<Option<String>>,
    pub events: OnceCell<Vec<Event>>,
    pub place_events: OnceCell<EventPriorities>,
}

/// Collaborators a mapping may use while computing fields.
pub struct MappingContext<'a> {
    pub source_id: &'a str,
    pub params: &'a DriverParams,
    pub authority: &'a dyn AuthorityMapper,
    pub dates: &'a DateRangeResolver,
}

/// Schema-specific half of normalization.
pub trait SchemaMapping {
    /// Value of the `record_format` field.
    fn format(&self) -> &'static str;

    /// The element holding the record, if the document is of this schema.
    fn record_root<'a, 'input>(&self, document: &'a Document<'input>)
        -> Option<Node<'a, 'input>>;

    fn record_id(&self, root: Node<'_, '_>) -> Option<String>;

    /// Fields copied straight from fixed paths.
    fn field_table(&self) -> &'static [FieldRule];

    fn computed_fields(
        &self,
        root: Node<'_, '_>,
        ctx: &MappingContext<'_>,
        memo: &RecordMemo,
        warnings: &mut Warnings,
        fields: &mut FieldMap,
    );
}

/// A parsed source record together with its normalization state.
#[derive(Debug)]
pub struct ParsedRecord<'input> {
    pub document: Document<'input>,
    pub source_id: String,
    pub warnings: Warnings,
    pub memo: RecordMemo,
}

impl<'input> ParsedRecord<'input> {
    pub fn parse(xml: &'input str, source_id: impl Into<String>) -> Result<Self> {
        Ok(Self {
            document: Document::parse(xml)?,
            source_id: source_id.into(),
            warnings: Warnings::new(),
            memo: RecordMemo::default(),
        })
    }
}

/// Turns parsed records into canonical field maps.
pub struct RecordNormalizer<M> {
    mapping: M,
    params: DriverParams,
    authority: Box<dyn AuthorityMapper + Send + Sync>,
    dates: DateRangeResolver,
}

/// Normalizer for LIDO records.
pub type LidoNormalizer = RecordNormalizer<LidoMapping>;

impl LidoNormalizer {
    pub fn lido(params: DriverParams) -> Self {
        Self::new(LidoMapping, params)
    }
}

impl<M: SchemaMapping> RecordNormalizer<M> {
    /// Create a normalizer whose authority ids are namespaced per
    /// `params.authority_namespaces`.
    pub fn new(mapping: M, params: DriverParams) -> Self {
        let authority = NamespaceMapper::new(params.authority_namespaces.clone());
        Self {
            mapping,
            params,
            authority: Box::new(authority),
            dates: DateRangeResolver::new(),
        }
    }

    /// Replace the authority id mapper.
    #[must_use]
    pub fn with_authority(mut self, mapper: impl AuthorityMapper + Send + Sync + 'static) -> Self {
        self.authority = Box::new(mapper);
        self
    }

    /// Replace the date resolver, e.g. to pin "today" in tests.
    #[must_use]
    pub fn with_dates(mut self, dates: DateRangeResolver) -> Self {
        self.dates = dates;
        self
    }

    pub fn params(&self) -> &DriverParams {
        &self.params
    }

    /// Parse and normalize one standalone record document.
    pub fn normalize_xml(&self, xml: &str, source_id: &str) -> Result<(FieldMap, Warnings)> {
        let mut record = ParsedRecord::parse(xml, source_id)?;
        let fields = self.normalize(&mut record)?;
        Ok((fields, record.warnings))
    }

    /// Produce the canonical field map of a record.
    ///
    /// Anomalies inside the record are collected in `record.warnings`; only
    /// a record that cannot be identified is an error.
    pub fn normalize(&self, record: &mut ParsedRecord<'_>) -> Result<FieldMap> {
        let ParsedRecord {
            document,
            source_id,
            warnings,
            memo,
        } = record;
        let schema = self.mapping.format();

        let root = self
            .mapping
            .record_root(document)
            .ok_or(HarvesterError::MissingIdentifier { schema })?;
        let record_id = self
            .mapping
            .record_id(root)
            .ok_or(HarvesterError::MissingIdentifier { schema })?;

        let mut fields = FieldMap::new();
        for rule in self.mapping.field_table() {
            rule.apply(root, &mut fields);
        }

        let ctx = MappingContext {
            source_id: source_id.as_str(),
            params: &self.params,
            authority: self.authority.as_ref(),
            dates: &self.dates,
        };
        self.mapping
            .computed_fields(root, &ctx, memo, warnings, &mut fields);

        fields.set("id", format!("{source_id}.{record_id}"));
        fields.set("record_format", schema);
        fields.set("source_str_mv", source_id.as_str());
        fields.set("datasource_str_mv", source_id.as_str());
        fields.set("fieldset_version_str", FIELD_SET_VERSION);

        tracing::debug!(
            source = %source_id,
            record = %record_id,
            fields = fields.len(),
            warnings = warnings.len(),
            "Normalized record"
        );
        Ok(fields)
    }
}
