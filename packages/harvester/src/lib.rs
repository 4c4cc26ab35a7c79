//! Heritage Harvester - Incremental OAI-PMH harvesting of museum metadata.
//!
//! This crate harvests LIDO object records from OAI-PMH repositories and
//! normalizes them into flat field maps for a search index: titles, actors,
//! date ranges, places and geometries.
//!
//! # Example
//!
//! ```
//! use heritage_harvester::normalize::{DriverParams, LidoNormalizer};
//!
//! let lido = r#"<lido xmlns="http://www.lido-schema.org">
//!   <lidoRecID>42</lidoRecID>
//!   <descriptiveMetadata><objectIdentificationWrap><titleWrap><titleSet>
//!     <appellationValue>Teapot</appellationValue>
//!   </titleSet></titleWrap></objectIdentificationWrap></descriptiveMetadata>
//! </lido>"#;
//!
//! let normalizer = LidoNormalizer::lido(DriverParams::default());
//! let (fields, _warnings) = normalizer.normalize_xml(lido, "museum").unwrap();
//! assert_eq!(fields.first("id"), Some("museum.42"));
//! assert_eq!(fields.first("title"), Some("Teapot"));
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Constants, the sources file, and validation
//! - [`types`]: Core data types (RawRecord, FieldMap, DateRange, etc.)
//! - [`error`]: Error types and Result alias
//! - [`http`]: HTTP transport for OAI-PMH requests
//! - [`oai`]: ListRecords requests and response parsing
//! - [`harvest`]: Harvest controller, state stores and record sinks
//! - [`normalize`]: Schema mappings and the record normalizer
//! - [`dates`]: Free-text date range resolution
//! - [`geometry`]: GML to WKT conversion
//! - [`events`]: LIDO events and actor resolution
//! - [`location`]: Place and address resolution
//! - [`xml`]: XML utilities
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod dates;
pub mod error;
pub mod events;
pub mod geometry;
pub mod harvest;
pub mod http;
pub mod location;
pub mod normalize;
pub mod oai;
pub mod types;
pub mod xml;

// Re-export commonly used items
pub use config::{validate_date, HarvestConfig, SourceConfig};
pub use error::{HarvesterError, Result};
pub use harvest::{HarvestController, RecordSink, StateStore};
pub use normalize::{DriverParams, LidoNormalizer};
pub use types::{FieldMap, HarvestSummary, HarvestWindow, RawRecord};
