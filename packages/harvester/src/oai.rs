//! OAI-PMH 2.0 ListRecords requests and responses.

use roxmltree::Document;

use crate::config::SourceConfig;
use crate::error::{HarvesterError, Result};
use crate::types::{RawRecord, RecordStatus};
use crate::xml::{
    element_children, find_child, find_children, get_attribute, get_text, standalone_fragment,
    text_at,
};

/// OAI error code for an empty result set.
pub const NO_RECORDS_MATCH: &str = "noRecordsMatch";

/// One page of a ListRecords listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRecordsPage {
    pub records: Vec<RawRecord>,
    /// Records dropped because their header has no identifier.
    pub unidentified: u64,
    /// Cursor for the next page; `None` on the last page.
    pub resumption_token: Option<String>,
    pub response_date: Option<String>,
}

/// Query parameters of a ListRecords request.
///
/// A continuation request carries only the verb and the resumption token.
///
/// # Examples
/// ```
/// use heritage_harvester::config::SourceConfig;
/// use heritage_harvester::oai::list_records_query;
///
/// let source = SourceConfig::new("museum", "https://example.org/oai", "lido");
/// let first = list_records_query(&source, Some("2024-01-01"), "2024-02-01", None);
/// assert_eq!(first[0], ("verb", "ListRecords".to_string()));
/// assert_eq!(first.len(), 4);
///
/// let next = list_records_query(&source, Some("2024-01-01"), "2024-02-01", Some("abc"));
/// assert_eq!(next, vec![
///     ("verb", "ListRecords".to_string()),
///     ("resumptionToken", "abc".to_string()),
/// ]);
/// ```
pub fn list_records_query(
    source: &SourceConfig,
    from: Option<&str>,
    until: &str,
    resumption_token: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut query = vec![("verb", "ListRecords".to_string())];
    if let Some(token) = resumption_token {
        query.push(("resumptionToken", token.to_string()));
        return query;
    }

    query.push(("metadataPrefix", source.metadata_prefix.clone()));
    if let Some(set) = source.set.as_deref().filter(|s| !s.is_empty()) {
        query.push(("set", set.to_string()));
    }
    if let Some(from) = from {
        query.push(("from", from.to_string()));
    }
    query.push(("until", until.to_string()));
    query
}

/// Parse a ListRecords response.
///
/// `noRecordsMatch` yields an empty page; any other OAI error is returned as
/// [`HarvesterError::Protocol`]. Each record's metadata element is extracted
/// as a standalone document.
pub fn parse_list_records(xml: &str) -> Result<ListRecordsPage> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();
    let mut page = ListRecordsPage {
        response_date: text_at(root, "responseDate"),
        ..Default::default()
    };

    if let Some(error) = find_child(root, "error") {
        let code = get_attribute(error, "code").unwrap_or_default();
        if code == NO_RECORDS_MATCH {
            return Ok(page);
        }
        return Err(HarvesterError::Protocol {
            code: code.to_string(),
            message: get_text(error),
        });
    }

    let Some(list) = find_child(root, "ListRecords") else {
        return Err(HarvesterError::Protocol {
            code: "badResponse".to_string(),
            message: "response has no ListRecords element".to_string(),
        });
    };

    for record in find_children(list, "record") {
        let header = find_child(record, "header");
        let Some(identifier) = header.and_then(|h| text_at(h, "identifier")) else {
            tracing::warn!("Skipping record without identifier");
            page.unidentified += 1;
            continue;
        };

        let status = match header.and_then(|h| get_attribute(h, "status")) {
            Some("deleted") => RecordStatus::Deleted,
            _ => RecordStatus::Active,
        };
        let payload = match status {
            RecordStatus::Deleted => String::new(),
            RecordStatus::Active => find_child(record, "metadata")
                .and_then(|m| element_children(m).next())
                .map(|m| standalone_fragment(m, xml))
                .unwrap_or_default(),
        };

        page.records.push(RawRecord {
            identifier,
            datestamp: header.and_then(|h| text_at(h, "datestamp")),
            payload,
            status,
        });
    }

    page.resumption_token = find_child(list, "resumptionToken")
        .map(get_text)
        .filter(|t| !t.is_empty());
    Ok(page)
}
