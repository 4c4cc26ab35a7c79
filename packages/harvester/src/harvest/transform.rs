//! Page body checks and the optional pre-transform step.

use roxmltree::Document;

use crate::error::{HarvesterError, Result};

/// Rewrites a page body before records are extracted.
pub trait PreTransform {
    /// Transform `body`; `source_id` identifies the source being harvested.
    fn transform(&self, body: &str, source_id: &str) -> Result<String>;
}

impl<F> PreTransform for F
where
    F: Fn(&str, &str) -> Result<String>,
{
    fn transform(&self, body: &str, source_id: &str) -> Result<String> {
        self(body, source_id)
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && !matches!(c, '\u{fffe}' | '\u{ffff}'))
}

/// Drop invalid UTF-8 sequences and characters XML 1.0 does not allow.
///
/// # Examples
/// ```
/// use heritage_harvester::harvest::sanitize_body;
///
/// assert_eq!(sanitize_body(b"<a>b\x01c\xffd</a>"), "<a>bcd</a>");
/// ```
pub fn sanitize_body(bytes: &[u8]) -> String {
    bytes
        .utf8_chunks()
        .flat_map(|chunk| chunk.valid().chars())
        .filter(|c| is_xml_char(*c))
        .collect()
}

/// Decode a page body and check that it is well-formed XML.
///
/// A body that fails is re-attempted once with encoding errors and illegal
/// characters dropped. A second failure is a parse error.
pub fn decode_page(bytes: &[u8], source_id: &str) -> Result<String> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        if Document::parse(text).is_ok() {
            return Ok(text.to_string());
        }
    }

    tracing::warn!(source = source_id, "Invalid XML received, trying encoding fix");
    let text = sanitize_body(bytes);
    if let Err(e) = Document::parse(&text) {
        tracing::error!(source = source_id, error = %e, "Could not parse XML");
        return Err(e.into());
    }
    Ok(text)
}

/// Decode a page and run the pre-transform over it, if any.
///
/// Transform failures surface as [`HarvesterError::PreTransform`].
pub fn prepare_page(
    bytes: &[u8],
    source_id: &str,
    pre_transform: Option<&dyn PreTransform>,
) -> Result<String> {
    let text = decode_page(bytes, source_id)?;
    let Some(transform) = pre_transform else {
        return Ok(text);
    };
    transform
        .transform(&text, source_id)
        .map_err(|e| match e {
            HarvesterError::PreTransform(_) => e,
            other => HarvesterError::PreTransform(other.to_string()),
        })
}
