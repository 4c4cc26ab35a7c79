//! Authority identifier namespacing.

use std::collections::BTreeMap;

/// Subject concept ids.
pub const TOPIC: &str = "topic";
/// Place ids.
pub const GEOGRAPHIC: &str = "geographic";

const ANY_KIND: &str = "*";

/// Maps a raw authority id of a kind to its index form.
pub trait AuthorityMapper {
    fn map_id(&self, kind: &str, id: &str) -> String;
}

/// Prefixes ids with a configured namespace: `<namespace>.<id>`.
///
/// A namespace registered under `*` applies to every kind without its own
/// entry. Ids of unconfigured kinds pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct NamespaceMapper {
    namespaces: BTreeMap<String, String>,
}

impl NamespaceMapper {
    pub fn new(namespaces: BTreeMap<String, String>) -> Self {
        Self { namespaces }
    }
}

impl AuthorityMapper for NamespaceMapper {
    fn map_id(&self, kind: &str, id: &str) -> String {
        match self
            .namespaces
            .get(kind)
            .or_else(|| self.namespaces.get(ANY_KIND))
        {
            Some(namespace) => format!("{namespace}.{id}"),
            None => id.to_string(),
        }
    }
}

/// Render an id with its type as `(type)id`, unless it is already a URL.
///
/// # Examples
/// ```
/// use heritage_harvester::normalize::typed_id;
///
/// assert_eq!(typed_id("123", Some("kunta")), "(kunta)123");
/// assert_eq!(typed_id("http://www.yso.fi/onto/yso/p1", Some("uri")), "http://www.yso.fi/onto/yso/p1");
/// assert_eq!(typed_id("123", None), "123");
/// ```
pub fn typed_id(id: &str, id_type: Option<&str>) -> String {
    let id = id.trim();
    let is_url = id.starts_with("http://") || id.starts_with("https://");
    match id_type.map(str::trim).filter(|t| !t.is_empty()) {
        Some(id_type) if !is_url => format!("({id_type}){id}"),
        _ => id.to_string(),
    }
}
