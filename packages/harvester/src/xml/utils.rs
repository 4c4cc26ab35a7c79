//! XML utility functions for navigating and extracting data from DOM trees.
//!
//! All lookups compare local names only, so the same paths work whether a
//! repository serves `<lido:title>` or an unprefixed `<title>`.

use roxmltree::Node;
use unicode_normalization::UnicodeNormalization;

/// Get the tag name without namespace prefix.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use heritage_harvester::xml::get_tag_name;
///
/// let xml = r#"<lido:lido xmlns:lido="http://www.lido-schema.org"/>"#;
/// let doc = Document::parse(xml).unwrap();
/// assert_eq!(get_tag_name(doc.root_element()), "lido");
/// ```
pub fn get_tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Find the first child element with the given tag name.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use heritage_harvester::xml::find_child;
///
/// let xml = r#"<root><child1/><child2/></root>"#;
/// let doc = Document::parse(xml).unwrap();
/// let root = doc.root_element();
///
/// assert!(find_child(root, "child1").is_some());
/// assert!(find_child(root, "missing").is_none());
/// ```
pub fn find_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && get_tag_name(*child) == tag)
}

/// Find all child elements with the given tag name.
pub fn find_children<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |child| child.is_element() && get_tag_name(*child) == tag)
}

/// Find the first element matching a slash-separated path of tag names.
///
/// Only the first child is followed at every step; use [`find_all_by_path`]
/// when repeated elements matter.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use heritage_harvester::xml::find_by_path;
///
/// let xml = r#"<event><eventType><term>valmistus</term></eventType></event>"#;
/// let doc = Document::parse(xml).unwrap();
///
/// let term = find_by_path(doc.root_element(), "eventType/term");
/// assert_eq!(term.unwrap().text(), Some("valmistus"));
/// ```
pub fn find_by_path<'a, 'input>(node: Node<'a, 'input>, path: &str) -> Option<Node<'a, 'input>> {
    let mut current = node;
    for part in path.split('/') {
        current = find_child(current, part)?;
    }
    Some(current)
}

/// Find every element matching a slash-separated path, fanning out over
/// repeated elements at each step. Document order is preserved.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use heritage_harvester::xml::find_all_by_path;
///
/// let xml = r#"<wrap><set><term>a</term><term>b</term></set><set><term>c</term></set></wrap>"#;
/// let doc = Document::parse(xml).unwrap();
///
/// assert_eq!(find_all_by_path(doc.root_element(), "set/term").len(), 3);
/// ```
pub fn find_all_by_path<'a, 'input>(node: Node<'a, 'input>, path: &str) -> Vec<Node<'a, 'input>> {
    let mut current = vec![node];
    for part in path.split('/') {
        current = current
            .into_iter()
            .flat_map(|n| {
                n.children()
                    .filter(move |c| c.is_element() && get_tag_name(*c) == part)
            })
            .collect();
        if current.is_empty() {
            break;
        }
    }
    current
}

/// Get the trimmed, NFC-normalized text content of a node.
///
/// Only the node's own leading text is used; mixed content is rare in the
/// metadata schemas handled here.
pub fn get_text(node: Node<'_, '_>) -> String {
    node.text()
        .map(|s| s.trim().nfc().collect())
        .unwrap_or_default()
}

/// Text of the first element at `path`, if non-empty.
pub fn text_at(node: Node<'_, '_>, path: &str) -> Option<String> {
    find_by_path(node, path)
        .map(get_text)
        .filter(|s| !s.is_empty())
}

/// Non-empty texts of every element at `path`.
pub fn texts_at(node: Node<'_, '_>, path: &str) -> Vec<String> {
    find_all_by_path(node, path)
        .into_iter()
        .map(get_text)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Get an attribute value from a node, ignoring its namespace.
pub fn get_attribute<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name() == name)
        .map(|a| a.value())
}

/// Check if a node has a specific tag name.
pub fn has_tag(node: Node<'_, '_>, tag: &str) -> bool {
    node.is_element() && get_tag_name(node) == tag
}

/// Get all element children of a node.
pub fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}

/// Extract an element as a standalone document.
///
/// The element's source text is sliced out of the input and namespace
/// declarations inherited from its ancestors are added to its start tag, so
/// the fragment parses on its own.
pub fn standalone_fragment(node: Node<'_, '_>, input: &str) -> String {
    let fragment = &input[node.range()];
    let name_end = fragment
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(fragment.len());
    let start_tag_end = fragment.find('>').unwrap_or(fragment.len());
    let start_tag = &fragment[..start_tag_end];

    let mut declarations = String::new();
    for ns in node.namespaces() {
        let attr = match ns.name() {
            Some("xml") => continue,
            Some(prefix) => format!("xmlns:{prefix}"),
            None => "xmlns".to_string(),
        };
        let declared = start_tag.contains(&format!(" {attr}="))
            || start_tag.contains(&format!("\n{attr}="))
            || start_tag.contains(&format!("\t{attr}="));
        if !declared {
            declarations.push_str(&format!(
                " {attr}=\"{}\"",
                ns.uri().replace('&', "&amp;").replace('"', "&quot;")
            ));
        }
    }

    format!(
        "{}{}{}",
        &fragment[..name_end],
        declarations,
        &fragment[name_end..]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    #[test]
    fn test_get_tag_name_with_namespace() {
        let xml = r#"<ns:root xmlns:ns="http://example.com"><ns:child/></ns:root>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(get_tag_name(doc.root_element()), "root");
    }

    #[test]
    fn test_find_children() {
        let xml = r#"<root><item>1</item><other/><item>2</item></root>"#;
        let doc = Document::parse(xml).unwrap();
        let items: Vec<_> = find_children(doc.root_element(), "item").collect();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_find_by_path_missing() {
        let xml = r#"<root><level1><target>found</target></level1></root>"#;
        let doc = Document::parse(xml).unwrap();
        let root = doc.root_element();

        assert_eq!(get_text(find_by_path(root, "level1/target").unwrap()), "found");
        assert!(find_by_path(root, "missing/path").is_none());
    }

    #[test]
    fn test_find_all_by_path_preserves_order() {
        let xml = r#"<r><a><b>1</b><b>2</b></a><a><b>3</b></a></r>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(texts_at(doc.root_element(), "a/b"), vec!["1", "2", "3"]);
        assert!(texts_at(doc.root_element(), "a/c").is_empty());
    }

    #[test]
    fn test_get_text_normalizes() {
        // "a" followed by a combining diaeresis composes to "ä"
        let xml = "<root>  Ha\u{0308}me  </root>";
        let doc = Document::parse(xml).unwrap();
        assert_eq!(get_text(doc.root_element()), "H\u{00e4}me");
    }

    #[test]
    fn test_text_at_skips_empty() {
        let xml = r#"<root><a>  </a><b>x</b></root>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(text_at(doc.root_element(), "a"), None);
        assert_eq!(text_at(doc.root_element(), "b"), Some("x".to_string()));
    }

    #[test]
    fn test_get_attribute_ignores_namespace() {
        let xml = r#"<root xmlns:l="urn:l" l:type="image_thumb" plain="1"/>"#;
        let doc = Document::parse(xml).unwrap();
        let root = doc.root_element();
        assert_eq!(get_attribute(root, "type"), Some("image_thumb"));
        assert_eq!(get_attribute(root, "plain"), Some("1"));
        assert_eq!(get_attribute(root, "missing"), None);
    }

    #[test]
    fn test_has_tag_and_element_children() {
        let xml = r#"<root>text<child1/>more<child2/></root>"#;
        let doc = Document::parse(xml).unwrap();
        let root = doc.root_element();
        assert!(has_tag(root, "root"));
        assert_eq!(element_children(root).count(), 2);
    }

    #[test]
    fn test_standalone_fragment_carries_namespaces() {
        let xml = r#"<OAI-PMH xmlns:lido="http://www.lido-schema.org"><metadata><lido:lido><lido:lidoRecID>1</lido:lidoRecID></lido:lido></metadata></OAI-PMH>"#;
        let doc = Document::parse(xml).unwrap();
        let lido = doc
            .descendants()
            .find(|n| n.is_element() && get_tag_name(*n) == "lido")
            .unwrap();

        let fragment = standalone_fragment(lido, xml);
        assert!(fragment.starts_with(r#"<lido:lido xmlns:lido="http://www.lido-schema.org">"#));

        let reparsed = Document::parse(&fragment).unwrap();
        assert_eq!(text_at(reparsed.root_element(), "lidoRecID"), Some("1".to_string()));
    }

    #[test]
    fn test_standalone_fragment_keeps_own_declaration() {
        let xml = r#"<wrap><rec xmlns="urn:r"><id>7</id></rec></wrap>"#;
        let doc = Document::parse(xml).unwrap();
        let rec = doc.root_element().first_element_child().unwrap();

        let fragment = standalone_fragment(rec, xml);
        assert_eq!(fragment, r#"<rec xmlns="urn:r"><id>7</id></rec>"#);
    }
}
