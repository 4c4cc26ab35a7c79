//! Place-name candidates for geocoding.
//!
//! Subject places become primary candidates and event places secondary ones.
//! Records that already carry GML coordinates need no geocoding and produce
//! no candidates at all.

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)] // Static patterns that are guaranteed to be valid
fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("valid regex")
}

/// Separators between sub-locations: `, `, `. ` and ` & `.
static ADDRESS_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| pattern(r"(,|\.|\s*&)\s+"));
static HIERARCHY_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| pattern(r" tai | or |\. "));
static ADDRESS_LIST_BODY: LazyLock<Regex> = LazyLock::new(|| pattern(r"(.+?) \d+, *\d+"));
static ADDRESS_LIST_NUMBER: LazyLock<Regex> = LazyLock::new(|| pattern(r" (\d+)(?:,|$)"));
static ADDRESS_NOTE: LazyLock<Regex> = LazyLock::new(|| pattern(r"(.*\S+\s+\d+),"));
static PARENTHESIZED: LazyLock<Regex> = LazyLock::new(|| pattern(r"\(.*"));

const MUNICIPALITY_TERMS: &[&str] = &[
    "kunta", "kaupunki", "kylä", "municipality", "city", "town", "village",
];
const SUB_LOCATION_TERMS: &[&str] = &[
    "katuosoite",
    "kartano",
    "tila",
    "talo",
    "rakennus",
    "alue",
    "street",
    "manor",
    "estate",
    "house",
    "building",
    "area",
];
const STREET_TERMS: &[&str] = &["katuosoite", "street"];
const STREET_OVERRIDDEN_TERMS: &[&str] = &["kaupunginosa", "rakennus", "district", "building"];

/// A place mentioned in a subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectPlace {
    pub name: Option<String>,
    pub classification: Option<String>,
    /// Names of the nested part-of-place elements, space separated.
    pub sub_location: String,
}

/// One part of a flat part-of-place list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacePart {
    pub name: Option<String>,
    pub classification: Option<String>,
}

/// The place of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPlace {
    pub name: Option<String>,
    pub sub_location: String,
    pub parts: Vec<PlacePart>,
    pub display: Option<String>,
    pub place_id: Option<String>,
    /// Standalone GML fragments of every place under this event place.
    pub gml: Vec<String>,
}

/// Deduplicated place-name candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationCandidates {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
}

fn classified_as(classification: &str, terms: &[&str]) -> bool {
    let classification = classification.to_lowercase();
    terms.iter().any(|term| classification.contains(term))
}

/// Number of words made of letters, apostrophes and hyphens.
fn word_count(text: &str) -> usize {
    text.split(|c: char| !(c.is_alphabetic() || c == '\'' || c == '-'))
        .filter(|w| w.chars().any(char::is_alphabetic))
        .count()
}

fn strip_trailing_punctuation(text: &str) -> &str {
    text.trim_end_matches(|c: char| c.is_whitespace() || "/:;,=([.".contains(c))
}

/// Split a list of sub-locations and prefix each with the main place.
///
/// A comma followed by a number does not split, so "Kalevankatu 17, 19"
/// stays together.
///
/// # Examples
/// ```
/// use heritage_harvester::location::split_addresses;
///
/// assert_eq!(
///     split_addresses("Helsinki", "Mannerheimintie 1, Kalevankatu 17, 19"),
///     vec!["Helsinki Mannerheimintie 1", "Helsinki Kalevankatu 17, 19"],
/// );
/// ```
pub fn split_addresses(main_place: &str, sub_location: &str) -> Vec<String> {
    let separators: Vec<(usize, usize)> = ADDRESS_SEPARATOR
        .find_iter(sub_location)
        .filter(|m| {
            let next = sub_location[m.end()..].chars().next();
            let digit_follows = next.is_some_and(|c| c.is_ascii_digit());
            !(m.as_str().starts_with(',') && digit_follows)
        })
        .map(|m| (m.start(), m.end()))
        .collect();

    let splits = separators
        .iter()
        .any(|&(start, end)| start > 0 && end < sub_location.len());
    if !splits {
        return vec![format!("{main_place} {sub_location}")];
    }

    let mut parts = Vec::new();
    let mut from = 0;
    for (start, end) in separators {
        parts.push(&sub_location[from..start]);
        from = end;
    }
    parts.push(&sub_location[from..]);
    parts
        .into_iter()
        .map(|part| format!("{main_place} {part}"))
        .collect()
}

/// Candidates from the places of one subject.
fn subject_candidates(places: &[SubjectPlace]) -> Vec<String> {
    let mut main_place = String::new();
    let mut sub_location = String::new();
    for place in places {
        let (Some(name), Some(classification)) = (&place.name, &place.classification) else {
            continue;
        };
        if classified_as(classification, MUNICIPALITY_TERMS) {
            main_place.push(' ');
            main_place.push_str(name);
        } else if classified_as(classification, SUB_LOCATION_TERMS) {
            sub_location.push(' ');
            sub_location.push_str(name);
        }
    }
    if !main_place.is_empty() && !sub_location.is_empty() {
        return split_addresses(main_place.trim(), sub_location.trim());
    }

    let mut result = Vec::new();
    for place in places {
        let Some(name) = place.name.as_deref().filter(|n| !n.is_empty()) else {
            continue;
        };
        if place.sub_location.is_empty() {
            result.push(name.to_string());
        } else {
            for part in HIERARCHY_SEPARATOR.split(&place.sub_location) {
                result.push(format!("{name} {part}"));
            }
        }
    }
    result
}

/// Candidates from the place of one event.
fn event_candidates(place: &EventPlace) -> Vec<String> {
    if let Some(name) = place.name.as_deref().filter(|n| !n.is_empty()) {
        if place.sub_location.is_empty() {
            return name.split('/').map(|s| s.trim().to_string()).collect();
        }
        return split_addresses(name, &place.sub_location);
    }

    if !place.parts.is_empty() {
        let is_street = |part: &PlacePart| {
            part.name.is_some()
                && part
                    .classification
                    .as_deref()
                    .is_some_and(|c| STREET_TERMS.contains(&c))
        };
        let have_street = place.parts.iter().any(is_street);
        let names: Vec<&str> = place
            .parts
            .iter()
            .filter(|part| {
                !(have_street
                    && part
                        .classification
                        .as_deref()
                        .is_some_and(|c| STREET_OVERRIDDEN_TERMS.contains(&c)))
            })
            .filter_map(|part| part.name.as_deref())
            .collect();
        return vec![names.join(" ")];
    }

    if let Some(display) = place.display.as_deref() {
        return display
            .split(['/', ';'])
            .map(|s| s.trim().to_string())
            .collect();
    }

    Vec::new()
}

/// Expand address lists, add variants without trailing notes, strip
/// parenthesized tails and drop duplicates (first occurrence wins).
pub fn process_locations(locations: &[String]) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for location in locations {
        let body = ADDRESS_LIST_BODY
            .captures(location)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str());
        let numbers: Vec<&str> = ADDRESS_LIST_NUMBER
            .captures_iter(location)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .collect();
        match body {
            Some(body) if !numbers.is_empty() => {
                result.extend(numbers.iter().map(|n| format!("{body} {n}")));
            }
            _ => result.push(location.clone()),
        }
    }

    let noted: Vec<String> = result
        .iter()
        .filter(|item| word_count(item) > 2 && item.matches(',').count() == 1)
        .filter_map(|item| ADDRESS_NOTE.captures(item))
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect();
    result.extend(noted);

    let mut unique: Vec<String> = Vec::new();
    for item in result.iter().filter(|s| !s.is_empty()) {
        let cleaned = PARENTHESIZED.replace(item, "");
        let cleaned = strip_trailing_punctuation(&cleaned).trim().to_string();
        if !unique.contains(&cleaned) {
            unique.push(cleaned);
        }
    }
    unique
}

/// Resolve primary and secondary place candidates.
///
/// `subjects` holds the places of each subject; `event_places` the place of
/// each main or place event, in priority order.
pub fn resolve_locations<'a>(
    subjects: &[Vec<SubjectPlace>],
    event_places: impl IntoIterator<Item = &'a EventPlace>,
) -> LocationCandidates {
    let subject_locations: Vec<String> = subjects
        .iter()
        .flat_map(|places| subject_candidates(places))
        .map(|s| s.trim_end_matches([',', '.', ' ']).to_string())
        .collect();

    let mut locations = Vec::new();
    for place in event_places {
        if !place.gml.is_empty() {
            return LocationCandidates::default();
        }
        locations.extend(event_candidates(place));
    }

    // A single word that starts a subject place adds nothing.
    let accepted: Vec<String> = locations
        .into_iter()
        .filter(|location| {
            word_count(location) != 1
                || !subject_locations
                    .iter()
                    .any(|subject| subject.starts_with(location.as_str()))
        })
        .collect();

    LocationCandidates {
        primary: process_locations(&subject_locations),
        secondary: process_locations(&accepted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn subject_place(name: &str, classification: Option<&str>) -> SubjectPlace {
        SubjectPlace {
            name: Some(name.to_string()),
            classification: classification.map(str::to_string),
            sub_location: String::new(),
        }
    }

    fn named_event_place(name: &str) -> EventPlace {
        EventPlace {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("Hämeenlinna"), 1);
        assert_eq!(word_count("Kalevankatu 17"), 1);
        assert_eq!(word_count("Helsinki Uudenmaankatu 31, katurakennus"), 3);
    }

    #[test]
    fn test_split_addresses_separators() {
        assert_eq!(
            split_addresses("Turku", "Linnankatu 3. Aurakatu & Puistokatu"),
            vec!["Turku Linnankatu 3", "Turku Aurakatu", "Turku Puistokatu"]
        );
        assert_eq!(
            split_addresses("Turku", "Linnankatu 3"),
            vec!["Turku Linnankatu 3"]
        );
    }

    #[test]
    fn test_subject_municipality_and_street() {
        let subjects = vec![vec![
            subject_place("Helsinki", Some("kunta")),
            subject_place("Mannerheimintie 1, Aleksanterinkatu 5", Some("katuosoite")),
        ]];
        let result = resolve_locations(&subjects, []);
        assert_eq!(
            result.primary,
            vec!["Helsinki Mannerheimintie 1", "Helsinki Aleksanterinkatu 5"]
        );
    }

    #[test]
    fn test_subject_hierarchical_place() {
        let subjects = vec![vec![SubjectPlace {
            name: Some("Espoo".to_string()),
            classification: None,
            sub_location: "Tapiola tai Otaniemi".to_string(),
        }]];
        let result = resolve_locations(&subjects, []);
        assert_eq!(result.primary, vec!["Espoo Tapiola", "Espoo Otaniemi"]);
    }

    #[test]
    fn test_event_named_place_split_on_slash() {
        let places = vec![named_event_place("Helsinki/Espoo")];
        let result = resolve_locations(&[], &places);
        assert_eq!(result.secondary, vec!["Helsinki", "Espoo"]);
    }

    #[test]
    fn test_event_part_list_street_wins() {
        let place = EventPlace {
            parts: vec![
                PlacePart {
                    name: Some("Helsinki".into()),
                    classification: Some("kunta".into()),
                },
                PlacePart {
                    name: Some("Kallio".into()),
                    classification: Some("kaupunginosa".into()),
                },
                PlacePart {
                    name: Some("Fleminginkatu 3".into()),
                    classification: Some("katuosoite".into()),
                },
            ],
            ..Default::default()
        };
        let result = resolve_locations(&[], [&place]);
        assert_eq!(result.secondary, vec!["Helsinki Fleminginkatu 3"]);
    }

    #[test]
    fn test_event_display_place() {
        let place = EventPlace {
            display: Some("Tampere; Pirkkala / Nokia".into()),
            ..Default::default()
        };
        let result = resolve_locations(&[], [&place]);
        assert_eq!(result.secondary, vec!["Tampere", "Pirkkala", "Nokia"]);
    }

    #[test]
    fn test_gml_suppresses_all_candidates() {
        let subjects = vec![vec![subject_place("Helsinki", None)]];
        let places = vec![
            named_event_place("Turku"),
            EventPlace {
                gml: vec!["<gml/>".into()],
                ..Default::default()
            },
        ];
        assert_eq!(
            resolve_locations(&subjects, &places),
            LocationCandidates::default()
        );
    }

    #[test]
    fn test_single_word_prefix_of_subject_is_suppressed() {
        let subjects = vec![vec![subject_place("Helsinki Kallio", None)]];
        let places = vec![
            named_event_place("Helsinki"),
            named_event_place("Hel"),
            named_event_place("Espoo"),
            named_event_place("Helsinki Vallila"),
        ];
        let result = resolve_locations(&subjects, &places);
        // "Hel" is a prefix too; only the word count is checked, not word boundaries
        assert_eq!(result.secondary, vec!["Espoo", "Helsinki Vallila"]);
    }

    #[test]
    fn test_process_address_list() {
        let result = process_locations(&["Helsinki, Kalevankatu 17, 19".to_string()]);
        assert_eq!(
            result,
            vec!["Helsinki, Kalevankatu 17", "Helsinki, Kalevankatu 19"]
        );
    }

    #[test]
    fn test_process_note_variant_and_cleanup() {
        let result = process_locations(&[
            "Helsinki Uudenmaankatu 31, katurakennus".to_string(),
            "Turku (keskusta).".to_string(),
            "Uusimaa, Helsinki, Malmi".to_string(),
            "Turku".to_string(),
        ]);
        assert_eq!(
            result,
            vec![
                "Helsinki Uudenmaankatu 31, katurakennus",
                "Turku",
                "Uusimaa, Helsinki, Malmi",
                "Helsinki Uudenmaankatu 31",
            ]
        );
    }
}
