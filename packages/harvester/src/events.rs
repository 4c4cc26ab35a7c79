//! Events and event-priority based actor selection.
//!
//! LIDO records describe an object through events (creation, design, use,
//! finding, ...). Event types are free-text labels that differ between
//! deployments, so every lookup goes through an [`EventPriorities`] table
//! mapping labels to a priority (lower is more authoritative).

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::location::EventPlace;

/// A person or organisation taking part in an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub name: String,
    pub role: Option<String>,
}

impl Actor {
    pub fn new(name: impl Into<String>, role: Option<String>) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }

    /// `"Name, role"`, or just the name when the role is unknown.
    #[must_use]
    pub fn with_role(&self) -> String {
        match &self.role {
            Some(role) => format!("{}, {role}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Raw date values of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDate {
    pub earliest: Option<String>,
    pub latest: Option<String>,
    pub display: Option<String>,
}

/// One event as extracted from a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    pub event_type: Option<String>,
    pub name: Option<String>,
    pub actors: Vec<Actor>,
    pub date: EventDate,
    pub period: Option<String>,
    pub places: Vec<EventPlace>,
    pub materials: Vec<String>,
    pub display_materials: Option<String>,
    pub cultures: Vec<String>,
}

impl Event {
    /// Lowercased event type label.
    #[must_use]
    pub fn type_label(&self) -> Option<String> {
        self.event_type.as_deref().map(str::to_lowercase)
    }

    /// Whether the event type is one of the given (lowercase) labels.
    #[must_use]
    pub fn is_type(&self, labels: &[&str]) -> bool {
        self.type_label()
            .is_some_and(|label| labels.contains(&label.as_str()))
    }
}

/// Event type label to priority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<String, u32>")]
pub struct EventPriorities(BTreeMap<String, u32>);

impl From<BTreeMap<String, u32>> for EventPriorities {
    fn from(map: BTreeMap<String, u32>) -> Self {
        map.into_iter().collect()
    }
}

impl<S: AsRef<str>> FromIterator<(S, u32)> for EventPriorities {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(label, priority)| (label.as_ref().to_lowercase(), priority))
                .collect(),
        )
    }
}

impl EventPriorities {
    /// Events defining the object itself.
    #[must_use]
    pub fn default_main() -> Self {
        [
            ("suunnittelu", 0),
            ("design", 0),
            ("valmistus", 1),
            ("creation", 1),
        ]
        .into_iter()
        .collect()
    }

    /// Events whose places describe where the object has been.
    #[must_use]
    pub fn default_place() -> Self {
        [("käyttö", 0), ("use", 0)].into_iter().collect()
    }

    /// Set a label's priority, replacing any configured one.
    pub fn insert(&mut self, label: &str, priority: u32) {
        self.0.insert(label.to_lowercase(), priority);
    }

    #[must_use]
    pub fn priority(&self, label: &str) -> Option<u32> {
        self.0.get(&label.to_lowercase()).copied()
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.priority(label).is_some()
    }

    /// Events with a known label, stably sorted by priority.
    ///
    /// # Examples
    /// ```
    /// use heritage_harvester::events::{Event, EventPriorities};
    ///
    /// let events = vec![
    ///     Event { event_type: Some("Valmistus".into()), ..Default::default() },
    ///     Event { event_type: Some("näyttely".into()), ..Default::default() },
    ///     Event { event_type: Some("suunnittelu".into()), ..Default::default() },
    /// ];
    /// let ordered = EventPriorities::default_main().order(&events);
    /// let labels: Vec<_> = ordered.iter().map(|e| e.event_type.as_deref().unwrap()).collect();
    /// assert_eq!(labels, vec!["suunnittelu", "Valmistus"]);
    /// ```
    pub fn order<'a>(&self, events: &'a [Event]) -> Vec<&'a Event> {
        let mut ranked: Vec<(u32, &Event)> = events
            .iter()
            .filter_map(|event| {
                let priority = self.priority(event.event_type.as_deref()?)?;
                Some((priority, event))
            })
            .collect();
        ranked.sort_by_key(|(priority, _)| *priority);
        ranked.into_iter().map(|(_, event)| event).collect()
    }
}

/// Selects actors from events by event priority and role.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActorEventResolver;

impl ActorEventResolver {
    /// Actors of the prioritized events, optionally limited to one role term
    /// (compared case-insensitively). Names are de-duplicated, keeping the
    /// first occurrence.
    pub fn actors(
        &self,
        events: &[Event],
        priorities: &EventPriorities,
        role: Option<&str>,
    ) -> Vec<Actor> {
        let role = role.map(str::to_lowercase);
        let mut result: Vec<Actor> = Vec::new();
        for event in priorities.order(events) {
            for actor in &event.actors {
                if let Some(wanted) = &role {
                    let matches = actor
                        .role
                        .as_deref()
                        .is_some_and(|r| r.to_lowercase() == *wanted);
                    if !matches {
                        continue;
                    }
                }
                if !result.iter().any(|a| a.name == actor.name) {
                    result.push(actor.clone());
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn event(event_type: &str, actors: &[(&str, Option<&str>)]) -> Event {
        Event {
            event_type: Some(event_type.to_string()),
            actors: actors
                .iter()
                .map(|(name, role)| Actor::new(*name, role.map(str::to_string)))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_order_is_stable_within_priority() {
        let events = vec![
            event("valmistus", &[("A", None)]),
            event("design", &[("B", None)]),
            event("creation", &[("C", None)]),
            event("suunnittelu", &[("D", None)]),
        ];
        let ordered: Vec<_> = EventPriorities::default_main()
            .order(&events)
            .into_iter()
            .map(|e| e.actors[0].name.as_str())
            .collect();
        assert_eq!(ordered, vec!["B", "D", "A", "C"]);
    }

    #[test]
    fn test_actors_filtered_by_role() {
        let events = vec![
            event(
                "valmistus",
                &[("Artist", Some("Taiteilija")), ("Maker", Some("valmistaja"))],
            ),
            event("käyttö", &[("User", Some("taiteilija"))]),
        ];
        let priorities: EventPriorities = [("valmistus", 0)].into_iter().collect();
        let actors = ActorEventResolver.actors(&events, &priorities, Some("taiteilija"));
        assert_eq!(actors, vec![Actor::new("Artist", Some("Taiteilija".into()))]);
    }

    #[test]
    fn test_actor_names_deduplicated() {
        let events = vec![
            event("valmistus", &[("Same", Some("valmistaja"))]),
            event("suunnittelu", &[("Same", Some("suunnittelija")), ("Other", None)]),
        ];
        let actors = ActorEventResolver.actors(&events, &EventPriorities::default_main(), None);
        let names: Vec<_> = actors.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Same", "Other"]);
        assert_eq!(actors[0].with_role(), "Same, suunnittelija");
    }

    #[test]
    fn test_priorities_deserialize_lowercased() {
        let priorities: EventPriorities = serde_yaml_ng::from_str("Valmistus: 1\nUse: 0\n").unwrap();
        assert_eq!(priorities.priority("valmistus"), Some(1));
        assert_eq!(priorities.priority("USE"), Some(0));
        assert!(!priorities.contains("löytyminen"));
    }

    #[test]
    fn test_insert_replaces_existing() {
        let mut priorities = EventPriorities::default_place();
        priorities.insert("Use", 999);
        priorities.insert("valmistus", 999);
        assert_eq!(priorities.priority("use"), Some(999));
        assert_eq!(priorities.priority("valmistus"), Some(999));
        assert_eq!(priorities.priority("käyttö"), Some(0));
    }
}
