//! LIDO (Lightweight Information Describing Objects) mapping.

use roxmltree::{Document, Node};

use super::{
    typed_id, DriverParams, FieldRule, MappingContext, RecordMemo, SchemaMapping, GEOGRAPHIC,
    TOPIC,
};
use crate::dates::DateRangeResolver;
use crate::events::{Actor, ActorEventResolver, Event, EventDate, EventPriorities};
use crate::geometry::{center_coordinates, parse_gml_fragment};
use crate::location::{resolve_locations, EventPlace, PlacePart, SubjectPlace};
use crate::types::{DateRange, FieldMap, Warnings};
use crate::xml::{
    find_all_by_path, find_child, find_children, get_attribute, get_text, has_tag,
    standalone_fragment, text_at, texts_at,
};

const TITLE: &str = "descriptiveMetadata/objectIdentificationWrap/titleWrap/titleSet/appellationValue";
const WORK_TYPE: &str =
    "descriptiveMetadata/objectClassificationWrap/objectWorkTypeWrap/objectWorkType/term";
const CLASSIFICATION: &str =
    "descriptiveMetadata/objectClassificationWrap/classificationWrap/classification/term";
const RECORD_SOURCE: &str =
    "administrativeMetadata/recordWrap/recordSource/legalBodyName/appellationValue";
const EVENTS: &str = "descriptiveMetadata/eventWrap/eventSet/event";
const SUBJECT_SETS: &str = "descriptiveMetadata/objectRelationWrap/subjectWrap/subjectSet";
const SUBJECTS: &str = "descriptiveMetadata/objectRelationWrap/subjectWrap/subjectSet/subject";
const RELATED_WORK_SETS: &str =
    "descriptiveMetadata/objectRelationWrap/relatedWorksWrap/relatedWorkSet";
const DESCRIPTION_SETS: &str =
    "descriptiveMetadata/objectIdentificationWrap/objectDescriptionWrap/objectDescriptionSet";
const MEASUREMENT_SETS: &str =
    "descriptiveMetadata/objectIdentificationWrap/objectMeasurementsWrap/objectMeasurementsSet";
const RESOURCE_SETS: &str = "administrativeMetadata/resourceWrap/resourceSet";

static FIELDS: &[FieldRule] = &[
    FieldRule::first("title", TITLE),
    FieldRule::first(
        "institution",
        "descriptiveMetadata/objectIdentificationWrap/repositoryWrap/repositorySet/repositoryName/legalBodyName/appellationValue",
    ),
    FieldRule::first(
        "identifier",
        "descriptiveMetadata/objectIdentificationWrap/repositoryWrap/repositorySet/workID",
    ),
    FieldRule::all("classification_str_mv", CLASSIFICATION),
    FieldRule::all("classification_txt_mv", CLASSIFICATION),
    FieldRule::all("category_str_mv", "category/term"),
];

const CREATION: &[&str] = &["valmistus", "creation"];
const DESIGN: &[&str] = &["suunnittelu", "design"];
const PRODUCTION: &[&str] = &["tuotanto", "production"];
const PHOTOGRAPHY: &[&str] = &["kuvaus", "photography"];
const USE: &[&str] = &["käyttö", "use"];
const FINDING: &[&str] = &["löytyminen", "finding"];
const EXHIBITION: &[&str] = &["näyttely", "exhibition"];

/// Tried in order when the creation event has no usable date.
const SECONDARY_DATE_EVENTS: &[(&[&str], &str)] = &[
    (DESIGN, "design_daterange"),
    (PRODUCTION, "production_daterange"),
    (PHOTOGRAPHY, "photography_daterange"),
];

/// Role-specific actor fields: field, event labels, role terms.
const ACTOR_FIELDS: &[(&str, &[&str], &[&str])] = &[
    ("artist_str_mv", CREATION, &["taiteilija", "artist"]),
    ("photographer_str_mv", CREATION, &["valokuvaaja", "photographer"]),
    ("finder_str_mv", FINDING, &["löytäjä", "finder"]),
    ("manufacturer_str_mv", CREATION, &["valmistaja", "manufacturer"]),
    ("designer_str_mv", DESIGN, &["suunnittelija", "designer"]),
];

const IMAGE_WORK_TYPES: &[&str] = &[
    "Kuva",
    "Kuva, Valokuva",
    "Valokuva",
    "dia",
    "kuva",
    "negatiivi",
    "photograph",
    "valoku",
    "valokuva",
    "valokuvat",
];
const IMAGE_RESOURCE_TYPES: &[&str] = &[
    "",
    "image_thumb",
    "thumb",
    "medium",
    "image_large",
    "large",
    "zoomview",
    "image_master",
    "image_original",
];
const HIRES_RESOURCE_TYPES: &[&str] = &["image_master", "image_original"];

/// Work type of photographs, whose creation place is where the photo was
/// taken rather than where the object has been.
const PHOTO_WORK_TYPE: &str = "valokuva";
const CREATION_PLACE_PRIORITY: u32 = 999;

const COLLECTION_REL_TYPES: &[&str] = &["kokoelma", "kuuluu kokoelmaan", "collection"];
const PARENT_REL_TYPES: &[&str] = &[
    "kokoelma",
    "kuuluu kokoelmaan",
    "collection",
    "arkisto",
    "archive",
    "alakokoelma",
    "subcollection",
    "erityiskokoelma",
    "hankintaerä",
];
const DESCRIPTION_EXCLUDED_TYPES: &[&str] = &["provenienssi", "provenance"];
const TOPIC_EXCLUDED_TYPES: &[&str] = &["aihe", "iconclass"];
const TOPIC_ID_EXCLUDED_TYPES: &[&str] = &["iconclass"];
const RESTRICTED: &str = "restricted";

/// Field mapping for LIDO records, either bare or inside a `lidoWrap`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LidoMapping;

impl SchemaMapping for LidoMapping {
    fn format(&self) -> &'static str {
        "lido"
    }

    fn record_root<'a, 'input>(
        &self,
        document: &'a Document<'input>,
    ) -> Option<Node<'a, 'input>> {
        document.descendants().find(|node| has_tag(*node, "lido"))
    }

    fn record_id(&self, root: Node<'_, '_>) -> Option<String> {
        text_at(root, "lidoRecID")
    }

    fn field_table(&self) -> &'static [FieldRule] {
        FIELDS
    }

    fn computed_fields(
        &self,
        root: Node<'_, '_>,
        ctx: &MappingContext<'_>,
        memo: &RecordMemo,
        warnings: &mut Warnings,
        fields: &mut FieldMap,
    ) {
        let events = memo.events.get_or_init(|| extract_events(root));
        let work_type = memo
            .work_type
            .get_or_init(|| text_at(root, WORK_TYPE))
            .as_deref();
        let place_events = memo
            .place_events
            .get_or_init(|| place_event_priorities(ctx.params, work_type));
        let main_events = ctx.params.main_events();

        if !fields.contains("institution") {
            if let Some(source) = text_at(root, RECORD_SOURCE) {
                fields.set("institution", source);
            }
        }
        if let Some(description) = description(root, fields.first("title")) {
            fields.set("description", description);
        }

        work_types(root, ctx, work_type, fields);
        actor_fields(events, &main_events, fields);
        materials(events, fields);
        fields.set_all("measurements", measurements(root));
        fields.set_all(
            "culture",
            events.iter().flat_map(|e| e.cultures.iter().cloned()),
        );
        rights(root, fields);
        related_works(root, fields);
        building(ctx, fields);
        topics(root, ctx, fields);
        geographic_ids(root, ctx, events, place_events, fields);
        fields.set_all(
            "exhibition_str_mv",
            events
                .iter()
                .filter(|e| e.is_type(EXHIBITION))
                .filter_map(|e| e.name.clone()),
        );
        date_fields(root, ctx.dates, events, warnings, fields);
        online_flags(root, ctx, fields);
        geolocation(events, warnings, fields);

        let event_places = main_events
            .order(events)
            .into_iter()
            .chain(place_events.order(events))
            .filter_map(|event| event.places.first());
        let candidates = resolve_locations(&subject_places(root), event_places);
        fields.set_all("place_primary_str_mv", candidates.primary);
        fields.set_all("place_secondary_str_mv", candidates.secondary);
    }
}

fn extract_events(root: Node<'_, '_>) -> Vec<Event> {
    find_all_by_path(root, EVENTS)
        .into_iter()
        .map(extract_event)
        .collect()
}

fn extract_event(event: Node<'_, '_>) -> Event {
    Event {
        event_type: text_at(event, "eventType/term"),
        name: text_at(event, "eventName/appellationValue"),
        actors: find_all_by_path(event, "eventActor/actorInRole")
            .into_iter()
            .filter_map(|actor| {
                let name = text_at(actor, "actor/nameActorSet/appellationValue")?;
                Some(Actor::new(name, text_at(actor, "roleActor/term")))
            })
            .collect(),
        date: EventDate {
            earliest: text_at(event, "eventDate/date/earliestDate"),
            latest: text_at(event, "eventDate/date/latestDate"),
            display: text_at(event, "eventDate/displayDate"),
        },
        period: text_at(event, "periodName/term"),
        places: find_children(event, "eventPlace")
            .map(extract_event_place)
            .collect(),
        materials: texts_at(event, "eventMaterialsTech/materialsTech/termMaterialsTech/term"),
        display_materials: text_at(event, "eventMaterialsTech/displayMaterialsTech"),
        cultures: texts_at(event, "culture/term"),
    }
}

fn extract_event_place(event_place: Node<'_, '_>) -> EventPlace {
    let input = event_place.document().input_text();
    let place = find_child(event_place, "place");
    EventPlace {
        name: place.and_then(|p| text_at(p, "namePlaceSet/appellationValue")),
        sub_location: place.map(sub_location).unwrap_or_default(),
        parts: place
            .map(|p| {
                find_children(p, "partOfPlace")
                    .map(|part| PlacePart {
                        name: text_at(part, "namePlaceSet/appellationValue"),
                        classification: text_at(part, "placeClassification/term"),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        display: text_at(event_place, "displayPlace"),
        place_id: place.and_then(place_id),
        gml: find_all_by_path(event_place, "place/gml")
            .into_iter()
            .map(|gml| standalone_fragment(gml, input))
            .collect(),
    }
}

/// Names of all nested `partOfPlace` elements, outermost first.
fn sub_location(place: Node<'_, '_>) -> String {
    fn collect(node: Node<'_, '_>, names: &mut Vec<String>) {
        for part in find_children(node, "partOfPlace") {
            if let Some(name) = text_at(part, "namePlaceSet/appellationValue") {
                names.push(name);
            }
            collect(part, names);
        }
    }

    let mut names = Vec::new();
    collect(place, &mut names);
    names.join(" ")
}

fn place_id(place: Node<'_, '_>) -> Option<String> {
    let id = find_child(place, "placeID")?;
    let text = get_text(id);
    (!text.is_empty()).then(|| typed_id(&text, get_attribute(id, "type")))
}

fn subject_places(root: Node<'_, '_>) -> Vec<Vec<SubjectPlace>> {
    find_all_by_path(root, SUBJECTS)
        .into_iter()
        .map(|subject| {
            find_all_by_path(subject, "subjectPlace/place")
                .into_iter()
                .map(|place| SubjectPlace {
                    name: text_at(place, "namePlaceSet/appellationValue"),
                    classification: text_at(place, "placeClassification/term"),
                    sub_location: sub_location(place),
                })
                .collect()
        })
        .collect()
}

fn type_in(node: Node<'_, '_>, types: &[&str]) -> bool {
    get_attribute(node, "type").is_some_and(|t| types.contains(&t.to_lowercase().as_str()))
}

fn without_list_separators(text: &str) -> String {
    text.replace([',', ';'], " ")
}

/// Object descriptions plus subject descriptions that do not repeat the
/// title.
fn description(root: Node<'_, '_>, title: Option<&str>) -> Option<String> {
    let title = title.unwrap_or_default();

    let mut notes: Vec<String> = find_all_by_path(root, DESCRIPTION_SETS)
        .into_iter()
        .filter(|set| !type_in(*set, DESCRIPTION_EXCLUDED_TYPES))
        .flat_map(|set| texts_at(set, "descriptiveNoteValue"))
        .collect();
    if !notes.is_empty() && notes.join("; ") == title {
        notes.clear();
    }

    let title = without_list_separators(title);
    let subject_descriptions = find_all_by_path(root, SUBJECT_SETS)
        .into_iter()
        .filter_map(|set| {
            let subject = find_child(set, "displaySubject")?;
            let label_ok = get_attribute(subject, "label")
                .is_none_or(|label| label.to_lowercase() == "aihe");
            let text = get_text(subject);
            let repeats_title = without_list_separators(&text).trim() == title;
            (label_ok && !repeats_title && !text.is_empty()).then_some(text)
        });

    let mut parts: Vec<String> = Vec::new();
    for part in subject_descriptions.chain(notes) {
        if !parts.contains(&part) {
            parts.push(part);
        }
    }
    let description = parts.join(" ").trim().to_string();
    (!description.is_empty()).then_some(description)
}

/// `linkResource` values with their representation type.
fn resource_links<'a>(root: Node<'a, '_>) -> Vec<(&'a str, String)> {
    find_all_by_path(root, RESOURCE_SETS)
        .into_iter()
        .flat_map(|set| find_children(set, "resourceRepresentation"))
        .filter_map(|representation| {
            let link = text_at(representation, "linkResource")?;
            Some((get_attribute(representation, "type").unwrap_or_default(), link))
        })
        .collect()
}

fn work_types(
    root: Node<'_, '_>,
    ctx: &MappingContext<'_>,
    work_type: Option<&str>,
    fields: &mut FieldMap,
) {
    let mut types: Vec<String> = work_type.map(str::to_string).into_iter().collect();
    let has_image_type = types
        .iter()
        .any(|t| IMAGE_WORK_TYPES.contains(&t.as_str()));
    if !has_image_type
        && resource_links(root)
            .iter()
            .any(|(kind, _)| IMAGE_RESOURCE_TYPES.contains(kind))
    {
        types.push(ctx.params.image_work_type.clone());
    }
    fields.set_all("format_ext_str_mv", types);
}

fn priorities(labels: &[&str]) -> EventPriorities {
    labels.iter().map(|label| (*label, 0)).collect()
}

fn actor_fields(events: &[Event], main_events: &EventPriorities, fields: &mut FieldMap) {
    let resolver = ActorEventResolver;

    let authors = resolver.actors(events, main_events, None);
    fields.set_all("author", authors.iter().map(Actor::with_role));
    fields.set_all("author_facet", authors.into_iter().map(|a| a.name));

    for (field, labels, roles) in ACTOR_FIELDS {
        let priorities = priorities(labels);
        let mut names: Vec<String> = Vec::new();
        for role in *roles {
            for actor in resolver.actors(events, &priorities, Some(*role)) {
                if !names.contains(&actor.name) {
                    names.push(actor.name);
                }
            }
        }
        fields.set_all(field, names);
    }
}

/// Materials of the creation event, or the display text split on `,`/`;`.
fn materials(events: &[Event], fields: &mut FieldMap) {
    let creation = priorities(CREATION).order(events);
    let mut materials: Vec<String> = creation
        .iter()
        .flat_map(|e| e.materials.iter().cloned())
        .collect();
    if materials.is_empty() {
        if let Some(display) = creation.iter().find_map(|e| e.display_materials.as_deref()) {
            materials = display
                .split([',', ';'])
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
        }
    }
    fields.set_all("material_str_mv", materials.iter().cloned());
    fields.set_all("material", materials);
}

/// Display measurements per set, falling back to the structured values.
/// Extents are appended in parentheses.
fn measurements(root: Node<'_, '_>) -> Vec<String> {
    let mut results = Vec::new();
    for set in find_all_by_path(root, MEASUREMENT_SETS) {
        let mut values = texts_at(set, "displayObjectMeasurements");
        if values.is_empty() {
            values = find_all_by_path(set, "objectMeasurements/measurementsSet")
                .into_iter()
                .map(|m| {
                    ["measurementType", "measurementValue", "measurementUnit"]
                        .iter()
                        .filter_map(|part| text_at(m, part))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .filter(|v| !v.is_empty())
                .collect();
        }
        if values.is_empty() {
            continue;
        }

        let extents = texts_at(set, "objectMeasurements/extentMeasurements").join(", ");
        if !extents.is_empty() {
            for value in &mut values {
                if !value.contains(&extents) {
                    value.push_str(&format!(" ({extents})"));
                }
            }
        }
        results.extend(values);
    }
    results
}

fn rights(root: Node<'_, '_>, fields: &mut FieldMap) {
    let sets = find_all_by_path(root, RESOURCE_SETS);

    if let Some(holder) = sets.iter().find_map(|set| {
        text_at(*set, "rightsResource/rightsHolder/legalBodyName/appellationValue")
    }) {
        fields.set("rights", holder);
    }

    let mut usage: Vec<String> = Vec::new();
    for set in &sets {
        let right = text_at(*set, "rightsResource/rightsType/conceptID")
            .unwrap_or_else(|| RESTRICTED.to_string());
        if !usage.contains(&right) {
            usage.push(right);
        }
    }
    fields.set_all("usage_rights_str_mv", usage.iter().cloned());
    fields.set_all("usage_rights_ext_str_mv", usage);
}

fn related_work_titles(root: Node<'_, '_>, rel_types: &[&str]) -> Vec<String> {
    find_all_by_path(root, RELATED_WORK_SETS)
        .into_iter()
        .filter(|set| {
            text_at(*set, "relatedWorkRelType/term")
                .is_some_and(|t| rel_types.contains(&t.to_lowercase().as_str()))
        })
        .filter_map(|set| text_at(set, "relatedWork/displayObject"))
        .collect()
}

fn related_works(root: Node<'_, '_>, fields: &mut FieldMap) {
    if let Some(collection) = related_work_titles(root, COLLECTION_REL_TYPES)
        .into_iter()
        .next()
    {
        fields.set("collection", collection);
    }
    fields.set_all(
        "hierarchy_parent_title",
        related_work_titles(root, PARENT_REL_TYPES),
    );
}

/// Place events for a record. Creation counts too, at the lowest priority,
/// unless the object is a photograph.
fn place_event_priorities(params: &DriverParams, work_type: Option<&str>) -> EventPriorities {
    let mut priorities = params.place_events();
    if work_type != Some(PHOTO_WORK_TYPE) {
        for label in CREATION {
            priorities.insert(label, CREATION_PLACE_PRIORITY);
        }
    }
    priorities
}

fn building(ctx: &MappingContext<'_>, fields: &mut FieldMap) {
    let institution = fields.first("institution").map(str::to_string);
    let collection = fields.first("collection").map(str::to_string);

    let mut building = if ctx.params.institution_in_building {
        institution.and_then(|i| i.split('/').next().map(str::to_string))
    } else {
        institution
    };
    if ctx.params.collection_in_building {
        if let Some(collection) = collection {
            building = Some(match building {
                Some(b) if !b.is_empty() => format!("{b}/{collection}"),
                _ => collection,
            });
        }
    }
    if let Some(building) = building {
        fields.set("building", building);
    }
}

fn topics(root: Node<'_, '_>, ctx: &MappingContext<'_>, fields: &mut FieldMap) {
    let subjects = find_all_by_path(root, SUBJECTS);

    // Some sources pack several terms into one element.
    let topics: Vec<String> = subjects
        .iter()
        .filter(|subject| !type_in(**subject, TOPIC_EXCLUDED_TYPES))
        .flat_map(|subject| texts_at(*subject, "subjectConcept/term"))
        .flat_map(|term| {
            term.split(',')
                .map(|t| t.trim().to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    fields.set_all("topic_facet", topics.iter().cloned());
    fields.set_all("topic", topics);

    let ids: Vec<String> = subjects
        .iter()
        .filter(|subject| !type_in(**subject, TOPIC_ID_EXCLUDED_TYPES))
        .flat_map(|subject| find_all_by_path(*subject, "subjectConcept/conceptID"))
        .filter_map(|id| {
            let text = get_text(id);
            (!text.is_empty()).then(|| typed_id(&text, get_attribute(id, "type")))
        })
        .map(|id| ctx.authority.map_id(TOPIC, &id))
        .collect();
    fields.set_all("topic_id_str_mv", ids);
}

fn geographic_ids(
    root: Node<'_, '_>,
    ctx: &MappingContext<'_>,
    events: &[Event],
    place_events: &EventPriorities,
    fields: &mut FieldMap,
) {
    let event_ids = place_events
        .order(events)
        .into_iter()
        .flat_map(|event| event.places.iter().filter_map(|p| p.place_id.clone()));
    let subject_ids = find_all_by_path(root, SUBJECTS)
        .into_iter()
        .flat_map(|subject| find_all_by_path(subject, "subjectPlace/place"))
        .filter_map(place_id);

    let ids: Vec<String> = event_ids
        .chain(subject_ids)
        .map(|id| ctx.authority.map_id(GEOGRAPHIC, &id))
        .collect();
    fields.set_all("geographic_id_str_mv", ids);
}

/// Date range of the events with the given labels: the first explicit pair,
/// display date and period across the events, resolved together.
fn event_date_range(
    dates: &DateRangeResolver,
    events: &[Event],
    labels: &[&str],
    warnings: &mut Warnings,
) -> Option<DateRange> {
    let mut explicit: Option<(&str, &str)> = None;
    let mut display = None;
    let mut period = None;
    for event in priorities(labels).order(events) {
        if explicit.is_none() {
            if let (Some(start), Some(end)) = (&event.date.earliest, &event.date.latest) {
                explicit = Some((start.as_str(), end.as_str()));
            }
        }
        display = display.or(event.date.display.as_deref());
        period = period.or(event.period.as_deref());
    }
    dates.resolve(
        explicit.map(|(start, _)| start),
        explicit.map(|(_, end)| end),
        display,
        period,
        warnings,
    )
}

fn subject_date_ranges(
    root: Node<'_, '_>,
    dates: &DateRangeResolver,
    warnings: &mut Warnings,
) -> Vec<DateRange> {
    find_all_by_path(root, SUBJECTS)
        .into_iter()
        .filter_map(|subject| {
            let (start, end) = match (
                text_at(subject, "subjectDate/date/earliestDate"),
                text_at(subject, "subjectDate/date/latestDate"),
            ) {
                (Some(start), Some(end)) => (Some(start), Some(end)),
                _ => (None, None),
            };
            let display = text_at(subject, "subjectDate/displayDate");
            dates.resolve(
                start.as_deref(),
                end.as_deref(),
                display.as_deref(),
                None,
                warnings,
            )
        })
        .collect()
}

fn date_fields(
    root: Node<'_, '_>,
    dates: &DateRangeResolver,
    events: &[Event],
    warnings: &mut Warnings,
    fields: &mut FieldMap,
) {
    let mut main_date: Option<DateRange> = None;
    let mut search: Vec<String> = Vec::new();

    for range in subject_date_ranges(root, dates, warnings) {
        main_date.get_or_insert(range);
        search.push(range.to_index_string());
    }

    if let Some(range) = event_date_range(dates, events, CREATION, warnings) {
        main_date.get_or_insert(range);
        search.push(range.to_index_string());
        fields.set("creation_daterange", range.to_index_string());
    } else {
        for (labels, field) in SECONDARY_DATE_EVENTS {
            if let Some(range) = event_date_range(dates, events, labels, warnings) {
                fields.set(field, range.to_index_string());
                if search.is_empty() {
                    search.push(range.to_index_string());
                }
                main_date.get_or_insert(range);
            }
        }
    }

    if let Some(range) = event_date_range(dates, events, USE, warnings) {
        fields.set("use_daterange", range.to_index_string());
    }
    if let Some(range) = event_date_range(dates, events, FINDING, warnings) {
        fields.set("finding_daterange", range.to_index_string());
    }

    if let Some(range) = main_date {
        fields.set("main_date_str", range.start.year.to_string());
        fields.set("main_date", range.start.to_string());
    }
    fields.set_all("search_daterange_mv", search);
}

fn online_flags(root: Node<'_, '_>, ctx: &MappingContext<'_>, fields: &mut FieldMap) {
    let links = resource_links(root);
    let online = ctx.params.online.unwrap_or(!links.is_empty());
    if !online {
        return;
    }

    fields.set_flag("online_boolean", true);
    fields.set("online_str_mv", ctx.source_id);
    if ctx.params.free_online() {
        fields.set_flag("free_online_boolean", true);
        fields.set("free_online_str_mv", ctx.source_id);
    }
    if links
        .iter()
        .any(|(kind, _)| HIRES_RESOURCE_TYPES.contains(kind))
    {
        fields.set_flag("hires_image_boolean", true);
        fields.set("hires_image_str_mv", ctx.source_id);
    }
}

fn geolocation(events: &[Event], warnings: &mut Warnings, fields: &mut FieldMap) {
    let mut geometries = Vec::new();
    for fragment in events
        .iter()
        .flat_map(|e| &e.places)
        .flat_map(|p| &p.gml)
    {
        match parse_gml_fragment(fragment) {
            Ok(Some(geometry)) => geometries.push(geometry),
            Ok(None) => {}
            Err(e) => warnings.push(e.to_string()),
        }
    }
    fields.set_all("location_geo", geometries.iter().map(|g| g.to_wkt()));
    if let Some(center) = center_coordinates(&geometries) {
        fields.set("center_coords", center);
    }
}
