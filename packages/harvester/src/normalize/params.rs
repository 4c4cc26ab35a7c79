//! Per-source overrides of normalization behavior.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::events::EventPriorities;

const DEFAULT_IMAGE_WORK_TYPE: &str = "Kuva";

fn default_true() -> bool {
    true
}

fn default_image_work_type() -> String {
    DEFAULT_IMAGE_WORK_TYPE.to_string()
}

/// Deployment overrides for one source, read from `driver_params` in the
/// sources file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriverParams {
    /// Force the online flag instead of deriving it from resource links.
    pub online: Option<bool>,

    /// Force the free-online flag.
    pub free_online: Option<bool>,

    /// Free-online value when `free_online` is not set.
    #[serde(default = "default_true")]
    pub free_online_default: bool,

    /// Use the top-level institution name as the building.
    pub institution_in_building: bool,

    /// Append the collection to the building.
    pub collection_in_building: bool,

    /// Work type added when a record has image links but no image work type.
    #[serde(default = "default_image_work_type")]
    pub image_work_type: String,

    /// Events that define the object. Defaults to design and creation.
    pub main_events: Option<EventPriorities>,

    /// Events whose places locate the object. Defaults to use.
    pub place_events: Option<EventPriorities>,

    /// Authority id namespaces keyed by kind (`topic`, `geographic`, or `*`).
    pub authority_namespaces: BTreeMap<String, String>,
}

impl Default for DriverParams {
    fn default() -> Self {
        Self {
            online: None,
            free_online: None,
            free_online_default: true,
            institution_in_building: false,
            collection_in_building: false,
            image_work_type: default_image_work_type(),
            main_events: None,
            place_events: None,
            authority_namespaces: BTreeMap::new(),
        }
    }
}

impl DriverParams {
    #[must_use]
    pub fn main_events(&self) -> EventPriorities {
        self.main_events
            .clone()
            .unwrap_or_else(EventPriorities::default_main)
    }

    #[must_use]
    pub fn place_events(&self) -> EventPriorities {
        self.place_events
            .clone()
            .unwrap_or_else(EventPriorities::default_place)
    }

    #[must_use]
    pub fn free_online(&self) -> bool {
        self.free_online.unwrap_or(self.free_online_default)
    }
}
