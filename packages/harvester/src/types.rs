//! Core data types for the harvester.
//!
//! These types carry records from the protocol layer to the sinks, and the
//! canonical values produced by the normalizer.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Whether a record is live or has been withdrawn by the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Active,
    Deleted,
}

impl RecordStatus {
    #[must_use]
    pub fn is_deleted(self) -> bool {
        self == Self::Deleted
    }
}

/// A record as retrieved from a repository.
///
/// The payload is the record's metadata element as a standalone XML
/// document; it is empty for deleted records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub identifier: String,
    pub datestamp: Option<String>,
    pub payload: String,
    pub status: RecordStatus,
}

impl RawRecord {
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.status.is_deleted()
    }
}

/// Requested harvest window. Unset bounds fall back to the stored state
/// (`from`) and the current time (`until`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestWindow {
    pub from: Option<String>,
    pub until: Option<String>,
}

impl HarvestWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn with_until(mut self, until: impl Into<String>) -> Self {
        self.until = Some(until.into());
        self
    }
}

/// What a sink did with one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkOutcome {
    Changed,
    Unchanged,
    Rejected,
}

/// Counters for one harvest run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HarvestSummary {
    pub changed: u64,
    pub deleted: u64,
    pub unchanged: u64,
    pub rejected: u64,
    /// Largest record datestamp seen during the run.
    pub last_harvested: Option<String>,
}

impl HarvestSummary {
    /// Human readable report line logged at the end of a run.
    #[must_use]
    pub fn report(&self) -> String {
        format!(
            "Harvested {} updated, {} unchanged and {} deleted records",
            self.changed, self.unchanged, self.deleted
        )
    }

    /// Total number of records handed to the sink.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.changed + self.deleted + self.unchanged + self.rejected
    }
}

/// De-duplicated list of non-fatal anomalies found while normalizing a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Warnings(Vec<String>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning unless it is already present.
    pub fn push(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !self.0.contains(&message) {
            tracing::debug!(warning = %message, "record warning");
            self.0.push(message);
        }
    }

    #[must_use]
    pub fn contains(&self, message: &str) -> bool {
        self.0.iter().any(|w| w == message)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Canonical instant pattern: `[-]YYYY-MM-DDThh:mm:ssZ`.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static INSTANT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?)([0-9]{4,})-([0-9]{2})-([0-9]{2})T([0-9]{2}):([0-9]{2}):([0-9]{2})Z$")
        .expect("valid regex")
});

/// An extended ISO-8601 instant with support for negative (BCE) years.
///
/// The fields are not validated on construction; see [`IsoInstant::is_valid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IsoInstant {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl IsoInstant {
    #[must_use]
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// `YYYY-01-01T00:00:00Z`
    #[must_use]
    pub fn start_of_year(year: i32) -> Self {
        Self::new(year, 1, 1, 0, 0, 0)
    }

    /// `YYYY-12-31T23:59:59Z`
    #[must_use]
    pub fn end_of_year(year: i32) -> Self {
        Self::new(year, 12, 31, 23, 59, 59)
    }

    /// Parse a canonical instant. Field values are not range checked.
    ///
    /// # Examples
    /// ```
    /// use heritage_harvester::types::IsoInstant;
    ///
    /// let instant = IsoInstant::parse("-0500-01-01T00:00:00Z").unwrap();
    /// assert_eq!(instant.year, -500);
    /// assert!(IsoInstant::parse("1930").is_none());
    /// ```
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let caps = INSTANT_PATTERN.captures(value)?;
        let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        let magnitude: i32 = caps.get(2)?.as_str().parse().ok()?;
        let year = if caps.get(1).is_some_and(|m| !m.as_str().is_empty()) {
            -magnitude
        } else {
            magnitude
        };
        Some(Self::new(
            year,
            field(3)?,
            field(4)?,
            field(5)?,
            field(6)?,
            field(7)?,
        ))
    }

    /// Whether the fields form a real proleptic Gregorian date and time.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day).is_some()
            && self.hour < 24
            && self.minute < 60
            && self.second < 60
    }

    /// Day part as `[-]YYYY-MM-DD`.
    #[must_use]
    pub fn date_string(&self) -> String {
        let sign = if self.year < 0 { "-" } else { "" };
        format!(
            "{sign}{:04}-{:02}-{:02}",
            self.year.unsigned_abs(),
            self.month,
            self.day
        )
    }

    /// Whether the day part falls after `day`.
    #[must_use]
    pub fn is_after_day(&self, day: NaiveDate) -> bool {
        use chrono::Datelike;
        (self.year, self.month, self.day) > (day.year(), day.month(), day.day())
    }
}

impl Ord for IsoInstant {
    fn cmp(&self, other: &Self) -> Ordering {
        (
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        )
            .cmp(&(
                other.year,
                other.month,
                other.day,
                other.hour,
                other.minute,
                other.second,
            ))
    }
}

impl PartialOrd for IsoInstant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for IsoInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}T{:02}:{:02}:{:02}Z",
            self.date_string(),
            self.hour,
            self.minute,
            self.second
        )
    }
}

impl Serialize for IsoInstant {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A validated interval; `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: IsoInstant,
    pub end: IsoInstant,
}

impl DateRange {
    #[must_use]
    pub fn new(start: IsoInstant, end: IsoInstant) -> Self {
        Self { start, end }
    }

    /// Index rendering at day precision.
    ///
    /// # Examples
    /// ```
    /// use heritage_harvester::types::{DateRange, IsoInstant};
    ///
    /// let decade = DateRange::new(IsoInstant::start_of_year(1930), IsoInstant::end_of_year(1939));
    /// assert_eq!(decade.to_index_string(), "[1930-01-01 TO 1939-12-31]");
    ///
    /// let day = DateRange::new(
    ///     IsoInstant::new(1930, 5, 1, 0, 0, 0),
    ///     IsoInstant::new(1930, 5, 1, 23, 59, 59),
    /// );
    /// assert_eq!(day.to_index_string(), "1930-05-01");
    /// ```
    #[must_use]
    pub fn to_index_string(&self) -> String {
        let start = self.start.date_string();
        let end = self.end.date_string();
        if start == end {
            start
        } else {
            format!("[{start} TO {end}]")
        }
    }
}

/// A WGS-84 position.
///
/// Keeps the coordinate text as it appeared in the source so WKT output
/// does not change its precision.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    lat_text: String,
    lon_text: String,
}

impl Position {
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self::with_text(lat, lon, lat.to_string(), lon.to_string())
    }

    #[must_use]
    pub fn with_text(
        lat: f64,
        lon: f64,
        lat_text: impl Into<String>,
        lon_text: impl Into<String>,
    ) -> Self {
        Self {
            lat,
            lon,
            lat_text: lat_text.into(),
            lon_text: lon_text.into(),
        }
    }

    /// `"lon lat"` in the source's own notation.
    #[must_use]
    pub fn to_wkt(&self) -> String {
        format!("{} {}", self.lon_text, self.lat_text)
    }
}

/// A geometry decoded from a GML fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    Polygon {
        outer: Vec<Position>,
        inner: Option<Vec<Position>>,
    },
}

/// Canonical field map: field name to one or more values, sorted by name.
///
/// Empty values are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, Vec<String>>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a field with a single value.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            return;
        }
        self.0.insert(name.to_string(), vec![value]);
    }

    /// Replace a field with a list of values; nothing is stored if every
    /// value is empty.
    pub fn set_all<I, S>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values
            .into_iter()
            .map(Into::into)
            .filter(|v| !v.is_empty())
            .collect();
        if !values.is_empty() {
            self.0.insert(name.to_string(), values);
        }
    }

    /// Append a value to a field.
    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            return;
        }
        self.0.entry(name.to_string()).or_default().push(value);
    }

    /// Append several values to a field.
    pub fn extend<I, S>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self.push(name, value);
        }
    }

    /// Store `"true"` when the flag is set.
    pub fn set_flag(&mut self, name: &str, flag: bool) {
        if flag {
            self.set(name, "true");
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.first()).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}
