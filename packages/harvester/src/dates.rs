//! Free-text and partial-ISO date resolution.
//!
//! Museum catalogues record dates as anything from a full timestamp to
//! "1930-luvun loppu" or "late 1930s". [`DateRangeResolver`] turns those into
//! a [`DateRange`] of two canonical instants, or nothing. It never fails:
//! anything it cannot use is reported through [`Warnings`].

use std::sync::LazyLock;

use chrono::{NaiveDate, Utc};
use regex::{Captures, Regex};

use crate::types::{DateRange, IsoInstant, Warnings};

pub const WARN_INVALID_RANGE: &str = "invalid date range";
pub const WARN_INVALID_DATE: &str = "invalid date";
pub const WARN_INVALID_END_DATE: &str = "invalid end date";
pub const WARN_UNPARSEABLE: &str = "unparseable date";

#[allow(clippy::expect_used)] // Static patterns that are guaranteed to be valid
fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("valid regex")
}

const MONTHS: &str = "tammikuu|helmikuu|maaliskuu|huhtikuu|toukokuu|kesäkuu|heinäkuu|elokuu|\
syyskuu|lokakuu|marraskuu|joulukuu|january|february|march|april|may|june|july|august|\
september|october|november|december";

static PARTIAL_DATE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"^(-?)(\d{1,4})(?:-(\d{1,2})(?:-(\d{1,2})(?:T(\d{2}):(\d{2}):(\d{2})Z?)?)?)?$")
});

static DMY_TO_DMY: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(\d\d?)\s*.\s*(\d\d?)\s*.\s*(\d\d\d\d)\s*-\s*(\d\d?)\s*.\s*(\d\d?)\s*.\s*(\d\d\d\d)")
});
static YEAR_TO_DMY: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(\d\d\d\d)\s*-\s*(\d\d?)\s*.\s*(\d\d?)\s*.\s*(\d\d\d\d)"));
static DMY_TO_YEAR: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(\d\d?)\s*.\s*(\d\d?)\s*.\s*(\d\d\d\d)\s*-\s*(\d\d\d\d)"));
static YMD_TO_YMD: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(\d\d\d\d)\s*.\s*(\d\d?)\s*.\s*(\d\d?)\s*-\s*(\d\d\d\d)\s*.\s*(\d\d?)\s*.\s*(\d\d?)")
});
static YMD_TO_YMD_COMPACT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(\d\d\d\d)(\d\d?)(\d\d?)\s*-\s*(\d\d\d\d)(\d\d?)(\d\d?)"));
static YM_TO_YM_COMPACT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(\d\d\d\d)(\d\d?)\s*-\s*(\d\d\d\d)(\d\d?)"));
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| pattern(r"(\d\d\d\d)-(\d\d?)-(\d\d?)"));
static RANGE_TO_END: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(\d\d\d\d)\s*-\s*(\d\d\d\d)\s*(?:-luvun|-l)\s+(?:loppupuoli|loppu)")
});
static RANGE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(\d?\d?\d\d)\s*(?:-|~)\s*(\d?\d?\d\d)\s*(-luku|-l|s\b)?\s*(?:\(?\?\)?)?")
});
static YEAR_MONTH_NAME: LazyLock<Regex> =
    LazyLock::new(|| pattern(&format!(r"(\d?\d?\d\d)\s+({MONTHS})")));
static MONTH_NAME_YEAR: LazyLock<Regex> =
    LazyLock::new(|| pattern(&format!(r"({MONTHS})\s+(\d?\d?\d\d)")));
static COMPACT_DATE: LazyLock<Regex> = LazyLock::new(|| pattern(r"(\d\d\d\d)(\d\d)(\d\d)"));
static COMPACT_MONTH: LazyLock<Regex> = LazyLock::new(|| pattern(r"(\d\d\d\d)(\d\d)"));
static DMY: LazyLock<Regex> = LazyLock::new(|| pattern(r"(\d\d?)\s*\.\s*(\d\d?)\s*\.\s*(\d\d\d\d)"));
static MY: LazyLock<Regex> = LazyLock::new(|| pattern(r"(\d\d?)\s*\.\s*(\d\d\d\d)"));
static EARLY: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(\d?\d?\d\d)\s*-(?:luvun|luku)\s+(?:alkupuolelta|alkupuoli|alku|alusta)")
});
static EARLY_EN: LazyLock<Regex> = LazyLock::new(|| pattern(r"early\s+(\d?\d?\d\d)'?s\b"));
static MID: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(\d?\d?\d\d)\s*-(?:luvun|luku)\s+puoliväli"));
static MID_EN: LazyLock<Regex> = LazyLock::new(|| pattern(r"mid-?\s*(\d?\d?\d\d)'?s\b"));
static LATE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(\d?\d?\d\d)\s*(?:-luvun|-l)\s+(?:loppupuoli|loppu|lopulta|loppupuolelta)")
});
static LATE_EN: LazyLock<Regex> = LazyLock::new(|| pattern(r"late\s+(\d?\d?\d\d)'?s\b"));
static DECADE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(-?\d?\d?\d\d)\s*-(?:luku|luvulta|l)"));
static DECADE_EN: LazyLock<Regex> = LazyLock::new(|| pattern(r"(-?\d?\d?\d\d)'?s\b"));
static BCE_TO_BCE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(\d?\d?\d\d)\s*(?:ekr|eaa|bce|bc).?\s*-\s*(\d?\d?\d\d)\s*(?:ekr|eaa|bce|bc)")
});
static BCE_TO_CE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(\d?\d?\d\d)\s*(?:ekr|eaa|bce|bc).?\s*-\s*(\d?\d?\d\d)\s*(?:jkr|jaa|ce|ad)")
});
static AFTER: LazyLock<Regex> = LazyLock::new(|| pattern(r"(-?\d?\d?\d\d) jälkeen"));
static AFTER_EN: LazyLock<Regex> = LazyLock::new(|| pattern(r"after\s+(-?\d?\d?\d\d)"));
static SIGNED_RANGE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(-?\d\d\d\d)\s*-\s*(-?\d\d\d\d)"));
static SHORT_RANGE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(-?\d{1,4})\s+-\s+(-?\d{1,4})"));
static UNCERTAIN: LazyLock<Regex> = LazyLock::new(|| pattern(r"(-?\d?\d?\d\d)\s*\?"));
static UNCERTAIN_EN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?:circa|ca\.?|c\.)\s*(-?\d?\d?\d\d)"));
static YEAR: LazyLock<Regex> = LazyLock::new(|| pattern(r"(-?\d?\d?\d\d)\b"));

/// Named periods with fixed ranges. `None` marks labels meaning "no date".
const ERAS: &[(&str, Option<(&str, &str)>)] = &[
    (
        "kivikausi",
        Some(("-8600-01-01T00:00:00Z", "-1501-12-31T23:59:59Z")),
    ),
    (
        "stone age",
        Some(("-8600-01-01T00:00:00Z", "-1501-12-31T23:59:59Z")),
    ),
    (
        "pronssikausi",
        Some(("-1500-01-01T00:00:00Z", "-0501-12-31T23:59:59Z")),
    ),
    (
        "bronze age",
        Some(("-1500-01-01T00:00:00Z", "-0501-12-31T23:59:59Z")),
    ),
    (
        "rautakausi",
        Some(("-0500-01-01T00:00:00Z", "1299-12-31T23:59:59Z")),
    ),
    (
        "iron age",
        Some(("-0500-01-01T00:00:00Z", "1299-12-31T23:59:59Z")),
    ),
    (
        "keskiaika",
        Some(("1300-01-01T00:00:00Z", "1550-12-31T23:59:59Z")),
    ),
    (
        "middle ages",
        Some(("1300-01-01T00:00:00Z", "1550-12-31T23:59:59Z")),
    ),
    ("ajoittamaton", None),
    ("tuntematon", None),
    ("undated", None),
    ("unknown", None),
];

fn month_number(name: &str) -> Option<u32> {
    let month = match name {
        "tammikuu" | "january" => 1,
        "helmikuu" | "february" => 2,
        "maaliskuu" | "march" => 3,
        "huhtikuu" | "april" => 4,
        "toukokuu" | "may" => 5,
        "kesäkuu" | "june" => 6,
        "heinäkuu" | "july" => 7,
        "elokuu" | "august" => 8,
        "syyskuu" | "september" => 9,
        "lokakuu" | "october" => 10,
        "marraskuu" | "november" => 11,
        "joulukuu" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

/// Last day of a month, `None` for an invalid month.
fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(next.signed_duration_since(first).num_days() as u32)
}

/// Start/end years synthesized for a decade or century label.
fn span_end(year: i64, century: i64, decade: i64) -> i64 {
    if year % 100 == 0 {
        year + century
    } else if year % 10 == 0 {
        year + decade
    } else {
        year
    }
}

/// An explicit date of year, month, day or second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PartialDate {
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
    time: Option<(u32, u32, u32)>,
}

impl PartialDate {
    fn parse(value: &str) -> Option<Self> {
        let caps = PARTIAL_DATE.captures(value.trim())?;
        let num = |i: usize| -> Option<Option<u32>> {
            match caps.get(i) {
                Some(m) => m.as_str().parse().ok().map(Some),
                None => Some(None),
            }
        };
        let magnitude: i32 = caps.get(2)?.as_str().parse().ok()?;
        let year = if caps.get(1).is_some_and(|m| !m.as_str().is_empty()) {
            -magnitude
        } else {
            magnitude
        };
        let time = match (num(5)?, num(6)?, num(7)?) {
            (Some(h), Some(m), Some(s)) => Some((h, m, s)),
            _ => None,
        };
        Some(Self {
            year,
            month: num(3)?,
            day: num(4)?,
            time,
        })
    }

    fn first_instant(&self) -> IsoInstant {
        let (hour, minute, second) = self.time.unwrap_or((0, 0, 0));
        IsoInstant::new(
            self.year,
            self.month.unwrap_or(1),
            self.day.unwrap_or(1),
            hour,
            minute,
            second,
        )
    }

    fn last_instant(&self) -> Option<IsoInstant> {
        if let Some((hour, minute, second)) = self.time {
            return Some(IsoInstant::new(
                self.year,
                self.month.unwrap_or(1),
                self.day.unwrap_or(1),
                hour,
                minute,
                second,
            ));
        }
        match (self.month, self.day) {
            (None, _) => Some(IsoInstant::end_of_year(self.year)),
            (Some(month), Some(day)) => Some(IsoInstant::new(self.year, month, day, 23, 59, 59)),
            (Some(month), None) => {
                let day = last_day_of_month(self.year, month)?;
                Some(IsoInstant::new(self.year, month, day, 23, 59, 59))
            }
        }
    }
}

/// What a cascade family produced before padding and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Candidate {
    /// Complete instants.
    Instants(String, String),
    /// Year tokens still to be padded and expanded.
    Years(String, String),
}

impl Candidate {
    fn years(start: impl ToString, end: impl ToString) -> Self {
        Self::Years(start.to_string(), end.to_string())
    }
}

fn group<'h>(caps: &Captures<'h>, i: usize) -> Option<&'h str> {
    caps.get(i).map(|m| m.as_str())
}

fn number(caps: &Captures<'_>, i: usize) -> Option<u32> {
    group(caps, i)?.parse().ok()
}

fn year_value(caps: &Captures<'_>, i: usize) -> Option<i64> {
    group(caps, i)?.parse().ok()
}

fn day_start(year: impl std::fmt::Display, month: u32, day: u32) -> String {
    format!("{year}-{month:02}-{day:02}T00:00:00Z")
}

fn day_end(year: impl std::fmt::Display, month: u32, day: u32) -> String {
    format!("{year}-{month:02}-{day:02}T23:59:59Z")
}

/// Sign and zero handling of a year token.
fn signed_year(token: &str) -> Option<String> {
    let value: i64 = token.parse().ok()?;
    Some(if value < 0 {
        format!("-{:0>4}", token.trim_start_matches('-'))
    } else if value == 0 {
        "0000".to_string()
    } else {
        token.to_string()
    })
}

fn pad_start_year(token: &str) -> Option<String> {
    let year = signed_year(token)?;
    Some(match year.len() {
        1 => format!("000{year}"),
        2 => format!("19{year}"),
        3 => format!("0{year}"),
        _ => year,
    })
}

/// A two-digit end year borrows the start year's century.
fn pad_end_year(token: &str, start: &str) -> Option<String> {
    let year = signed_year(token)?;
    Some(match year.len() {
        1 => format!("000{year}"),
        2 => format!("{}{year}", &start[..start.len().saturating_sub(2)]),
        3 => format!("0{year}"),
        _ => year,
    })
}

/// Resolves event and subject dates into validated ranges.
#[derive(Debug, Clone)]
pub struct DateRangeResolver {
    today: NaiveDate,
}

impl Default for DateRangeResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DateRangeResolver {
    /// Resolver that rejects dates after the current UTC day.
    pub fn new() -> Self {
        Self {
            today: Utc::now().date_naive(),
        }
    }

    /// Resolver with a fixed notion of "today".
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Resolve a date from explicit bounds, a display text or a period label.
    ///
    /// Explicit bounds win when the start parses. Otherwise the display text,
    /// else the period label, is parsed as free text.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use heritage_harvester::dates::DateRangeResolver;
    /// use heritage_harvester::types::Warnings;
    ///
    /// let resolver = DateRangeResolver::with_today(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    /// let mut warnings = Warnings::new();
    ///
    /// let range = resolver.resolve(None, None, Some("1930-luku"), None, &mut warnings).unwrap();
    /// assert_eq!(range.to_index_string(), "[1930-01-01 TO 1939-12-31]");
    /// ```
    pub fn resolve(
        &self,
        start: Option<&str>,
        end: Option<&str>,
        display: Option<&str>,
        period: Option<&str>,
        warnings: &mut Warnings,
    ) -> Option<DateRange> {
        fn non_empty(s: Option<&str>) -> Option<&str> {
            s.map(str::trim).filter(|s| !s.is_empty())
        }

        if let Some(start) = non_empty(start) {
            match PartialDate::parse(start) {
                Some(first) => return self.resolve_explicit(first, non_empty(end), warnings),
                None => warnings.push(WARN_INVALID_DATE),
            }
        }
        if let Some(display) = non_empty(display) {
            return self.parse_free_text(display, warnings);
        }
        if let Some(period) = non_empty(period) {
            return self.parse_free_text(period, warnings);
        }
        None
    }

    fn resolve_explicit(
        &self,
        start: PartialDate,
        end: Option<&str>,
        warnings: &mut Warnings,
    ) -> Option<DateRange> {
        let mut end = match end {
            Some(text) => match PartialDate::parse(text) {
                Some(end) => end,
                None => {
                    warnings.push(WARN_INVALID_DATE);
                    return None;
                }
            },
            None => start,
        };

        if end.first_instant() < start.first_instant() {
            warnings.push(WARN_INVALID_RANGE);
            end = start;
        }

        let first = start.first_instant();
        let last = end.last_instant();
        match last {
            Some(last) if first.is_valid() && last.is_valid() => Some(DateRange::new(first, last)),
            _ => {
                warnings.push(WARN_INVALID_DATE);
                None
            }
        }
    }

    /// Parse a free-text date expression.
    pub fn parse_free_text(&self, input: &str, warnings: &mut Warnings) -> Option<DateRange> {
        let input = input.trim().to_lowercase();

        for (label, range) in ERAS {
            if input.contains(label) {
                let (start, end) = (*range)?;
                return Some(DateRange::new(
                    IsoInstant::parse(start)?,
                    IsoInstant::parse(end)?,
                ));
            }
        }

        let input = input.split(',').next().unwrap_or_default();

        let recorded = warnings.len();
        let Some(candidate) = self.match_families(input, warnings) else {
            if warnings.len() == recorded {
                warnings.push(WARN_UNPARSEABLE);
            }
            return None;
        };

        let (start, end) = match candidate {
            Candidate::Instants(start, end) => (start, end),
            Candidate::Years(start, end) => {
                let Some(start) = pad_start_year(&start) else {
                    warnings.push(WARN_UNPARSEABLE);
                    return None;
                };
                let Some(end) = pad_end_year(&end, &start) else {
                    warnings.push(WARN_UNPARSEABLE);
                    return None;
                };
                (
                    format!("{start}-01-01T00:00:00Z"),
                    format!("{end}-12-31T23:59:59Z"),
                )
            }
        };

        self.validate(&start, &end, warnings)
    }

    fn validate(&self, start: &str, end: &str, warnings: &mut Warnings) -> Option<DateRange> {
        let start = IsoInstant::parse(start);
        let end = IsoInstant::parse(end);

        if start.iter().chain(end.iter()).any(|i| i.is_after_day(self.today)) {
            return None;
        }

        let start = start.filter(IsoInstant::is_valid);
        let end = end.filter(IsoInstant::is_valid);
        match (start, end) {
            (Some(start), Some(end)) if start > end => {
                warnings.push(WARN_INVALID_RANGE);
                Some(DateRange::new(start, IsoInstant::end_of_year(start.year)))
            }
            (Some(start), Some(end)) => Some(DateRange::new(start, end)),
            (Some(start), None) => {
                warnings.push(WARN_INVALID_RANGE);
                Some(DateRange::new(start, IsoInstant::end_of_year(start.year)))
            }
            (None, Some(end)) => {
                warnings.push(WARN_INVALID_RANGE);
                Some(DateRange::new(IsoInstant::start_of_year(end.year), end))
            }
            (None, None) => {
                warnings.push(WARN_INVALID_RANGE);
                None
            }
        }
    }

    /// End of a named or numbered month, warning when the month is invalid.
    fn month_end(year: &str, month: u32, warnings: &mut Warnings) -> Option<String> {
        let day = year
            .parse::<i32>()
            .ok()
            .and_then(|y| last_day_of_month(y, month));
        match day {
            Some(day) => Some(day_end(year, month, day)),
            None => {
                warnings.push(WARN_INVALID_END_DATE);
                None
            }
        }
    }

    /// The ordered cascade; the first matching family wins.
    fn match_families(&self, input: &str, warnings: &mut Warnings) -> Option<Candidate> {
        if let Some(c) = DMY_TO_DMY.captures(input) {
            return Some(Candidate::Instants(
                day_start(format!("{:04}", number(&c, 3)?), number(&c, 2)?, number(&c, 1)?),
                day_end(format!("{:04}", number(&c, 6)?), number(&c, 5)?, number(&c, 4)?),
            ));
        }
        if let Some(c) = YEAR_TO_DMY.captures(input) {
            return Some(Candidate::Instants(
                day_start(format!("{:04}", number(&c, 1)?), 1, 1),
                day_end(format!("{:04}", number(&c, 4)?), number(&c, 3)?, number(&c, 2)?),
            ));
        }
        if let Some(c) = DMY_TO_YEAR.captures(input) {
            return Some(Candidate::Instants(
                day_start(format!("{:04}", number(&c, 3)?), number(&c, 2)?, number(&c, 1)?),
                day_end(format!("{:04}", number(&c, 4)?), 12, 31),
            ));
        }
        if let Some(c) = YMD_TO_YMD.captures(input) {
            return Some(Candidate::Instants(
                day_start(format!("{:04}", number(&c, 1)?), number(&c, 2)?, number(&c, 3)?),
                day_end(format!("{:04}", number(&c, 4)?), number(&c, 5)?, number(&c, 6)?),
            ));
        }
        if let Some(c) = YMD_TO_YMD_COMPACT.captures(input) {
            return Some(Candidate::Instants(
                day_start(format!("{:04}", number(&c, 1)?), number(&c, 2)?, number(&c, 3)?),
                day_end(format!("{:04}", number(&c, 4)?), number(&c, 5)?, number(&c, 6)?),
            ));
        }
        if let Some(c) = YM_TO_YM_COMPACT.captures(input) {
            let start = day_start(format!("{:04}", number(&c, 1)?), number(&c, 2)?, 1);
            let end = Self::month_end(&format!("{:04}", number(&c, 3)?), number(&c, 4)?, warnings)?;
            return Some(Candidate::Instants(start, end));
        }
        if let Some(c) = ISO_DATE.captures(input) {
            let year = group(&c, 1)?;
            let (month, day) = (number(&c, 2)?, number(&c, 3)?);
            return Some(Candidate::Instants(
                day_start(year, month, day),
                day_end(year, month, day),
            ));
        }
        if let Some(c) = RANGE_TO_END.captures(input) {
            let end = year_value(&c, 2)?;
            return Some(Candidate::years(group(&c, 1)?, span_end(end, 99, 9)));
        }
        if let Some(c) = RANGE.captures(input) {
            let mut end = year_value(&c, 2)?;
            if c.get(3).is_some() && end % 10 == 0 {
                end += 9;
            }
            // A plain two-digit end keeps its token so the start's century applies.
            let end = if end == year_value(&c, 2)? {
                group(&c, 2)?.to_string()
            } else {
                end.to_string()
            };
            return Some(Candidate::years(group(&c, 1)?, end));
        }
        if let Some(c) = YEAR_MONTH_NAME.captures(input) {
            return self.named_month(group(&c, 1)?, group(&c, 2)?, warnings);
        }
        if let Some(c) = MONTH_NAME_YEAR.captures(input) {
            return self.named_month(group(&c, 2)?, group(&c, 1)?, warnings);
        }
        if let Some(c) = COMPACT_DATE.captures(input) {
            let year = group(&c, 1)?;
            let (month, day) = (number(&c, 2)?, number(&c, 3)?);
            return Some(Candidate::Instants(
                day_start(year, month, day),
                day_end(year, month, day),
            ));
        }
        if let Some(c) = COMPACT_MONTH.captures(input) {
            let year = group(&c, 1)?;
            let month = number(&c, 2)?;
            let end = Self::month_end(year, month, warnings)?;
            return Some(Candidate::Instants(day_start(year, month, 1), end));
        }
        if let Some(c) = DMY.captures(input) {
            let year = group(&c, 3)?;
            let (month, day) = (number(&c, 2)?, number(&c, 1)?);
            return Some(Candidate::Instants(
                day_start(year, month, day),
                day_end(year, month, day),
            ));
        }
        if let Some(c) = MY.captures(input) {
            let year = group(&c, 2)?;
            let month = number(&c, 1)?;
            let end = Self::month_end(year, month, warnings)?;
            return Some(Candidate::Instants(day_start(year, month, 1), end));
        }
        if let Some(c) = EARLY.captures(input).or_else(|| EARLY_EN.captures(input)) {
            let year = year_value(&c, 1)?;
            return Some(Candidate::years(year, span_end(year, 29, 3)));
        }
        if let Some(c) = MID.captures(input).or_else(|| MID_EN.captures(input)) {
            let year = year_value(&c, 1)?;
            let (start, end) = if year % 100 == 0 {
                (year + 29, year + 70)
            } else if year % 10 == 0 {
                (year + 3, year + 7)
            } else {
                (year, year)
            };
            return Some(Candidate::years(start, end));
        }
        if let Some(c) = LATE.captures(input).or_else(|| LATE_EN.captures(input)) {
            let year = year_value(&c, 1)?;
            let (start, end) = if year % 100 == 0 {
                (year + 70, year + 99)
            } else if year % 10 == 0 {
                (year + 7, year + 9)
            } else {
                (year, year)
            };
            return Some(Candidate::years(start, end));
        }
        if let Some(c) = DECADE.captures(input).or_else(|| DECADE_EN.captures(input)) {
            let year = year_value(&c, 1)?;
            return Some(Candidate::years(year, span_end(year, 99, 9)));
        }
        if let Some(c) = BCE_TO_BCE.captures(input) {
            return Some(Candidate::years(-year_value(&c, 1)?, -year_value(&c, 2)?));
        }
        if let Some(c) = BCE_TO_CE.captures(input) {
            return Some(Candidate::years(-year_value(&c, 1)?, group(&c, 2)?));
        }
        if let Some(c) = AFTER.captures(input).or_else(|| AFTER_EN.captures(input)) {
            let year = group(&c, 1)?;
            return Some(Candidate::years(year, year_value(&c, 1)? + 9));
        }
        if let Some(c) = SIGNED_RANGE
            .captures(input)
            .or_else(|| SHORT_RANGE.captures(input))
        {
            return Some(Candidate::years(group(&c, 1)?, group(&c, 2)?));
        }
        if let Some(c) = UNCERTAIN
            .captures(input)
            .or_else(|| UNCERTAIN_EN.captures(input))
            .or_else(|| YEAR.captures(input))
        {
            let year = group(&c, 1)?;
            return Some(Candidate::years(year, year));
        }
        None
    }

    fn named_month(
        &self,
        year: &str,
        month_name: &str,
        warnings: &mut Warnings,
    ) -> Option<Candidate> {
        let month = month_number(month_name)?;
        let end = Self::month_end(year, month, warnings)?;
        Some(Candidate::Instants(day_start(year, month, 1), end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolver() -> DateRangeResolver {
        DateRangeResolver::with_today(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())
    }

    fn free_text(input: &str) -> Option<(String, String)> {
        let mut warnings = Warnings::new();
        resolver()
            .parse_free_text(input, &mut warnings)
            .map(|r| (r.start.to_string(), r.end.to_string()))
    }

    fn range(start: &str, end: &str) -> Option<(String, String)> {
        Some((start.to_string(), end.to_string()))
    }

    #[test]
    fn test_explicit_end_before_start_is_clamped() {
        let mut warnings = Warnings::new();
        let result = resolver()
            .resolve(Some("1950"), Some("1940"), None, None, &mut warnings)
            .unwrap();
        assert_eq!(result.start.to_string(), "1950-01-01T00:00:00Z");
        assert_eq!(result.end.to_string(), "1950-12-31T23:59:59Z");
        assert!(warnings.contains(WARN_INVALID_RANGE));
    }

    #[test]
    fn test_explicit_canonical_range_is_unchanged() {
        let mut warnings = Warnings::new();
        let start = "1930-05-01T10:00:00Z";
        let end = "1931-02-03T04:05:06Z";
        let result = resolver()
            .resolve(Some(start), Some(end), None, None, &mut warnings)
            .unwrap();
        assert_eq!(result.start.to_string(), start);
        assert_eq!(result.end.to_string(), end);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_explicit_partial_precision() {
        let mut warnings = Warnings::new();
        let result = resolver()
            .resolve(Some("1930-02"), Some("1932-02"), None, None, &mut warnings)
            .unwrap();
        assert_eq!(result.start.to_string(), "1930-02-01T00:00:00Z");
        assert_eq!(result.end.to_string(), "1932-02-29T23:59:59Z");

        let result = resolver()
            .resolve(Some("-500"), Some("-0300"), None, None, &mut warnings)
            .unwrap();
        assert_eq!(result.start.to_string(), "-0500-01-01T00:00:00Z");
        assert_eq!(result.end.to_string(), "-0300-12-31T23:59:59Z");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_explicit_invalid_calendar_value() {
        let mut warnings = Warnings::new();
        let result = resolver().resolve(Some("1930-13"), Some("1931"), None, None, &mut warnings);
        assert_eq!(result, None);
        assert!(warnings.contains(WARN_INVALID_DATE));
    }

    #[test]
    fn test_unparseable_start_falls_back_to_display() {
        let mut warnings = Warnings::new();
        let result = resolver()
            .resolve(Some("n/a"), None, Some("1930"), None, &mut warnings)
            .unwrap();
        assert_eq!(result.to_index_string(), "[1930-01-01 TO 1930-12-31]");
        assert!(warnings.contains(WARN_INVALID_DATE));
    }

    #[test]
    fn test_period_used_when_display_missing() {
        let mut warnings = Warnings::new();
        let result = resolver()
            .resolve(None, None, Some("  "), Some("Keskiaika"), &mut warnings)
            .unwrap();
        assert_eq!(result.to_index_string(), "[1300-01-01 TO 1550-12-31]");
    }

    #[test]
    fn test_blank_start_uses_trimmed_display() {
        let mut warnings = Warnings::new();
        let result = resolver()
            .resolve(Some(" "), Some("1940"), Some("  1930-luku "), None, &mut warnings)
            .unwrap();
        assert_eq!(result.to_index_string(), "[1930-01-01 TO 1939-12-31]");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_eras() {
        assert_eq!(
            free_text("Kivikausi"),
            range("-8600-01-01T00:00:00Z", "-1501-12-31T23:59:59Z")
        );
        assert_eq!(
            free_text("Late Bronze Age"),
            range("-1500-01-01T00:00:00Z", "-0501-12-31T23:59:59Z")
        );
        assert_eq!(free_text("ajoittamaton"), None);
        assert_eq!(free_text("Unknown, 1930"), None);
    }

    #[test]
    fn test_english_decades() {
        assert_eq!(
            free_text("1930s"),
            range("1930-01-01T00:00:00Z", "1939-12-31T23:59:59Z")
        );
        assert_eq!(
            free_text("late 1930s"),
            range("1937-01-01T00:00:00Z", "1939-12-31T23:59:59Z")
        );
        assert_eq!(
            free_text("early 1930s"),
            range("1930-01-01T00:00:00Z", "1933-12-31T23:59:59Z")
        );
        assert_eq!(
            free_text("mid-1930s"),
            range("1933-01-01T00:00:00Z", "1937-12-31T23:59:59Z")
        );
    }

    #[test]
    fn test_finnish_decades_and_centuries() {
        assert_eq!(
            free_text("1930-luku"),
            range("1930-01-01T00:00:00Z", "1939-12-31T23:59:59Z")
        );
        assert_eq!(
            free_text("1800-luvun loppupuoli"),
            range("1870-01-01T00:00:00Z", "1899-12-31T23:59:59Z")
        );
        assert_eq!(
            free_text("1900-luvun alku"),
            range("1900-01-01T00:00:00Z", "1929-12-31T23:59:59Z")
        );
        assert_eq!(
            free_text("1950-luvun puoliväli"),
            range("1953-01-01T00:00:00Z", "1957-12-31T23:59:59Z")
        );
    }

    #[test]
    fn test_year_ranges() {
        assert_eq!(
            free_text("1920-1930"),
            range("1920-01-01T00:00:00Z", "1930-12-31T23:59:59Z")
        );
        assert_eq!(
            free_text("1920-1930s"),
            range("1920-01-01T00:00:00Z", "1939-12-31T23:59:59Z")
        );
        assert_eq!(
            free_text("30-40-luku"),
            range("1930-01-01T00:00:00Z", "1949-12-31T23:59:59Z")
        );
        assert_eq!(
            free_text("1945-48"),
            range("1945-01-01T00:00:00Z", "1948-12-31T23:59:59Z")
        );
    }

    #[test]
    fn test_full_dates() {
        assert_eq!(
            free_text("1.2.1930 - 3.4.1931"),
            range("1930-02-01T00:00:00Z", "1931-04-03T23:59:59Z")
        );
        assert_eq!(
            free_text("1930-5-7"),
            range("1930-05-07T00:00:00Z", "1930-05-07T23:59:59Z")
        );
        assert_eq!(
            free_text("19300507"),
            range("1930-05-07T00:00:00Z", "1930-05-07T23:59:59Z")
        );
        assert_eq!(
            free_text("193002"),
            range("1930-02-01T00:00:00Z", "1930-02-28T23:59:59Z")
        );
    }

    #[test]
    fn test_month_names() {
        assert_eq!(
            free_text("1930 helmikuu"),
            range("1930-02-01T00:00:00Z", "1930-02-28T23:59:59Z")
        );
        assert_eq!(
            free_text("May 1930"),
            range("1930-05-01T00:00:00Z", "1930-05-31T23:59:59Z")
        );
    }

    #[test]
    fn test_bce_ranges() {
        assert_eq!(
            free_text("500 eKr - 300 eKr"),
            range("-0500-01-01T00:00:00Z", "-0300-12-31T23:59:59Z")
        );
        assert_eq!(
            free_text("100 BC - 150 AD"),
            range("-0100-01-01T00:00:00Z", "0150-12-31T23:59:59Z")
        );
        assert_eq!(
            free_text("-500 - -300"),
            range("-0500-01-01T00:00:00Z", "-0300-12-31T23:59:59Z")
        );
    }

    #[test]
    fn test_after_and_uncertain_years() {
        assert_eq!(
            free_text("1930 jälkeen"),
            range("1930-01-01T00:00:00Z", "1939-12-31T23:59:59Z")
        );
        assert_eq!(
            free_text("after 1930"),
            range("1930-01-01T00:00:00Z", "1939-12-31T23:59:59Z")
        );
        assert_eq!(
            free_text("1930?"),
            range("1930-01-01T00:00:00Z", "1930-12-31T23:59:59Z")
        );
        assert_eq!(
            free_text("ca. 1890"),
            range("1890-01-01T00:00:00Z", "1890-12-31T23:59:59Z")
        );
    }

    #[test]
    fn test_text_after_comma_is_ignored() {
        assert_eq!(
            free_text("1930, korjattu 1950"),
            range("1930-01-01T00:00:00Z", "1930-12-31T23:59:59Z")
        );
    }

    #[test]
    fn test_future_dates_are_rejected() {
        assert_eq!(free_text("2030"), None);
        assert_eq!(free_text("2020-2027"), None);
        assert_eq!(
            free_text("2026"),
            None,
            "end of the current year is after today"
        );
        assert_eq!(
            free_text("2025"),
            range("2025-01-01T00:00:00Z", "2025-12-31T23:59:59Z")
        );
    }

    #[test]
    fn test_unparseable_text_warns() {
        let mut warnings = Warnings::new();
        assert_eq!(resolver().parse_free_text("no idea", &mut warnings), None);
        assert!(warnings.contains(WARN_UNPARSEABLE));
    }

    #[test]
    fn test_invalid_month_name_end() {
        let mut warnings = Warnings::new();
        assert_eq!(resolver().parse_free_text("193013", &mut warnings), None);
        assert!(warnings.contains(WARN_INVALID_END_DATE));
        assert!(!warnings.contains(WARN_UNPARSEABLE));
    }

    #[test]
    fn test_invalid_calendar_value_is_repaired_from_valid_end() {
        let mut warnings = Warnings::new();
        let result = resolver()
            .parse_free_text("31.2.1930 - 1931", &mut warnings)
            .unwrap();
        assert_eq!(result.start.to_string(), "1931-01-01T00:00:00Z");
        assert_eq!(result.end.to_string(), "1931-12-31T23:59:59Z");
        assert!(warnings.contains(WARN_INVALID_RANGE));
    }

    // Families that overlap: the earlier family in the cascade must win.

    #[test]
    fn test_cascade_late_decade_before_plain_decade() {
        // "1930s" alone would be the whole decade
        assert_eq!(
            free_text("late 1930s").unwrap().0,
            "1937-01-01T00:00:00Z"
        );
    }

    #[test]
    fn test_cascade_range_end_before_range_suffix() {
        // the decade-suffix range family would end at 1909
        assert_eq!(
            free_text("1800-1900-luvun loppu"),
            range("1800-01-01T00:00:00Z", "1999-12-31T23:59:59Z")
        );
    }

    #[test]
    fn test_cascade_day_month_year_before_month_year() {
        assert_eq!(
            free_text("12.5.1930"),
            range("1930-05-12T00:00:00Z", "1930-05-12T23:59:59Z")
        );
    }

    #[test]
    fn test_cascade_year_month_is_read_as_short_range() {
        // "1930-05" is a year range with a two-digit end, which lands before
        // the start and is clamped to the start's year.
        let mut warnings = Warnings::new();
        let result = resolver().parse_free_text("1930-05", &mut warnings).unwrap();
        assert_eq!(result.to_index_string(), "[1930-01-01 TO 1930-12-31]");
        assert!(warnings.contains(WARN_INVALID_RANGE));
    }

    #[test]
    fn test_padding() {
        assert_eq!(pad_start_year("30").as_deref(), Some("1930"));
        assert_eq!(pad_start_year("5").as_deref(), Some("0005"));
        assert_eq!(pad_start_year("850").as_deref(), Some("0850"));
        assert_eq!(pad_start_year("-50").as_deref(), Some("-0050"));
        assert_eq!(pad_start_year("0").as_deref(), Some("0000"));
        assert_eq!(pad_end_year("48", "1945").as_deref(), Some("1948"));
    }
}
