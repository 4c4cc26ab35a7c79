//! Configuration constants, the sources file, and validation functions.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::error::{HarvesterError, Result};
use crate::normalize::DriverParams;

/// Default number of attempts for a single request.
pub const DEFAULT_MAX_TRIES: u32 = 5;

/// Default wait between request attempts in seconds.
pub const DEFAULT_RETRY_WAIT_SECS: u64 = 30;

/// HTTP timeout in seconds.
///
/// OAI-PMH pages of rich object records can be several megabytes and some
/// repositories build them on the fly.
pub const HTTP_TIMEOUT_SECS: u64 = 120;

/// Maximum number of names tried when allocating a temp file.
pub const MAX_TEMP_ATTEMPTS: u32 = 100;

/// Prefix of the durable state key holding a source's last harvest date.
pub const STATE_KEY_PREFIX: &str = "Last Harvest Date";

/// Date pattern: YYYY-MM-DD, optionally followed by Thh:mm:ssZ.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}(T\d{2}:\d{2}:\d{2}Z)?$").expect("valid regex")
});

/// Durable state key for a source.
///
/// # Examples
/// ```
/// use heritage_harvester::config::state_key;
///
/// assert_eq!(state_key("museum"), "Last Harvest Date museum");
/// ```
pub fn state_key(source_id: &str) -> String {
    format!("{STATE_KEY_PREFIX} {source_id}")
}

/// Validate an OAI-PMH datestamp (day or seconds granularity).
///
/// # Examples
/// ```
/// use heritage_harvester::config::validate_date;
///
/// assert!(validate_date("2025-01-01").is_ok());
/// assert!(validate_date("2025-01-01T10:00:00Z").is_ok());
/// assert!(validate_date("2025-13-01").is_err());
/// ```
pub fn validate_date(date_str: &str) -> Result<()> {
    if !DATE_PATTERN.is_match(date_str) {
        return Err(HarvesterError::InvalidDate(date_str.to_string()));
    }

    let day = &date_str[..10];
    chrono::NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|_| HarvesterError::InvalidDate(date_str.to_string()))?;

    if date_str.len() > 10 {
        chrono::NaiveDateTime::parse_from_str(date_str, "%Y-%m-%dT%H:%M:%SZ")
            .map_err(|_| HarvesterError::InvalidDate(date_str.to_string()))?;
    }

    Ok(())
}

/// Datestamp granularity supported by a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// YYYY-MM-DD
    #[default]
    Day,
    /// YYYY-MM-DDThh:mm:ssZ
    Seconds,
}

impl Granularity {
    /// Render a timestamp in this granularity.
    #[must_use]
    pub fn format(self, instant: chrono::DateTime<chrono::Utc>) -> String {
        match self {
            Self::Day => instant.format("%Y-%m-%d").to_string(),
            Self::Seconds => instant.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        }
    }

    /// Fit a stored datestamp to this granularity. Day granularity keeps
    /// only the date part.
    #[must_use]
    pub fn fit(self, datestamp: &str) -> String {
        match self {
            Self::Day => datestamp.get(..10).unwrap_or(datestamp).to_string(),
            Self::Seconds => datestamp.to_string(),
        }
    }
}

fn default_max_tries() -> u32 {
    DEFAULT_MAX_TRIES
}

fn default_retry_wait_secs() -> u64 {
    DEFAULT_RETRY_WAIT_SECS
}

fn default_http_timeout_secs() -> u64 {
    HTTP_TIMEOUT_SECS
}

/// Settings shared by all sources.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HarvestSettings {
    /// Attempts per request before the run is aborted.
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,

    /// Fixed wait between attempts.
    #[serde(default = "default_retry_wait_secs")]
    pub retry_wait_secs: u64,

    /// Per-request timeout.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Directory for temp files (OS default when unset).
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            max_tries: DEFAULT_MAX_TRIES,
            retry_wait_secs: DEFAULT_RETRY_WAIT_SECS,
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            temp_dir: None,
        }
    }
}

impl HarvestSettings {
    pub fn retry_wait(&self) -> Duration {
        Duration::from_secs(self.retry_wait_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn with_max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = max_tries.max(1);
        self
    }

    pub fn with_retry_wait_secs(mut self, secs: u64) -> Self {
        self.retry_wait_secs = secs;
        self
    }
}

/// One harvestable repository.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Source identifier, also used in state keys and document ids.
    pub id: String,

    /// OAI-PMH base URL.
    #[serde(default)]
    pub url: String,

    /// Metadata format requested from the repository.
    #[serde(default)]
    pub metadata_prefix: String,

    /// Optional OAI-PMH set.
    #[serde(default)]
    pub set: Option<String>,

    #[serde(default)]
    pub granularity: Granularity,

    /// Normalization overrides for this source.
    #[serde(default)]
    pub driver_params: DriverParams,
}

impl SourceConfig {
    /// Create a source with the given id, URL and metadata prefix.
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        metadata_prefix: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            metadata_prefix: metadata_prefix.into(),
            set: None,
            granularity: Granularity::Day,
            driver_params: DriverParams::default(),
        }
    }

    /// Check that everything needed before the first request is present.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(HarvesterError::MissingSourceConfig {
                source_id: self.id.clone(),
                field: "url",
            });
        }
        url::Url::parse(&self.url).map_err(|e| HarvesterError::InvalidSourceConfig {
            source_id: self.id.clone(),
            message: format!("url '{}': {e}", self.url),
        })?;
        if self.metadata_prefix.trim().is_empty() {
            return Err(HarvesterError::MissingSourceConfig {
                source_id: self.id.clone(),
                field: "metadata_prefix",
            });
        }
        Ok(())
    }
}

/// Contents of a sources file.
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    #[serde(default)]
    pub harvesting: HarvestSettings,

    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl HarvestConfig {
    /// Parse and validate a YAML sources document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        for source in &config.sources {
            if source.id.trim().is_empty() {
                return Err(HarvesterError::MissingSourceConfig {
                    source_id: String::new(),
                    field: "id",
                });
            }
            source.validate()?;
        }
        Ok(config)
    }

    /// Read and validate a YAML sources file.
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Look up a source by id.
    pub fn source(&self, id: &str) -> Result<&SourceConfig> {
        self.sources
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| HarvesterError::UnknownSource(id.to_string()))
    }
}
