use std::path::PathBuf;
use std::time::Duration;

use heritage_harvester::config::HarvestSettings;

use crate::error::{PipelineError, Result};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_INTERVAL_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| PipelineError::Config("DATABASE_URL not set".into()))?;

        let max_connections = parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")?
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        Ok(Self {
            database_url,
            max_connections,
        })
    }

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub sources_file: PathBuf,
    /// Pause between harvest rounds; `None` runs a single round.
    pub interval: Option<Duration>,
    pub max_tries: Option<u32>,
    pub retry_wait_secs: Option<u64>,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let pipeline = PipelineConfig::from_lookup(&lookup)?;

        let sources_file = lookup("SOURCES_FILE")
            .ok_or_else(|| PipelineError::Config("SOURCES_FILE not set".into()))?
            .into();

        // 0 disables the schedule
        let interval_secs =
            parse_var(&lookup, "HARVEST_INTERVAL_SECS")?.unwrap_or(DEFAULT_INTERVAL_SECS);

        Ok(Self {
            database_url: pipeline.database_url,
            max_connections: pipeline.max_connections,
            sources_file,
            interval: (interval_secs > 0).then(|| Duration::from_secs(interval_secs)),
            max_tries: parse_var(&lookup, "HARVEST_MAX_TRIES")?,
            retry_wait_secs: parse_var(&lookup, "HARVEST_RETRY_WAIT_SECS")?,
        })
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            database_url: self.database_url.clone(),
            max_connections: self.max_connections,
        }
    }

    /// Apply the environment's retry overrides to the sources file settings.
    pub fn harvest_settings(&self, mut settings: HarvestSettings) -> HarvestSettings {
        if let Some(max_tries) = self.max_tries {
            settings = settings.with_max_tries(max_tries);
        }
        if let Some(secs) = self.retry_wait_secs {
            settings = settings.with_retry_wait_secs(secs);
        }
        settings
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| PipelineError::Config(format!("{key} is not a valid number: '{value}'"))),
    }
}
