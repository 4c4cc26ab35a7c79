//! Incremental OAI-PMH harvesting of one source.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::Utc;

use crate::config::{state_key, HarvestSettings, SourceConfig};
use crate::error::{HarvesterError, Result};
use crate::harvest::sink::RecordSink;
use crate::harvest::state::StateStore;
use crate::harvest::temp::allocate_temp_path;
use crate::harvest::transform::{prepare_page, PreTransform};
use crate::http::{Transport, TransportError};
use crate::oai::{list_records_query, parse_list_records};
use crate::types::{HarvestSummary, HarvestWindow, RawRecord, RecordStatus, SinkOutcome};

/// Shared flag that stops a harvest between pages.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

type DeletionCheck = Box<dyn Fn(&RawRecord) -> bool + Send>;

/// Harvests one source through ListRecords paging.
///
/// The stored last-harvest date only advances when a run completes; a run
/// that fails or is cancelled leaves it untouched.
pub struct HarvestController {
    source: SourceConfig,
    settings: HarvestSettings,
    transport: Box<dyn Transport + Send>,
    state: Arc<dyn StateStore + Send + Sync>,
    pre_transform: Option<Box<dyn PreTransform + Send>>,
    deletion_check: Option<DeletionCheck>,
    cancel: CancelFlag,
}

impl HarvestController {
    /// Create a controller. Fails before any network activity if the source
    /// configuration is incomplete.
    pub fn new(
        source: SourceConfig,
        settings: HarvestSettings,
        transport: impl Transport + Send + 'static,
        state: Arc<dyn StateStore + Send + Sync>,
    ) -> Result<Self> {
        source.validate()?;
        Ok(Self {
            source,
            settings,
            transport: Box::new(transport),
            state,
            pre_transform: None,
            deletion_check: None,
            cancel: CancelFlag::new(),
        })
    }

    /// Rewrite every page body before records are extracted.
    #[must_use]
    pub fn with_pre_transform(mut self, transform: impl PreTransform + Send + 'static) -> Self {
        self.pre_transform = Some(Box::new(transform));
        self
    }

    /// Mark records deleted when `check` returns true, in addition to the
    /// header status.
    #[must_use]
    pub fn with_deletion_check(
        mut self,
        check: impl Fn(&RawRecord) -> bool + Send + 'static,
    ) -> Self {
        self.deletion_check = Some(Box::new(check));
        self
    }

    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn source(&self) -> &SourceConfig {
        &self.source
    }

    /// Harvest everything changed within `window` into `sink`.
    ///
    /// `from` defaults to the stored last-harvest date (absent means from the
    /// beginning) and `until` to now, in the source's granularity.
    pub fn harvest(
        &self,
        window: &HarvestWindow,
        sink: &mut dyn RecordSink,
    ) -> Result<HarvestSummary> {
        let source_id = self.source.id.as_str();
        let key = state_key(source_id);
        let granularity = self.source.granularity;

        let from = match &window.from {
            Some(from) => Some(from.clone()),
            None => self.state.get_state(&key)?,
        }
        .map(|from| granularity.fit(&from));
        let until = window
            .until
            .clone()
            .unwrap_or_else(|| granularity.format(Utc::now()));

        tracing::info!(
            source = source_id,
            from = from.as_deref().unwrap_or("beginning"),
            until = %until,
            "Harvest started"
        );

        let mut summary = HarvestSummary::default();
        let mut resumption_token: Option<String> = None;
        let mut pages = 0u64;

        loop {
            if self.cancel.is_cancelled() {
                tracing::warn!(source = source_id, pages, "Harvest cancelled");
                return Err(HarvesterError::Cancelled(source_id.to_string()));
            }

            let query = list_records_query(
                &self.source,
                from.as_deref(),
                &until,
                resumption_token.as_deref(),
            );
            let body = self.fetch_with_retry(&query)?;
            let pre_transform = self
                .pre_transform
                .as_deref()
                .map(|t| t as &dyn PreTransform);
            let text = match prepare_page(&body, source_id, pre_transform) {
                Ok(text) => text,
                Err(e) => {
                    self.keep_failed_page(&body, &e);
                    return Err(e);
                }
            };
            let page = parse_list_records(&text)?;
            pages += 1;

            if page.unidentified > 0 {
                tracing::warn!(
                    source = source_id,
                    count = page.unidentified,
                    "Rejected records without identifier"
                );
                summary.rejected += page.unidentified;
            }

            for mut record in page.records {
                if self.deletion_check.as_ref().is_some_and(|check| check(&record)) {
                    record.status = RecordStatus::Deleted;
                }
                self.track_datestamp(&mut summary, record.datestamp.as_deref());

                match sink.put(&record)? {
                    SinkOutcome::Changed if record.is_deleted() => summary.deleted += 1,
                    SinkOutcome::Changed => summary.changed += 1,
                    SinkOutcome::Unchanged => summary.unchanged += 1,
                    SinkOutcome::Rejected => {
                        tracing::warn!(
                            source = source_id,
                            record = %record.identifier,
                            "Record rejected"
                        );
                        summary.rejected += 1;
                    }
                }
            }

            tracing::debug!(
                source = source_id,
                page = pages,
                response_date = page.response_date.as_deref().unwrap_or("unknown"),
                changed = summary.changed,
                deleted = summary.deleted,
                "Page processed"
            );

            match page.resumption_token {
                Some(token) => resumption_token = Some(token),
                None => break,
            }
        }

        if let Some(last) = &summary.last_harvested {
            self.state.save_state(&key, last)?;
        }
        tracing::info!(source = source_id, "{}", summary.report());
        Ok(summary)
    }

    fn track_datestamp(&self, summary: &mut HarvestSummary, datestamp: Option<&str>) {
        let Some(datestamp) = datestamp else {
            return;
        };
        if summary
            .last_harvested
            .as_deref()
            .map_or(true, |last| datestamp > last)
        {
            summary.last_harvested = Some(datestamp.to_string());
        }
    }

    /// Save a page that could not be parsed to the temp directory for
    /// inspection. Failing to save it only logs.
    fn keep_failed_page(&self, body: &[u8], error: &HarvesterError) {
        let saved = allocate_temp_path(
            self.settings.temp_dir.as_deref(),
            &format!("oai-{}-", self.source.id),
            ".xml",
        )
        .and_then(|path| {
            std::fs::write(&path, body)?;
            Ok(path)
        });
        match saved {
            Ok(path) => tracing::error!(
                source = %self.source.id,
                error = %error,
                path = %path.display(),
                "Unparseable page saved"
            ),
            Err(e) => tracing::error!(
                source = %self.source.id,
                error = %error,
                save_error = %e,
                "Unparseable page could not be saved"
            ),
        }
    }

    /// Fetch a page, retrying transport failures up to `max_tries` attempts
    /// in total with a fixed wait in between.
    fn fetch_with_retry(&self, query: &[(&str, String)]) -> Result<Vec<u8>> {
        let max_tries = self.settings.max_tries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport.fetch(&self.source.url, query) {
                Ok(body) => return Ok(body),
                Err(e @ TransportError::InvalidUrl(_)) => return Err(e.into()),
                Err(e) if attempt < max_tries => {
                    tracing::warn!(
                        source = %self.source.id,
                        attempt,
                        max_tries,
                        error = %e,
                        "Request failed, retrying in {}s",
                        self.settings.retry_wait_secs
                    );
                    thread::sleep(self.settings.retry_wait());
                }
                Err(e) => {
                    tracing::error!(
                        source = %self.source.id,
                        attempt,
                        error = %e,
                        "Request failed, giving up"
                    );
                    return Err(HarvesterError::RetriesExhausted {
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}
