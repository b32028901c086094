use chrono::Utc;
use std::time::Duration;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::diagnostics::RunDiagnostics;
use crate::field_mapper::{FieldMapper, RowMapping};
use crate::lazy_load::{LazyLoader, LoadOutcome};
use crate::models::Slate;
use crate::normalizer::{NormalizedDataset, Normalizer};
use crate::row_extractor::RowExtractor;
use crate::session::{PageSession, SlateControl};
use crate::utils::error::Result;
use crate::utils::retry::{retry_transient, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlateStatus {
    Harvested,
    /// Table never appeared or had no data rows.
    Empty,
    /// Selection or loading failed; the slate contributed nothing.
    Failed(String),
}

/// Per-slate result, in processing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlateHarvest {
    pub slate: Slate,
    pub status: SlateStatus,
    pub load: Option<LoadOutcome>,
    pub rows_seen: usize,
    pub rows_accepted: usize,
    pub records_kept: usize,
}

impl SlateHarvest {
    fn new(slate: &Slate, status: SlateStatus) -> Self {
        Self {
            slate: slate.clone(),
            status,
            load: None,
            rows_seen: 0,
            rows_accepted: 0,
            records_kept: 0,
        }
    }
}

/// Drives the page through each slate in turn. A slate is drained completely
/// into the dataset before the next one is selected.
#[derive(Debug, Clone)]
pub struct SlateIterator {
    loader: LazyLoader,
    extractor: RowExtractor,
    mapper: FieldMapper,
    normalizer: Normalizer,
    retry: RetryPolicy,
    selection_settle: Duration,
}

impl SlateIterator {
    pub fn new(
        loader: LazyLoader,
        extractor: RowExtractor,
        mapper: FieldMapper,
        retry: RetryPolicy,
        selection_settle: Duration,
    ) -> Self {
        Self {
            loader,
            extractor,
            mapper,
            normalizer: Normalizer::new(),
            retry,
            selection_settle,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let extractor = RowExtractor::new(
            &config.waits.table_selector,
            &config.waits.row_selector,
            &config.waits.cell_selector,
        )?;
        Ok(Self::new(
            LazyLoader::from_config(config),
            extractor,
            FieldMapper::new(config.columns.clone()),
            config.waits.retry.clone(),
            Duration::from_millis(config.waits.selection_settle_ms),
        ))
    }

    pub fn loader(&self) -> &LazyLoader {
        &self.loader
    }

    /// Harvest `slates` in order. Slate-level failures are logged, counted,
    /// and skipped; only fatal errors end the iteration.
    pub async fn run<S: PageSession + ?Sized>(
        &self,
        session: &S,
        control: Option<&SlateControl>,
        slates: &[Slate],
        dataset: &mut NormalizedDataset,
        diagnostics: &mut RunDiagnostics,
    ) -> Result<Vec<SlateHarvest>> {
        let mut results = Vec::with_capacity(slates.len());

        for slate in slates {
            diagnostics.record_slate_attempted();
            let span = tracing::info_span!("slate", slate = %slate.display_label);

            let outcome = self
                .harvest_slate(session, control, slate, dataset, diagnostics)
                .instrument(span)
                .await;

            match outcome {
                Ok(harvest) => {
                    if harvest.status == SlateStatus::Empty {
                        diagnostics.record_slate_empty();
                    }
                    results.push(harvest);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(slate = %slate, error = %e, "Skipping slate");
                    diagnostics.record_slate_failed(slate);
                    results.push(SlateHarvest::new(slate, SlateStatus::Failed(e.to_string())));
                }
            }
        }

        Ok(results)
    }

    async fn select<S: PageSession + ?Sized>(
        &self,
        session: &S,
        control: &SlateControl,
        slate: &Slate,
    ) -> Result<()> {
        let label = slate.display_label.as_str();
        retry_transient(&self.retry, "slate selection", move || async move {
            session.select_option(control, label).await
        })
        .await?;

        tokio::time::sleep(self.selection_settle).await;
        Ok(())
    }

    async fn harvest_slate<S: PageSession + ?Sized>(
        &self,
        session: &S,
        control: Option<&SlateControl>,
        slate: &Slate,
        dataset: &mut NormalizedDataset,
        diagnostics: &mut RunDiagnostics,
    ) -> Result<SlateHarvest> {
        // Only discovered slates come with a control; the implicit view is never selected
        if let Some(control) = control {
            self.select(session, control, slate).await?;
            tracing::debug!("Slate selected");
        }

        let load = self.loader.load_all(session).await?;
        if !load.table_found {
            let mut harvest = SlateHarvest::new(slate, SlateStatus::Empty);
            harvest.load = Some(load);
            return Ok(harvest);
        }

        let html = session.content().await?;
        let captured_at = Utc::now();
        let snapshot = self.extractor.extract(&html, &slate.id);

        if let Some(header) = &snapshot.header {
            self.mapper.columns().check_header(header)?;
        }

        let mut harvest = SlateHarvest::new(slate, SlateStatus::Harvested);
        harvest.load = Some(load);

        for row in &snapshot.rows {
            diagnostics.record_row_seen();
            harvest.rows_seen += 1;

            match self.mapper.map(row, captured_at) {
                RowMapping::Accepted(record) => {
                    diagnostics.record_accepted();
                    harvest.rows_accepted += 1;
                    if dataset.accept(self.normalizer.normalize(record)) {
                        harvest.records_kept += 1;
                    }
                }
                RowMapping::Rejected(reason) => {
                    tracing::debug!(row = row.row_index, reason = %reason, "Row rejected");
                    diagnostics.record_rejected(&reason);
                }
            }
        }

        if harvest.rows_seen == 0 {
            harvest.status = SlateStatus::Empty;
        }

        tracing::info!(
            rows = harvest.rows_seen,
            accepted = harvest.rows_accepted,
            kept = harvest.records_kept,
            "Slate harvested"
        );
        Ok(harvest)
    }
}
