use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::diagnostics::{DatasetSummary, RunDiagnostics};
use crate::models::RunKey;
use crate::normalizer::NormalizedDataset;
use crate::session::PageSession;
use crate::sink::{CsvSink, OutputScope, RunMeta};
use crate::slate_discovery::{SlateDiscoverer, SlateDiscovery};
use crate::slate_iterator::{SlateHarvest, SlateIterator};
use crate::utils::error::Result;

/// Everything a harvest produced, before persistence.
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub run_id: Uuid,
    pub run_key: RunKey,
    pub dataset: NormalizedDataset,
    pub diagnostics: RunDiagnostics,
    pub slates: Vec<SlateHarvest>,
    /// The page had no slate control and was harvested as one view.
    pub implicit: bool,
    /// Label of the slate the run was restricted to.
    pub restricted_to: Option<String>,
}

impl HarvestReport {
    pub fn contributing_slates(&self) -> usize {
        self.dataset
            .records()
            .iter()
            .map(|r| r.slate_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn scope(&self) -> OutputScope {
        match &self.restricted_to {
            Some(label) => OutputScope::Restricted(label.clone()),
            None if self.contributing_slates() > 1 => OutputScope::AllSlates,
            None => OutputScope::Single,
        }
    }

    pub fn run_meta(&self) -> RunMeta {
        RunMeta {
            run_key: self.run_key,
            scope: self.scope(),
            discovered_slates: !self.implicit,
        }
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary::from_records(self.dataset.records())
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: HarvestReport,
    /// `None` when the run harvested nothing and no file was written.
    pub written: Option<PathBuf>,
}

/// Runs the full pipeline against one page session: navigate, discover
/// slates, drain each slate, and hand the dataset to a sink.
pub struct Harvester {
    config: AppConfig,
    discoverer: SlateDiscoverer,
    iterator: SlateIterator,
}

impl Harvester {
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            discoverer: SlateDiscoverer::from_config(&config.slates),
            iterator: SlateIterator::from_config(&config)?,
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Harvest the configured target. The session is borrowed exclusively so
    /// nothing else can drive the page while slates are being switched.
    pub async fn harvest<S: PageSession + ?Sized>(
        &self,
        session: &mut S,
        run_key: RunKey,
    ) -> Result<HarvestReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("harvest", run_id = %run_id, run = %run_key);
        let session: &S = session;

        async move {
            tracing::info!(url = %self.config.target.url, "Starting harvest");
            session.navigate(&self.config.target.url).await?;

            tokio::time::sleep(Duration::from_millis(self.config.waits.initial_settle_ms)).await;
            if let Err(e) = self.iterator.loader().wait_for_table(session).await {
                if e.is_fatal() {
                    return Err(e);
                }
                tracing::warn!(error = %e, "Results table not rendered after initial load");
            }

            let mut discovery = self.discover(session).await?;
            let restricted_to = match &self.config.slates.only {
                Some(query) => discovery.restrict(query),
                None => None,
            };

            let slates = discovery.slates_to_harvest();
            let mut dataset = NormalizedDataset::new(self.config.slates.dedup);
            let mut diagnostics = RunDiagnostics::new();

            let results = match self
                .iterator
                .run(
                    session,
                    discovery.control.as_ref(),
                    &slates,
                    &mut dataset,
                    &mut diagnostics,
                )
                .await
            {
                Ok(results) => results,
                Err(e) => {
                    diagnostics.log_summary();
                    tracing::error!(error = %e, "Harvest aborted");
                    return Err(e);
                }
            };

            diagnostics.duplicates_dropped = dataset.duplicates_dropped();
            diagnostics.inactive_records = dataset.inactive_count();

            Ok(HarvestReport {
                run_id,
                run_key,
                dataset,
                diagnostics,
                slates: results,
                implicit: discovery.is_implicit(),
                restricted_to,
            })
        }
        .instrument(span)
        .await
    }

    async fn discover<S: PageSession + ?Sized>(&self, session: &S) -> Result<SlateDiscovery> {
        if !self.config.slates.discover {
            tracing::debug!("Slate discovery disabled");
            return Ok(SlateDiscovery::implicit());
        }

        match self.discoverer.discover(session).await {
            Ok(discovery) => Ok(discovery),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "Slate discovery failed; harvesting current view");
                Ok(SlateDiscovery::implicit())
            }
        }
    }

    /// Harvest and persist. Zero-record runs succeed without writing a file;
    /// persistence failures are returned after diagnostics are logged.
    pub async fn run<S: PageSession + ?Sized>(
        &self,
        session: &mut S,
        run_key: RunKey,
        sink: &CsvSink,
    ) -> Result<RunOutcome> {
        let report = self.harvest(session, run_key).await?;

        report.diagnostics.log_summary();
        report.summary().log();

        if report.dataset.is_empty() {
            tracing::warn!(run = %report.run_key, "no records harvested");
            return Ok(RunOutcome {
                report,
                written: None,
            });
        }

        let written = sink.write(&report.dataset, &report.run_meta()).inspect_err(|e| {
            tracing::error!(error = %e, "Failed to persist dataset");
        })?;

        Ok(RunOutcome {
            report,
            written: Some(written),
        })
    }
}
