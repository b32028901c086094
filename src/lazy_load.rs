//! Forces a lazily rendered table to attach all of its rows.
//!
//! The driver jumps to the bottom of the page and re-measures the row count
//! after a settle interval. Growth resets the plateau counter. After
//! `plateau_attempts` consecutive measurements without growth it performs a
//! pass of smaller incremental scrolls, since some pages only load when the
//! table itself moves through the viewport rather than on a jump to the end.
//! If that pass adds nothing either, the configured "load more" buttons and
//! next-page controls are clicked in order. Only when no stimulus adds rows is
//! the table considered complete.
//!
//! The loop is capped by `max_scrolls` so a table that never stops growing
//! still terminates.

use std::time::Duration;

use crate::config::{AppConfig, LazyLoadConfig};
use crate::session::PageSession;
use crate::utils::error::{AppError, Result};
use crate::utils::retry::{retry_transient, RetryPolicy};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Rows rendered in the table when loading finished, header included.
    pub row_count: usize,
    pub table_found: bool,
    /// Measurements that observed growth, including growth found by the
    /// incremental pass.
    pub growth_iterations: u32,
    pub bottom_scrolls: u32,
    pub incremental_scrolls: u32,
    /// Clicks on load-more or next-page controls.
    pub clicks: u32,
    /// `false` when loading stopped at `max_scrolls` instead.
    pub plateaued: bool,
}

#[derive(Debug, Clone)]
pub struct LazyLoader {
    config: LazyLoadConfig,
    table_selector: String,
    row_selector: String,
    retry: RetryPolicy,
}

impl LazyLoader {
    pub fn new(
        config: LazyLoadConfig,
        table_selector: impl Into<String>,
        row_selector: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            config,
            table_selector: table_selector.into(),
            row_selector: row_selector.into(),
            retry,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.lazy_load.clone(),
            &config.waits.table_selector,
            &config.waits.row_selector,
            config.waits.retry.clone(),
        )
    }

    /// Wait for the table to attach, retrying while it is absent.
    pub async fn wait_for_table<S: PageSession + ?Sized>(&self, session: &S) -> Result<usize> {
        let table = self.table_selector.as_str();
        let row = self.row_selector.as_str();
        retry_transient(&self.retry, "results table", move || async move {
            session
                .row_count(table, row)
                .await?
                .ok_or_else(|| AppError::transient(format!("table '{}' not attached", table)))
        })
        .await
    }

    async fn measure<S: PageSession + ?Sized>(&self, session: &S) -> Result<usize> {
        // A table detached mid-scroll measures as empty, which never counts as growth
        Ok(session
            .row_count(&self.table_selector, &self.row_selector)
            .await?
            .unwrap_or(0))
    }

    /// Click each configured control in turn until one makes the table grow.
    async fn click_for_more<S: PageSession + ?Sized>(
        &self,
        session: &S,
        outcome: &mut LoadOutcome,
    ) -> Result<bool> {
        let settle = Duration::from_millis(self.config.click_settle_ms);
        let selectors = self
            .config
            .load_more_selectors
            .iter()
            .chain(self.config.next_page_selectors.iter());

        for selector in selectors {
            if !session.click(selector).await? {
                continue;
            }
            outcome.clicks += 1;
            tokio::time::sleep(settle).await;

            let current = self.measure(session).await?;
            if current > outcome.row_count {
                tracing::debug!(from = outcome.row_count, to = current, selector = %selector, "Table grew on click");
                outcome.row_count = current;
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn load_all<S: PageSession + ?Sized>(&self, session: &S) -> Result<LoadOutcome> {
        let initial = match self.wait_for_table(session).await {
            Ok(count) => count,
            Err(e) if e.is_transient() => {
                tracing::warn!(error = %e, "Results table never appeared; treating slate as empty");
                return Ok(LoadOutcome::default());
            }
            Err(e) => return Err(e),
        };

        let settle = Duration::from_millis(self.config.settle_ms);
        let nudge_settle = Duration::from_millis(self.config.incremental_settle_ms);

        let mut outcome = LoadOutcome {
            row_count: initial,
            table_found: true,
            ..LoadOutcome::default()
        };
        let mut stale = 0u32;

        while outcome.bottom_scrolls < self.config.max_scrolls {
            session.scroll_to_bottom().await?;
            outcome.bottom_scrolls += 1;
            tokio::time::sleep(settle).await;

            let current = self.measure(session).await?;
            if current > outcome.row_count {
                tracing::debug!(from = outcome.row_count, to = current, "Table grew");
                outcome.row_count = current;
                outcome.growth_iterations += 1;
                stale = 0;
                continue;
            }

            stale += 1;
            if stale < self.config.plateau_attempts {
                continue;
            }

            let mut grew = false;
            for _ in 0..self.config.incremental_scrolls {
                session.scroll_by(self.config.incremental_step_px).await?;
                outcome.incremental_scrolls += 1;
                tokio::time::sleep(nudge_settle).await;

                let current = self.measure(session).await?;
                if current > outcome.row_count {
                    tracing::debug!(from = outcome.row_count, to = current, "Table grew on incremental scroll");
                    outcome.row_count = current;
                    grew = true;
                    break;
                }
            }

            if !grew {
                grew = self.click_for_more(session, &mut outcome).await?;
            }

            if grew {
                outcome.growth_iterations += 1;
                stale = 0;
            } else {
                outcome.plateaued = true;
                break;
            }
        }

        if !outcome.plateaued {
            tracing::warn!(
                max_scrolls = self.config.max_scrolls,
                rows = outcome.row_count,
                "Stopped scrolling before the table plateaued"
            );
        }

        session.scroll_to_top().await?;
        tokio::time::sleep(settle).await;

        tracing::info!(
            rows = outcome.row_count,
            growth = outcome.growth_iterations,
            scrolls = outcome.bottom_scrolls,
            clicks = outcome.clicks,
            "Lazy load finished"
        );
        Ok(outcome)
    }
}
