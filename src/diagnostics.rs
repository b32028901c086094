//! End-of-run counts. Row and slate failures are absorbed where they happen
//! and only surface here.

use std::collections::BTreeMap;

use crate::field_mapper::RejectReason;
use crate::models::{PlayerPerformanceRecord, Slate};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunDiagnostics {
    pub rows_seen: usize,
    pub rows_accepted: usize,
    pub rows_rejected: usize,
    /// Rejections by [`RejectReason::code`].
    pub rejections: BTreeMap<&'static str, usize>,
    pub slates_attempted: usize,
    pub slates_failed: usize,
    /// Slates whose table never appeared or held no data rows.
    pub slates_empty: usize,
    pub failed_slates: Vec<String>,
    pub duplicates_dropped: usize,
    pub inactive_records: usize,
}

impl RunDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_row_seen(&mut self) {
        self.rows_seen += 1;
        metrics::counter!("harvest_rows_seen_total").increment(1);
    }

    pub fn record_accepted(&mut self) {
        self.rows_accepted += 1;
        metrics::counter!("harvest_rows_accepted_total").increment(1);
    }

    pub fn record_rejected(&mut self, reason: &RejectReason) {
        self.rows_rejected += 1;
        *self.rejections.entry(reason.code()).or_default() += 1;
        metrics::counter!("harvest_rows_rejected_total", "reason" => reason.code()).increment(1);
    }

    pub fn record_slate_attempted(&mut self) {
        self.slates_attempted += 1;
        metrics::counter!("harvest_slates_attempted_total").increment(1);
    }

    pub fn record_slate_failed(&mut self, slate: &Slate) {
        self.slates_failed += 1;
        self.failed_slates.push(slate.display_label.clone());
        metrics::counter!("harvest_slates_failed_total").increment(1);
    }

    pub fn record_slate_empty(&mut self) {
        self.slates_empty += 1;
    }

    pub fn log_summary(&self) {
        tracing::info!(
            rows_seen = self.rows_seen,
            rows_accepted = self.rows_accepted,
            rows_rejected = self.rows_rejected,
            slates_attempted = self.slates_attempted,
            slates_failed = self.slates_failed,
            slates_empty = self.slates_empty,
            duplicates_dropped = self.duplicates_dropped,
            inactive = self.inactive_records,
            "Harvest diagnostics"
        );
        for (code, count) in &self.rejections {
            tracing::info!(reason = code, count, "Rows rejected");
        }
        if !self.failed_slates.is_empty() {
            tracing::warn!(slates = ?self.failed_slates, "Slates skipped after selection failure");
        }
    }
}

/// Shape of the accepted dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSummary {
    pub total: usize,
    pub by_position: BTreeMap<String, usize>,
    /// Counts per slate id, in first-seen order.
    pub by_slate: Vec<(String, usize)>,
    pub active: usize,
    pub inactive: usize,
}

impl DatasetSummary {
    pub fn from_records(records: &[PlayerPerformanceRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Self::default()
        };

        for record in records {
            let position = if record.position.is_empty() {
                "UNKNOWN".to_string()
            } else {
                record.position.clone()
            };
            *summary.by_position.entry(position).or_default() += 1;

            match summary.by_slate.iter_mut().find(|(id, _)| *id == record.slate_id) {
                Some((_, count)) => *count += 1,
                None => summary.by_slate.push((record.slate_id.clone(), 1)),
            }

            if record.inactive {
                summary.inactive += 1;
            } else {
                summary.active += 1;
            }
        }

        summary
    }

    pub fn log(&self) {
        tracing::info!(
            total = self.total,
            active = self.active,
            inactive = self.inactive,
            "Dataset summary"
        );
        for (position, count) in &self.by_position {
            tracing::info!(position = %position, count, "Records by position");
        }
        for (slate, count) in &self.by_slate {
            tracing::info!(slate = %slate, count, "Records by slate");
        }
    }
}
