//! Delimited-file output for a finished run.
//!
//! Writes go to a temporary file next to the destination and are renamed
//! into place once complete, so a failed run never leaves a partial file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::config::OutputConfig;
use crate::models::{PlayerPerformanceRecord, RunKey};
use crate::normalizer::NormalizedDataset;
use crate::utils::error::{AppError, Result};
use crate::utils::text::slugify;

pub const COLUMNS: &[&str] = &[
    "player_name",
    "position",
    "game_info",
    "stats",
    "salary",
    "fppg",
    "points",
    "row_number",
    "scrape_date",
    "week",
    "day",
];

pub const SLATE_COLUMN: &str = "slate_id";

const SCRAPE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Whether the trailing `slate_id` column is written.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlateColumn {
    /// Only when the run iterated discovered slates.
    #[default]
    Auto,
    Always,
    Never,
}

/// Which slates fed the output; decides the file name suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputScope {
    Single,
    AllSlates,
    Restricted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMeta {
    pub run_key: RunKey,
    pub scope: OutputScope,
    /// The run iterated slates from a page control rather than the implicit view.
    pub discovered_slates: bool,
}

#[derive(Debug, Clone)]
pub struct CsvSink {
    output_dir: PathBuf,
    delimiter: u8,
    slate_column: SlateColumn,
}

impl CsvSink {
    pub fn new(output_dir: impl Into<PathBuf>, delimiter: u8, slate_column: SlateColumn) -> Self {
        Self {
            output_dir: output_dir.into(),
            delimiter,
            slate_column,
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        let delimiter = config.delimiter.as_bytes().first().copied().unwrap_or(b',');
        Self::new(&config.dir, delimiter, config.include_slate_column)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `week5_Sunday.csv`, `week5_Sunday_all_games.csv`, `week5_Sunday_sun_1_00pm_et.csv`.
    pub fn file_name(meta: &RunMeta) -> String {
        let base = format!("week{}_{}", meta.run_key.week, meta.run_key.day);
        match &meta.scope {
            OutputScope::Single => format!("{}.csv", base),
            OutputScope::AllSlates => format!("{}_all_games.csv", base),
            OutputScope::Restricted(label) => {
                let slug = slugify(label);
                if slug.is_empty() {
                    format!("{}.csv", base)
                } else {
                    format!("{}_{}.csv", base, slug)
                }
            }
        }
    }

    pub fn destination(&self, meta: &RunMeta) -> PathBuf {
        self.output_dir.join(Self::file_name(meta))
    }

    fn writes_slate_column(&self, meta: &RunMeta) -> bool {
        match self.slate_column {
            SlateColumn::Always => true,
            SlateColumn::Never => false,
            SlateColumn::Auto => meta.discovered_slates,
        }
    }

    pub fn header(&self, meta: &RunMeta) -> Vec<&'static str> {
        let mut header = COLUMNS.to_vec();
        if self.writes_slate_column(meta) {
            header.push(SLATE_COLUMN);
        }
        header
    }

    fn record_fields(record: &PlayerPerformanceRecord, meta: &RunMeta, with_slate: bool) -> Vec<String> {
        let decimal = |value: Option<rust_decimal::Decimal>| value.map(|v| v.to_string()).unwrap_or_default();
        let mut fields = vec![
            record.player_name.clone(),
            record.position.clone(),
            record.matchup_text.clone(),
            record.box_score_text.clone(),
            decimal(record.salary),
            decimal(record.season_average_score),
            decimal(record.actual_score),
            record.source_row_index.to_string(),
            record.captured_at.format(SCRAPE_DATE_FORMAT).to_string(),
            meta.run_key.week_label(),
            meta.run_key.day.to_string(),
        ];
        if with_slate {
            fields.push(record.slate_id.clone());
        }
        fields
    }

    /// Write the dataset and return the final path. Any failure is a
    /// [`AppError::Persistence`] and leaves no file at the destination.
    pub fn write(&self, dataset: &NormalizedDataset, meta: &RunMeta) -> Result<PathBuf> {
        let destination = self.destination(meta);
        let with_slate = self.writes_slate_column(meta);

        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            AppError::Persistence(format!(
                "Failed to create output directory {}: {}",
                self.output_dir.display(),
                e
            ))
        })?;

        let mut temp = NamedTempFile::new_in(&self.output_dir)
            .map_err(|e| AppError::Persistence(format!("Failed to create temp file: {}", e)))?;

        {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(self.delimiter)
                .from_writer(&mut temp);

            writer
                .write_record(self.header(meta))
                .map_err(|e| AppError::Persistence(format!("Failed to write header: {}", e)))?;

            for record in dataset.records() {
                writer
                    .write_record(Self::record_fields(record, meta, with_slate))
                    .map_err(|e| {
                        AppError::Persistence(format!(
                            "Failed to write row for {}: {}",
                            record.player_name, e
                        ))
                    })?;
            }

            writer
                .flush()
                .map_err(|e| AppError::Persistence(format!("Failed to flush output: {}", e)))?;
        }

        temp.persist(&destination).map_err(|e| {
            AppError::Persistence(format!(
                "Failed to move output into {}: {}",
                destination.display(),
                e.error
            ))
        })?;

        tracing::info!(
            path = %destination.display(),
            records = dataset.len(),
            "Wrote dataset"
        );
        metrics::counter!("harvest_files_written_total").increment(1);

        Ok(destination)
    }
}
