use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cell texts of one rendered table row, captured during a single extraction
/// pass. A later pass produces new rows rather than updating these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawRow {
    pub slate_id: String,
    /// Position in the table, counting the header row as 0.
    pub row_index: usize,
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new(slate_id: impl Into<String>, row_index: usize, cells: Vec<String>) -> Self {
        Self {
            slate_id: slate_id.into(),
            row_index,
            cells,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(String::as_str)
    }
}

/// One player's line for one slate.
///
/// `player_name` is always longer than two characters. Numeric fields are
/// `None` when the cell was blank or malformed and are never negative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerPerformanceRecord {
    pub player_name: String,
    pub position: String,
    pub salary: Option<Decimal>,
    pub season_average_score: Option<Decimal>,
    pub actual_score: Option<Decimal>,
    pub matchup_text: String,
    pub box_score_text: String,
    pub slate_id: String,
    pub source_row_index: usize,
    pub captured_at: DateTime<Utc>,
    /// Zero actual score; kept in the dataset, filtering is left to consumers.
    pub inactive: bool,
}
