//! Binds the cells of a [`RawRow`] to the fields of a
//! [`PlayerPerformanceRecord`].
//!
//! The table has no header names reliable enough to bind by, so each field is
//! located by a [`ColumnRule`]: a fixed index, a fixed offset from the end of
//! the row, or content detection. The rules live in a declarative
//! [`ColumnMap`] that is validated at startup and checked against each
//! slate's header row, so layout drift is reported instead of silently
//! mis-binding fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{PlayerPerformanceRecord, RawRow};
use crate::normalizer::{looks_like_currency, looks_like_number, parse_currency, parse_decimal};
use crate::utils::error::{AppError, Result};

/// Rows with fewer cells than this are rejected outright.
pub const MIN_COLUMNS: usize = 4;

/// Names of length two or less are treated as noise.
const MIN_NAME_CHARS: usize = 3;

/// Closed set of roster role abbreviations.
pub const ROLE_ABBREVIATIONS: &[&str] = &["QB", "RB", "WR", "TE", "K", "DEF", "DST", "D/ST", "FLEX"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ColumnRule {
    /// Cell at a fixed position from the start of the row.
    Index { at: usize },
    /// Cell at a fixed position from the end of the row (`0` is the last cell).
    FromEnd { at: usize },
    /// Locate the cell by its content.
    Detect,
}

impl ColumnRule {
    fn resolve(&self, width: usize) -> Option<usize> {
        match *self {
            ColumnRule::Index { at } => (at < width).then_some(at),
            ColumnRule::FromEnd { at } => (at < width).then(|| width - 1 - at),
            ColumnRule::Detect => None,
        }
    }

    fn is_fixed(&self) -> bool {
        !matches!(self, ColumnRule::Detect)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnSpec {
    pub rule: ColumnRule,
    /// Text the header cell for this column is expected to contain.
    pub header: Option<String>,
}

impl ColumnSpec {
    pub fn detect() -> Self {
        Self {
            rule: ColumnRule::Detect,
            header: None,
        }
    }

    pub fn index(at: usize) -> Self {
        Self {
            rule: ColumnRule::Index { at },
            header: None,
        }
    }

    pub fn from_end(at: usize) -> Self {
        Self {
            rule: ColumnRule::FromEnd { at },
            header: None,
        }
    }

    pub fn expecting(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Position,
    Identity,
    Salary,
    SeasonAverage,
    ActualScore,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Position => "position",
            Field::Identity => "identity",
            Field::Salary => "salary",
            Field::SeasonAverage => "season_average",
            Field::ActualScore => "actual_score",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnMap {
    pub position: ColumnSpec,
    pub identity: ColumnSpec,
    pub salary: ColumnSpec,
    pub season_average: ColumnSpec,
    pub actual_score: ColumnSpec,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            position: ColumnSpec::detect(),
            identity: ColumnSpec::detect(),
            salary: ColumnSpec::detect(),
            season_average: ColumnSpec::from_end(1),
            actual_score: ColumnSpec::from_end(0),
        }
    }
}

impl ColumnMap {
    /// Positional binding matching the completed-results table:
    /// position, avatar, player, salary, FPPG, points.
    pub fn positional() -> Self {
        Self {
            position: ColumnSpec::index(0),
            identity: ColumnSpec::index(2),
            salary: ColumnSpec::index(3),
            season_average: ColumnSpec::index(4),
            actual_score: ColumnSpec::index(5),
        }
    }

    fn specs(&self) -> [(Field, &ColumnSpec); 5] {
        [
            (Field::Position, &self.position),
            (Field::Identity, &self.identity),
            (Field::Salary, &self.salary),
            (Field::SeasonAverage, &self.season_average),
            (Field::ActualScore, &self.actual_score),
        ]
    }

    /// Startup check: no two fields may claim the same fixed column.
    pub fn validate(&self) -> Result<()> {
        let fixed: Vec<(Field, &ColumnRule)> = self
            .specs()
            .into_iter()
            .filter(|(_, spec)| spec.rule.is_fixed())
            .map(|(field, spec)| (field, &spec.rule))
            .collect();

        for (i, (field, rule)) in fixed.iter().enumerate() {
            for (other, other_rule) in &fixed[i + 1..] {
                if rule == other_rule {
                    return Err(AppError::Validation(format!(
                        "columns.{} and columns.{} both bind {:?}",
                        field.name(),
                        other.name(),
                        rule
                    )));
                }
            }
        }

        for (field, spec) in self.specs() {
            if matches!(&spec.header, Some(h) if h.trim().is_empty()) {
                return Err(AppError::Validation(format!(
                    "columns.{}.header must not be blank",
                    field.name()
                )));
            }
        }

        Ok(())
    }

    /// Compare the map against a rendered header row. Fixed columns must exist,
    /// must not land on the same cell, and expected header labels must be
    /// present.
    pub fn check_header(&self, header: &[String]) -> Result<()> {
        let mut bound: Vec<(Field, usize)> = Vec::new();

        for (field, spec) in self.specs() {
            let expected = spec.header.as_deref().map(str::to_lowercase);

            if spec.rule.is_fixed() {
                let Some(index) = spec.rule.resolve(header.len()) else {
                    return Err(AppError::LayoutDrift {
                        message: format!(
                            "{} column {:?} is outside a header of {} cells",
                            field.name(),
                            spec.rule,
                            header.len()
                        ),
                    });
                };
                // Index and FromEnd rules can name the same cell at this width
                if let Some((other, _)) = bound.iter().find(|(_, at)| *at == index) {
                    return Err(AppError::LayoutDrift {
                        message: format!(
                            "{} and {} both resolve to column {} of a {}-cell header",
                            other.name(),
                            field.name(),
                            index,
                            header.len()
                        ),
                    });
                }
                bound.push((field, index));
                if let Some(expected) = expected {
                    if !header[index].to_lowercase().contains(&expected) {
                        return Err(AppError::LayoutDrift {
                            message: format!(
                                "{} column {} has header '{}', expected '{}'",
                                field.name(),
                                index,
                                header[index],
                                expected
                            ),
                        });
                    }
                }
            } else if let Some(expected) = expected {
                if !header.iter().any(|h| h.to_lowercase().contains(&expected)) {
                    return Err(AppError::LayoutDrift {
                        message: format!("no header cell contains '{}' for {}", expected, field.name()),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Why a row did not yield a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    TooFewCells { found: usize },
    MissingIdentity,
    NameTooShort { name: String },
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::TooFewCells { .. } => "too_few_cells",
            RejectReason::MissingIdentity => "missing_identity",
            RejectReason::NameTooShort { .. } => "name_too_short",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::TooFewCells { found } => {
                write!(f, "{} cells, need at least {}", found, MIN_COLUMNS)
            }
            RejectReason::MissingIdentity => f.write_str("no player identity cell"),
            RejectReason::NameTooShort { name } => write!(f, "player name '{}' too short", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowMapping {
    Accepted(PlayerPerformanceRecord),
    Rejected(RejectReason),
}

impl RowMapping {
    pub fn is_accepted(&self) -> bool {
        matches!(self, RowMapping::Accepted(_))
    }

    pub fn accepted(self) -> Option<PlayerPerformanceRecord> {
        match self {
            RowMapping::Accepted(record) => Some(record),
            RowMapping::Rejected(_) => None,
        }
    }
}

pub fn is_role_abbreviation(text: &str) -> bool {
    let token = text.trim();
    ROLE_ABBREVIATIONS.iter().any(|role| token.eq_ignore_ascii_case(role))
}

/// Cell positions bound for one row.
#[derive(Debug, Default)]
struct Binding {
    position: Option<usize>,
    identity: Option<usize>,
    salary: Option<usize>,
    season_average: Option<usize>,
    actual_score: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    columns: ColumnMap,
}

impl FieldMapper {
    pub fn new(columns: ColumnMap) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Map one row. Never fails: rows that cannot produce a valid record
    /// come back as [`RowMapping::Rejected`].
    pub fn map(&self, row: &RawRow, captured_at: DateTime<Utc>) -> RowMapping {
        if row.len() < MIN_COLUMNS {
            return RowMapping::Rejected(RejectReason::TooFewCells { found: row.len() });
        }

        let binding = self.bind(row);
        let Some(identity) = binding.identity.and_then(|i| row.cell(i)) else {
            return RowMapping::Rejected(RejectReason::MissingIdentity);
        };

        let mut lines = identity.lines().map(str::trim);
        let player_name = lines.next().unwrap_or_default().to_string();
        if player_name.chars().count() < MIN_NAME_CHARS {
            return RowMapping::Rejected(RejectReason::NameTooShort { name: player_name });
        }
        let matchup_text = lines.next().unwrap_or_default().to_string();
        let box_score_text = lines.next().unwrap_or_default().to_string();

        let text_at = |index: Option<usize>| index.and_then(|i| row.cell(i)).unwrap_or_default();

        RowMapping::Accepted(PlayerPerformanceRecord {
            player_name,
            position: text_at(binding.position).trim().to_string(),
            salary: parse_currency(text_at(binding.salary)),
            season_average_score: parse_decimal(text_at(binding.season_average)),
            actual_score: parse_decimal(text_at(binding.actual_score)),
            matchup_text,
            box_score_text,
            slate_id: row.slate_id.clone(),
            source_row_index: row.row_index,
            captured_at,
            inactive: false,
        })
    }

    /// Fixed rules claim their cells first; detection then runs in the order
    /// identity, salary, scores, position over the unclaimed cells.
    fn bind(&self, row: &RawRow) -> Binding {
        let width = row.len();
        let mut claimed = vec![false; width];
        let mut binding = Binding::default();

        for (field, spec) in self.columns.specs() {
            if let Some(index) = spec.rule.resolve(width) {
                claimed[index] = true;
                *slot(&mut binding, field) = Some(index);
            }
        }

        let free = |claimed: &[bool]| (0..width).filter(|i| !claimed[*i]).collect::<Vec<_>>();

        if self.columns.identity.rule == ColumnRule::Detect {
            let candidates = free(&claimed);
            let multi_line = candidates.iter().copied().find(|&i| {
                let text = &row.cells[i];
                text.contains('\n') && text.chars().any(char::is_alphabetic)
            });
            let found = multi_line.or_else(|| {
                candidates.iter().copied().find(|&i| {
                    let text = row.cells[i].trim();
                    text.chars().any(char::is_alphabetic)
                        && !is_role_abbreviation(text)
                        && !looks_like_currency(text)
                        && !looks_like_number(text)
                })
            });
            if let Some(i) = found {
                claimed[i] = true;
                binding.identity = Some(i);
            }
        }

        if self.columns.salary.rule == ColumnRule::Detect {
            if let Some(i) = free(&claimed).into_iter().find(|&i| looks_like_currency(&row.cells[i])) {
                claimed[i] = true;
                binding.salary = Some(i);
            }
        }

        for field in [Field::ActualScore, Field::SeasonAverage] {
            let spec = match field {
                Field::ActualScore => &self.columns.actual_score,
                _ => &self.columns.season_average,
            };
            if spec.rule != ColumnRule::Detect {
                continue;
            }
            // Nearest the end of the row wins
            if let Some(i) = free(&claimed).into_iter().rev().find(|&i| looks_like_number(&row.cells[i])) {
                claimed[i] = true;
                *slot(&mut binding, field) = Some(i);
            }
        }

        if self.columns.position.rule == ColumnRule::Detect {
            if let Some(i) = free(&claimed).into_iter().find(|&i| is_role_abbreviation(&row.cells[i])) {
                binding.position = Some(i);
            }
        }

        binding
    }
}

fn slot(binding: &mut Binding, field: Field) -> &mut Option<usize> {
    match field {
        Field::Position => &mut binding.position,
        Field::Identity => &mut binding.identity,
        Field::Salary => &mut binding.salary,
        Field::SeasonAverage => &mut binding.season_average,
        Field::ActualScore => &mut binding.actual_score,
    }
}
