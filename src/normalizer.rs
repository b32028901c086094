//! Canonicalization of mapped records and first-wins deduplication.

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::models::PlayerPerformanceRecord;
use crate::utils::text::collapse_whitespace;

/// Placeholders the table uses for "no value".
const BLANK_TOKENS: &[&str] = &["", "-", "--", "—", "–", "n/a", "na"];

fn currency_regex() -> &'static Regex {
    static CURRENCY: OnceLock<Regex> = OnceLock::new();
    CURRENCY.get_or_init(|| {
        Regex::new(r"^\$\s*(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)$").expect("valid currency regex")
    })
}

fn decimal_regex() -> &'static Regex {
    static DECIMAL: OnceLock<Regex> = OnceLock::new();
    DECIMAL.get_or_init(|| {
        Regex::new(r"^[+-]?(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?|\.\d+)$").expect("valid decimal regex")
    })
}

pub fn is_blank_token(text: &str) -> bool {
    let trimmed = text.trim();
    BLANK_TOKENS.iter().any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// `true` for cells shaped like a currency amount (`$` followed by digits).
pub fn looks_like_currency(text: &str) -> bool {
    currency_regex().is_match(text.trim())
}

/// `true` for cells shaped like a plain signed decimal.
pub fn looks_like_number(text: &str) -> bool {
    decimal_regex().is_match(text.trim())
}

/// `"$28"` → `28`, `"$1,250.50"` → `1250.50`. Blank placeholders and
/// anything not shaped like a dollar amount yield `None`.
pub fn parse_currency(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    let captures = currency_regex().captures(trimmed)?;
    let digits = captures.get(1)?.as_str().replace(',', "");
    Decimal::from_str(&digits).ok()
}

/// Plain non-negative decimal. Negative values and malformed tokens yield
/// `None`; they are never coerced to zero.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    if !decimal_regex().is_match(trimmed) {
        return None;
    }
    let value = Decimal::from_str(&trimmed.replace(',', "")).ok()?;
    if value.is_sign_negative() && !value.is_zero() {
        None
    } else {
        // "-0" parses with a negative sign
        Some(value.abs())
    }
}

fn clean_text(text: &str) -> String {
    if is_blank_token(text) {
        String::new()
    } else {
        collapse_whitespace(text)
    }
}

fn non_negative(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| !v.is_sign_negative() || v.is_zero()).map(|v| v.abs())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Canonicalize a mapped record. Applying it to its own output returns
    /// an identical record.
    pub fn normalize(&self, record: PlayerPerformanceRecord) -> PlayerPerformanceRecord {
        let actual_score = non_negative(record.actual_score);
        PlayerPerformanceRecord {
            player_name: collapse_whitespace(&record.player_name),
            position: clean_text(&record.position).to_uppercase(),
            salary: non_negative(record.salary),
            season_average_score: non_negative(record.season_average_score),
            inactive: actual_score.is_some_and(|score| score.is_zero()),
            actual_score,
            matchup_text: clean_text(&record.matchup_text),
            box_score_text: clean_text(&record.box_score_text),
            slate_id: record.slate_id.trim().to_string(),
            source_row_index: record.source_row_index,
            captured_at: record.captured_at,
        }
    }
}

/// How duplicate players are collapsed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    /// Slates are disjoint; a player may appear once per slate.
    #[default]
    PerSlate,
    /// One merged view across slates; a player appears once overall.
    Merged,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    PlayerInSlate { player_name: String, slate_id: String },
    Player(String),
}

impl DedupKey {
    pub fn for_record(record: &PlayerPerformanceRecord, mode: DedupMode) -> Self {
        match mode {
            DedupMode::PerSlate => DedupKey::PlayerInSlate {
                player_name: record.player_name.clone(),
                slate_id: record.slate_id.clone(),
            },
            DedupMode::Merged => DedupKey::Player(record.player_name.clone()),
        }
    }
}

/// Accepted records in extraction order. The first record for a key wins;
/// later ones are dropped and counted.
#[derive(Debug, Clone)]
pub struct NormalizedDataset {
    mode: DedupMode,
    records: Vec<PlayerPerformanceRecord>,
    seen: HashSet<DedupKey>,
    duplicates_dropped: usize,
}

impl NormalizedDataset {
    pub fn new(mode: DedupMode) -> Self {
        Self {
            mode,
            records: Vec::new(),
            seen: HashSet::new(),
            duplicates_dropped: 0,
        }
    }

    /// Returns `false` when the record duplicates one already accepted.
    pub fn accept(&mut self, record: PlayerPerformanceRecord) -> bool {
        let key = DedupKey::for_record(&record, self.mode);
        if self.seen.insert(key) {
            self.records.push(record);
            true
        } else {
            self.duplicates_dropped += 1;
            tracing::trace!(
                player = %record.player_name,
                slate = %record.slate_id,
                "dropping duplicate record"
            );
            false
        }
    }

    pub fn mode(&self) -> DedupMode {
        self.mode
    }

    pub fn records(&self) -> &[PlayerPerformanceRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<PlayerPerformanceRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    pub fn inactive_count(&self) -> usize {
        self.records.iter().filter(|r| r.inactive).count()
    }
}

/// Collapse `records` under `mode`, keeping extraction order.
pub fn dedup(
    records: impl IntoIterator<Item = PlayerPerformanceRecord>,
    mode: DedupMode,
) -> NormalizedDataset {
    let mut dataset = NormalizedDataset::new(mode);
    for record in records {
        dataset.accept(record);
    }
    dataset
}
