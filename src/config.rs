use chrono::NaiveDate;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use url::Url;

use crate::field_mapper::ColumnMap;
use crate::normalizer::DedupMode;
use crate::session::parse_selector;
use crate::sink::SlateColumn;
use crate::utils::retry::RetryPolicy;

pub const DEFAULT_TARGET_URL: &str = "https://sports.yahoo.com/dailyfantasy/research/completed";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub target: TargetConfig,
    pub browser: BrowserConfig,
    pub waits: WaitConfig,
    pub lazy_load: LazyLoadConfig,
    pub slates: SlateConfig,
    pub columns: ColumnMap,
    pub output: OutputConfig,
    pub season: SeasonConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub url: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_TARGET_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub chrome_path: Option<String>,
    pub user_agent: String,
    pub window_width: u32,
    pub window_height: u32,
    pub navigation_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            window_width: 1920,
            window_height: 1080,
            navigation_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    pub table_selector: String,
    pub row_selector: String,
    pub cell_selector: String,
    /// Pause after navigation before looking for slates.
    pub initial_settle_ms: u64,
    /// Pause after each slate selection for the table to re-render.
    pub selection_settle_ms: u64,
    pub retry: RetryPolicy,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            table_selector: "table".to_string(),
            row_selector: "tr".to_string(),
            cell_selector: "td, th".to_string(),
            initial_settle_ms: 5_000,
            selection_settle_ms: 3_000,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LazyLoadConfig {
    /// Pause after each jump to the bottom.
    pub settle_ms: u64,
    /// Consecutive no-growth measurements before the nudge pass.
    pub plateau_attempts: u32,
    /// Hard cap on bottom scrolls per slate.
    pub max_scrolls: u32,
    pub incremental_scrolls: u32,
    pub incremental_step_px: i64,
    pub incremental_settle_ms: u64,
    /// "Load more" style buttons clicked once scrolling plateaus.
    pub load_more_selectors: Vec<String>,
    /// Next-page controls of a paginator that appends rows to the same table.
    pub next_page_selectors: Vec<String>,
    /// Pause after each click before re-measuring.
    pub click_settle_ms: u64,
}

impl Default for LazyLoadConfig {
    fn default() -> Self {
        Self {
            settle_ms: 2_000,
            plateau_attempts: 2,
            max_scrolls: 50,
            incremental_scrolls: 5,
            incremental_step_px: 500,
            incremental_settle_ms: 1_000,
            load_more_selectors: [
                "button[class*='load']",
                "button[class*='more']",
                "a[class*='load']",
                "a[class*='more']",
                "[data-testid*='load']",
                "[data-testid*='more']",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            // A paginator that replaces rows would drop earlier pages
            next_page_selectors: Vec::new(),
            click_settle_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlateConfig {
    /// When off, the current view is harvested as the single implicit slate.
    pub discover: bool,
    /// Pins the slate control; skips candidate scanning.
    pub control_selector: Option<String>,
    pub candidate_selectors: Vec<String>,
    /// Option labels that are prompts rather than slates.
    pub placeholder_labels: Vec<String>,
    /// Keep only the slate whose label or id matches.
    pub only: Option<String>,
    pub dedup: DedupMode,
}

impl Default for SlateConfig {
    fn default() -> Self {
        Self {
            discover: true,
            control_selector: None,
            candidate_selectors: [
                "select",
                "select[name*='time']",
                "select[name*='game']",
                "select[name*='slate']",
                ".dropdown select",
                "[data-testid*='select']",
                "[data-testid*='dropdown']",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            placeholder_labels: vec!["Select a game time".to_string()],
            only: None,
            dedup: DedupMode::PerSlate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub delimiter: String,
    pub include_slate_column: SlateColumn,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data_csv"),
            delimiter: ",".to_string(),
            include_slate_column: SlateColumn::Auto,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonConfig {
    pub start_date: NaiveDate,
}

impl Default for SeasonConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2025, 9, 4).unwrap_or_default(),
        }
    }
}

impl AppConfig {
    /// Built-in defaults, then `config/harvester.*`, then `explicit`, then
    /// `HARVEST__SECTION__KEY` environment variables.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name("config/harvester").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path));
        }

        let s = builder
            .add_source(
                Environment::with_prefix("HARVEST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        // Add Chrome path from environment if not set
        if config.browser.chrome_path.is_none() {
            config.browser.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if Url::parse(&self.target.url).is_err() {
            return Err(ConfigError::Message("Invalid target URL format".into()));
        }

        if self.browser.window_width == 0 || self.browser.window_height == 0 {
            return Err(ConfigError::Message("Browser window size must be greater than 0".into()));
        }

        if self.browser.navigation_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Browser navigation_timeout_secs must be greater than 0".into(),
            ));
        }

        for selector in [
            &self.waits.table_selector,
            &self.waits.row_selector,
            &self.waits.cell_selector,
        ] {
            parse_selector(selector).map_err(|e| ConfigError::Message(e.to_string()))?;
        }

        if self.waits.retry.attempts == 0 {
            return Err(ConfigError::Message("Retry attempts must be greater than 0".into()));
        }

        if self.waits.retry.outer_timeout_secs == 0 {
            return Err(ConfigError::Message("Retry outer_timeout_secs must be greater than 0".into()));
        }

        if self.lazy_load.plateau_attempts == 0 {
            return Err(ConfigError::Message("Lazy-load plateau_attempts must be greater than 0".into()));
        }

        if self.lazy_load.max_scrolls < self.lazy_load.plateau_attempts {
            return Err(ConfigError::Message(
                "Lazy-load max_scrolls cannot be less than plateau_attempts".into(),
            ));
        }

        for selector in self
            .lazy_load
            .load_more_selectors
            .iter()
            .chain(self.lazy_load.next_page_selectors.iter())
        {
            parse_selector(selector).map_err(|e| ConfigError::Message(e.to_string()))?;
        }

        if self.slates.discover
            && self.slates.control_selector.is_none()
            && self.slates.candidate_selectors.is_empty()
        {
            return Err(ConfigError::Message(
                "Slate discovery needs a control_selector or candidate_selectors".into(),
            ));
        }

        for selector in self
            .slates
            .control_selector
            .iter()
            .chain(self.slates.candidate_selectors.iter())
        {
            parse_selector(selector).map_err(|e| ConfigError::Message(e.to_string()))?;
        }

        self.columns
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        if self.output.delimiter.len() != 1 {
            return Err(ConfigError::Message("Output delimiter must be a single byte".into()));
        }

        if self.output.dir.as_os_str().is_empty() {
            return Err(ConfigError::Message("Output dir must not be empty".into()));
        }

        Ok(())
    }

    pub fn delimiter_byte(&self) -> u8 {
        self.output.delimiter.as_bytes().first().copied().unwrap_or(b',')
    }
}
