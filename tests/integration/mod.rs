// Integration tests for the slate harvester
// These drive the full pipeline against simulated pages; no browser needed

pub mod harvest_scenarios;
pub mod lazy_load_tests;
pub mod persistence_tests;

use std::path::Path;
use slate_harvester::{
    AppConfig,
    config::LazyLoadConfig,
    models::{RunKey, Weekday},
    sink::CsvSink,
    utils::retry::RetryPolicy,
    Harvester, SimulatedSlate,
};

/// Configuration with every wait collapsed to zero
pub fn get_test_config(output_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.target.url = "https://example.test/dailyfantasy/research/completed".to_string();
    config.waits.initial_settle_ms = 0;
    config.waits.selection_settle_ms = 0;
    config.waits.retry = RetryPolicy::immediate(2);
    config.lazy_load = LazyLoadConfig {
        settle_ms: 0,
        plateau_attempts: 2,
        max_scrolls: 50,
        incremental_scrolls: 3,
        incremental_step_px: 500,
        incremental_settle_ms: 0,
        click_settle_ms: 0,
        ..LazyLoadConfig::default()
    };
    config.output.dir = output_dir.to_path_buf();
    config
}

pub fn create_test_harvester(config: AppConfig) -> anyhow::Result<(Harvester, CsvSink)> {
    let sink = CsvSink::from_config(&config.output);
    let harvester = Harvester::new(config)?;
    Ok((harvester, sink))
}

pub fn run_key() -> RunKey {
    RunKey::new(5, Weekday::Sunday)
}

/// A slate holding `count` distinct, well-formed players
pub fn roster(label: &str, prefix: &str, count: usize) -> SimulatedSlate {
    (0..count).fold(SimulatedSlate::new(label), |slate, i| {
        let name = format!("{} Player{}\nAAA vs BBB\n{} REC, {} YDS", prefix, i, i % 9, i * 7);
        let salary = format!("${}", 10 + i % 30);
        slate.row(&["WR", &name, &salary, "10.5", "12.0"])
    })
}
