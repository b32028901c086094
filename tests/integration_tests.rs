// Integration tests for the slate harvester
//
// These tests verify that all pipeline stages work together correctly,
// from slate discovery through to the written CSV file.

mod integration;

use integration::*;
use slate_harvester::{AppConfig, Harvester, SimulatedSession};
use tempfile::TempDir;

#[tokio::test]
async fn test_system_health() -> anyhow::Result<()> {
    // The shipped defaults must build a working harvester
    let _harvester = Harvester::new(AppConfig::default())?;
    Ok(())
}

#[tokio::test]
async fn test_end_to_end_workflow() -> anyhow::Result<()> {
    // 1. Page with a slate control and three lazily rendered slates
    // 2. Discover, select and drain each slate
    // 3. Write the merged dataset and read it back
    let dir = TempDir::new()?;
    let (harvester, sink) = create_test_harvester(get_test_config(dir.path()))?;

    let mut session = SimulatedSession::with_control(vec![
        roster("Thu 8:15pm ET", "Thu", 18).with_value("thu").lazy(6, 6),
        roster("Sun 1:00pm ET", "Sun", 30).with_value("sun_early").lazy(10, 10),
        roster("Mon 8:15pm ET", "Mon", 9).with_value("mon"),
    ])
    .with_placeholder("Select a game time");

    println!("Testing end-to-end workflow...");

    let outcome = harvester.run(&mut session, run_key(), &sink).await?;
    let report = &outcome.report;

    assert!(!report.implicit);
    assert_eq!(report.slates.len(), 3);
    assert_eq!(report.dataset.len(), 57);
    assert_eq!(report.diagnostics.rows_seen, 57);
    assert_eq!(report.diagnostics.rows_rejected, 0);
    println!("✓ Harvested {} records across {} slates", report.dataset.len(), report.slates.len());

    let summary = report.summary();
    assert_eq!(
        summary.by_slate,
        vec![
            ("thu".to_string(), 18),
            ("sun_early".to_string(), 30),
            ("mon".to_string(), 9),
        ]
    );
    assert_eq!(summary.by_position.get("WR"), Some(&57));
    println!("✓ Dataset summary matches slate order");

    let path = outcome.written.expect("file should be written");
    assert_eq!(path.file_name().unwrap(), "week5_Sunday_all_games.csv");

    let mut reader = csv::Reader::from_path(&path)?;
    assert_eq!(reader.records().count(), 57);
    println!("✓ Wrote {}", path.display());

    let stats = session.stats();
    assert_eq!(stats.navigations, 1);
    assert_eq!(stats.selections, 3);
    assert_eq!(stats.top_scrolls, 3);

    Ok(())
}

#[tokio::test]
async fn test_configuration_validation() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let config = get_test_config(dir.path());
    assert!(config.validate().is_ok());

    let mut broken = config.clone();
    broken.waits.table_selector = "table >".to_string();
    assert!(Harvester::new(broken).is_err());

    let mut broken = config;
    broken.target.url = "not a url".to_string();
    assert!(Harvester::new(broken).is_err());

    Ok(())
}
