use super::*;
use slate_harvester::{SimulatedSession, lazy_load::LazyLoader};
use tempfile::TempDir;

#[tokio::test]
async fn test_lazy_slate_is_fully_harvested() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let (harvester, _sink) = create_test_harvester(get_test_config(dir.path()))?;

    let mut session = SimulatedSession::single(roster("Main", "Lazy", 40).lazy(10, 10));
    let report = harvester.harvest(&mut session, run_key()).await?;

    assert_eq!(report.dataset.len(), 40);
    let load = report.slates[0].load.clone().expect("slate was loaded");
    assert_eq!(load.growth_iterations, 3);
    assert_eq!(load.bottom_scrolls, 3 + 2);

    // Extraction happens after returning to the top
    assert_eq!(session.stats().top_scrolls, 1);

    let indices: Vec<usize> = report.dataset.records().iter().map(|r| r.source_row_index).collect();
    assert_eq!(indices, (1..=40).collect::<Vec<_>>());

    Ok(())
}

#[tokio::test]
async fn test_each_slate_loads_from_scratch() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let (harvester, _sink) = create_test_harvester(get_test_config(dir.path()))?;

    let mut session = SimulatedSession::with_control(vec![
        roster("Early", "E", 25).lazy(5, 5),
        roster("Late", "L", 12).lazy(4, 4),
    ]);
    let report = harvester.harvest(&mut session, run_key()).await?;

    assert_eq!(report.dataset.len(), 37);
    assert_eq!(report.slates[0].records_kept, 25);
    assert_eq!(report.slates[1].records_kept, 12);
    assert_eq!(session.stats().top_scrolls, 2);

    Ok(())
}

#[tokio::test]
async fn test_loader_uses_configured_selectors() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut config = get_test_config(dir.path());
    config.waits.row_selector = "tbody tr".to_string();

    let loader = LazyLoader::from_config(&config);
    let session = SimulatedSession::single(roster("Main", "Sel", 7).lazy(3, 3));
    let outcome = loader.load_all(&session).await?;

    assert_eq!(outcome.row_count, 7);
    assert_eq!(outcome.growth_iterations, 2);

    Ok(())
}

#[tokio::test]
async fn test_load_more_button_is_clicked_with_default_selectors() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let (harvester, _sink) = create_test_harvester(get_test_config(dir.path()))?;

    let mut session = SimulatedSession::single(roster("Main", "More", 26).load_more(10, 10));
    let report = harvester.harvest(&mut session, run_key()).await?;

    assert_eq!(report.dataset.len(), 26);
    let load = report.slates[0].load.clone().expect("slate was loaded");
    assert_eq!(load.clicks, 2);
    assert_eq!(load.growth_iterations, 2);
    assert!(load.plateaued);
    assert_eq!(session.stats().clicks, 2);

    Ok(())
}
