use super::*;
use rust_decimal::Decimal;
use slate_harvester::{
    AppError, SimulatedSession,
    field_mapper::ColumnSpec,
    normalizer::DedupMode,
    sink::OutputScope,
    slate_iterator::SlateStatus,
};
use std::str::FromStr;
use tempfile::TempDir;

fn jane_doe_row() -> [&'static str; 5] {
    ["QB", "Jane Doe\nTEAM vs TEAM\n12-20, 150 YDS", "$28", "18.4", "21.0"]
}

#[tokio::test]
async fn test_single_slate_with_malformed_row() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let (harvester, sink) = create_test_harvester(get_test_config(dir.path()))?;

    let mut session = SimulatedSession::single(
        SimulatedSlate::new("Main")
            .row(&["QB", "Broken"])
            .row(&jane_doe_row())
            .row(&["WR", "Sam Hill\nNYG @ DAL\n6 REC, 88 YDS", "$17", "11.2", "14.8"]),
    );

    let outcome = harvester.run(&mut session, run_key(), &sink).await?;
    let report = &outcome.report;

    assert!(report.implicit);
    assert_eq!(report.dataset.len(), 2);
    assert_eq!(report.diagnostics.rows_seen, 3);
    assert_eq!(report.diagnostics.rows_rejected, 1);
    assert_eq!(report.diagnostics.rejections.get("too_few_cells"), Some(&1));

    let jane = &report.dataset.records()[0];
    assert_eq!(jane.player_name, "Jane Doe");
    assert_eq!(jane.salary, Some(Decimal::from(28)));
    assert_eq!(jane.actual_score, Some(Decimal::from_str("21.0")?));
    assert_eq!(jane.slate_id, "default");
    assert_eq!(jane.source_row_index, 2);

    let written = outcome.written.expect("file should be written");
    assert_eq!(written.file_name().unwrap(), "week5_Sunday.csv");
    let contents = std::fs::read_to_string(&written)?;
    assert!(!contents.lines().next().unwrap().contains("slate_id"));

    println!("✓ Single-slate scenario harvested {} records", report.dataset.len());
    Ok(())
}

#[tokio::test]
async fn test_merged_mode_keeps_first_slate_record() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut config = get_test_config(dir.path());
    config.slates.dedup = DedupMode::Merged;
    let (harvester, sink) = create_test_harvester(config)?;

    let mut session = SimulatedSession::with_control(vec![
        SimulatedSlate::new("Sun 1:00pm ET")
            .with_value("early")
            .row(&["RB", "John Smith\nKC @ LV", "$22", "14.0", "10.0"])
            .row(&["TE", "Pat Lane\nKC @ LV", "$12", "7.0", "8.0"]),
        SimulatedSlate::new("Sun 4:05pm ET")
            .with_value("late")
            .row(&["RB", "John Smith\nKC @ LV", "$22", "14.0", "30.0"])
            .row(&["K", "Kim Kick\nSF @ SEA", "$9", "8.0", "11.0"]),
    ])
    .with_placeholder("Select a game time");

    let outcome = harvester.run(&mut session, run_key(), &sink).await?;
    let report = &outcome.report;

    let smiths: Vec<_> = report
        .dataset
        .records()
        .iter()
        .filter(|r| r.player_name == "John Smith")
        .collect();
    assert_eq!(smiths.len(), 1);
    assert_eq!(smiths[0].slate_id, "early");
    assert_eq!(smiths[0].actual_score, Some(Decimal::from(10)));
    assert_eq!(report.dataset.len(), 3);
    assert_eq!(report.diagnostics.duplicates_dropped, 1);

    assert_eq!(report.scope(), OutputScope::AllSlates);
    let written = outcome.written.expect("file should be written");
    assert_eq!(written.file_name().unwrap(), "week5_Sunday_all_games.csv");
    let contents = std::fs::read_to_string(&written)?;
    assert!(contents.lines().next().unwrap().ends_with("slate_id"));
    assert_eq!(session.stats().selections, 2);

    Ok(())
}

#[tokio::test]
async fn test_per_slate_mode_keeps_player_in_each_slate() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let (harvester, sink) = create_test_harvester(get_test_config(dir.path()))?;

    let mut session = SimulatedSession::with_control(vec![
        SimulatedSlate::new("Early").row(&["RB", "John Smith\nKC @ LV", "$22", "14.0", "10.0"]),
        SimulatedSlate::new("Late").row(&["RB", "John Smith\nKC @ LV", "$22", "14.0", "30.0"]),
    ]);

    let outcome = harvester.run(&mut session, run_key(), &sink).await?;

    let slates: Vec<&str> = outcome
        .report
        .dataset
        .records()
        .iter()
        .map(|r| r.slate_id.as_str())
        .collect();
    assert_eq!(slates, vec!["Early", "Late"]);
    assert_eq!(outcome.report.diagnostics.duplicates_dropped, 0);

    Ok(())
}

#[tokio::test]
async fn test_complete_slate_needs_only_confirmation_scrolls() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let config = get_test_config(dir.path());
    let plateau_attempts = config.lazy_load.plateau_attempts;
    let (harvester, _sink) = create_test_harvester(config)?;

    let mut session = SimulatedSession::single(roster("Main", "Full", 15));
    let report = harvester.harvest(&mut session, run_key()).await?;

    let load = report.slates[0].load.clone().expect("slate was loaded");
    assert_eq!(load.growth_iterations, 0);
    assert_eq!(load.bottom_scrolls, plateau_attempts);
    assert!(load.plateaued);
    assert_eq!(report.dataset.len(), 15);

    Ok(())
}

#[tokio::test]
async fn test_failed_slate_does_not_abort_run() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let (harvester, sink) = create_test_harvester(get_test_config(dir.path()))?;

    let mut session = SimulatedSession::with_control(vec![
        roster("Thu 8:15pm ET", "Thu", 3),
        roster("Sun 1:00pm ET", "Sun", 4).failing_selection(),
        roster("Mon 8:15pm ET", "Mon", 2),
    ]);

    let outcome = harvester.run(&mut session, run_key(), &sink).await?;
    let report = &outcome.report;

    assert_eq!(report.dataset.len(), 5);
    assert_eq!(report.diagnostics.slates_attempted, 3);
    assert_eq!(report.diagnostics.slates_failed, 1);
    assert_eq!(report.diagnostics.failed_slates, vec!["Sun 1:00pm ET".to_string()]);
    assert!(matches!(report.slates[1].status, SlateStatus::Failed(_)));
    assert!(outcome.written.is_some());

    Ok(())
}

#[tokio::test]
async fn test_slate_label_with_irregular_spacing_is_selected() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let (harvester, _sink) = create_test_harvester(get_test_config(dir.path()))?;

    let mut session = SimulatedSession::with_control(vec![
        roster("Thu 8:15pm ET", "Thu", 1),
        roster("Sun  1:00pm ET", "Sun", 1),
    ]);

    let report = harvester.harvest(&mut session, run_key()).await?;

    assert_eq!(report.slates[1].slate.display_label, "Sun 1:00pm ET");
    assert_eq!(report.slates[1].status, SlateStatus::Harvested);
    assert_eq!(report.diagnostics.slates_failed, 0);
    assert_eq!(report.dataset.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_slate_restriction() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut config = get_test_config(dir.path());
    config.slates.only = Some("late".to_string());
    let (harvester, sink) = create_test_harvester(config)?;

    let mut session = SimulatedSession::with_control(vec![
        roster("Sun 1:00pm ET", "Early", 3).with_value("early"),
        roster("Sun 4:05pm ET", "Late", 2).with_value("late"),
    ]);

    let outcome = harvester.run(&mut session, run_key(), &sink).await?;

    assert_eq!(outcome.report.restricted_to.as_deref(), Some("Sun 4:05pm ET"));
    assert_eq!(outcome.report.dataset.len(), 2);
    assert!(outcome.report.dataset.records().iter().all(|r| r.slate_id == "late"));
    assert_eq!(
        outcome.written.unwrap().file_name().unwrap(),
        "week5_Sunday_sun_4_05pm_et.csv"
    );

    Ok(())
}

#[tokio::test]
async fn test_zero_records_is_not_a_failure() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let (harvester, sink) = create_test_harvester(get_test_config(dir.path()))?;

    let mut session = SimulatedSession::single(SimulatedSlate::new("Main").row(&["QB", "x"]));

    let outcome = harvester.run(&mut session, run_key(), &sink).await?;

    assert!(outcome.report.dataset.is_empty());
    assert!(outcome.written.is_none());
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_layout_drift_aborts_before_write() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut config = get_test_config(dir.path());
    config.columns.salary = ColumnSpec::index(2).expecting("Salary");
    let (harvester, sink) = create_test_harvester(config)?;

    let mut session = SimulatedSession::single(
        SimulatedSlate::new("Main")
            .with_header(&["POS", "PLAYER", "OPP", "FPPG", "POINTS"])
            .row(&jane_doe_row()),
    );

    let result = harvester.run(&mut session, run_key(), &sink).await;

    assert!(matches!(result, Err(AppError::LayoutDrift { .. })));
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_snapshot_replay_harvests_implicit_slate() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut config = get_test_config(dir.path());
    config.slates.discover = false;
    let (harvester, _sink) = create_test_harvester(config)?;

    let html = r#"
        <html><body>
            <select name="gameTime"><option>Sun 1:00pm ET</option><option>Sun 4:05pm ET</option></select>
            <table>
                <tr><th>POS</th><th></th><th>PLAYER</th><th>SALARY</th><th>FPPG</th><th>POINTS</th></tr>
                <tr>
                    <td>QB</td><td><img src="a.png"></td>
                    <td><div>Jane Doe</div><div>TEAM vs TEAM</div><div>12-20, 150 YDS</div></td>
                    <td>$28</td><td>18.4</td><td>21.0</td>
                </tr>
                <tr>
                    <td>DEF</td><td></td>
                    <td><div>Bears</div><div>CHI @ GB</div></td>
                    <td>$8</td><td>5.5</td><td>0</td>
                </tr>
            </table>
        </body></html>
    "#;
    let mut session = SimulatedSession::from_html(html);

    let report = harvester.harvest(&mut session, run_key()).await?;

    assert!(report.implicit);
    assert_eq!(report.dataset.len(), 2);
    let bears = &report.dataset.records()[1];
    assert_eq!(bears.position, "DEF");
    assert_eq!(bears.matchup_text, "CHI @ GB");
    assert_eq!(bears.box_score_text, "");
    assert!(bears.inactive);
    assert_eq!(report.diagnostics.inactive_records, 1);
    assert_eq!(report.summary().inactive, 1);

    Ok(())
}
