use super::*;
use slate_harvester::{AppError, SimulatedSession, sink::{COLUMNS, SlateColumn}};
use tempfile::TempDir;

#[test]
fn test_written_file_matches_column_contract() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let (harvester, sink) = create_test_harvester(get_test_config(dir.path()))?;

    let mut session = SimulatedSession::single(
        SimulatedSlate::new("Main")
            .row(&["QB", "Jane Doe\nTEAM vs TEAM\n12-20, 150 YDS", "$28", "18.4", "21.0"])
            .row(&["RB", "Max Run\nKC @ LV", "$abc", "—", "DNP"]),
    );

    let outcome = tokio_test::block_on(harvester.run(&mut session, run_key(), &sink))?;
    let path = outcome.written.expect("file should be written");

    let mut reader = csv::Reader::from_path(&path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    assert_eq!(headers, COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>());

    let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][3], "12-20, 150 YDS");
    assert_eq!(&rows[0][9], "Week 5");
    assert_eq!(&rows[0][10], "Sunday");

    // Malformed numbers are written empty, never as zero
    assert_eq!(&rows[1][4], "");
    assert_eq!(&rows[1][5], "");
    assert_eq!(&rows[1][6], "");

    Ok(())
}

#[test]
fn test_persistence_failure_is_fatal() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let blocker = dir.path().join("data_csv");
    std::fs::write(&blocker, "occupied")?;

    let (harvester, sink) = create_test_harvester(get_test_config(&blocker))?;
    let mut session = SimulatedSession::single(roster("Main", "P", 3));

    let result = tokio_test::block_on(harvester.run(&mut session, run_key(), &sink));

    match result {
        Err(err @ AppError::Persistence(_)) => assert!(err.is_fatal()),
        other => panic!("expected persistence error, got {:?}", other.map(|o| o.written)),
    }
    assert_eq!(std::fs::read_to_string(&blocker)?, "occupied");

    Ok(())
}

#[test]
fn test_slate_column_always() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut config = get_test_config(dir.path());
    config.output.include_slate_column = SlateColumn::Always;
    config.output.delimiter = ";".to_string();
    let (harvester, sink) = create_test_harvester(config)?;

    let mut session = SimulatedSession::single(roster("Main", "S", 2));
    let outcome = tokio_test::block_on(harvester.run(&mut session, run_key(), &sink))?;

    let contents = std::fs::read_to_string(outcome.written.unwrap())?;
    let mut lines = contents.lines();
    assert!(lines.next().unwrap().ends_with(";slate_id"));
    assert!(lines.next().unwrap().ends_with(";default"));

    Ok(())
}
