//! Status command for inspecting the period cache.

use std::io::Write;

use anyhow::Result;

use crate::Config;
use crate::commands::open_store;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let periods = store.list_periods()?;

    writeln!(writer, "Period cache: {}", config.database_path.display())?;

    if periods.is_empty() {
        writeln!(writer, "No cached periods.")?;
        return Ok(());
    }

    writeln!(writer, "Periods:")?;
    for period in periods {
        let state = if period.is_complete { "" } else { " (incomplete)" };
        writeln!(
            writer,
            "- {}: {}..{}, {} events{state}",
            period.key, period.start_date, period.end_date, period.event_count
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use calrep_core::{Event, TimeSpan};
    use calrep_db::PeriodStore;
    use chrono::DateTime;

    #[test]
    fn status_lists_cached_periods_with_counts() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("periods.db");
        let mut store = PeriodStore::open(&db_path).unwrap();

        let start = DateTime::parse_from_rfc3339("2024-03-01T00:00:00-03:00").unwrap();
        let end = DateTime::parse_from_rfc3339("2024-03-31T23:59:59-03:00").unwrap();
        let events = vec![Event {
            id: "1".to_string(),
            title: "Lunch".to_string(),
            time_span: TimeSpan::Timed {
                start: DateTime::parse_from_rfc3339("2024-03-04T12:00:00-03:00").unwrap(),
                end: DateTime::parse_from_rfc3339("2024-03-04T13:00:00-03:00").unwrap(),
            },
            color_tag: None,
        }];
        store.store("month_3", &start, &end, &events, 8.0).unwrap();
        drop(store);

        let config = Config {
            database_path: db_path,
            ..Config::default()
        };
        let mut output = Vec::new();
        run(&mut output, &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Periods:"));
        assert!(
            output.contains("- month_3_20240301_20240331: 2024-03-01..2024-03-31, 1 events")
        );
    }

    #[test]
    fn status_reports_an_empty_cache() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            database_path: temp.path().join("periods.db"),
            ..Config::default()
        };
        let mut output = Vec::new();
        run(&mut output, &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("No cached periods."));
    }
}
