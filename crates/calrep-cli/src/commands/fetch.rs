//! Fetch command: warm the period cache without reporting.

use std::io::Write;

use anyhow::Result;
use chrono::Utc;

use calrep_gcal::GcalSource;

use crate::cli::PeriodArgs;
use crate::commands::{open_store, resolve_kind, timezone};
use crate::{Config, engine};

pub fn run<W: Write>(writer: &mut W, config: &Config, period: &PeriodArgs) -> Result<()> {
    let kind = resolve_kind(period)?;
    let tz = timezone(config)?;
    let now = Utc::now().with_timezone(&tz);

    let mut store = open_store(config)?;
    let mut source = GcalSource::new(config.token_path.clone());
    let outcome = engine::fetch_period(
        &mut store,
        &mut source,
        &kind,
        now,
        config.all_day_event_hours,
        &config.calendars,
    )?;

    writeln!(writer, "Cached {} events for {}", outcome.stored, outcome.key)?;
    if outcome.dropped > 0 {
        writeln!(writer, "Dropped {} malformed events", outcome.dropped)?;
    }
    Ok(())
}
