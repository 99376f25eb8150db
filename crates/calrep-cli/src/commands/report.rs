//! Report command: cached-or-fetched time reports.

use std::io::Write;

use anyhow::Result;
use chrono::Utc;

use calrep_core::ReportConfig;
use calrep_gcal::GcalSource;

use crate::cli::PeriodArgs;
use crate::commands::{open_store, resolve_kind, timezone};
use crate::{Config, engine, render};

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    period: &PeriodArgs,
    json: bool,
    refresh: bool,
) -> Result<()> {
    let kind = resolve_kind(period)?;
    let tz = timezone(config)?;
    let now = Utc::now().with_timezone(&tz);
    let report_config = ReportConfig {
        all_day_event_hours: config.all_day_event_hours,
        working_days_per_week: config.working_days_per_week,
    };

    let mut store = open_store(config)?;
    let mut source = GcalSource::new(config.token_path.clone());
    let outcome = engine::run_period(
        &mut store,
        &mut source,
        &kind,
        now,
        &report_config,
        &config.calendars,
        refresh,
    )?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&outcome.report)?)?;
    } else {
        render::render(writer, &outcome.report)?;
    }
    Ok(())
}
