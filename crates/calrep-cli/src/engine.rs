//! Cache-or-fetch report orchestration.
//!
//! [`run_period`] resolves a period, serves it from the SQLite cache when a
//! complete entry exists, and otherwise fetches from the event source,
//! stores the result atomically and aggregates the report. A failed fetch
//! or store leaves the cache untouched, so the next run retries cleanly.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use tracing::{debug, warn};

use calrep_core::{
    Event, PeriodKind, RawEvent, Report, ReportConfig, build_report, derive_key,
};
use calrep_db::PeriodStore;
use calrep_gcal::EventSource;

/// Result of one report run.
#[derive(Debug)]
pub struct ReportOutcome {
    pub report: Report,
    pub key: String,
    pub from_cache: bool,
    /// Malformed events dropped during ingestion; zero on cache hits.
    pub dropped: usize,
}

/// Result of a fetch-only run.
#[derive(Debug)]
pub struct FetchOutcome {
    pub key: String,
    pub stored: usize,
    pub dropped: usize,
}

/// Produces the report for a period, fetching on a cache miss.
///
/// `refresh` bypasses the cache read; the fetched result still replaces the
/// cached entry.
pub fn run_period<S: EventSource>(
    store: &mut PeriodStore,
    source: &mut S,
    kind: &PeriodKind,
    now: DateTime<Tz>,
    config: &ReportConfig,
    calendar_ids: &[String],
    refresh: bool,
) -> Result<ReportOutcome> {
    let (start, end) = kind.resolve(now).context("failed to resolve period")?;
    let kind_tag = kind.to_string();
    let key = derive_key(&kind_tag, &start, &end);

    if !refresh {
        if let Some(events) = store
            .load(&key)
            .with_context(|| format!("failed to read cached period {key}"))?
        {
            debug!(key, events = events.len(), "serving report from cache");
            return Ok(ReportOutcome {
                report: build_report(&events, &start, &end, config),
                key,
                from_cache: true,
                dropped: 0,
            });
        }
    }

    let (events, dropped) = fetch_and_store(
        store,
        source,
        &kind_tag,
        &start.fixed_offset(),
        &end.fixed_offset(),
        config.all_day_event_hours,
        calendar_ids,
    )?;
    Ok(ReportOutcome {
        report: build_report(&events, &start, &end, config),
        key,
        from_cache: false,
        dropped,
    })
}

/// Fetches and caches a period without aggregating a report.
pub fn fetch_period<S: EventSource>(
    store: &mut PeriodStore,
    source: &mut S,
    kind: &PeriodKind,
    now: DateTime<Tz>,
    all_day_event_hours: f64,
    calendar_ids: &[String],
) -> Result<FetchOutcome> {
    let (start, end) = kind.resolve(now).context("failed to resolve period")?;
    let kind_tag = kind.to_string();
    let key = derive_key(&kind_tag, &start, &end);
    let (events, dropped) = fetch_and_store(
        store,
        source,
        &kind_tag,
        &start.fixed_offset(),
        &end.fixed_offset(),
        all_day_event_hours,
        calendar_ids,
    )?;
    Ok(FetchOutcome {
        key,
        stored: events.len(),
        dropped,
    })
}

fn fetch_and_store<S: EventSource>(
    store: &mut PeriodStore,
    source: &mut S,
    kind_tag: &str,
    start: &DateTime<FixedOffset>,
    end: &DateTime<FixedOffset>,
    all_day_event_hours: f64,
    calendar_ids: &[String],
) -> Result<(Vec<Event>, usize)> {
    let raw = source
        .fetch_events(calendar_ids, start, end)
        .context("failed to fetch calendar events")?;
    let (events, dropped) = validate_events(raw);
    let stored = store
        .store(kind_tag, start, end, &events, all_day_event_hours)
        .context("failed to cache fetched events")?;
    debug!(kind = kind_tag, stored, dropped, "cached fetched period");
    Ok((events, dropped))
}

/// Validates raw events, dropping and logging malformed ones.
fn validate_events(raw: Vec<RawEvent>) -> (Vec<Event>, usize) {
    let mut events = Vec::with_capacity(raw.len());
    let mut dropped = 0;
    for raw_event in raw {
        match Event::from_raw(raw_event) {
            Ok(event) => events.push(event),
            Err(err) => {
                warn!(%err, "dropping malformed event");
                dropped += 1;
            }
        }
    }
    (events, dropped)
}
