//! Report aggregation.
//!
//! [`build_report`] turns a resolved event list plus period boundaries into
//! an immutable [`Report`]: a chronological listing, category/subcategory
//! groupings with totals, working-day statistics and a recurring-events
//! summary. Presentation layers only format the result; no further
//! computation is expected of them.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, TimeZone};
use serde::Serialize;

use crate::category::{OTHER_CATEGORY, categorize, is_recurring_candidate};
use crate::event::Event;

/// Aggregation knobs supplied by the application configuration.
#[derive(Debug, Clone, Copy)]
pub struct ReportConfig {
    /// Hours counted per calendar day of an all-day event.
    pub all_day_event_hours: f64,
    /// Working days per seven-day week, for the working-time statistics.
    pub working_days_per_week: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            all_day_event_hours: 8.0,
            working_days_per_week: 5,
        }
    }
}

/// One event resolved into display fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventEntry {
    pub title: String,
    pub category: String,
    pub subcategory: String,
    /// `YYYY-MM-DD`; lexicographic order matches chronological order.
    pub date: String,
    /// `HH:MM`, or `"All day"` for all-day events.
    pub start_label: String,
    /// `HH:MM`, empty for all-day events.
    pub end_label: String,
    pub duration_hours: f64,
    pub duration_label: String,
    pub color_tag: Option<String>,
}

/// Events sharing one subcategory within a category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubcategorySummary {
    pub name: String,
    pub total_hours: f64,
    /// Chronologically ascending.
    pub events: Vec<EventEntry>,
}

/// One `@XXX` category with its subcategory breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub total_hours: f64,
    pub event_count: usize,
    /// Sorted by summed duration, descending; encounter order breaks ties.
    pub subcategories: Vec<SubcategorySummary>,
}

/// Working-time statistics over the report period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorkingTimeStats {
    pub total_days: i64,
    pub working_days: i64,
    pub total_hours: f64,
    /// Zero when the period contains no working days.
    pub avg_hours_per_working_day: f64,
}

/// One distinct recurring title, ranked by total duration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecurringEntry {
    pub title: String,
    pub occurrences: usize,
    pub total_hours: f64,
    pub duration_label: String,
}

/// The complete aggregated report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub event_count: usize,
    pub total_hours: f64,
    /// All events, categorized and not, sorted by date ascending.
    pub chronological: Vec<EventEntry>,
    /// Sorted by summed duration, descending; encounter order breaks ties.
    pub categories: Vec<CategorySummary>,
    /// Sorted by individual event duration, descending.
    pub uncategorized: Vec<EventEntry>,
    pub uncategorized_hours: f64,
    pub stats: WorkingTimeStats,
    pub recurring: Vec<RecurringEntry>,
}

/// Formats a duration for display: minutes under one hour, hours to one
/// decimal under a day, days to one decimal beyond that.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "sub-hour durations fit in i64 minutes"
)]
pub fn duration_label(hours: f64) -> String {
    if hours < 1.0 {
        format!("{} min", (hours * 60.0) as i64)
    } else if hours < 24.0 {
        format!("{hours:.1} hrs")
    } else {
        format!("{:.1} days", hours / 24.0)
    }
}

#[derive(Debug, Default)]
struct Accumulated {
    hours: f64,
    count: usize,
}

/// Ordered accumulator: preserves first-encounter order for stable
/// tie-breaking in the duration sorts.
#[derive(Debug, Default)]
struct OrderedTotals {
    order: Vec<String>,
    totals: HashMap<String, Accumulated>,
}

impl OrderedTotals {
    fn add(&mut self, key: &str, hours: f64) {
        let entry = self.totals.entry(key.to_string()).or_insert_with(|| {
            self.order.push(key.to_string());
            Accumulated::default()
        });
        entry.hours += hours;
        entry.count += 1;
    }

    fn get(&self, key: &str) -> (f64, usize) {
        self.totals
            .get(key)
            .map_or((0.0, 0), |accumulated| (accumulated.hours, accumulated.count))
    }
}

/// Builds the aggregated report for `events` over `[start, end]`.
pub fn build_report<Tz: TimeZone>(
    events: &[Event],
    start: &DateTime<Tz>,
    end: &DateTime<Tz>,
    config: &ReportConfig,
) -> Report {
    let mut title_totals = OrderedTotals::default();
    let mut category_totals = OrderedTotals::default();
    let mut categorized: Vec<(String, Vec<EventEntry>)> = Vec::new();
    let mut uncategorized: Vec<EventEntry> = Vec::new();

    for event in events {
        let (category, subcategory) = categorize(&event.title);
        let hours = event.time_span.duration_hours(config.all_day_event_hours);
        let (start_label, end_label) = event.time_span.time_labels();
        let entry = EventEntry {
            title: event.title.clone(),
            subcategory,
            date: event.time_span.display_date(),
            start_label,
            end_label,
            duration_hours: hours,
            duration_label: duration_label(hours),
            color_tag: event.color_tag.clone(),
            category: category.clone(),
        };

        title_totals.add(&event.title, hours);
        category_totals.add(&category, hours);

        if category == OTHER_CATEGORY {
            uncategorized.push(entry);
        } else {
            match categorized.iter_mut().find(|(name, _)| *name == category) {
                Some((_, entries)) => entries.push(entry),
                None => categorized.push((category, vec![entry])),
            }
        }
    }

    let chronological = build_chronological(&categorized, &uncategorized);
    let categories = build_categories(categorized, &category_totals);
    let recurring = build_recurring(&title_totals);

    let (uncategorized_hours, _) = category_totals.get(OTHER_CATEGORY);
    let mut uncategorized = uncategorized;
    uncategorized.sort_by(|a, b| b.duration_hours.total_cmp(&a.duration_hours));

    let total_hours: f64 = title_totals
        .order
        .iter()
        .map(|title| title_totals.get(title).0)
        .sum();
    let stats = working_time_stats(
        start.date_naive(),
        end.date_naive(),
        total_hours,
        config.working_days_per_week,
    );

    Report {
        period_start: start.date_naive(),
        period_end: end.date_naive(),
        event_count: events.len(),
        total_hours,
        chronological,
        categories,
        uncategorized,
        uncategorized_hours,
        stats,
        recurring,
    }
}

fn build_chronological(
    categorized: &[(String, Vec<EventEntry>)],
    uncategorized: &[EventEntry],
) -> Vec<EventEntry> {
    let mut all: Vec<EventEntry> = categorized
        .iter()
        .flat_map(|(_, entries)| entries.iter().cloned())
        .chain(uncategorized.iter().cloned())
        .collect();
    // Stable: same-day events keep their relative order.
    all.sort_by(|a, b| a.date.cmp(&b.date));
    all
}

fn build_categories(
    categorized: Vec<(String, Vec<EventEntry>)>,
    category_totals: &OrderedTotals,
) -> Vec<CategorySummary> {
    let mut categories: Vec<CategorySummary> = categorized
        .into_iter()
        .map(|(name, entries)| {
            let (total_hours, _) = category_totals.get(&name);
            let event_count = entries.len();
            CategorySummary {
                name,
                total_hours,
                event_count,
                subcategories: build_subcategories(entries),
            }
        })
        .collect();
    categories.sort_by(|a, b| b.total_hours.total_cmp(&a.total_hours));
    categories
}

fn build_subcategories(entries: Vec<EventEntry>) -> Vec<SubcategorySummary> {
    let mut subcategories: Vec<SubcategorySummary> = Vec::new();
    for entry in entries {
        match subcategories
            .iter_mut()
            .find(|subcategory| subcategory.name == entry.subcategory)
        {
            Some(subcategory) => {
                subcategory.total_hours += entry.duration_hours;
                subcategory.events.push(entry);
            }
            None => subcategories.push(SubcategorySummary {
                name: entry.subcategory.clone(),
                total_hours: entry.duration_hours,
                events: vec![entry],
            }),
        }
    }
    for subcategory in &mut subcategories {
        subcategory.events.sort_by(|a, b| a.date.cmp(&b.date));
    }
    subcategories.sort_by(|a, b| b.total_hours.total_cmp(&a.total_hours));
    subcategories
}

fn build_recurring(title_totals: &OrderedTotals) -> Vec<RecurringEntry> {
    let mut recurring: Vec<RecurringEntry> = title_totals
        .order
        .iter()
        .filter(|title| is_recurring_candidate(title))
        .map(|title| {
            let (total_hours, occurrences) = title_totals.get(title);
            RecurringEntry {
                title: title.clone(),
                occurrences,
                total_hours,
                duration_label: duration_label(total_hours),
            }
        })
        .collect();
    recurring.sort_by(|a, b| b.total_hours.total_cmp(&a.total_hours));
    recurring
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "day counts are calendar-scale"
)]
fn working_time_stats(
    start: NaiveDate,
    end: NaiveDate,
    total_hours: f64,
    working_days_per_week: u32,
) -> WorkingTimeStats {
    let total_days = (end - start).num_days() + 1;
    let working_days =
        (total_days as f64 / 7.0 * f64::from(working_days_per_week)).round() as i64;
    let avg_hours_per_working_day = if working_days > 0 {
        total_hours / working_days as f64
    } else {
        0.0
    };
    WorkingTimeStats {
        total_days,
        working_days,
        total_hours,
        avg_hours_per_working_day,
    }
}
