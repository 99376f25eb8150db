//! Human-readable report rendering.
//!
//! Formats an aggregated [`Report`] for the terminal. All numbers come
//! precomputed from the aggregation; this module only lays them out.

use std::io::Write;

use anyhow::Result;

use calrep_core::{EventEntry, Report};

fn section<W: Write>(writer: &mut W, title: &str) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{title}")?;
    writeln!(writer, "{}", "─".repeat(title.chars().count()))?;
    Ok(())
}

/// Period-total time: plain hours under a day, days with the hour total
/// alongside from a day up.
fn total_time_label(hours: f64) -> String {
    if hours < 24.0 {
        format!("{hours:.1} hours")
    } else {
        format!("{:.1} days ({hours:.1} hours)", hours / 24.0)
    }
}

fn event_line(entry: &EventEntry) -> String {
    let time = if entry.end_label.is_empty() {
        entry.start_label.clone()
    } else {
        format!("{}-{}", entry.start_label, entry.end_label)
    };
    format!(
        "{}  {time:<11}  {} ({})",
        entry.date, entry.title, entry.duration_label
    )
}

/// Writes the full text report.
pub fn render<W: Write>(writer: &mut W, report: &Report) -> Result<()> {
    writeln!(
        writer,
        "TIME REPORT: {} - {}",
        report.period_start.format("%B %d, %Y"),
        report.period_end.format("%B %d, %Y")
    )?;

    if report.event_count == 0 {
        writeln!(writer)?;
        writeln!(writer, "No events in this period.")?;
        return Ok(());
    }

    section(writer, "EVENTS")?;
    for entry in &report.chronological {
        writeln!(writer, "{}", event_line(entry))?;
    }

    section(writer, "TIME SUMMARY")?;
    writeln!(writer, "Total events:        {}", report.event_count)?;
    writeln!(
        writer,
        "Total time:          {}",
        total_time_label(report.total_hours)
    )?;
    writeln!(writer, "Total days:          {}", report.stats.total_days)?;
    writeln!(writer, "Working days:        {}", report.stats.working_days)?;
    writeln!(
        writer,
        "Avg per working day: {:.1} hours",
        report.stats.avg_hours_per_working_day
    )?;

    if !report.categories.is_empty() {
        section(writer, "CATEGORIZED EVENTS")?;
        for category in &report.categories {
            writeln!(
                writer,
                "{}: {} ({} events)",
                category.name,
                calrep_core::duration_label(category.total_hours),
                category.event_count
            )?;
            for subcategory in &category.subcategories {
                writeln!(
                    writer,
                    "  {}: {}",
                    subcategory.name,
                    calrep_core::duration_label(subcategory.total_hours)
                )?;
                for entry in &subcategory.events {
                    writeln!(writer, "    {}", event_line(entry))?;
                }
            }
        }
    }

    if !report.uncategorized.is_empty() {
        section(writer, "UNCATEGORIZED EVENTS")?;
        for entry in &report.uncategorized {
            writeln!(writer, "{}", event_line(entry))?;
        }
        writeln!(
            writer,
            "Total uncategorized: {}",
            calrep_core::duration_label(report.uncategorized_hours)
        )?;
    }

    if !report.recurring.is_empty() {
        section(writer, "SUMMARY OF RECURRING EVENTS")?;
        for entry in &report.recurring {
            writeln!(
                writer,
                "{}: {} times, {}",
                entry.title, entry.occurrences, entry.duration_label
            )?;
        }
    }

    Ok(())
}
