//! Core domain logic for the calendar report generator.
//!
//! This crate contains the fundamental types and logic for:
//! - Events: validated calendar occurrences with an all-day or timed span
//! - Periods: named date ranges and their deterministic cache keys
//! - Categorization: extracting `@XXX` tags from event titles
//! - Reports: aggregating events into categorized, duration-summed views

pub mod category;
pub mod event;
pub mod period;
pub mod report;

pub use category::{OTHER_CATEGORY, categorize, is_recurring_candidate};
pub use event::{Event, MalformedEvent, RawEvent, RawEventTime, TimeSpan};
pub use period::{PeriodError, PeriodKind, derive_key};
pub use report::{
    CategorySummary, EventEntry, RecurringEntry, Report, ReportConfig, SubcategorySummary,
    WorkingTimeStats, build_report, duration_label,
};
