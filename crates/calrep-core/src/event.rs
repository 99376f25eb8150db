//! Event model and ingestion validation.
//!
//! Raw events arrive from the calendar API as loosely-shaped records where
//! every field is optional. [`Event::from_raw`] validates them once, at
//! ingestion, into a tagged [`TimeSpan`] so that downstream code never has
//! to re-check which representation is populated.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Deserialize;
use thiserror::Error;

/// Per-event validation errors.
///
/// These are never fatal to a batch: a malformed event is dropped (and
/// logged by the caller) while the rest of the batch proceeds.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedEvent {
    /// The event has no id.
    #[error("event is missing an id")]
    MissingId,
    /// The event has no title.
    #[error("event {id} is missing a title")]
    MissingTitle { id: String },
    /// Neither the all-day nor the timed representation is fully populated.
    #[error("event {id} has no usable time span")]
    MissingTimeSpan { id: String },
}

/// One raw event record as returned by the calendar API.
///
/// `start`/`end` carry either a calendar `date` (all-day events) or a
/// `dateTime` instant with offset (timed events).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEvent {
    pub id: Option<String>,
    pub summary: Option<String>,
    pub start: Option<RawEventTime>,
    pub end: Option<RawEventTime>,
    #[serde(rename = "colorId")]
    pub color_id: Option<String>,
}

/// One boundary of a raw event: a date xor an instant.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEventTime {
    pub date: Option<NaiveDate>,
    #[serde(rename = "dateTime")]
    pub date_time: Option<DateTime<FixedOffset>>,
}

/// When an event occurred: exactly one of the two representations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeSpan {
    /// A calendar-date range; `end` is exclusive, so a one-day event has
    /// `end = start + 1 day`.
    AllDay { start: NaiveDate, end: NaiveDate },
    /// Absolute instants with offset. Durations are computed on the
    /// instants themselves, so DST transitions cannot drift the result.
    Timed {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },
}

impl TimeSpan {
    /// Elapsed hours for this span.
    ///
    /// All-day events count `all_day_event_hours` per calendar day. An
    /// inverted all-day range (`end < start`) yields a negative value which
    /// is passed through unmodified.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "calendar-scale day and second counts fit in f64 exactly"
    )]
    pub fn duration_hours(&self, all_day_event_hours: f64) -> f64 {
        match self {
            Self::AllDay { start, end } => {
                let days = (*end - *start).num_days();
                days as f64 * all_day_event_hours
            }
            Self::Timed { start, end } => {
                let seconds = (*end - *start).num_seconds();
                seconds as f64 / 3600.0
            }
        }
    }

    /// The event's display date in `YYYY-MM-DD` form.
    ///
    /// Lexicographic order on this string matches chronological order, which
    /// the report aggregation relies on for its date sorts.
    #[must_use]
    pub fn display_date(&self) -> String {
        match self {
            Self::AllDay { start, .. } => start.format("%Y-%m-%d").to_string(),
            Self::Timed { start, .. } => start.format("%Y-%m-%d").to_string(),
        }
    }

    /// Start/end-of-day labels: `("All day", "")` for all-day events,
    /// `HH:MM` pairs for timed ones.
    #[must_use]
    pub fn time_labels(&self) -> (String, String) {
        match self {
            Self::AllDay { .. } => ("All day".to_string(), String::new()),
            Self::Timed { start, end } => (
                start.format("%H:%M").to_string(),
                end.format("%H:%M").to_string(),
            ),
        }
    }

    /// Whether this is the all-day representation.
    #[must_use]
    pub const fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay { .. })
    }
}

/// A validated calendar occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Source-assigned unique id.
    pub id: String,
    /// Free-form title; may carry an `@XXX` category tag.
    pub title: String,
    pub time_span: TimeSpan,
    /// Opaque color identifier, passed through untouched.
    pub color_tag: Option<String>,
}

impl Event {
    /// Validates a raw record into an [`Event`].
    ///
    /// Missing id or title and events lacking both time representations are
    /// rejected; rejection is a per-event tolerance, not a batch failure.
    pub fn from_raw(raw: RawEvent) -> Result<Self, MalformedEvent> {
        let id = match raw.id {
            Some(id) if !id.is_empty() => id,
            _ => return Err(MalformedEvent::MissingId),
        };
        let title = match raw.summary {
            Some(title) if !title.is_empty() => title,
            _ => return Err(MalformedEvent::MissingTitle { id }),
        };

        let start = raw.start.unwrap_or_default();
        let end = raw.end.unwrap_or_default();
        let time_span = match (start.date, end.date, start.date_time, end.date_time) {
            (Some(start), Some(end), _, _) => TimeSpan::AllDay { start, end },
            (_, _, Some(start), Some(end)) => TimeSpan::Timed { start, end },
            _ => return Err(MalformedEvent::MissingTimeSpan { id }),
        };

        Ok(Self {
            id,
            title,
            time_span,
            color_tag: raw.color_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, title: &str) -> RawEvent {
        RawEvent {
            id: Some(id.to_string()),
            summary: Some(title.to_string()),
            ..RawEvent::default()
        }
    }

    fn all_day(start: &str, end: &str) -> (Option<RawEventTime>, Option<RawEventTime>) {
        (
            Some(RawEventTime {
                date: start.parse().ok(),
                date_time: None,
            }),
            Some(RawEventTime {
                date: end.parse().ok(),
                date_time: None,
            }),
        )
    }

    fn timed(start: &str, end: &str) -> (Option<RawEventTime>, Option<RawEventTime>) {
        (
            Some(RawEventTime {
                date: None,
                date_time: DateTime::parse_from_rfc3339(start).ok(),
            }),
            Some(RawEventTime {
                date: None,
                date_time: DateTime::parse_from_rfc3339(end).ok(),
            }),
        )
    }

    #[test]
    fn from_raw_accepts_all_day_events() {
        let mut event = raw("1", "@ENG Standup");
        (event.start, event.end) = all_day("2024-03-01", "2024-03-02");

        let event = Event::from_raw(event).unwrap();
        assert!(event.time_span.is_all_day());
        assert_eq!(event.time_span.display_date(), "2024-03-01");
    }

    #[test]
    fn from_raw_accepts_timed_events() {
        let mut event = raw("2", "Lunch");
        (event.start, event.end) =
            timed("2024-01-01T12:00:00-03:00", "2024-01-01T13:00:00-03:00");

        let event = Event::from_raw(event).unwrap();
        assert!(!event.time_span.is_all_day());
        assert_eq!(event.time_span.time_labels(), ("12:00".into(), "13:00".into()));
    }

    #[test]
    fn from_raw_rejects_missing_id_and_title() {
        let mut no_id = raw("x", "Has title");
        no_id.id = None;
        assert_eq!(Event::from_raw(no_id), Err(MalformedEvent::MissingId));

        let mut no_title = raw("3", "x");
        no_title.summary = None;
        assert_eq!(
            Event::from_raw(no_title),
            Err(MalformedEvent::MissingTitle { id: "3".into() })
        );
    }

    #[test]
    fn from_raw_rejects_missing_time_span() {
        let event = raw("4", "No times");
        assert_eq!(
            Event::from_raw(event),
            Err(MalformedEvent::MissingTimeSpan { id: "4".into() })
        );
    }

    #[test]
    fn raw_event_deserializes_api_shape() {
        let json = r#"{
            "id": "abc",
            "summary": "@ENG Review",
            "start": {"dateTime": "2024-01-01T09:00:00-03:00"},
            "end": {"dateTime": "2024-01-01T11:30:00-03:00"},
            "colorId": "5"
        }"#;
        let raw: RawEvent = serde_json::from_str(json).unwrap();
        let event = Event::from_raw(raw).unwrap();
        assert_eq!(event.id, "abc");
        assert_eq!(event.color_tag.as_deref(), Some("5"));
        assert!((event.time_span.duration_hours(8.0) - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn all_day_duration_uses_configured_hours() {
        let mut event = raw("5", "Offsite");
        (event.start, event.end) = all_day("2024-03-01", "2024-03-02");
        let event = Event::from_raw(event).unwrap();
        assert!((event.time_span.duration_hours(8.0) - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn inverted_all_day_range_passes_through_negative() {
        let mut event = raw("6", "Inverted");
        (event.start, event.end) = all_day("2024-03-02", "2024-03-01");
        let event = Event::from_raw(event).unwrap();
        assert!((event.time_span.duration_hours(8.0) - (-8.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn timed_duration_is_offset_aware() {
        // Same instant expressed in two offsets: zero elapsed time.
        let mut event = raw("7", "Offset check");
        (event.start, event.end) =
            timed("2024-01-01T12:00:00-03:00", "2024-01-01T15:00:00+00:00");
        let event = Event::from_raw(event).unwrap();
        assert!((event.time_span.duration_hours(8.0)).abs() < f64::EPSILON);
    }
}
