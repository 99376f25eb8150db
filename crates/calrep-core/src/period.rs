//! Period kinds, boundary resolution and cache-key derivation.
//!
//! A period is a named, bounded date range whose fetched events may be
//! cached as a unit. Its identity is the deterministic key produced by
//! [`derive_key`]; every cache decision rests on that determinism.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use thiserror::Error;

/// Errors from parsing or resolving a period.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PeriodError {
    /// The period kind string was not recognized.
    #[error("invalid period kind: {value}")]
    InvalidKind { value: String },
    /// A `month_N` kind with N outside 1..=12.
    #[error("invalid month number: {value}")]
    InvalidMonth { value: u32 },
    /// A custom range with the end before the start.
    #[error("custom period end {end} is before start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    /// Custom periods need explicit dates; the bare kind string carries none.
    #[error("custom periods require explicit start and end dates")]
    CustomNeedsDates,
    /// A resolved boundary does not exist in the calendar.
    #[error("date is not representable: {date}")]
    UnrepresentableDate { date: String },
}

/// A named period type.
///
/// The string form (`last_month`, `month_3`, `custom`, ...) is the `kind`
/// tag embedded in period keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodKind {
    /// The previous calendar month.
    LastMonth,
    /// January 1st through December 31st of the current year.
    CurrentYear,
    /// January 1st through December 31st of the previous year.
    LastYear,
    /// A specific month (1-12) of the current year.
    Month(u32),
    /// An explicit date range, both ends inclusive.
    Custom { start: NaiveDate, end: NaiveDate },
}

impl PeriodKind {
    /// Resolves this kind to concrete `(start, end)` boundaries in the
    /// given timezone: start at 00:00:00, end at 23:59:59.
    pub fn resolve(&self, now: DateTime<Tz>) -> Result<(DateTime<Tz>, DateTime<Tz>), PeriodError> {
        let tz = now.timezone();
        let (first_day, last_day) = match *self {
            Self::LastMonth => {
                let this_month_first = ymd(now.year(), now.month(), 1)?;
                let prev_month_last = this_month_first - Duration::days(1);
                let prev_month_first =
                    ymd(prev_month_last.year(), prev_month_last.month(), 1)?;
                (prev_month_first, prev_month_last)
            }
            Self::CurrentYear => (ymd(now.year(), 1, 1)?, ymd(now.year(), 12, 31)?),
            Self::LastYear => (ymd(now.year() - 1, 1, 1)?, ymd(now.year() - 1, 12, 31)?),
            Self::Month(month) => {
                if !(1..=12).contains(&month) {
                    return Err(PeriodError::InvalidMonth { value: month });
                }
                let first = ymd(now.year(), month, 1)?;
                (first, last_day_of_month(now.year(), month)?)
            }
            Self::Custom { start, end } => {
                if end < start {
                    return Err(PeriodError::InvalidRange { start, end });
                }
                (start, end)
            }
        };

        let start = local_datetime(tz, first_day, NaiveTime::MIN)?;
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        let end = local_datetime(tz, last_day, end_of_day)?;
        Ok((start, end))
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastMonth => write!(f, "last_month"),
            Self::CurrentYear => write!(f, "current_year"),
            Self::LastYear => write!(f, "last_year"),
            Self::Month(month) => write!(f, "month_{month}"),
            Self::Custom { .. } => write!(f, "custom"),
        }
    }
}

impl FromStr for PeriodKind {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last_month" => Ok(Self::LastMonth),
            "current_year" => Ok(Self::CurrentYear),
            "last_year" => Ok(Self::LastYear),
            "custom" => Err(PeriodError::CustomNeedsDates),
            _ => {
                let month = s
                    .strip_prefix("month_")
                    .and_then(|n| n.parse::<u32>().ok())
                    .ok_or_else(|| PeriodError::InvalidKind {
                        value: s.to_string(),
                    })?;
                if (1..=12).contains(&month) {
                    Ok(Self::Month(month))
                } else {
                    Err(PeriodError::InvalidMonth { value: month })
                }
            }
        }
    }
}

/// Derives the deterministic cache key for a period.
///
/// Format: `{kind}_{start:YYYYMMDD}_{end:YYYYMMDD}`. Equal arguments always
/// produce an identical string; this underlies all cache-hit logic.
#[must_use]
pub fn derive_key<Tz: TimeZone>(kind: &str, start: &DateTime<Tz>, end: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    format!(
        "{kind}_{}_{}",
        start.format("%Y%m%d"),
        end.format("%Y%m%d")
    )
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate, PeriodError> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| PeriodError::UnrepresentableDate {
        date: format!("{year:04}-{month:02}-{day:02}"),
    })
}

fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate, PeriodError> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    Ok(ymd(next_year, next_month, 1)? - Duration::days(1))
}

/// Maps a local wall-clock time into the timezone.
///
/// Ambiguous times (DST fall-back) take the earlier instant; times inside a
/// DST gap are shifted forward one hour, which is guaranteed to exist.
fn local_datetime(tz: Tz, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Tz>, PeriodError> {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(instant) | LocalResult::Ambiguous(instant, _) => Ok(instant),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .ok_or_else(|| PeriodError::UnrepresentableDate {
                date: naive.to_string(),
            }),
    }
}
