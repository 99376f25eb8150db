//! SQLite period cache for the calendar report generator.
//!
//! Fetched events are cached per period under a deterministic period key.
//! A period's `is_complete` flag is only ever written in the same
//! transaction as its events, so a key either has its full event set
//! durably stored or reads as a cache miss. Readers never observe a
//! partially written period.
//!
//! # Thread Safety
//!
//! [`PeriodStore`] wraps a `rusqlite::Connection`, which is `Send` but not
//! `Sync`. Wrap it in a `Mutex` or use one store per thread for
//! multi-threaded access.
//!
//! # Schema
//!
//! Timed event boundaries are stored as RFC 3339 TEXT with their original
//! UTC offset; all-day boundaries as `YYYY-MM-DD` TEXT. The `is_all_day`
//! column selects which representation a row carries. The `duration` and
//! `category` columns are derived at store time for external inspection of
//! the database; loading reconstructs events from the boundary columns
//! alone.

use std::path::Path;

use chrono::{DateTime, FixedOffset};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use tracing::debug;

use calrep_core::{Event, TimeSpan, categorize, derive_key};

/// Period cache errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored boundary string failed to parse back.
    #[error("invalid stored timestamp for event {event_id}: {value}")]
    TimestampParse {
        event_id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Period cache backed by a SQLite database.
///
/// See the [module documentation](self) for the atomicity contract and
/// thread safety considerations.
pub struct PeriodStore {
    conn: Connection,
}

/// Period metadata as stored, for cache inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodRecord {
    pub key: String,
    pub kind: String,
    /// `YYYY-MM-DD`, inclusive.
    pub start_date: String,
    /// `YYYY-MM-DD`, inclusive.
    pub end_date: String,
    pub is_complete: bool,
    pub event_count: usize,
}

impl PeriodStore {
    /// Opens a period cache at the given path, creating it if necessary.
    ///
    /// The schema is initialized on first open.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Opens an in-memory period cache.
    ///
    /// Useful for testing. The cache is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Initializes the schema. Idempotent.
    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS periods (
                period_key TEXT PRIMARY KEY,
                period_type TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                is_complete INTEGER NOT NULL DEFAULT 0
            );

            -- Events table: one row per cached calendar event
            -- start_time/end_time: RFC 3339 for timed rows, YYYY-MM-DD for
            -- all-day rows, selected by is_all_day
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                summary TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                duration REAL NOT NULL,
                is_all_day INTEGER NOT NULL,
                category TEXT NOT NULL,
                period_key TEXT NOT NULL,
                color TEXT,
                FOREIGN KEY (period_key) REFERENCES periods(period_key) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_events_period ON events(period_key);
            ",
        )?;
        Ok(())
    }

    /// Stores a complete event set for a period, replacing any previous
    /// cache entry for the same key. Returns the number of events written.
    ///
    /// Everything happens in one transaction: the period row with
    /// `is_complete = 1`, the removal of stale events and every event
    /// insert. A failure anywhere rolls the whole store back, leaving the
    /// key a cache miss.
    pub fn store(
        &mut self,
        kind: &str,
        start: &DateTime<FixedOffset>,
        end: &DateTime<FixedOffset>,
        events: &[Event],
        all_day_event_hours: f64,
    ) -> Result<usize, StoreError> {
        let key = derive_key(kind, start, end);
        let tx = self.conn.transaction()?;
        tx.execute(
            "
            INSERT OR REPLACE INTO periods (period_key, period_type, start_date, end_date, is_complete)
            VALUES (?, ?, ?, ?, 1)
            ",
            params![
                key,
                kind,
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string(),
            ],
        )?;
        tx.execute("DELETE FROM events WHERE period_key = ?", params![key])?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR REPLACE INTO events
                (id, summary, start_time, end_time, duration, is_all_day, category, period_key, color)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )?;
            for event in events {
                let (start_time, end_time) = boundary_columns(&event.time_span);
                let (category, _) = categorize(&event.title);
                stmt.execute(params![
                    event.id,
                    event.title,
                    start_time,
                    end_time,
                    event.time_span.duration_hours(all_day_event_hours),
                    event.time_span.is_all_day(),
                    category,
                    key,
                    event.color_tag,
                ])?;
            }
        }
        tx.commit()?;
        debug!(key, events = events.len(), "stored period");
        Ok(events.len())
    }

    /// Whether a complete cache entry exists for the key.
    pub fn is_complete(&self, key: &str) -> Result<bool, StoreError> {
        let complete: Option<bool> = self
            .conn
            .query_row(
                "SELECT is_complete FROM periods WHERE period_key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(complete.unwrap_or(false))
    }

    /// Loads the cached events for a key, in insertion order.
    ///
    /// Returns `None` unless the key has a complete entry; an absent or
    /// incomplete period is indistinguishable from a miss by design.
    pub fn load(&self, key: &str) -> Result<Option<Vec<Event>>, StoreError> {
        if !self.is_complete(key)? {
            return Ok(None);
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT id, summary, start_time, end_time, is_all_day, color
            FROM events
            WHERE period_key = ?
            ORDER BY rowid ASC
            ",
        )?;
        let rows = stmt.query_map(params![key], |row| {
            Ok(EventRow {
                id: row.get(0)?,
                summary: row.get(1)?,
                start_time: row.get(2)?,
                end_time: row.get(3)?,
                is_all_day: row.get(4)?,
                color: row.get(5)?,
            })
        })?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?.into_event()?);
        }
        debug!(key, events = events.len(), "loaded cached period");
        Ok(Some(events))
    }

    /// Lists all cached periods ordered by start date.
    pub fn list_periods(&self) -> Result<Vec<PeriodRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT p.period_key, p.period_type, p.start_date, p.end_date, p.is_complete,
                   COUNT(e.id)
            FROM periods p
            LEFT JOIN events e ON e.period_key = p.period_key
            GROUP BY p.period_key
            ORDER BY p.start_date ASC, p.period_key ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PeriodRecord {
                key: row.get(0)?,
                kind: row.get(1)?,
                start_date: row.get(2)?,
                end_date: row.get(3)?,
                is_complete: row.get(4)?,
                event_count: row.get::<_, i64>(5)?.try_into().unwrap_or(0),
            })
        })?;
        let mut periods = Vec::new();
        for row in rows {
            periods.push(row?);
        }
        Ok(periods)
    }
}

struct EventRow {
    id: String,
    summary: String,
    start_time: String,
    end_time: String,
    is_all_day: bool,
    color: Option<String>,
}

impl EventRow {
    fn into_event(self) -> Result<Event, StoreError> {
        let time_span = if self.is_all_day {
            TimeSpan::AllDay {
                start: parse_date(&self.start_time, &self.id)?,
                end: parse_date(&self.end_time, &self.id)?,
            }
        } else {
            TimeSpan::Timed {
                start: parse_instant(&self.start_time, &self.id)?,
                end: parse_instant(&self.end_time, &self.id)?,
            }
        };
        Ok(Event {
            id: self.id,
            title: self.summary,
            time_span,
            color_tag: self.color,
        })
    }
}

fn boundary_columns(time_span: &TimeSpan) -> (String, String) {
    match time_span {
        TimeSpan::AllDay { start, end } => (
            start.format("%Y-%m-%d").to_string(),
            end.format("%Y-%m-%d").to_string(),
        ),
        TimeSpan::Timed { start, end } => (start.to_rfc3339(), end.to_rfc3339()),
    }
}

fn parse_date(value: &str, event_id: &str) -> Result<chrono::NaiveDate, StoreError> {
    value.parse().map_err(|source| StoreError::TimestampParse {
        event_id: event_id.to_string(),
        value: value.to_string(),
        source,
    })
}

fn parse_instant(value: &str, event_id: &str) -> Result<DateTime<FixedOffset>, StoreError> {
    DateTime::parse_from_rfc3339(value).map_err(|source| StoreError::TimestampParse {
        event_id: event_id.to_string(),
        value: value.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn bounds(start: &str, end: &str) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
        (
            DateTime::parse_from_rfc3339(start).unwrap(),
            DateTime::parse_from_rfc3339(end).unwrap(),
        )
    }

    fn march_2024() -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
        bounds("2024-03-01T00:00:00-03:00", "2024-03-31T23:59:59-03:00")
    }

    fn all_day_event(id: &str, title: &str, start: &str, end: &str) -> Event {
        Event {
            id: id.to_string(),
            title: title.to_string(),
            time_span: TimeSpan::AllDay {
                start: start.parse().unwrap(),
                end: end.parse().unwrap(),
            },
            color_tag: None,
        }
    }

    fn timed_event(id: &str, title: &str, start: &str, end: &str) -> Event {
        Event {
            id: id.to_string(),
            title: title.to_string(),
            time_span: TimeSpan::Timed {
                start: DateTime::parse_from_rfc3339(start).unwrap(),
                end: DateTime::parse_from_rfc3339(end).unwrap(),
            },
            color_tag: Some("5".to_string()),
        }
    }

    #[test]
    fn open_in_memory_store() {
        let store = PeriodStore::open_in_memory();
        assert!(store.is_ok());
    }

    #[test]
    fn open_creates_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("periods.db");
        {
            let mut store = PeriodStore::open(&path).expect("open store");
            let (start, end) = march_2024();
            store
                .store("month_3", &start, &end, &[], 8.0)
                .expect("store empty period");
        }
        let store = PeriodStore::open(&path).expect("reopen store");
        assert!(store.is_complete("month_3_20240301_20240331").unwrap());
    }

    #[test]
    fn schema_matches_data_model() {
        let store = PeriodStore::open_in_memory().expect("open in-memory store");

        let periods_columns = table_columns(&store.conn, "periods");
        assert_eq!(
            periods_columns,
            vec!["period_key", "period_type", "start_date", "end_date", "is_complete"]
        );

        let events_columns = table_columns(&store.conn, "events");
        assert_eq!(
            events_columns,
            vec![
                "id",
                "summary",
                "start_time",
                "end_time",
                "duration",
                "is_all_day",
                "category",
                "period_key",
                "color",
            ]
        );

        let event_indexes = index_names(&store.conn, "events");
        assert!(event_indexes.contains("idx_events_period"));

        let events_foreign_keys = foreign_keys(&store.conn, "events");
        assert_eq!(events_foreign_keys.len(), 1);
        assert_eq!(
            events_foreign_keys[0],
            (
                "periods".to_string(),
                "period_key".to_string(),
                "period_key".to_string(),
                "CASCADE".to_string(),
            )
        );
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    fn index_names(conn: &Connection, table: &str) -> HashSet<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA index_list({table})"))
            .expect("prepare index_list");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query index_list");
        rows.map(|row| row.expect("index_list row")).collect()
    }

    fn foreign_keys(conn: &Connection, table: &str) -> Vec<(String, String, String, String)> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA foreign_key_list({table})"))
            .expect("prepare foreign_key_list");
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .expect("query foreign_key_list");
        rows.map(|row| row.expect("foreign_key_list row")).collect()
    }

    #[test]
    fn store_then_load_round_trips_both_span_kinds() {
        let mut store = PeriodStore::open_in_memory().expect("open in-memory store");
        let (start, end) = march_2024();
        let events = vec![
            all_day_event("1", "@ENG Offsite", "2024-03-04", "2024-03-06"),
            timed_event(
                "2",
                "Lunch",
                "2024-03-05T12:00:00-03:00",
                "2024-03-05T13:00:00-03:00",
            ),
        ];

        let stored = store
            .store("month_3", &start, &end, &events, 8.0)
            .expect("store period");
        assert_eq!(stored, 2);

        let key = derive_key("month_3", &start, &end);
        assert_eq!(key, "month_3_20240301_20240331");
        assert!(store.is_complete(&key).unwrap());

        let loaded = store.load(&key).expect("load period").expect("cache hit");
        assert_eq!(loaded, events);
    }

    #[test]
    fn stored_duration_column_uses_configured_all_day_hours() {
        let mut store = PeriodStore::open_in_memory().expect("open in-memory store");
        let (start, end) = march_2024();
        let events = vec![all_day_event("1", "@ENG Offsite", "2024-03-04", "2024-03-06")];

        store.store("month_3", &start, &end, &events, 6.0).unwrap();

        let (duration, category): (f64, String) = store
            .conn
            .query_row(
                "SELECT duration, category FROM events WHERE period_key = ?",
                params![derive_key("month_3", &start, &end)],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert!((duration - 12.0).abs() < f64::EPSILON);
        assert_eq!(category, "ENG");
    }

    #[test]
    fn restore_replaces_previous_event_set() {
        let mut store = PeriodStore::open_in_memory().expect("open in-memory store");
        let (start, end) = march_2024();

        let first = vec![
            timed_event("1", "a", "2024-03-01T09:00:00Z", "2024-03-01T10:00:00Z"),
            timed_event("2", "b", "2024-03-02T09:00:00Z", "2024-03-02T10:00:00Z"),
        ];
        assert_eq!(store.store("month_3", &start, &end, &first, 8.0).unwrap(), 2);

        // A later fetch returns a different set; event 2 is gone.
        let second = vec![
            timed_event("1", "a", "2024-03-01T09:00:00Z", "2024-03-01T10:00:00Z"),
            timed_event("3", "c", "2024-03-03T09:00:00Z", "2024-03-03T10:00:00Z"),
        ];
        assert_eq!(store.store("month_3", &start, &end, &second, 8.0).unwrap(), 2);

        let loaded = store.load("month_3_20240301_20240331").unwrap().unwrap();
        assert_eq!(loaded, second);
    }

    #[test]
    fn load_preserves_insertion_order() {
        let mut store = PeriodStore::open_in_memory().expect("open in-memory store");
        let (start, end) = march_2024();
        let events = vec![
            timed_event("z", "later id", "2024-03-02T09:00:00Z", "2024-03-02T10:00:00Z"),
            timed_event("a", "earlier id", "2024-03-01T09:00:00Z", "2024-03-01T10:00:00Z"),
        ];

        store.store("month_3", &start, &end, &events, 8.0).unwrap();
        let loaded = store.load("month_3_20240301_20240331").unwrap().unwrap();
        let ids: Vec<&str> = loaded.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a"]);
    }

    #[test]
    fn absent_key_is_a_cache_miss() {
        let store = PeriodStore::open_in_memory().expect("open in-memory store");
        assert!(!store.is_complete("month_3_20240301_20240331").unwrap());
        assert!(store.load("month_3_20240301_20240331").unwrap().is_none());
    }

    #[test]
    fn incomplete_period_is_a_cache_miss() {
        let store = PeriodStore::open_in_memory().expect("open in-memory store");
        store
            .conn
            .execute(
                "
                INSERT INTO periods (period_key, period_type, start_date, end_date, is_complete)
                VALUES ('month_3_20240301_20240331', 'month_3', '2024-03-01', '2024-03-31', 0)
                ",
                [],
            )
            .unwrap();
        assert!(!store.is_complete("month_3_20240301_20240331").unwrap());
        assert!(store.load("month_3_20240301_20240331").unwrap().is_none());
    }

    #[test]
    fn failed_store_leaves_no_partial_state() {
        let mut store = PeriodStore::open_in_memory().expect("open in-memory store");
        // Force a mid-batch failure on a sentinel event id.
        store
            .conn
            .execute_batch(
                "
                CREATE TRIGGER fail_on_sentinel BEFORE INSERT ON events
                WHEN NEW.id = 'boom'
                BEGIN
                    SELECT RAISE(ABORT, 'sentinel');
                END;
                ",
            )
            .unwrap();

        let (start, end) = march_2024();
        let events = vec![
            timed_event("1", "a", "2024-03-01T09:00:00Z", "2024-03-01T10:00:00Z"),
            timed_event("boom", "b", "2024-03-02T09:00:00Z", "2024-03-02T10:00:00Z"),
        ];
        let result = store.store("month_3", &start, &end, &events, 8.0);
        assert!(result.is_err());

        assert!(!store.is_complete("month_3_20240301_20240331").unwrap());
        let event_count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
            .unwrap();
        assert_eq!(event_count, 0);
        let period_count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM periods", [], |row| row.get(0))
            .unwrap();
        assert_eq!(period_count, 0);
    }

    #[test]
    fn list_periods_orders_by_start_date_with_counts() {
        let mut store = PeriodStore::open_in_memory().expect("open in-memory store");
        let (april_start, april_end) =
            bounds("2024-04-01T00:00:00-03:00", "2024-04-30T23:59:59-03:00");
        let events = vec![timed_event(
            "1",
            "a",
            "2024-04-01T09:00:00Z",
            "2024-04-01T10:00:00Z",
        )];
        store.store("month_4", &april_start, &april_end, &events, 8.0).unwrap();

        let (march_start, march_end) = march_2024();
        store.store("month_3", &march_start, &march_end, &[], 8.0).unwrap();

        let periods = store.list_periods().unwrap();
        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0].key, "month_3_20240301_20240331");
        assert_eq!(periods[0].event_count, 0);
        assert!(periods[0].is_complete);
        assert_eq!(periods[1].key, "month_4_20240401_20240430");
        assert_eq!(periods[1].kind, "month_4");
        assert_eq!(periods[1].start_date, "2024-04-01");
        assert_eq!(periods[1].end_date, "2024-04-30");
        assert_eq!(periods[1].event_count, 1);
    }
}
