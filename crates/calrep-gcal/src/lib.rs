//! Google Calendar API integration for the calendar report generator.
//!
//! Provides OAuth token handling (load, refresh, persist) and a paginated
//! events fetch over the Calendar v3 REST API. Authentication is deferred
//! until the first fetch, so fully cached report runs never touch the
//! token file or the network.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use reqwest::Url;
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use calrep_core::RawEvent;

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Page size for event listing; the API caps pages at this value.
const MAX_RESULTS: u32 = 2500;
/// Tokens this close to expiry are refreshed up front.
const EXPIRY_MARGIN: chrono::Duration = chrono::Duration::seconds(60);

/// OAuth token errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token file could not be read.
    #[error("failed to read token file {path}: {source}")]
    TokenRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The token file is not valid JSON in the expected shape.
    #[error("failed to parse token file {path}: {source}")]
    TokenParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The refreshed token could not be written back.
    #[error("failed to write token file {path}: {source}")]
    TokenWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The token is expired and lacks the credentials needed to refresh.
    #[error("token is expired and has no refresh credentials")]
    NotRefreshable,
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// The refresh request failed at the transport level.
    #[error("token refresh request failed: {0}")]
    RefreshRequest(#[source] reqwest::Error),
    /// The authorization server rejected the refresh.
    #[error("token refresh rejected: {message}")]
    RefreshRejected { message: String },
}

/// Event fetch errors.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Authentication failed before the fetch could start.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("calendar API error for {calendar_id}: {message}")]
    Api { calendar_id: String, message: String },
    /// Failed to parse a response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// OAuth token file contents, in the shape written by Google's auth
/// libraries. Unknown fields are preserved as far as this struct carries
/// them; the file is rewritten after a refresh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredToken {
    /// Current access token, if any.
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_uri: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Access token expiry, UTC.
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Whether the access token is usable without a refresh.
    ///
    /// A token with no expiry is treated as expired; tokens within the
    /// refresh margin are too.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.token.is_some()
            && self
                .expiry
                .is_some_and(|expiry| expiry - EXPIRY_MARGIN > now)
    }
}

/// An authenticated API session.
pub struct Session {
    http: HttpClient,
    access_token: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Loads the token file and produces an authenticated [`Session`],
/// refreshing the access token first if it is missing or near expiry.
///
/// A successful refresh rewrites the token file so the next run can skip
/// the refresh round trip.
pub fn authenticate(token_path: &Path) -> Result<Session, AuthError> {
    let contents = fs::read_to_string(token_path).map_err(|source| AuthError::TokenRead {
        path: token_path.to_path_buf(),
        source,
    })?;
    let mut token: StoredToken =
        serde_json::from_str(&contents).map_err(|source| AuthError::TokenParse {
            path: token_path.to_path_buf(),
            source,
        })?;

    let http = HttpClient::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(AuthError::ClientBuild)?;

    if !token.is_fresh(Utc::now()) {
        refresh(&http, &mut token)?;
        persist(token_path, &token)?;
        debug!("refreshed access token");
    }

    let access_token = token.token.ok_or(AuthError::NotRefreshable)?;
    Ok(Session { http, access_token })
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

fn refresh(http: &HttpClient, token: &mut StoredToken) -> Result<(), AuthError> {
    let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
        token.refresh_token.as_deref(),
        token.client_id.as_deref(),
        token.client_secret.as_deref(),
    ) else {
        return Err(AuthError::NotRefreshable);
    };

    let url = token.token_uri.as_deref().unwrap_or(TOKEN_URL);
    let response = http
        .post(url)
        .form(&RefreshRequest {
            grant_type: "refresh_token",
            refresh_token,
            client_id,
            client_secret,
        })
        .send()
        .map_err(AuthError::RefreshRequest)?;

    let status = response.status();
    let body = response.text().map_err(AuthError::RefreshRequest)?;
    if !status.is_success() {
        return Err(AuthError::RefreshRejected {
            message: format!("status {status}: {body}"),
        });
    }

    let payload: RefreshResponse =
        serde_json::from_str(&body).map_err(|err| AuthError::RefreshRejected {
            message: err.to_string(),
        })?;
    token.token = Some(payload.access_token);
    token.expiry = payload
        .expires_in
        .map(|seconds| Utc::now() + chrono::Duration::seconds(seconds));
    Ok(())
}

fn persist(token_path: &Path, token: &StoredToken) -> Result<(), AuthError> {
    let contents =
        serde_json::to_string_pretty(token).map_err(|source| AuthError::TokenParse {
            path: token_path.to_path_buf(),
            source,
        })?;
    fs::write(token_path, contents).map_err(|source| AuthError::TokenWrite {
        path: token_path.to_path_buf(),
        source,
    })
}

/// A source of raw calendar events over a time range.
///
/// Abstracts the API client so the report engine can be exercised with
/// in-memory fixtures.
pub trait EventSource {
    /// Fetches all events across the given calendars between `time_min` and
    /// `time_max`, in calendar order then API return order.
    fn fetch_events(
        &mut self,
        calendar_ids: &[String],
        time_min: &DateTime<FixedOffset>,
        time_max: &DateTime<FixedOffset>,
    ) -> Result<Vec<RawEvent>, FetchError>;
}

#[derive(Debug, Deserialize)]
struct EventsPage {
    #[serde(default)]
    items: Vec<RawEvent>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

/// Calendar v3 events client over an authenticated session.
#[derive(Debug)]
pub struct GcalClient {
    session: Session,
}

impl GcalClient {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    /// Fetches one calendar's events, following pagination to the end.
    ///
    /// Recurring events are expanded into single occurrences by the API.
    pub fn fetch_calendar(
        &self,
        calendar_id: &str,
        time_min: &DateTime<FixedOffset>,
        time_max: &DateTime<FixedOffset>,
    ) -> Result<Vec<RawEvent>, FetchError> {
        let url = events_url(calendar_id)?;
        let time_min = time_min.to_rfc3339_opts(SecondsFormat::Secs, false);
        let time_max = time_max.to_rfc3339_opts(SecondsFormat::Secs, false);

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .session
                .http
                .get(url.clone())
                .bearer_auth(&self.session.access_token)
                .query(&[
                    ("timeMin", time_min.as_str()),
                    ("timeMax", time_max.as_str()),
                    ("singleEvents", "true"),
                    ("orderBy", "startTime"),
                ])
                .query(&[("maxResults", MAX_RESULTS)]);
            if let Some(token) = page_token.as_deref() {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request.send()?;
            let status = response.status();
            let body = response.text()?;
            if !status.is_success() {
                return Err(parse_api_error(&body, calendar_id).unwrap_or_else(|| {
                    FetchError::Api {
                        calendar_id: calendar_id.to_string(),
                        message: format!("status {status}: {body}"),
                    }
                }));
            }

            let page: EventsPage = serde_json::from_str(&body)
                .map_err(|err| FetchError::InvalidResponse(err.to_string()))?;
            events.extend(page.items);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(calendar_id, events = events.len(), "fetched calendar");
        Ok(events)
    }
}

impl EventSource for GcalClient {
    fn fetch_events(
        &mut self,
        calendar_ids: &[String],
        time_min: &DateTime<FixedOffset>,
        time_max: &DateTime<FixedOffset>,
    ) -> Result<Vec<RawEvent>, FetchError> {
        let mut events = Vec::new();
        for calendar_id in calendar_ids {
            events.extend(self.fetch_calendar(calendar_id, time_min, time_max)?);
        }
        Ok(events)
    }
}

/// Lazily-authenticating event source.
///
/// Holds only the token path until the first fetch; cache-hit report runs
/// construct this without ever authenticating.
#[derive(Debug)]
pub struct GcalSource {
    token_path: PathBuf,
    client: Option<GcalClient>,
}

impl GcalSource {
    #[must_use]
    pub const fn new(token_path: PathBuf) -> Self {
        Self {
            token_path,
            client: None,
        }
    }

    fn client(&mut self) -> Result<&GcalClient, FetchError> {
        match &mut self.client {
            Some(client) => Ok(client),
            slot @ None => {
                let session = authenticate(&self.token_path)?;
                Ok(slot.insert(GcalClient::new(session)))
            }
        }
    }
}

impl EventSource for GcalSource {
    fn fetch_events(
        &mut self,
        calendar_ids: &[String],
        time_min: &DateTime<FixedOffset>,
        time_max: &DateTime<FixedOffset>,
    ) -> Result<Vec<RawEvent>, FetchError> {
        let client = self.client()?;
        let mut events = Vec::new();
        for calendar_id in calendar_ids {
            events.extend(client.fetch_calendar(calendar_id, time_min, time_max)?);
        }
        Ok(events)
    }
}

fn events_url(calendar_id: &str) -> Result<Url, FetchError> {
    let mut url = Url::parse(CALENDAR_API_BASE)
        .map_err(|err| FetchError::InvalidResponse(err.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| FetchError::InvalidResponse("base URL cannot hold a path".to_string()))?
        .extend(["calendars", calendar_id, "events"]);
    Ok(url)
}

fn parse_api_error(body: &str, calendar_id: &str) -> Option<FetchError> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: ErrorDetails,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| FetchError::Api {
            calendar_id: calendar_id.to_string(),
            message: payload.error.message,
        })
}
