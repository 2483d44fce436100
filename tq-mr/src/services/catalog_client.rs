//! Release catalog (MusicBrainz) client
//!
//! Searches the release database by title/artist and reduces the raw
//! search records to the dated, official, high-confidence releases the
//! resolver works with. Rate limited to 1 request/second.

use crate::models::{Release, ReleaseConfidence};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const DEFAULT_CATALOG_URL: &str = "https://musicbrainz.org/ws/2";
const USER_AGENT: &str = "TrackQuiz/0.1.0 (https://github.com/trackquiz/trackquiz)";
const RATE_LIMIT_MS: u64 = 1000; // 1 request per second
const REQUEST_TIMEOUT_SECS: u64 = 10;
const SEARCH_LIMIT: u32 = 10;

/// Minimum search match score (0-100) for a record to be accepted
const MIN_MATCH_SCORE: i64 = 85;
/// Only officially released records are accepted
const REQUIRED_STATUS: &str = "Official";

/// Catalog client errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Could not reach the catalog at all (DNS, connect, timeout)
    #[error("Catalog unreachable: {0}")]
    Connectivity(String),

    /// Rate limit response from the catalog
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Non-success HTTP response
    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// One record of the release search response
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseRecord {
    /// Release title
    pub title: Option<String>,
    /// Release date in YYYY, YYYY-MM or YYYY-MM-DD format
    pub date: Option<String>,
    /// Release status, e.g. "Official" or "Bootleg"
    pub status: Option<String>,
    /// Search match score (0-100)
    pub score: Option<i64>,
    /// ISO country code
    pub country: Option<String>,
    /// Physical/digital media of this release
    #[serde(default)]
    pub media: Vec<MediaRecord>,
    /// Artist credits as printed on the release
    #[serde(rename = "artist-credit", default)]
    pub artist_credit: Vec<ArtistCreditRecord>,
    /// Per-country release events; date fallback when `date` is absent
    #[serde(rename = "release-events", default)]
    pub release_events: Vec<ReleaseEventRecord>,
}

/// Media entry of a release record
#[derive(Debug, Clone, Deserialize)]
pub struct MediaRecord {
    /// Media format, e.g. "Vinyl" or "CD"
    pub format: Option<String>,
}

/// Artist credit entry of a release record
#[derive(Debug, Clone, Deserialize)]
pub struct ArtistCreditRecord {
    /// Display name (may differ from the artist's canonical name)
    pub name: String,
}

/// Release event entry of a release record
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseEventRecord {
    /// Event date in YYYY, YYYY-MM or YYYY-MM-DD format
    pub date: Option<String>,
}

/// Release search response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseSearchResponse {
    #[serde(default)]
    pub releases: Vec<ReleaseRecord>,
}

impl ReleaseRecord {
    /// Release date, falling back to the first release event's date
    fn effective_date(&self) -> Option<&str> {
        self.date
            .as_deref()
            .or_else(|| self.release_events.first().and_then(|e| e.date.as_deref()))
    }
}

/// Rate limiter enforcing 1 request/second
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Release catalog API client
pub struct ReleaseCatalogClient {
    http_client: reqwest::Client,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
}

impl ReleaseCatalogClient {
    pub fn new() -> Result<Self, CatalogError> {
        Self::with_base_url(DEFAULT_CATALOG_URL.to_string())
    }

    /// Create a client against a non-default catalog URL (tests, mirrors)
    pub fn with_base_url(base_url: String) -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| CatalogError::Connectivity(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
        })
    }

    /// Search releases by clean title, optionally constrained to an artist
    ///
    /// Returns the accepted records mapped to [`Release`] values, sorted
    /// ascending by year. An empty list means the catalog has nothing
    /// usable, which is not an error.
    pub async fn lookup(
        &self,
        clean_title: &str,
        artist: Option<&str>,
    ) -> Result<Vec<Release>, CatalogError> {
        // Rate limit
        self.rate_limiter.wait().await;

        let query = build_query(clean_title, artist);
        let url = format!("{}/release", self.base_url);

        tracing::debug!(query = %query, "Querying release catalog");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("query", query.as_str()),
                ("fmt", "json"),
                ("limit", &SEARCH_LIMIT.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    CatalogError::Connectivity(e.to_string())
                } else {
                    CatalogError::ApiError(0, e.to_string())
                }
            })?;

        let status = response.status();

        if status == 503 {
            return Err(CatalogError::RateLimitExceeded);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CatalogError::ApiError(status.as_u16(), error_text));
        }

        let search: ReleaseSearchResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::ParseError(e.to_string()))?;

        let releases = filter_and_rank(search.releases);

        tracing::debug!(
            title = %clean_title,
            accepted = releases.len(),
            "Catalog lookup completed"
        );

        Ok(releases)
    }
}

/// Build the lucene-style search query
///
/// Exact-phrase match on the title, conjoined with an artist filter when
/// an artist was parsed from the label.
fn build_query(clean_title: &str, artist: Option<&str>) -> String {
    match artist {
        Some(artist) => format!("\"{}\" AND artist:\"{}\"", clean_title, artist),
        None => format!("\"{}\"", clean_title),
    }
}

/// Reduce raw search records to accepted releases, ascending by year
///
/// A record is accepted only with a usable date, "Official" status and a
/// match score of at least 85. Rejected records are dropped silently.
/// The sort is stable, so input order breaks year ties.
pub fn filter_and_rank(records: Vec<ReleaseRecord>) -> Vec<Release> {
    let mut releases: Vec<Release> = records
        .into_iter()
        .filter_map(|record| {
            let date = record.effective_date()?;
            let year = parse_year(date)?;

            if record.status.as_deref() != Some(REQUIRED_STATUS) {
                return None;
            }
            if record.score.unwrap_or(0) < MIN_MATCH_SCORE {
                return None;
            }

            Some(Release {
                year,
                country: record.country.clone().unwrap_or_default(),
                media_format: record
                    .media
                    .first()
                    .and_then(|m| m.format.clone())
                    .unwrap_or_default(),
                artist_credit: record
                    .artist_credit
                    .first()
                    .map(|a| a.name.clone())
                    .unwrap_or_default(),
                title: record.title,
                confidence: ReleaseConfidence::Catalog,
            })
        })
        .collect();

    releases.sort_by_key(|r| r.year);
    releases
}

/// Parse the 4-digit year from a YYYY[-MM[-DD]] date string
fn parse_year(date: &str) -> Option<i32> {
    let year = date.split('-').next()?;
    if year.len() != 4 {
        return None;
    }
    year.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        date: Option<&str>,
        status: Option<&str>,
        score: Option<i64>,
        title: &str,
    ) -> ReleaseRecord {
        ReleaseRecord {
            title: Some(title.to_string()),
            date: date.map(|d| d.to_string()),
            status: status.map(|s| s.to_string()),
            score,
            country: Some("GB".to_string()),
            media: vec![MediaRecord {
                format: Some("Vinyl".to_string()),
            }],
            artist_credit: vec![ArtistCreditRecord {
                name: "The Beatles".to_string(),
            }],
            release_events: Vec::new(),
        }
    }

    #[test]
    fn query_with_artist_conjoins_filter() {
        assert_eq!(
            build_query("Yesterday", Some("The Beatles")),
            "\"Yesterday\" AND artist:\"The Beatles\""
        );
    }

    #[test]
    fn query_without_artist_is_bare_phrase() {
        assert_eq!(build_query("Yesterday", None), "\"Yesterday\"");
    }

    #[test]
    fn mixed_fixture_keeps_exactly_the_passing_records() {
        // 3 passing, 2 failing (low score / missing date)
        let records = vec![
            record(Some("1988-03-01"), Some("Official"), Some(100), "c"),
            record(Some("1965-08-06"), Some("Official"), Some(95), "a"),
            record(Some("1970-01-01"), Some("Official"), Some(60), "low score"),
            record(None, Some("Official"), Some(100), "no date"),
            record(Some("1966-02-01"), Some("Official"), Some(90), "b"),
        ];

        let releases = filter_and_rank(records);
        assert_eq!(releases.len(), 3);
        assert_eq!(
            releases.iter().map(|r| r.year).collect::<Vec<_>>(),
            vec![1965, 1966, 1988]
        );
    }

    #[test]
    fn non_official_status_is_dropped() {
        let records = vec![
            record(Some("1965-08-06"), Some("Bootleg"), Some(100), "x"),
            record(Some("1965-08-06"), None, Some(100), "y"),
        ];
        assert!(filter_and_rank(records).is_empty());
    }

    #[test]
    fn score_threshold_is_inclusive() {
        let records = vec![
            record(Some("1965"), Some("Official"), Some(85), "at threshold"),
            record(Some("1966"), Some("Official"), Some(84), "below"),
            record(Some("1967"), Some("Official"), None, "missing"),
        ];
        let releases = filter_and_rank(records);
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].year, 1965);
    }

    #[test]
    fn release_event_date_backfills_missing_date() {
        let mut r = record(None, Some("Official"), Some(100), "event dated");
        r.release_events = vec![ReleaseEventRecord {
            date: Some("1972-06-16".to_string()),
        }];
        let releases = filter_and_rank(vec![r]);
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].year, 1972);
    }

    #[test]
    fn year_tie_preserves_input_order() {
        let mut first = record(Some("1965-08-06"), Some("Official"), Some(100), "first");
        first.country = Some("GB".to_string());
        let mut second = record(Some("1965-09-13"), Some("Official"), Some(100), "second");
        second.country = Some("US".to_string());

        let releases = filter_and_rank(vec![first, second]);
        assert_eq!(releases[0].title.as_deref(), Some("first"));
        assert_eq!(releases[1].title.as_deref(), Some("second"));
    }

    #[test]
    fn mapped_fields_come_from_first_media_and_credit() {
        let releases = filter_and_rank(vec![record(
            Some("1965-08-06"),
            Some("Official"),
            Some(100),
            "Help!",
        )]);
        let release = &releases[0];
        assert_eq!(release.media_format, "Vinyl");
        assert_eq!(release.artist_credit, "The Beatles");
        assert_eq!(release.country, "GB");
        assert_eq!(release.title.as_deref(), Some("Help!"));
        assert_eq!(release.confidence, ReleaseConfidence::Catalog);
    }

    #[test]
    fn malformed_years_are_dropped() {
        let records = vec![
            record(Some("196"), Some("Official"), Some(100), "short"),
            record(Some("????"), Some("Official"), Some(100), "garbage"),
        ];
        assert!(filter_and_rank(records).is_empty());
    }

    #[test]
    fn search_response_deserializes_hyphenated_keys() {
        let json = r#"{
            "releases": [{
                "title": "Help!",
                "date": "1965-08-06",
                "status": "Official",
                "score": 100,
                "country": "GB",
                "media": [{"format": "Vinyl"}],
                "artist-credit": [{"name": "The Beatles"}],
                "release-events": [{"date": "1965-08-06"}]
            }]
        }"#;

        let parsed: ReleaseSearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.releases.len(), 1);
        assert_eq!(parsed.releases[0].artist_credit[0].name, "The Beatles");
    }

    #[tokio::test]
    async fn rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(200);

        let start = Instant::now();
        limiter.wait().await;
        let first_elapsed = start.elapsed();
        limiter.wait().await;
        let second_elapsed = start.elapsed();

        assert!(first_elapsed < Duration::from_millis(100));
        assert!(second_elapsed >= Duration::from_millis(150));
    }
}
