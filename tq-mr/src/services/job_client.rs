//! Backing download-job server client
//!
//! The job server downloads playlist tracks in the background and
//! exposes playback URLs. This client covers the three endpoints the
//! resolver pipeline needs: download kickoff, playlist item listing and
//! download-state polling.

use crate::models::Track;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Job server client errors
#[derive(Debug, Error)]
pub enum JobError {
    /// Could not reach the job server
    #[error("Job server unreachable: {0}")]
    Connectivity(String),

    /// Non-success HTTP response
    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The job server reported an error for the playlist
    #[error("Upstream error: {0}")]
    Upstream(String),
}

/// One thumbnail variant of a playlist item
#[derive(Debug, Clone, Deserialize)]
pub struct ThumbnailRecord {
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// One item of the playlist listing
#[derive(Debug, Clone, Deserialize)]
pub struct VideoItemRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub thumbnails: Vec<ThumbnailRecord>,
}

/// Playlist listing response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItemsResponse {
    #[serde(default)]
    pub video_items: Vec<VideoItemRecord>,
    pub error: Option<String>,
}

/// Download-state response for one playlist job
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadState {
    /// Index of the track currently downloading
    pub track_index: Option<usize>,
    /// Total tracks the job expects to download
    pub total_tracks: Option<usize>,
    /// Ids whose media is downloaded and playable, oldest first
    #[serde(default)]
    pub video_ids: Vec<String>,
}

/// Download-job server API client
pub struct DownloadJobClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl DownloadJobClient {
    pub fn new(base_url: String) -> Result<Self, JobError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| JobError::Connectivity(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Start the download job for a playlist
    ///
    /// Fire-and-forget: the response is ignored and failures are only
    /// logged. Whether the job actually started shows up through the
    /// download-state polling.
    pub async fn kickoff_download(&self, playlist_url: &str) {
        let url = format!("{}/playlist-download", self.base_url);

        match self
            .http_client
            .get(&url)
            .query(&[("playlist_url", playlist_url)])
            .send()
            .await
        {
            Ok(response) => {
                tracing::debug!(
                    playlist_url = %playlist_url,
                    status = response.status().as_u16(),
                    "Download kickoff requested"
                );
            }
            Err(e) => {
                tracing::warn!(playlist_url = %playlist_url, error = %e, "Download kickoff failed");
            }
        }
    }

    /// Fetch the playlist items and map them to unresolved tracks
    ///
    /// Each track gets the thumbnail with the largest width×height area.
    /// A populated `error` field in the response is a session-level error.
    pub async fn playlist_items(&self, playlist_url: &str) -> Result<Vec<Track>, JobError> {
        let url = format!("{}/playlist-items", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .query(&[("playlist_url", playlist_url)])
            .send()
            .await
            .map_err(|e| JobError::Connectivity(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(JobError::ApiError(status.as_u16(), error_text));
        }

        let listing: PlaylistItemsResponse = response
            .json()
            .await
            .map_err(|e| JobError::ParseError(e.to_string()))?;

        if let Some(error) = listing.error {
            return Err(JobError::Upstream(error));
        }

        Ok(listing.video_items.into_iter().map(into_track).collect())
    }

    /// Fetch the current download state for a playlist job
    pub async fn download_state(&self, playlist_id: &str) -> Result<DownloadState, JobError> {
        let url = format!("{}/playlist-download-state", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .query(&[("playlist_id", playlist_id)])
            .send()
            .await
            .map_err(|e| JobError::Connectivity(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(JobError::ApiError(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| JobError::ParseError(e.to_string()))
    }
}

/// Map a playlist item to an unresolved track with its best thumbnail
fn into_track(item: VideoItemRecord) -> Track {
    let thumbnail_url = best_thumbnail(&item.thumbnails);
    Track::new(item.id, item.title, thumbnail_url)
}

/// Pick the thumbnail with the largest width×height area
fn best_thumbnail(thumbnails: &[ThumbnailRecord]) -> Option<String> {
    thumbnails
        .iter()
        .max_by_key(|t| u64::from(t.width) * u64::from(t.height))
        .map(|t| t.url.clone())
}
