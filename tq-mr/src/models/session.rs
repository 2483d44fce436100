//! Playlist session identity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One playlist's lifetime, from selection to replacement by a new playlist
///
/// The session id is the identity checked before applying any in-flight
/// resolution result to the registry; results for a replaced session are
/// discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    /// Unique session identifier
    pub session_id: Uuid,
    /// Playlist URL the session was started from
    pub playlist_url: String,
    /// Playlist id, as understood by the backing job server
    pub playlist_id: String,
    /// When the session started
    pub started_at: DateTime<Utc>,
}

impl GameSession {
    /// Create a new session for a playlist URL
    ///
    /// The playlist id is the last path segment of the URL (query string
    /// stripped), matching what the backing job server keys its state by.
    pub fn new(playlist_url: String) -> Self {
        let playlist_id = playlist_id_from_url(&playlist_url);
        Self {
            session_id: Uuid::new_v4(),
            playlist_url,
            playlist_id,
            started_at: Utc::now(),
        }
    }
}

/// Extract the playlist id from a playlist URL
///
/// Example: `https://music.example.com/playlist/1Bpgr72vuJwYXYqbdahtOO`
/// yields `1Bpgr72vuJwYXYqbdahtOO`.
pub fn playlist_id_from_url(playlist_url: &str) -> String {
    let without_query = playlist_url
        .split_once('?')
        .map(|(base, _)| base)
        .unwrap_or(playlist_url);

    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(without_query)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playlist_id_is_last_path_segment() {
        assert_eq!(
            playlist_id_from_url("https://music.example.com/playlist/1Bpgr72vuJwYXYqbdahtOO"),
            "1Bpgr72vuJwYXYqbdahtOO"
        );
    }

    #[test]
    fn playlist_id_ignores_query_and_trailing_slash() {
        assert_eq!(
            playlist_id_from_url("https://music.example.com/playlist/abc123/?si=xyz"),
            "abc123"
        );
    }

    #[test]
    fn bare_id_passes_through() {
        assert_eq!(playlist_id_from_url("abc123"), "abc123");
    }
}
