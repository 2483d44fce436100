//! Track state machine and release records
//!
//! A track progresses through four metadata states:
//! UNRESOLVED → RESOLVING → RESOLVED (or NOTFOUND)
//!
//! RESOLVED and NOTFOUND are terminal; a track never re-enters RESOLVING.

use serde::{Deserialize, Serialize};
use tq_common::events::ReleaseConfidence;

/// Metadata resolution state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetadataState {
    /// No resolution attempted yet
    Unresolved,
    /// Resolution in flight (guards against duplicate lookups)
    Resolving,
    /// Canonical title/artist/year populated
    Resolved,
    /// No usable metadata; track excluded from playback
    NotFound,
}

impl MetadataState {
    /// Whether the state permits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, MetadataState::Resolved | MetadataState::NotFound)
    }
}

/// One dated release of a song, as returned by the catalog or the fallback
///
/// Immutable value; a track's candidate list is always sorted ascending
/// by year (stable, so catalog result order breaks ties).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// 4-digit release year
    pub year: i32,
    /// ISO country code, may be empty when unknown
    pub country: String,
    /// Media format, e.g. "Vinyl" or "CD"
    pub media_format: String,
    /// Artist credit as printed on the release
    pub artist_credit: String,
    /// Release title; only populated by the catalog path
    pub title: Option<String>,
    /// Where this record came from
    pub confidence: ReleaseConfidence,
}

/// One playable item in the active session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Opaque id from the source platform, unique within a session
    pub external_id: String,
    /// Unstructured source title, immutable once set
    pub raw_label: String,
    /// Largest available thumbnail from the playlist item
    pub thumbnail_url: Option<String>,
    /// Canonical title, set exactly once by a successful resolution
    pub resolved_title: Option<String>,
    /// Canonical artist
    pub resolved_artist: Option<String>,
    /// Earliest known release year
    pub resolved_year: Option<i32>,
    /// All known releases, ascending by year
    pub candidate_releases: Vec<Release>,
    /// Resolution state
    pub metadata_state: MetadataState,
    /// Whether the backing job has confirmed the media is downloaded
    pub media_available: bool,
}

impl Track {
    /// Create an unresolved track from a playlist item
    pub fn new(external_id: String, raw_label: String, thumbnail_url: Option<String>) -> Self {
        Self {
            external_id,
            raw_label,
            thumbnail_url,
            resolved_title: None,
            resolved_artist: None,
            resolved_year: None,
            candidate_releases: Vec::new(),
            metadata_state: MetadataState::Unresolved,
            media_available: false,
        }
    }

    /// True iff metadata is resolved and the media is confirmed downloaded
    pub fn is_ready_for_playback(&self) -> bool {
        self.metadata_state == MetadataState::Resolved && self.media_available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_track_is_unresolved_and_not_playable() {
        let track = Track::new("v1".to_string(), "Artist - Song".to_string(), None);
        assert_eq!(track.metadata_state, MetadataState::Unresolved);
        assert!(!track.is_ready_for_playback());
        assert!(track.candidate_releases.is_empty());
    }

    #[test]
    fn readiness_requires_both_metadata_and_media() {
        let mut track = Track::new("v1".to_string(), "Artist - Song".to_string(), None);

        track.metadata_state = MetadataState::Resolved;
        assert!(!track.is_ready_for_playback());

        track.media_available = true;
        assert!(track.is_ready_for_playback());

        track.metadata_state = MetadataState::NotFound;
        assert!(!track.is_ready_for_playback());
    }

    #[test]
    fn terminal_states() {
        assert!(!MetadataState::Unresolved.is_terminal());
        assert!(!MetadataState::Resolving.is_terminal());
        assert!(MetadataState::Resolved.is_terminal());
        assert!(MetadataState::NotFound.is_terminal());
    }

    #[test]
    fn metadata_state_serializes_uppercase() {
        let json = serde_json::to_string(&MetadataState::NotFound).unwrap();
        assert_eq!(json, "\"NOTFOUND\"");
    }
}
