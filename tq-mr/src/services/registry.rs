//! Authoritative in-memory track collection for the active session
//!
//! Single source of truth for "is this track ready for playback". The
//! poller marks media arrivals, the resolver attaches metadata; the UI
//! only reads snapshots. Every mutation is applied under one write-lock
//! acquisition with no suspension point while the lock is held, so
//! overlapping poller/resolver writes cannot lose updates.
//!
//! All mutating operations carry the session id they belong to; writes
//! from a replaced session are rejected, which is how in-flight
//! resolutions for an abandoned session get discarded.

use crate::models::Track;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Outcome of the resolve-start guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginResolve {
    /// Track moved Unresolved → Resolving; caller owns the resolution
    Started,
    /// Track already left Unresolved; caller must not resolve again
    AlreadyHandled,
    /// No track with this id in the active session
    UnknownTrack,
    /// The given session is no longer the active one
    StaleSession,
}

#[derive(Default)]
struct RegistryInner {
    session_id: Option<Uuid>,
    tracks: Vec<Track>,
    index: HashMap<String, usize>,
}

impl RegistryInner {
    fn position(&self, external_id: &str) -> Option<usize> {
        self.index.get(external_id).copied()
    }
}

/// Shared, session-scoped track registry
#[derive(Clone, Default)]
pub struct TrackRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole collection for a new session
    ///
    /// Discards the previous session's tracks wholesale; its in-flight
    /// writers find their session id stale from here on.
    pub async fn replace(&self, session_id: Uuid, tracks: Vec<Track>) {
        let index = tracks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.external_id.clone(), i))
            .collect();

        let mut inner = self.inner.write().await;
        inner.session_id = Some(session_id);
        inner.tracks = tracks;
        inner.index = index;
    }

    /// Drop the active session and its tracks
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.session_id = None;
        inner.tracks.clear();
        inner.index.clear();
    }

    /// The active session id, if a session is running
    pub async fn session_id(&self) -> Option<Uuid> {
        self.inner.read().await.session_id
    }

    /// Look up one track by external id (cloned)
    pub async fn get(&self, external_id: &str) -> Option<Track> {
        let inner = self.inner.read().await;
        inner.position(external_id).map(|i| inner.tracks[i].clone())
    }

    /// Atomically move a track Unresolved → Resolving
    ///
    /// This is the at-most-once guard for metadata resolution: exactly
    /// one caller observes `Started` for a given track, checked and set
    /// under the same lock acquisition.
    pub async fn begin_resolving(&self, session_id: Uuid, external_id: &str) -> BeginResolve {
        use crate::models::MetadataState;

        let mut inner = self.inner.write().await;

        if inner.session_id != Some(session_id) {
            return BeginResolve::StaleSession;
        }

        let Some(position) = inner.position(external_id) else {
            return BeginResolve::UnknownTrack;
        };

        let track = &mut inner.tracks[position];
        if track.metadata_state != MetadataState::Unresolved {
            return BeginResolve::AlreadyHandled;
        }

        track.metadata_state = MetadataState::Resolving;
        BeginResolve::Started
    }

    /// Apply a synchronous mutation to one track
    ///
    /// Returns false (and applies nothing) when the session id is stale
    /// or the track is unknown. The mutator runs while the write lock is
    /// held; it must not block.
    pub async fn update<F>(&self, session_id: Uuid, external_id: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut Track),
    {
        let mut inner = self.inner.write().await;

        if inner.session_id != Some(session_id) {
            return false;
        }

        match inner.position(external_id) {
            Some(position) => {
                mutate(&mut inner.tracks[position]);
                true
            }
            None => false,
        }
    }

    /// Full copy of the active session's tracks, in playlist order
    pub async fn snapshot(&self) -> Vec<Track> {
        self.inner.read().await.tracks.clone()
    }

    /// The subset of tracks ready for playback
    pub async fn playable(&self) -> Vec<Track> {
        self.inner
            .read()
            .await
            .tracks
            .iter()
            .filter(|t| t.is_ready_for_playback())
            .cloned()
            .collect()
    }

    /// Next track to play: the first ready one not yet played
    ///
    /// Returns `None` once every track in the session has been played.
    pub async fn next_playable(&self, played: &[String]) -> Option<Track> {
        let inner = self.inner.read().await;

        if played.len() >= inner.tracks.len() {
            return None;
        }

        inner
            .tracks
            .iter()
            .find(|t| t.is_ready_for_playback() && !played.contains(&t.external_id))
            .cloned()
    }

    /// Number of tracks in the active session
    pub async fn len(&self) -> usize {
        self.inner.read().await.tracks.len()
    }

    /// True when no session is seeded
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.tracks.is_empty()
    }
}
