//! Event types for the TrackQuiz event system
//!
//! Provides shared event definitions and the EventBus used to fan out
//! session progress to SSE clients and other observers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Release confidence as carried in events
///
/// Mirrors the source tag on a resolved release so the UI can show a
/// "may not be fully accurate" disclaimer for fallback-sourced data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseConfidence {
    /// Resolved from the release catalog
    Catalog,
    /// Resolved from the generative fallback
    GeneratedFallback,
}

/// TrackQuiz event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// All events carry the session they belong to; SSE clients drop events
/// from sessions they no longer display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    /// A new playlist session started
    ///
    /// Triggers:
    /// - SSE: UI switches to the new track list
    SessionStarted {
        /// Session UUID
        session_id: Uuid,
        /// Playlist URL the session was started from
        playlist_url: String,
        /// Number of tracks seeded into the registry
        track_count: usize,
        /// When the session started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The active session was stopped or replaced
    SessionStopped {
        /// Session UUID
        session_id: Uuid,
        /// When the session stopped
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The backing job reported newly downloaded tracks
    ///
    /// Triggers:
    /// - SSE: UI updates the download progress bar
    DownloadProgress {
        /// Session UUID
        session_id: Uuid,
        /// Track ids observed so far
        received: usize,
        /// Total tracks expected for the playlist
        total: usize,
        /// When progress was observed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// All expected tracks have been downloaded; polling stopped
    DownloadCompleted {
        /// Session UUID
        session_id: Uuid,
        /// When the final track was observed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Metadata resolution started for a track
    TrackResolving {
        /// Session UUID
        session_id: Uuid,
        /// Source platform id of the track
        external_id: String,
        /// When resolution started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Metadata resolution succeeded for a track
    ///
    /// Triggers:
    /// - SSE: UI marks the track playable and renders title/artist/year
    TrackResolved {
        /// Session UUID
        session_id: Uuid,
        /// Source platform id of the track
        external_id: String,
        /// Canonical track title
        title: String,
        /// Canonical artist (None when unknown)
        artist: Option<String>,
        /// Earliest known release year
        year: Option<i32>,
        /// Where the metadata came from
        confidence: ReleaseConfidence,
        /// When resolution completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Metadata resolution found nothing usable; track excluded from playback
    TrackNotFound {
        /// Session UUID
        session_id: Uuid,
        /// Source platform id of the track
        external_id: String,
        /// Why the track could not be resolved
        reason: String,
        /// When resolution completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The backing job reported a track id the session never requested
    ///
    /// Contract violation between client and job server; always surfaced.
    IntegrityError {
        /// Session UUID
        session_id: Uuid,
        /// The unknown track id
        external_id: String,
        /// When the violation was detected
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl GameEvent {
    /// Event name used for SSE `event:` fields
    pub fn event_type(&self) -> &str {
        match self {
            GameEvent::SessionStarted { .. } => "SessionStarted",
            GameEvent::SessionStopped { .. } => "SessionStopped",
            GameEvent::DownloadProgress { .. } => "DownloadProgress",
            GameEvent::DownloadCompleted { .. } => "DownloadCompleted",
            GameEvent::TrackResolving { .. } => "TrackResolving",
            GameEvent::TrackResolved { .. } => "TrackResolved",
            GameEvent::TrackNotFound { .. } => "TrackNotFound",
            GameEvent::IntegrityError { .. } => "IntegrityError",
        }
    }

    /// Session this event belongs to
    pub fn session_id(&self) -> Uuid {
        match self {
            GameEvent::SessionStarted { session_id, .. }
            | GameEvent::SessionStopped { session_id, .. }
            | GameEvent::DownloadProgress { session_id, .. }
            | GameEvent::DownloadCompleted { session_id, .. }
            | GameEvent::TrackResolving { session_id, .. }
            | GameEvent::TrackResolved { session_id, .. }
            | GameEvent::TrackNotFound { session_id, .. }
            | GameEvent::IntegrityError { session_id, .. } => *session_id,
        }
    }
}

/// Broadcast bus for GameEvents
///
/// Thin wrapper over `tokio::sync::broadcast` shared by the poller,
/// resolver and SSE handlers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GameEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    ///
    /// Older events are dropped once the buffer is full and a subscriber
    /// lags behind.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)`; `Err` when no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: GameEvent,
    ) -> Result<usize, broadcast::error::SendError<GameEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_or_log(&self, event: GameEvent) {
        let event_type = event.event_type().to_string();
        if self.tx.send(event).is_err() {
            tracing::debug!(event = %event_type, "No subscribers for event");
        }
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
