//! Playlist session lifecycle
//!
//! Starting a session seeds the registry from the playlist listing,
//! kicks off the backing download job and spawns the poller. Starting a
//! new session (or stopping) cancels the old poller and invalidates the
//! old session id, so in-flight resolutions of the abandoned session are
//! discarded when they try to write back.

use crate::models::GameSession;
use crate::services::job_client::DownloadJobClient;
use crate::services::poller::{DownloadProgressPoller, DownloadStateSource};
use crate::services::registry::TrackRegistry;
use crate::services::resolver::{FallbackLookup, ReleaseLookup, TrackMetadataResolver};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tq_common::events::{EventBus, GameEvent};
use tq_common::{Error, Result};

struct ActiveSession {
    session: GameSession,
    cancel_token: CancellationToken,
    poller_handle: JoinHandle<()>,
}

/// Owns the active session and everything running on its behalf
pub struct SessionManager {
    registry: TrackRegistry,
    event_bus: EventBus,
    job_client: Arc<DownloadJobClient>,
    catalog: Arc<dyn ReleaseLookup>,
    fallback: Option<Arc<dyn FallbackLookup>>,
    last_error: Arc<RwLock<Option<String>>>,
    active: Mutex<Option<ActiveSession>>,
}

impl SessionManager {
    pub fn new(
        registry: TrackRegistry,
        event_bus: EventBus,
        job_client: Arc<DownloadJobClient>,
        catalog: Arc<dyn ReleaseLookup>,
        fallback: Option<Arc<dyn FallbackLookup>>,
        last_error: Arc<RwLock<Option<String>>>,
    ) -> Self {
        Self {
            registry,
            event_bus,
            job_client,
            catalog,
            fallback,
            last_error,
            active: Mutex::new(None),
        }
    }

    /// Start a session for a playlist URL, replacing any active one
    ///
    /// Returns the new session and the number of seeded tracks. Playlist
    /// fetch failure is the one user-visible session-level error; the
    /// previous session is only torn down after the fetch succeeds.
    pub async fn start_session(&self, playlist_url: &str) -> Result<(GameSession, usize)> {
        let playlist_url = playlist_url.trim();
        if playlist_url.is_empty() {
            return Err(Error::InvalidInput("playlist URL is empty".to_string()));
        }

        let tracks = self
            .job_client
            .playlist_items(playlist_url)
            .await
            .map_err(|e| Error::Upstream(format!("Playlist fetch failed: {}", e)))?;

        if tracks.is_empty() {
            return Err(Error::NotFound(
                "playlist contains no playable items".to_string(),
            ));
        }

        let session = GameSession::new(playlist_url.to_string());
        let track_count = tracks.len();

        let mut active = self.active.lock().await;
        self.teardown(active.take()).await;

        self.registry.replace(session.session_id, tracks).await;

        // Kickoff is fire-and-forget; whether the job started shows up
        // through the download-state polling
        let job_client = Arc::clone(&self.job_client);
        let kickoff_url = playlist_url.to_string();
        tokio::spawn(async move {
            job_client.kickoff_download(&kickoff_url).await;
        });

        let resolver = Arc::new(TrackMetadataResolver::new(
            Arc::clone(&self.catalog),
            self.fallback.clone(),
            self.registry.clone(),
            self.event_bus.clone(),
        ));

        let state_source: Arc<dyn DownloadStateSource> = self.job_client.clone();
        let poller = DownloadProgressPoller::new(
            state_source,
            resolver,
            self.registry.clone(),
            self.event_bus.clone(),
            session.session_id,
            session.playlist_id.clone(),
        );

        let cancel_token = CancellationToken::new();
        let poller_token = cancel_token.clone();
        let last_error = Arc::clone(&self.last_error);
        let session_id = session.session_id;

        let poller_handle = tokio::spawn(async move {
            if let Err(e) = poller.run(poller_token).await {
                tracing::error!(session_id = %session_id, error = %e, "Poller aborted");
                *last_error.write().await = Some(e.to_string());
            }
        });

        *active = Some(ActiveSession {
            session: session.clone(),
            cancel_token,
            poller_handle,
        });

        tracing::info!(
            session_id = %session.session_id,
            playlist_id = %session.playlist_id,
            tracks = track_count,
            "Session started"
        );

        self.event_bus.emit_or_log(GameEvent::SessionStarted {
            session_id: session.session_id,
            playlist_url: playlist_url.to_string(),
            track_count,
            timestamp: chrono::Utc::now(),
        });

        Ok((session, track_count))
    }

    /// Stop the active session, if any
    ///
    /// Returns true when a session was stopped.
    pub async fn stop_session(&self) -> bool {
        let mut active = self.active.lock().await;
        let had_session = active.is_some();
        self.teardown(active.take()).await;
        self.registry.clear().await;
        had_session
    }

    /// The active session, if any
    pub async fn current_session(&self) -> Option<GameSession> {
        self.active.lock().await.as_ref().map(|a| a.session.clone())
    }

    /// Shared track registry (read-only from the API's point of view)
    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    /// Next track to play, given the ids already played this game
    pub async fn next_playable(&self, played: &[String]) -> Option<crate::models::Track> {
        self.registry.next_playable(played).await
    }

    async fn teardown(&self, previous: Option<ActiveSession>) {
        let Some(previous) = previous else {
            return;
        };

        tracing::info!(session_id = %previous.session.session_id, "Stopping session");
        previous.cancel_token.cancel();
        previous.poller_handle.abort();

        self.event_bus.emit_or_log(GameEvent::SessionStopped {
            session_id: previous.session.session_id,
            timestamp: chrono::Utc::now(),
        });
    }
}
