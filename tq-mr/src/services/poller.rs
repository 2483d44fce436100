//! Download progress polling
//!
//! Watches the backing job server for newly downloaded tracks and feeds
//! each one into the metadata resolver. Runs as an explicit cancellable
//! task driven by a fixed 1-second interval; `tick` is public so tests
//! drive the state machine directly instead of waiting on wall-clock
//! timers.

use crate::services::job_client::{DownloadJobClient, DownloadState, JobError};
use crate::services::registry::TrackRegistry;
use crate::services::resolver::TrackMetadataResolver;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tq_common::events::{EventBus, GameEvent};
use uuid::Uuid;

const POLL_INTERVAL_MS: u64 = 1000;

/// Download-state source seam over the job client
#[async_trait]
pub trait DownloadStateSource: Send + Sync {
    async fn download_state(&self, playlist_id: &str) -> Result<DownloadState, JobError>;
}

#[async_trait]
impl DownloadStateSource for DownloadJobClient {
    async fn download_state(&self, playlist_id: &str) -> Result<DownloadState, JobError> {
        DownloadJobClient::download_state(self, playlist_id).await
    }
}

/// Fatal poller errors; transient transport failures are retried instead
#[derive(Debug, Error)]
pub enum PollerError {
    /// The job reported a track id the session never requested
    #[error("Job reported unknown track id: {0}")]
    Integrity(String),
}

/// What one poll tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing new since the last tick
    Idle,
    /// At least one new track was dispatched to the resolver
    Progressed,
    /// All expected tracks observed; polling is done
    Completed,
    /// The session was replaced; polling is obsolete
    SessionReplaced,
}

/// Polls the job server and dispatches newly downloaded tracks
///
/// The cursor counts job ids already observed this session; it only ever
/// advances, and freezes once it reaches the expected total. Every id in
/// the new portion of the list is processed in order, oldest first, so a
/// backlog of several downloads between two ticks is fully caught up.
pub struct DownloadProgressPoller {
    source: Arc<dyn DownloadStateSource>,
    resolver: Arc<TrackMetadataResolver>,
    registry: TrackRegistry,
    event_bus: EventBus,
    session_id: Uuid,
    playlist_id: String,
    cursor: usize,
}

impl DownloadProgressPoller {
    pub fn new(
        source: Arc<dyn DownloadStateSource>,
        resolver: Arc<TrackMetadataResolver>,
        registry: TrackRegistry,
        event_bus: EventBus,
        session_id: Uuid,
        playlist_id: String,
    ) -> Self {
        Self {
            source,
            resolver,
            registry,
            event_bus,
            session_id,
            playlist_id,
            cursor: 0,
        }
    }

    /// Ids observed so far this session
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Poll until completed, cancelled or a fatal integrity error
    ///
    /// One tick runs to completion before the next is considered; ticks
    /// that would fire while a slow tick is still in flight are skipped,
    /// not queued.
    pub async fn run(mut self, cancel_token: CancellationToken) -> Result<(), PollerError> {
        let mut interval = tokio::time::interval(Duration::from_millis(POLL_INTERVAL_MS));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    tracing::debug!(session_id = %self.session_id, "Poller cancelled");
                    return Ok(());
                }
                _ = interval.tick() => {
                    match self.tick().await? {
                        TickOutcome::Idle | TickOutcome::Progressed => {}
                        TickOutcome::Completed => {
                            tracing::info!(
                                session_id = %self.session_id,
                                tracks = self.cursor,
                                "All tracks downloaded, polling stopped"
                            );
                            return Ok(());
                        }
                        TickOutcome::SessionReplaced => return Ok(()),
                    }
                }
            }
        }
    }

    /// One poll cycle
    ///
    /// Transport failures fetching the download state are retryable: the
    /// tick reports Idle and the next interval tries again.
    pub async fn tick(&mut self) -> Result<TickOutcome, PollerError> {
        if self.registry.session_id().await != Some(self.session_id) {
            return Ok(TickOutcome::SessionReplaced);
        }

        let state = match self.source.download_state(&self.playlist_id).await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    playlist_id = %self.playlist_id,
                    error = %e,
                    "Download state fetch failed, retrying next tick"
                );
                return Ok(TickOutcome::Idle);
            }
        };

        let observed = state.video_ids.len();
        let total = state.total_tracks;

        if observed <= self.cursor {
            return Ok(self.completion_outcome(observed, total));
        }

        // Catch up the full new slice, oldest first, one at a time
        for external_id in &state.video_ids[self.cursor..] {
            if self.registry.get(external_id).await.is_none() {
                // The job reported a track the client never requested;
                // contract violation, never swallowed
                tracing::error!(
                    session_id = %self.session_id,
                    external_id = %external_id,
                    "Job reported a track id absent from the registry"
                );
                self.event_bus.emit_or_log(GameEvent::IntegrityError {
                    session_id: self.session_id,
                    external_id: external_id.clone(),
                    timestamp: chrono::Utc::now(),
                });
                return Err(PollerError::Integrity(external_id.clone()));
            }

            let marked = self
                .registry
                .update(self.session_id, external_id, |track| {
                    track.media_available = true;
                })
                .await;
            if !marked {
                return Ok(TickOutcome::SessionReplaced);
            }

            tracing::debug!(
                session_id = %self.session_id,
                external_id = %external_id,
                "Track downloaded, dispatching to resolver"
            );
            self.resolver.resolve(self.session_id, external_id).await;
        }

        self.cursor = observed;

        self.event_bus.emit_or_log(GameEvent::DownloadProgress {
            session_id: self.session_id,
            received: observed,
            total: total.unwrap_or(0),
            timestamp: chrono::Utc::now(),
        });

        match self.completion_outcome(observed, total) {
            TickOutcome::Completed => Ok(TickOutcome::Completed),
            _ => Ok(TickOutcome::Progressed),
        }
    }

    fn completion_outcome(&self, observed: usize, total: Option<usize>) -> TickOutcome {
        match total {
            Some(total) if total > 0 && observed >= total => {
                self.event_bus.emit_or_log(GameEvent::DownloadCompleted {
                    session_id: self.session_id,
                    timestamp: chrono::Utc::now(),
                });
                TickOutcome::Completed
            }
            _ => TickOutcome::Idle,
        }
    }
}
