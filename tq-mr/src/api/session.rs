//! Session lifecycle and track snapshot endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::Track;
use crate::AppState;

/// POST /session request body
#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Playlist URL to start a game session from
    pub playlist_url: String,
}

/// Session description returned by POST /session and GET /session
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub playlist_url: String,
    pub playlist_id: String,
    pub started_at: DateTime<Utc>,
    pub track_count: usize,
}

/// POST /session
///
/// Starts a session for the given playlist, replacing any active one.
/// Playlist fetch failure surfaces here as the single session-level
/// error; per-track resolution failures never do.
pub async fn start_session(
    State(state): State<AppState>,
    Json(request): Json<StartSessionRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let (session, track_count) = state
        .session_manager
        .start_session(&request.playlist_url)
        .await?;

    Ok(Json(SessionResponse {
        session_id: session.session_id,
        playlist_url: session.playlist_url,
        playlist_id: session.playlist_id,
        started_at: session.started_at,
        track_count,
    }))
}

/// GET /session
pub async fn current_session(State(state): State<AppState>) -> ApiResult<Json<SessionResponse>> {
    let session = state
        .session_manager
        .current_session()
        .await
        .ok_or_else(|| crate::error::ApiError::NotFound("no active session".to_string()))?;

    let track_count = state.session_manager.registry().len().await;

    Ok(Json(SessionResponse {
        session_id: session.session_id,
        playlist_url: session.playlist_url,
        playlist_id: session.playlist_id,
        started_at: session.started_at,
        track_count,
    }))
}

/// GET /session/tracks
///
/// Full registry snapshot, candidate releases included; the UI's detail
/// view and its fallback-accuracy disclaimer render from this.
pub async fn session_tracks(State(state): State<AppState>) -> Json<Vec<Track>> {
    Json(state.session_manager.registry().snapshot().await)
}

/// GET /session/playable
pub async fn playable_tracks(State(state): State<AppState>) -> Json<Vec<Track>> {
    Json(state.session_manager.registry().playable().await)
}

/// GET /session/next query parameters
#[derive(Debug, Default, Deserialize)]
pub struct NextTrackQuery {
    /// Comma-separated external ids already played this game
    #[serde(default)]
    pub played: String,
}

/// GET /session/next?played=v1,v2
///
/// First ready track not yet played; null once every track in the
/// session has been played.
pub async fn next_track(
    State(state): State<AppState>,
    axum::extract::Query(query): axum::extract::Query<NextTrackQuery>,
) -> Json<Option<Track>> {
    let played: Vec<String> = query
        .played
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();

    Json(state.session_manager.next_playable(&played).await)
}

/// DELETE /session response
#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub stopped: bool,
}

/// DELETE /session
pub async fn stop_session(State(state): State<AppState>) -> Json<StopSessionResponse> {
    let stopped = state.session_manager.stop_session().await;
    Json(StopSessionResponse { stopped })
}

/// Build session routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/session",
            post(start_session).get(current_session).delete(stop_session),
        )
        .route("/session/tracks", get(session_tracks))
        .route("/session/playable", get(playable_tracks))
        .route("/session/next", get(next_track))
}
