//! Track metadata resolution
//!
//! Turns a raw track label into canonical title/artist/year plus the
//! candidate-release list, querying the catalog first and the generative
//! fallback second. Resolution is at-most-once per track: the registry's
//! Unresolved → Resolving guard is taken before the first network call,
//! so overlapping triggers for the same track cannot race into duplicate
//! lookups.

use crate::models::{MetadataState, Release, ReleaseConfidence};
use crate::services::catalog_client::{CatalogError, ReleaseCatalogClient};
use crate::services::fallback_client::MetadataFallbackClient;
use crate::services::registry::{BeginResolve, TrackRegistry};
use crate::services::title_parser;
use async_trait::async_trait;
use std::sync::Arc;
use tq_common::events::{EventBus, GameEvent};
use uuid::Uuid;

/// Release lookup seam over the catalog client
#[async_trait]
pub trait ReleaseLookup: Send + Sync {
    async fn lookup(
        &self,
        clean_title: &str,
        artist: Option<&str>,
    ) -> Result<Vec<Release>, CatalogError>;
}

#[async_trait]
impl ReleaseLookup for ReleaseCatalogClient {
    async fn lookup(
        &self,
        clean_title: &str,
        artist: Option<&str>,
    ) -> Result<Vec<Release>, CatalogError> {
        ReleaseCatalogClient::lookup(self, clean_title, artist).await
    }
}

/// Release lookup seam over the generative fallback client
#[async_trait]
pub trait FallbackLookup: Send + Sync {
    async fn lookup(&self, clean_title: &str, artist: Option<&str>) -> Vec<Release>;
}

#[async_trait]
impl FallbackLookup for MetadataFallbackClient {
    async fn lookup(&self, clean_title: &str, artist: Option<&str>) -> Vec<Release> {
        MetadataFallbackClient::lookup(self, clean_title, artist).await
    }
}

/// How one resolve call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// Metadata attached; track is Resolved
    Resolved,
    /// Nothing usable found; track is NotFound
    NotFound,
    /// Track had already left Unresolved; nothing done
    AlreadySettled,
    /// Session was replaced; result discarded
    StaleSession,
}

/// Orchestrates title parsing, catalog lookup and fallback lookup for
/// one track at a time
pub struct TrackMetadataResolver {
    catalog: Arc<dyn ReleaseLookup>,
    fallback: Option<Arc<dyn FallbackLookup>>,
    registry: TrackRegistry,
    event_bus: EventBus,
}

impl TrackMetadataResolver {
    pub fn new(
        catalog: Arc<dyn ReleaseLookup>,
        fallback: Option<Arc<dyn FallbackLookup>>,
        registry: TrackRegistry,
        event_bus: EventBus,
    ) -> Self {
        Self {
            catalog,
            fallback,
            registry,
            event_bus,
        }
    }

    /// Resolve one track's metadata
    ///
    /// Idempotent: a second call for an already Resolving/Resolved/
    /// NotFound track returns immediately without any lookup.
    pub async fn resolve(&self, session_id: Uuid, external_id: &str) -> ResolveOutcome {
        match self.registry.begin_resolving(session_id, external_id).await {
            BeginResolve::Started => {}
            BeginResolve::AlreadyHandled => return ResolveOutcome::AlreadySettled,
            BeginResolve::StaleSession | BeginResolve::UnknownTrack => {
                tracing::debug!(external_id = %external_id, "Resolve skipped, session gone");
                return ResolveOutcome::StaleSession;
            }
        }

        // The guard is held from here on; exactly one caller reaches this
        // point per track.
        let Some(track) = self.registry.get(external_id).await else {
            return ResolveOutcome::StaleSession;
        };

        self.event_bus.emit_or_log(GameEvent::TrackResolving {
            session_id,
            external_id: external_id.to_string(),
            timestamp: chrono::Utc::now(),
        });

        let parsed = title_parser::parse(&track.raw_label);
        if parsed.clean_title.is_empty() {
            tracing::info!(
                raw_label = %track.raw_label,
                "Could not parse label sensibly, no metadata lookup possible"
            );
            return self
                .mark_not_found(session_id, external_id, "unparseable title")
                .await;
        }

        // Remaster suffixes that survive bracket stripping would poison
        // the exact-phrase query
        let clean_title = title_parser::strip_remaster_suffix(&parsed.clean_title);
        if clean_title.is_empty() {
            return self
                .mark_not_found(session_id, external_id, "unparseable title")
                .await;
        }

        let artist = parsed.artist.as_deref();

        let releases = match self.catalog.lookup(&clean_title, artist).await {
            Ok(releases) => releases,
            Err(e) => {
                // Catalog trouble is not fatal to the track; the fallback
                // still gets its chance
                tracing::warn!(
                    external_id = %external_id,
                    error = %e,
                    "Catalog lookup failed, treating as empty"
                );
                Vec::new()
            }
        };

        if !releases.is_empty() {
            return self
                .apply_releases(session_id, external_id, &clean_title, artist, releases)
                .await;
        }

        let Some(fallback) = &self.fallback else {
            tracing::warn!(
                external_id = %external_id,
                "No catalog match and metadata fallback is not configured"
            );
            return self
                .mark_not_found(session_id, external_id, "fallback not configured")
                .await;
        };

        let releases = fallback.lookup(&clean_title, artist).await;
        if releases.is_empty() {
            return self
                .mark_not_found(session_id, external_id, "no usable metadata")
                .await;
        }

        self.apply_releases(session_id, external_id, &clean_title, artist, releases)
            .await
    }

    /// Attach a non-empty release list to the track and mark it Resolved
    ///
    /// The earliest-year release is canonical: its title (when present)
    /// and artist credit win over the parsed ones.
    async fn apply_releases(
        &self,
        session_id: Uuid,
        external_id: &str,
        clean_title: &str,
        parsed_artist: Option<&str>,
        releases: Vec<Release>,
    ) -> ResolveOutcome {
        let canonical = &releases[0];
        let confidence = canonical.confidence;

        let title = canonical
            .title
            .clone()
            .unwrap_or_else(|| clean_title.to_string());
        let artist = if canonical.artist_credit.is_empty() {
            parsed_artist.map(|a| a.to_string())
        } else {
            Some(canonical.artist_credit.clone())
        };
        let year = canonical.year;

        let applied = self
            .registry
            .update(session_id, external_id, |track| {
                track.resolved_title = Some(title.clone());
                track.resolved_artist = artist.clone();
                track.resolved_year = Some(year);
                track.candidate_releases = releases;
                track.metadata_state = MetadataState::Resolved;
            })
            .await;

        if !applied {
            tracing::debug!(external_id = %external_id, "Resolution result discarded, session replaced");
            return ResolveOutcome::StaleSession;
        }

        if confidence == ReleaseConfidence::GeneratedFallback {
            tracing::info!(
                external_id = %external_id,
                title = %title,
                "Track resolved from generative fallback"
            );
        } else {
            tracing::info!(
                external_id = %external_id,
                title = %title,
                year = year,
                "Track resolved from catalog"
            );
        }

        self.event_bus.emit_or_log(GameEvent::TrackResolved {
            session_id,
            external_id: external_id.to_string(),
            title,
            artist,
            year: Some(year),
            confidence,
            timestamp: chrono::Utc::now(),
        });

        ResolveOutcome::Resolved
    }

    async fn mark_not_found(
        &self,
        session_id: Uuid,
        external_id: &str,
        reason: &str,
    ) -> ResolveOutcome {
        let applied = self
            .registry
            .update(session_id, external_id, |track| {
                track.metadata_state = MetadataState::NotFound;
            })
            .await;

        if !applied {
            return ResolveOutcome::StaleSession;
        }

        self.event_bus.emit_or_log(GameEvent::TrackNotFound {
            session_id,
            external_id: external_id.to_string(),
            reason: reason.to_string(),
            timestamp: chrono::Utc::now(),
        });

        ResolveOutcome::NotFound
    }
}
