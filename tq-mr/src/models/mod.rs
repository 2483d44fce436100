//! Data models for the metadata resolver

mod session;
mod track;

pub use session::GameSession;
pub use track::{MetadataState, Release, Track};

pub use tq_common::events::ReleaseConfidence;
