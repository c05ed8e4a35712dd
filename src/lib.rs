//! Bili Scribe - pull everything useful out of a Bilibili video link
//!
//! Resolves a BV identifier from whatever link the user pastes, fetches the
//! title, description and hot comments from the public web API, and
//! transcribes the audio track with yt-dlp plus a local Whisper model.

pub mod api;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod transcribe;

pub use api::{ApiError, BiliApiClient, CommentSection, RankedComment, VideoApi, VideoMetadata};
pub use cli::Cli;
pub use config::Config;
pub use pipeline::{Pipeline, RunOutcome};
pub use report::Report;
pub use resolver::{Bvid, HttpRedirectFollower, Resolver, VideoRef};
pub use transcribe::{AudioTranscriber, TranscribeError, TranscriptionProvider, TranscriptionResult};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Failures that end a run
#[derive(thiserror::Error, Debug)]
pub enum ScribeError {
    #[error("Could not extract a BV identifier from: {0}")]
    UnresolvedUrl(String),

    #[error("Failed to fetch video info: {0}")]
    Metadata(#[from] ApiError),
}
