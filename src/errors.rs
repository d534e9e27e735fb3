//! Typed error hierarchy for the Jules helpers.
//!
//! One enum per collaborator:
//! - `CredentialError` — reading `JULES_API_KEY` from the dotenv file
//! - `SourceError` — resolving the repository source from `git`
//! - `ArtifactError` — running the artifact helper script
//! - `ExtractError` — per-session extraction failures

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors from loading the API credential.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential file not found at {path}")]
    MissingFile { path: PathBuf },

    #[error("{key} not found in {path}")]
    MissingKey { key: String, path: PathBuf },

    #[error("Failed to read credential file at {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// Errors from resolving the repository source via `git`.
///
/// The review command collapses all of these into one diagnostic; the
/// variants are kept apart so verbose logging can say what actually failed.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("git binary not found")]
    GitNotFound,

    #[error("{path} is not a git repository")]
    NotARepository { path: PathBuf },

    #[error("no remote.origin.url configured")]
    NoOriginRemote,

    #[error("remote URL '{url}' is not a GitHub repository")]
    UnrecognizedRemote { url: String },

    #[error("git timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("git exited with code {code}: {stderr}")]
    GitFailed { code: i32, stderr: String },

    #[error("Failed to run git: {0}")]
    Io(#[source] std::io::Error),
}

/// Errors from running the artifact helper script.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to spawn artifact helper {path}: {source}")]
    SpawnFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact helper timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("artifact helper exited with code {code}")]
    NonZeroExit { code: i32 },

    #[error("Failed to wait for artifact helper: {0}")]
    Wait(#[source] std::io::Error),
}

/// Errors scoped to a single session during extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid session ID format: {0}")]
    InvalidSessionId(String),

    #[error(transparent)]
    Artifacts(#[from] ArtifactError),

    #[error("No patch found for session {0}")]
    NoPatch(String),

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
