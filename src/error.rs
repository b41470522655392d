//! Error taxonomy for a notifier run.
//!
//! Storage and delivery failures abort the run; scrape failures are contained
//! per series by the checker.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("state file {path:?} not found")]
    Missing { path: PathBuf },

    #[error("failed to read state file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path:?} is not valid JSON: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("failed to open fetch session: {0}")]
    Session(String),

    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("no chapter links containing {marker:?} on page")]
    NoChapterLinks { marker: String },

    #[error("chapter link {text:?} has no chapter number")]
    NoChapterNumber { text: String },
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("refusing to send an empty message")]
    EmptyMessage,

    #[error("notifier is not configured: {0}")]
    NotConfigured(String),

    /// Built with `reqwest::Error::without_url`: the webhook URL is the secret.
    #[error("webhook request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("webhook rejected message with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Fatal errors of a single pipeline execution.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("reading history failed: {0}")]
    ReadingHistory(#[source] StorageError),

    #[error("checking failed: {0}")]
    Checking(#[source] ScrapeError),

    #[error("notification failed: {0}")]
    Notifying(#[source] DeliveryError),

    #[error("persisting history failed: {0}")]
    PersistingHistory(#[source] StorageError),
}
