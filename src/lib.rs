//! Comic Notifier Library
//!
//! Checks tracked webcomic series for new chapters, posts one webhook message
//! listing them and records the new baseline.

pub mod config;
pub mod detector;
pub mod error;
pub mod message;
pub mod notify;
pub mod pipeline;
pub mod scrapers;
pub mod storage;
pub mod types;

#[cfg(test)]
mod test_support;

pub use error::{DeliveryError, PipelineError, ScrapeError, StorageError};
pub use types::*;
