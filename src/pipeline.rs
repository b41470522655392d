//! One notifier run: read history, check every series, decide, notify and
//! persist.
//!
//! ```text
//! Idle -> ReadingHistory -> Checking -> Deciding -> Notifying -> PersistingHistory -> Done
//!                                                \-> Skipping -----------------------/
//! ```
//!
//! The state file is only written after the notifier accepted the message,
//! so a failed delivery leaves the baseline untouched for the next run.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::config::{Config, SiteConfig};
use crate::detector::any_new;
use crate::error::{DeliveryError, PipelineError};
use crate::message::format_message;
use crate::notify::{Notifier, WebhookNotifier};
use crate::scrapers::{fetcher_from_config, ChapterChecker};
use crate::storage::{self, StateStore};
use crate::types::{RunOutcome, RunResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    ReadingHistory,
    Checking,
    Deciding,
    Notifying,
    Skipping,
    PersistingHistory,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::ReadingHistory => "reading history",
            Stage::Checking => "checking",
            Stage::Deciding => "deciding",
            Stage::Notifying => "notifying",
            Stage::Skipping => "skipping",
            Stage::PersistingHistory => "persisting history",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

pub struct Pipeline {
    store: StateStore,
    checker: ChapterChecker,
    notifier: Box<dyn Notifier>,
    site: SiteConfig,
    message_path: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(
        store: StateStore,
        checker: ChapterChecker,
        notifier: Box<dyn Notifier>,
        site: SiteConfig,
    ) -> Self {
        Self { store, checker, notifier, site, message_path: None }
    }

    /// Wires the production fetcher and webhook notifier from `config`.
    pub fn from_config(root: &Path, config: &Config) -> Result<Self, DeliveryError> {
        let notifier = WebhookNotifier::from_config(&config.notifier)?;
        let checker = ChapterChecker::new(fetcher_from_config(&config.fetcher), config.site.clone());
        let store = StateStore::new(config.state_path(root));

        Ok(Self::new(store, checker, Box::new(notifier), config.site.clone())
            .with_message_file(config.message_path(root)))
    }

    /// Also keep the last sent message in this file.
    pub fn with_message_file(mut self, path: Option<PathBuf>) -> Self {
        self.message_path = path;
        self
    }

    fn enter(&self, stage: Stage) {
        log::info!("[{}]", stage);
    }

    /// Reads history and checks every series without notifying or writing
    /// anything.
    pub fn check_only(&self) -> Result<RunResult, PipelineError> {
        self.enter(Stage::ReadingHistory);
        let mut state = self.store.load().map_err(PipelineError::ReadingHistory)?;

        self.enter(Stage::Checking);
        let checked_at = Utc::now();
        let failures = self.checker.check_all(&mut state).map_err(PipelineError::Checking)?;
        if !failures.is_empty() {
            log::warn!("{} of {} series could not be checked", failures.len(), state.len());
        }

        self.enter(Stage::Deciding);
        let any_new = any_new(&state);
        Ok(RunResult { checked_at, any_new, state, failures })
    }

    /// Runs the whole pipeline once.
    pub fn run_once(&self) -> Result<RunOutcome, PipelineError> {
        self.enter(Stage::Idle);
        let run = self.check_only()?;
        log::info!("Compared with history at {}, anything new: {}", run.checked_at, run.any_new);

        if !run.any_new {
            self.enter(Stage::Skipping);
            log::info!("Nothing new");
            self.enter(Stage::Done);
            return Ok(RunOutcome::NothingNew);
        }

        self.enter(Stage::Notifying);
        let message = format_message(&run.state, &self.site);
        self.notifier.send(&message).map_err(PipelineError::Notifying)?;

        self.enter(Stage::PersistingHistory);
        let mut state = run.state;
        let notified = state.iter().filter(|s| s.has_new_chapter).count();
        storage::advance(&mut state);
        self.store.save(&state).map_err(PipelineError::PersistingHistory)?;

        if let Some(path) = &self.message_path {
            if let Err(e) = storage::save_message(path, &message) {
                log::warn!("Failed to keep a copy of the message: {}", e);
            }
        }

        self.enter(Stage::Done);
        Ok(RunOutcome::Notified { series: notified })
    }
}
