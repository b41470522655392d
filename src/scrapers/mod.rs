mod chapter;
mod http;
mod selenium;

pub use chapter::extract_latest_chapter;
pub use http::HttpFetcher;
pub use selenium::BrowserFetcher;

use crate::config::{FetcherConfig, FetcherKind, SiteConfig};
use crate::detector;
use crate::error::ScrapeError;
use crate::types::TrackedState;

/// Something that can open a page-fetching session.
pub trait PageFetcher {
    fn open(&self) -> Result<Box<dyn FetchSession>, ScrapeError>;
}

/// An open browser or HTTP session. Must be closed with `quit`.
pub trait FetchSession {
    fn fetch_page(&mut self, url: &str) -> Result<String, ScrapeError>;
    fn quit(self: Box<Self>) -> Result<(), ScrapeError>;
}

pub fn fetcher_from_config(config: &FetcherConfig) -> Box<dyn PageFetcher> {
    match config.kind {
        FetcherKind::Http => Box::new(HttpFetcher::new(config)),
        FetcherKind::Browser => Box::new(BrowserFetcher::new(config)),
    }
}

/// Looks up the latest chapter of every tracked series.
pub struct ChapterChecker {
    fetcher: Box<dyn PageFetcher>,
    site: SiteConfig,
}

impl ChapterChecker {
    pub fn new(fetcher: Box<dyn PageFetcher>, site: SiteConfig) -> Self {
        Self { fetcher, site }
    }

    pub fn fetch_latest(
        &self,
        session: &mut dyn FetchSession,
        series_id: &str,
    ) -> Result<u32, ScrapeError> {
        let url = self.site.series_url(series_id);
        log::debug!("Fetching {}", url);
        let html = session.fetch_page(&url)?;
        extract_latest_chapter(&html, &self.site.chapter_marker)
    }

    /// Checks every series in state order using one session.
    ///
    /// A series that fails to fetch or parse is logged, left with no latest
    /// number and returned in the failure list; the rest are still checked.
    /// Only failing to open the session is an error.
    pub fn check_all(
        &self,
        state: &mut TrackedState,
    ) -> Result<Vec<(String, ScrapeError)>, ScrapeError> {
        let mut session = self.fetcher.open()?;

        if let Some(home) = &self.site.home_url {
            match session.fetch_page(home) {
                Ok(_) => log::info!("Arrived at home page {}", home),
                Err(e) => log::warn!("Home page visit failed, continuing: {}", e),
            }
        }

        let mut failures = Vec::new();
        for series in state.iter_mut() {
            series.reset_run();
            log::info!("Searching chapter list of {} ({})", series.name, series.id);

            match self.fetch_latest(session.as_mut(), &series.id) {
                Ok(latest) => {
                    detector::evaluate(series, latest);
                    if series.has_new_chapter {
                        log::info!("New chapter for {} (latest: {})", series.name, latest);
                    } else {
                        log::info!("No new chapter for {} (latest: {})", series.name, latest);
                    }
                }
                Err(e) => {
                    log::warn!("Skipping {} ({}): {}", series.name, series.id, e);
                    failures.push((series.id.clone(), e));
                }
            }
        }

        if let Err(e) = session.quit() {
            log::warn!("Failed to close fetch session: {}", e);
        }

        Ok(failures)
    }
}
