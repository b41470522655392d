use std::future::Future;
use std::time::Duration;

use thirtyfour::prelude::*;
use thirtyfour::ChromeCapabilities;
use tokio::runtime::{Builder, Runtime};

use super::{FetchSession, PageFetcher};
use crate::config::FetcherConfig;
use crate::error::ScrapeError;

const JS_RENDER_WAIT: u64 = 1;

/// Drives a ChromeDriver instance for sites that need JavaScript to list
/// chapters. One browser is started per checking pass.
pub struct BrowserFetcher {
    webdriver_url: String,
    user_agent: String,
    timeout: Duration,
}

impl BrowserFetcher {
    pub fn new(config: &FetcherConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn capabilities(&self) -> WebDriverResult<ChromeCapabilities> {
        let mut caps = DesiredCapabilities::chrome();
        let user_agent = format!("--user-agent={}", self.user_agent);
        caps.add_chrome_option(
            "args",
            vec![
                "--headless=new",
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--disable-gpu",
                "--window-size=1920,1080",
                user_agent.as_str(),
            ],
        )?;
        Ok(caps)
    }
}

impl PageFetcher for BrowserFetcher {
    fn open(&self) -> Result<Box<dyn FetchSession>, ScrapeError> {
        let session_err = |e: &dyn std::fmt::Display| ScrapeError::Session(e.to_string());

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| session_err(&e))?;

        let caps = self.capabilities().map_err(|e| session_err(&e))?;
        let driver = runtime
            .block_on(within(self.timeout, &self.webdriver_url, WebDriver::new(&self.webdriver_url, caps)))
            .map_err(|e| {
                session_err(&format!("failed to connect to ChromeDriver at {}: {}", self.webdriver_url, e))
            })?;

        log::debug!("Browser session opened via {}", self.webdriver_url);
        Ok(Box::new(BrowserSession { runtime, driver: Some(driver), timeout: self.timeout }))
    }
}

struct BrowserSession {
    runtime: Runtime,
    driver: Option<WebDriver>,
    timeout: Duration,
}

impl FetchSession for BrowserSession {
    fn fetch_page(&mut self, url: &str) -> Result<String, ScrapeError> {
        let driver = self
            .driver
            .as_ref()
            .ok_or_else(|| ScrapeError::Session("browser already closed".to_string()))?;

        self.runtime.block_on(within(self.timeout, url, async {
            driver.goto(url).await?;
            tokio::time::sleep(Duration::from_secs(JS_RENDER_WAIT)).await;
            driver.source().await
        }))
    }

    fn quit(mut self: Box<Self>) -> Result<(), ScrapeError> {
        match self.driver.take() {
            Some(driver) => self
                .runtime
                .block_on(within(self.timeout, "quit", driver.quit()))
                .map_err(|e| ScrapeError::Session(format!("failed to quit browser: {}", e))),
            None => Ok(()),
        }
    }
}

/// Bounds one WebDriver round trip (page load and render wait included) by
/// the configured fetch timeout.
async fn within<T>(
    timeout: Duration,
    url: &str,
    fut: impl Future<Output = WebDriverResult<T>>,
) -> Result<T, ScrapeError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(|e| ScrapeError::Fetch { url: url.to_string(), message: e.to_string() }),
        Err(_) => Err(ScrapeError::Fetch {
            url: url.to_string(),
            message: format!("timed out after {}s", timeout.as_secs()),
        }),
    }
}
