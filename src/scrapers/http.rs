use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

use super::{FetchSession, PageFetcher};
use crate::config::FetcherConfig;
use crate::error::ScrapeError;

/// Plain HTTP fetcher. Enough for sites that render chapter lists server-side.
pub struct HttpFetcher {
    user_agent: String,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl PageFetcher for HttpFetcher {
    fn open(&self) -> Result<Box<dyn FetchSession>, ScrapeError> {
        let client = Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(self.timeout)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ScrapeError::Session(e.to_string()))?;

        Ok(Box::new(HttpSession { client }))
    }
}

struct HttpSession {
    client: Client,
}

impl FetchSession for HttpSession {
    fn fetch_page(&mut self, url: &str) -> Result<String, ScrapeError> {
        let fetch_err = |e: reqwest::Error| ScrapeError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        };

        let resp = self.client.get(url).send().map_err(fetch_err)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::Status { url: url.to_string(), status: status.as_u16() });
        }

        let header_charset = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_param)
            .map(str::to_string);
        let bytes = resp.bytes().map_err(fetch_err)?;
        Ok(decode_page(&bytes, header_charset.as_deref()))
    }

    fn quit(self: Box<Self>) -> Result<(), ScrapeError> {
        Ok(())
    }
}

/// How far into the document a `<meta charset>` declaration is looked for.
const META_SNIFF_LEN: usize = 2048;

/// Decodes a page body. The Content-Type charset wins, then a `<meta>`
/// declaration near the top of the document, then UTF-8. The site serves
/// Big5 and does not always say so in the header.
pub(crate) fn decode_page(bytes: &[u8], header_charset: Option<&str>) -> String {
    let encoding = header_charset
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .or_else(|| meta_charset(bytes))
        .unwrap_or(UTF_8);

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        log::debug!("Page had bytes invalid in {}; replaced", used.name());
    }
    text.into_owned()
}

fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"'))
        } else {
            None
        }
    })
}

fn meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(META_SNIFF_LEN)]);
    let re = Regex::new(r#"(?i)<meta[^>]*charset\s*=\s*["']?([A-Za-z0-9_.:-]+)"#).ok()?;
    let label = re.captures(&head)?.get(1)?.as_str();
    Encoding::for_label(label.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::chapter::extract_latest_chapter;
    use crate::test_support::serve_once;

    fn big5_fixture() -> Vec<u8> {
        std::fs::read("tests/fixtures/comic_big5.html").unwrap()
    }

    #[test]
    fn test_charset_param() {
        assert_eq!(charset_param("text/html; charset=big5"), Some("big5"));
        assert_eq!(charset_param("text/html;Charset=\"UTF-8\""), Some("UTF-8"));
        assert_eq!(charset_param("text/html"), None);
    }

    #[test]
    fn test_meta_charset_used_when_header_is_silent() {
        let html = decode_page(&big5_fixture(), None);
        assert!(html.contains("第 12 話"));
        assert_eq!(extract_latest_chapter(&html, "第").unwrap(), 12);
    }

    #[test]
    fn test_header_charset_wins_over_meta() {
        let page = "<html><head><meta charset=\"big5\"></head><body>第 3 話</body></html>";
        let html = decode_page(page.as_bytes(), Some("utf-8"));
        assert!(html.contains("第 3 話"));
    }

    #[test]
    fn test_plain_page_defaults_to_utf8() {
        assert_eq!(decode_page("<a>第 5 話</a>".as_bytes(), None), "<a>第 5 話</a>");
    }

    #[test]
    fn test_big5_page_over_http_without_header_charset() {
        let (base, server) = serve_once("200 OK", "text/html", big5_fixture());
        let fetcher = HttpFetcher::new(&FetcherConfig::default());

        let mut session = fetcher.open().unwrap();
        let html = session.fetch_page(&format!("{}/comic/123.html", base)).unwrap();
        session.quit().unwrap();
        server.join().unwrap();

        assert_eq!(extract_latest_chapter(&html, "第").unwrap(), 12);
    }

    #[test]
    fn test_error_status_is_scrape_error() {
        let (base, server) = serve_once("404 Not Found", "text/html", b"gone".to_vec());
        let mut session = HttpFetcher::new(&FetcherConfig::default()).open().unwrap();

        let result = session.fetch_page(&format!("{}/comic/999.html", base));
        server.join().unwrap();
        assert!(matches!(result, Err(ScrapeError::Status { status: 404, .. })));
    }
}
