use regex::Regex;
use scraper::{Html, Selector};

use crate::error::ScrapeError;

/// Finds the newest chapter number on a series index page.
///
/// The site lists chapters oldest first, so the last link whose text contains
/// `marker` (e.g. `第 123 話`) is the latest one.
pub fn extract_latest_chapter(html: &str, marker: &str) -> Result<u32, ScrapeError> {
    let document = Html::parse_document(html);

    let last = link_texts(&document)
        .into_iter()
        .filter(|text| text.contains(marker))
        .last()
        .ok_or_else(|| ScrapeError::NoChapterLinks { marker: marker.to_string() })?;

    chapter_number(&last, marker).ok_or(ScrapeError::NoChapterNumber { text: last })
}

fn link_texts(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("a") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|link| {
            link.text()
                .flat_map(str::split_whitespace)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|text| !text.is_empty())
        .collect()
}

/// Number right after the marker, or else the first all-digit word.
fn chapter_number(text: &str, marker: &str) -> Option<u32> {
    let pattern = format!(r"{}\s*(\d+)", regex::escape(marker));
    if let Ok(re) = Regex::new(&pattern) {
        if let Some(n) = re.captures(text).and_then(|cap| cap[1].parse().ok()) {
            return Some(n);
        }
    }

    text.split_whitespace()
        .find(|word| word.chars().all(|c| c.is_ascii_digit()))
        .and_then(|word| word.parse().ok())
}
