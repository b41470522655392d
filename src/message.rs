use std::fmt::Write;

use crate::config::SiteConfig;
use crate::types::TrackedState;

/// Builds the notification text for every series with a new chapter, in
/// state order. Returns an empty string when nothing qualifies.
pub fn format_message(state: &TrackedState, site: &SiteConfig) -> String {
    let mut message = String::new();

    for series in state.iter().filter(|s| s.has_new_chapter) {
        let Some(latest) = series.latest_chapter_num else {
            continue;
        };
        // writing to a String cannot fail
        let _ = writeln!(
            message,
            "{} 最新一話:{}話（上次讀到{}話）",
            series.name, latest, series.prev_chapter_num
        );
        let _ = writeln!(message, "{}\n", site.series_url(&series.id));
    }

    message
}
