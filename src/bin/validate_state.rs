//! State Validation Binary
//!
//! Validates config.yml and the tracked state file before a scheduled run:
//! - Config parses and the series URL template has a `{}` placeholder
//! - State file exists and is a JSON object keyed by series id
//! - Every series has a name and a plausible id
//! - A notification channel credential is available

use std::path::PathBuf;

use anyhow::{Context, Result};
use comic_notifier::config::Config;
use comic_notifier::notify::Channel;
use comic_notifier::storage::StateStore;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let root = PathBuf::from(std::env::var("ROOT").unwrap_or_else(|_| ".".to_string()));

    println!("=== Comic State Validator ===");

    let config = Config::load(&root).context("Failed to load config.yml")?;
    let store = StateStore::new(config.state_path(&root));

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    match store.load() {
        Ok(state) => {
            if state.is_empty() {
                warnings.push(format!("{:?} tracks no series", store.path()));
            }

            for series in state.iter() {
                if series.name.trim().is_empty() {
                    errors.push(format!("Series '{}' has empty name", series.id));
                }

                if series.id.trim().is_empty() {
                    errors.push(format!("Series '{}' has empty id", series.name));
                } else if !series.id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                    warnings.push(format!(
                        "Series '{}' has an id that may not form a valid URL: {}",
                        series.name,
                        config.site.series_url(&series.id)
                    ));
                }

                if let Some(latest) = series.latest_chapter_num {
                    if latest < series.prev_chapter_num {
                        warnings.push(format!(
                            "Series '{}' has baseline {} ahead of last seen chapter {}",
                            series.name, series.prev_chapter_num, latest
                        ));
                    }
                }
            }

            println!("Loaded {} series from {:?}", state.len(), store.path());
        }
        Err(e) => errors.push(e.to_string()),
    }

    if let Err(e) = Channel::from_config(&config.notifier) {
        errors.push(e.to_string());
    }

    if errors.is_empty() && warnings.is_empty() {
        println!("✓ Config and state are valid");
        return Ok(());
    }

    if !errors.is_empty() {
        println!("\n❌ ERRORS (must fix):");
        for error in &errors {
            println!("  - {}", error);
        }
    }

    if !warnings.is_empty() {
        println!("\n⚠️  WARNINGS:");
        for warning in &warnings {
            println!("  - {}", warning);
        }
    }

    if !errors.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}
