use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use comic_notifier::config::Config;
use comic_notifier::message::format_message;
use comic_notifier::pipeline::Pipeline;
use comic_notifier::scrapers::{fetcher_from_config, ChapterChecker};
use comic_notifier::storage::StateStore;
use comic_notifier::TrackedSeries;

#[derive(Parser)]
#[command(name = "comic_notifier", version, about = "Notify about new webcomic chapters")]
struct Cli {
    /// Directory holding config.yml and the state file
    #[arg(long, env = "ROOT", default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Check every series, notify about new chapters and record them
    Run,
    /// Check every series and print the message without sending or saving
    Check,
    /// Show tracked series and their baselines
    List,
    /// Start tracking a series
    Track {
        id: String,
        name: String,
        /// Last chapter already read
        #[arg(long, default_value_t = 0)]
        prev: u32,
    },
    /// Stop tracking a series
    Untrack { id: String },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load(&cli.root)?;
    let store = StateStore::new(config.state_path(&cli.root));

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let pipeline = Pipeline::from_config(&cli.root, &config)
                .context("Failed to set up notifier")?;
            match pipeline.run_once() {
                Ok(outcome) => log::info!("Run finished: {}", outcome),
                Err(e) => {
                    log::error!("Run failed: {}", e);
                    return Err(e.into());
                }
            }
        }
        Command::Check => {
            let checker = ChapterChecker::new(fetcher_from_config(&config.fetcher), config.site.clone());
            let mut state = store.load()?;
            let failures = checker.check_all(&mut state)?;

            for series in state.iter() {
                let latest = series
                    .latest_chapter_num
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "?".to_string());
                let mark = if series.has_new_chapter { "NEW" } else { "-" };
                println!("{:>4} {} {} -> {}", mark, series.name, series.prev_chapter_num, latest);
            }
            for (id, e) in &failures {
                println!("failed {}: {}", id, e);
            }

            let message = format_message(&state, &config.site);
            if message.is_empty() {
                println!("\nNothing new.");
            } else {
                println!("\nMessage that would be sent:\n{}", message);
            }
        }
        Command::List => {
            let state = store.load()?;
            if state.is_empty() {
                println!("No series tracked.");
            }
            for series in state.iter() {
                println!(
                    "{}\t{}\tread up to {}\t{}",
                    series.id,
                    series.name,
                    series.prev_chapter_num,
                    config.site.series_url(&series.id)
                );
            }
        }
        Command::Track { id, name, prev } => {
            if id.trim().is_empty() || name.trim().is_empty() {
                bail!("series id and name must not be empty");
            }
            let mut state = store.load_or_default()?;
            let replaced = state.get(&id).is_some();
            state.insert(TrackedSeries::new(id.clone(), name.clone(), prev));
            store.save(&state)?;
            if replaced {
                println!("Updated {} ({}), read up to {}", name, id, prev);
            } else {
                println!("Tracking {} ({}), read up to {}", name, id, prev);
            }
        }
        Command::Untrack { id } => {
            let mut state = store.load()?;
            match state.remove(&id) {
                Some(series) => {
                    store.save(&state)?;
                    println!("Stopped tracking {} ({})", series.name, id);
                }
                None => bail!("series {} is not tracked", id),
            }
        }
    }

    Ok(())
}
