use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use citywatch_core::{
    AddOutcome, CityDirectoryEntry, CityId, Config, FileStore, PersistentWatchlistStore,
    RefreshOutcome, SearchOutcome, WatchlistController, finder::display_name, gateway_from_config,
};
use inquire::{Select, Text};
use std::{path::PathBuf, sync::Arc};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "citywatch", version, about = "Track current weather for a list of cities")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure API key, language and city directory.
    Configure,

    /// Search the city directory.
    Search {
        /// City name or part of it (letters, spaces and hyphens).
        query: String,
    },

    /// Search for a city and add it to the watchlist.
    Add {
        query: String,
    },

    /// Show the watchlist.
    List,

    /// Fetch fresh conditions for one city, or for all of them.
    Refresh {
        /// City id as shown by `list`.
        id: Option<u64>,

        #[arg(long, conflicts_with = "id")]
        all: bool,
    },

    /// Remove a city from the watchlist.
    Remove {
        id: u64,
    },

    /// Remove every city from the watchlist.
    Clear,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Configure => configure(config),
            Command::Search { query } => {
                let controller = open_controller(&config)?;
                let outcome = controller.begin_search(&query).await?;
                print_candidates(&query, &outcome);
                Ok(())
            }
            Command::Add { query } => add(&config, &query).await,
            Command::List => {
                let controller = open_controller(&config)?;
                output::print_watchlist(&controller.entries());
                Ok(())
            }
            Command::Refresh { id, all } => refresh(&config, id, all).await,
            Command::Remove { id } => {
                let controller = open_controller(&config)?;
                if controller.remove(CityId(id)).await? {
                    println!("Removed city {id}.");
                } else {
                    println!("City {id} is not in the watchlist.");
                }
                Ok(())
            }
            Command::Clear => {
                let controller = open_controller(&config)?;
                controller.remove_all().await?;
                println!("Watchlist cleared.");
                Ok(())
            }
        }
    }
}

fn open_controller(config: &Config) -> Result<WatchlistController> {
    let gateway = gateway_from_config(config).context("Failed to set up the weather client")?;
    let data_dir = config.data_dir()?;
    tracing::debug!(data_dir = %data_dir.display(), "opening watchlist store");
    let store = PersistentWatchlistStore::new(Arc::new(FileStore::new(data_dir)));

    let (controller, problem) = WatchlistController::open_recovering(Arc::new(gateway), store)?;
    if let Some(problem) = problem {
        eprintln!("Warning: {problem}. Starting with an empty watchlist.");
    }

    Ok(controller)
}

fn configure(mut config: Config) -> Result<()> {
    let api_key = Text::new("OpenWeather API key:")
        .with_default(config.api_key.as_deref().unwrap_or_default())
        .prompt()?;
    config.set_api_key(api_key);

    let lang = Text::new("Language for descriptions (blank for English):")
        .with_default(config.lang.as_deref().unwrap_or_default())
        .prompt()?;
    config.lang = Some(lang).filter(|l| !l.trim().is_empty());

    let current_dir = config
        .directory_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let directory = Text::new("Path to city.list.json (blank for the bundled sample):")
        .with_default(&current_dir)
        .prompt()?;
    config.directory_path = Some(directory).filter(|d| !d.trim().is_empty()).map(PathBuf::from);

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn add(config: &Config, query: &str) -> Result<()> {
    let controller = open_controller(config)?;
    let outcome = controller.begin_search(query).await?;

    let candidates = match outcome {
        SearchOutcome::Matches(list) => list,
        other => {
            print_candidates(query, &other);
            return Ok(());
        }
    };

    let city = pick_city(candidates)?;
    match controller.add(&city).await? {
        AddOutcome::Added(entry) => {
            println!("Added:");
            output::print_entry(&entry);
        }
        AddOutcome::Duplicate => {
            println!("{} is already in the watchlist.", display_name(&city));
        }
    }

    Ok(())
}

fn pick_city(mut candidates: Vec<CityDirectoryEntry>) -> Result<CityDirectoryEntry> {
    if candidates.len() == 1 {
        return candidates.pop().ok_or_else(|| anyhow!("No city to pick"));
    }

    let labels: Vec<String> = candidates
        .iter()
        .map(|c| format!("{} [{}]", display_name(c), c.id))
        .collect();

    let choice = Select::new("Which city?", labels.clone()).prompt()?;
    let index = labels
        .iter()
        .position(|l| *l == choice)
        .ok_or_else(|| anyhow!("Selected city is not in the list"))?;

    Ok(candidates.swap_remove(index))
}

async fn refresh(config: &Config, id: Option<u64>, all: bool) -> Result<()> {
    let controller = open_controller(config)?;

    match (id, all) {
        (Some(id), _) => match controller.refresh(CityId(id)).await? {
            RefreshOutcome::Updated(entry) => output::print_entry(&entry),
            RefreshOutcome::Discarded => println!("City {id} is not in the watchlist."),
        },
        (None, true) => {
            let report = controller.refresh_all().await;
            output::print_report(&report);
            output::print_watchlist(&controller.entries());
            if !report.all_succeeded() {
                return Err(anyhow!("{} of the refreshes failed", report.failed.len()));
            }
        }
        (None, false) => {
            return Err(anyhow!("Specify a city id or --all"));
        }
    }

    Ok(())
}

fn print_candidates(query: &str, outcome: &SearchOutcome) {
    for line in candidate_lines(query, outcome) {
        println!("{line}");
    }
}

fn candidate_lines(query: &str, outcome: &SearchOutcome) -> Vec<String> {
    match outcome {
        SearchOutcome::Matches(list) => list
            .iter()
            .map(|city| format!("{:>10}  {}", city.id, display_name(city)))
            .collect(),
        // Empty input is rejected by `begin_search` before searching.
        SearchOutcome::NoQuery | SearchOutcome::NoMatches => {
            vec![format!("No city matches '{query}'.")]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_refresh_all() {
        let cli = Cli::try_parse_from(["citywatch", "refresh", "--all"]).unwrap();
        assert!(matches!(cli.command, Command::Refresh { id: None, all: true }));
    }

    #[test]
    fn refresh_id_conflicts_with_all() {
        assert!(Cli::try_parse_from(["citywatch", "refresh", "42", "--all"]).is_err());
    }

    #[test]
    fn candidate_lines_list_matches_or_report_none() {
        let city = CityDirectoryEntry::new(4717560, "Paris", "US", Some("TX"));
        let lines = candidate_lines("paris", &SearchOutcome::Matches(vec![city]));
        assert_eq!(lines, ["   4717560  Paris, TX (US)"]);

        let lines = candidate_lines("zzz", &SearchOutcome::NoMatches);
        assert_eq!(lines, ["No city matches 'zzz'."]);
    }

    #[test]
    fn pick_city_takes_single_candidate_without_prompt() {
        let city = CityDirectoryEntry::new(2996944, "Lyon", "FR", None);
        let picked = pick_city(vec![city.clone()]).unwrap();
        assert_eq!(picked, city);
    }
}
