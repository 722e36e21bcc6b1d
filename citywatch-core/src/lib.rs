//! Core library for the `citywatch` CLI.
//!
//! This crate defines:
//! - Configuration handling
//! - City search over a static directory
//! - The weather gateway abstraction and its OpenWeather implementation
//! - The persisted watchlist and the controller that keeps it current
//!
//! It is used by `citywatch-cli`, but can also be reused by other front ends.

pub mod config;
pub mod controller;
pub mod error;
pub mod finder;
pub mod gateway;
pub mod model;
pub mod store;
pub mod watchlist;

pub use config::Config;
pub use controller::{AddOutcome, RefreshOutcome, RefreshReport, WatchlistController};
pub use error::{DirectoryError, GatewayError, StoreError, ValidationError, WatchError};
pub use finder::SearchOutcome;
pub use gateway::{WeatherGateway, gateway_from_config};
pub use model::{CityDirectoryEntry, CityId, WatchlistEntry, WeatherReading};
pub use store::{FileStore, KeyValueStore, MemoryStore, PersistentWatchlistStore};
pub use watchlist::Watchlist;
