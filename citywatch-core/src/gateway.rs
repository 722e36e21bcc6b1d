use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

use crate::{
    Config,
    error::{DirectoryError, GatewayError},
    gateway::{
        directory::{CityDirectory, DirectorySource},
        openweather::OpenWeatherGateway,
    },
    model::{CityDirectoryEntry, CityId, WeatherReading},
};

pub mod directory;
pub mod openweather;

/// I/O boundary for weather readings and the city directory.
#[async_trait]
pub trait WeatherGateway: Send + Sync + Debug {
    /// Current conditions for one city.
    async fn fetch_current(&self, city_id: CityId) -> Result<WeatherReading, GatewayError>;

    /// The full static directory. Implementations may cache it.
    async fn fetch_directory(&self) -> Result<Arc<[CityDirectoryEntry]>, DirectoryError>;
}

/// Construct the OpenWeather gateway described by `config`.
pub fn gateway_from_config(config: &Config) -> Result<OpenWeatherGateway, GatewayError> {
    let source = match &config.directory_path {
        Some(path) => DirectorySource::File(path.clone()),
        None => DirectorySource::Bundled,
    };

    let mut gateway = OpenWeatherGateway::new(&config.feed_root, CityDirectory::new(source))?
        .with_units(&config.units);

    if let Some(key) = config.effective_api_key() {
        gateway = gateway.with_api_key(key);
    }
    if let Some(lang) = &config.lang {
        gateway = gateway.with_lang(lang);
    }

    Ok(gateway)
}
