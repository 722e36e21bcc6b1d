use async_trait::async_trait;
use chrono::Local;
use reqwest::Client;
use serde::Deserialize;
use std::{sync::Arc, time::Duration};

use crate::{
    error::{DirectoryError, GatewayError},
    gateway::directory::CityDirectory,
    model::{CityDirectoryEntry, CityId, WeatherReading},
};

use super::WeatherGateway;

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct OpenWeatherGateway {
    http: Client,
    feed_root: String,
    api_key: Option<String>,
    units: String,
    lang: Option<String>,
    directory: CityDirectory,
}

impl OpenWeatherGateway {
    /// `feed_root` may contain `{id}`; otherwise the id is appended as a path segment.
    pub fn new(feed_root: &str, directory: CityDirectory) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            feed_root: feed_root.to_string(),
            api_key: None,
            units: "metric".to_string(),
            lang: None,
            directory,
        })
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_units(mut self, units: &str) -> Self {
        self.units = units.to_string();
        self
    }

    pub fn with_lang(mut self, lang: &str) -> Self {
        self.lang = Some(lang.to_string());
        self
    }

    fn current_url(&self, city_id: CityId) -> String {
        if self.feed_root.contains("{id}") {
            self.feed_root.replace("{id}", &city_id.to_string())
        } else {
            format!("{}/{}", self.feed_root.trim_end_matches('/'), city_id)
        }
    }

    fn query_params(&self) -> Vec<(&'static str, &str)> {
        let mut params = vec![("units", self.units.as_str())];
        if let Some(key) = &self.api_key {
            params.push(("appid", key.as_str()));
        }
        if let Some(lang) = &self.lang {
            params.push(("lang", lang.as_str()));
        }
        params
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    id: u64,
    name: String,
    sys: OwSys,
    main: OwMain,
    weather: Vec<OwWeather>,
}

#[async_trait]
impl WeatherGateway for OpenWeatherGateway {
    async fn fetch_current(&self, city_id: CityId) -> Result<WeatherReading, GatewayError> {
        let url = self.current_url(city_id);
        tracing::debug!(%city_id, %url, "requesting current weather");

        let res = self.http.get(&url).query(&self.query_params()).send().await?;

        let status = res.status();
        let body = res.text().await?;
        let received_at = Local::now();

        if !status.is_success() {
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Payload(format!("{e}: {}", truncate_body(&body))))?;

        let condition = parsed.weather.into_iter().next().ok_or_else(|| {
            GatewayError::Payload("response contained no weather conditions".to_string())
        })?;

        Ok(WeatherReading {
            city_id: CityId(parsed.id),
            name: parsed.name,
            country: parsed.sys.country,
            description: condition.description,
            icon: condition.icon,
            temp: parsed.main.temp,
            feels_like: parsed.main.feels_like,
            temp_min: parsed.main.temp_min,
            temp_max: parsed.main.temp_max,
            received_at,
        })
    }

    async fn fetch_directory(&self) -> Result<Arc<[CityDirectoryEntry]>, DirectoryError> {
        self.directory.load().await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
