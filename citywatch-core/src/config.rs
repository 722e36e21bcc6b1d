use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf};

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "CITYWATCH_API_KEY";

/// Default endpoint; `{id}` is replaced by the city id.
pub const DEFAULT_FEED_ROOT: &str = "https://api.openweathermap.org/data/2.5/weather?id={id}";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// units = "metric"
/// lang = "fr"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenWeather `appid`.
    pub api_key: Option<String>,

    /// Weather endpoint template; see [`DEFAULT_FEED_ROOT`].
    pub feed_root: String,

    pub units: String,

    pub lang: Option<String>,

    /// JSON city directory; the bundled sample is used when unset.
    pub directory_path: Option<PathBuf>,

    /// Where the watchlist is persisted; the platform data dir when unset.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            feed_root: DEFAULT_FEED_ROOT.to_string(),
            units: "metric".to_string(),
            lang: None,
            directory_path: None,
            data_dir: None,
        }
    }
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory holding the persisted watchlist.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.data_dir().to_path_buf()),
        }
    }

    /// Set or replace the API key. An empty key clears it.
    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key).filter(|k| !k.trim().is_empty());
    }

    /// API key from the environment, falling back to the file.
    pub fn effective_api_key(&self) -> Option<String> {
        env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.api_key.clone())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "citywatch", "citywatch-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_openweather_metric() {
        let cfg = Config::default();

        assert_eq!(cfg.feed_root, DEFAULT_FEED_ROOT);
        assert_eq!(cfg.units, "metric");
        assert!(cfg.api_key.is_none());
        assert!(cfg.directory_path.is_none());
    }

    #[test]
    fn set_api_key_ignores_blank_values() {
        let mut cfg = Config::default();

        cfg.set_api_key("KEY".into());
        assert_eq!(cfg.api_key.as_deref(), Some("KEY"));

        cfg.set_api_key("  ".into());
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg: Config = toml::from_str("lang = \"fr\"").expect("partial config must parse");

        assert_eq!(cfg.lang.as_deref(), Some("fr"));
        assert_eq!(cfg.units, "metric");
        assert_eq!(cfg.feed_root, DEFAULT_FEED_ROOT);
    }

    #[test]
    fn save_and_load_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("OPEN_KEY".into());
        cfg.directory_path = Some(PathBuf::from("/tmp/city.list.json"));
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_key.as_deref(), Some("OPEN_KEY"));
        assert_eq!(loaded.directory_path, cfg.directory_path);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.units, "metric");
    }
}
