use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub default_model: String,
    pub temperature: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl Config {
    /// Loads the config file (defaults when it does not exist) and applies
    /// `PROMPTKIT_*` environment overrides.
    pub fn load() -> Result<Self> {
        let config = Self::load_from(&Self::get_config_path()?)?;
        Ok(config.with_env_overrides())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Persists a new default temperature, keeping the rest of the file.
    pub fn save_temperature(temperature: f32) -> Result<()> {
        Self::save_temperature_to(&Self::get_config_path()?, temperature)
    }

    /// Fails without touching the file when the existing config can't be
    /// read back.
    pub fn save_temperature_to(path: &Path, temperature: f32) -> Result<()> {
        let mut config = Self::load_from(path)?;
        config.temperature = temperature;
        config.save_to(path)
    }

    /// Applies `PROMPTKIT_API_URL`, `PROMPTKIT_MODEL` and
    /// `PROMPTKIT_TEMPERATURE`. Values that do not parse are ignored.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("PROMPTKIT_API_URL").filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(model) = lookup("PROMPTKIT_MODEL").filter(|v| !v.trim().is_empty()) {
            self.default_model = model;
        }
        if let Some(temperature) = lookup("PROMPTKIT_TEMPERATURE")
            .and_then(|v| v.trim().parse::<f32>().ok())
            .filter(|t| (0.0..=1.0).contains(t))
        {
            self.temperature = temperature;
        }
        self
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("promptkit").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.default_model, "gpt-3.5-turbo");
    }

    #[test]
    fn test_round_trip_and_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("promptkit").join("config.json");

        let config = Config {
            api_base_url: "https://prompts.example.com".to_string(),
            default_model: "gigachat".to_string(),
            temperature: 0.2,
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);

        fs::write(&path, r#"{"default_model": "other"}"#).unwrap();
        let partial = Config::load_from(&path).unwrap();
        assert_eq!(partial.default_model, "other");
        assert_eq!(partial.api_base_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_save_temperature_keeps_other_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"api_base_url": "https://prompts.example.com"}"#).unwrap();

        Config::save_temperature_to(&path, 0.4).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_base_url, "https://prompts.example.com");
        assert_eq!(config.temperature, 0.4);
    }

    #[test]
    fn test_save_temperature_leaves_corrupt_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        assert!(Config::save_temperature_to(&path, 0.4).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PROMPTKIT_API_URL", "http://backend:8080"),
            ("PROMPTKIT_MODEL", " "),
            ("PROMPTKIT_TEMPERATURE", "0.3"),
        ]);
        let config = Config::default().with_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_base_url, "http://backend:8080");
        assert_eq!(config.default_model, DEFAULT_MODEL);
        assert_eq!(config.temperature, 0.3);
    }

    #[test]
    fn test_bad_temperature_override_is_ignored() {
        for raw in ["warm", "1.7"] {
            let config = Config::default()
                .with_overrides(|k| (k == "PROMPTKIT_TEMPERATURE").then(|| raw.to_string()));
            assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
        }
    }
}
