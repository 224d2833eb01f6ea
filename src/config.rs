//! Configuration for the tracker server
//!
//! Read from `$JEEPNEY_CONFIG`, or `~/.config/jeepney-tracker/config.toml`
//! when that variable is unset. A missing file means defaults. Environment
//! variables (a `.env` file is honored) override file values.

use crate::error::{Result, TrackerError};
use crate::jeepney_models::LatLng;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Cebu City
pub const DEFAULT_CENTER: LatLng = LatLng::new(10.3157, 123.8854);

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub server: ServerConfig,
    pub fleet: FleetConfig,
    pub map: MapConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// CSV directory; the built-in sample fleet is used when unset
    pub data_dir: Option<PathBuf>,
    /// Seconds between reloads of `data_dir`; 0 disables
    pub refresh_interval_secs: u64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            refresh_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub api_key: Option<String>,
    pub center: LatLng,
    pub zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            center: DEFAULT_CENTER,
            zoom: 13,
        }
    }
}

impl MapConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl TrackerConfig {
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = env::var("JEEPNEY_CONFIG") {
            return Ok(PathBuf::from(path));
        }

        let dir = dirs::config_dir()
            .ok_or_else(|| TrackerError::Config("no config directory on this platform".to_string()))?;
        Ok(dir.join("jeepney-tracker").join("config.toml"))
    }

    /// Loads file config (if any), then applies environment overrides.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let path = Self::config_path()?;
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| TrackerError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| TrackerError::Config(e.to_string()))
    }

    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("JEEPNEY_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("JEEPNEY_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| TrackerError::Config(format!("JEEPNEY_PORT is not a port: {}", port)))?;
        }
        if let Some(dir) = lookup("JEEPNEY_DATA_DIR") {
            self.fleet.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(secs) = lookup("JEEPNEY_REFRESH_SECS") {
            self.fleet.refresh_interval_secs = secs
                .parse()
                .map_err(|_| TrackerError::Config(format!("JEEPNEY_REFRESH_SECS is not a number: {}", secs)))?;
        }
        if let Some(key) = lookup("GOOGLE_MAPS_API_KEY") {
            self.map.api_key = Some(key);
        }
        Ok(())
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}

impl std::fmt::Display for TrackerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Bind:          {}:{}", self.server.host, self.server.port)?;
        writeln!(
            f,
            "Fleet data:    {}",
            self.fleet
                .data_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(built-in sample)".to_string())
        )?;
        writeln!(f, "Refresh every: {}s", self.fleet.refresh_interval_secs)?;
        writeln!(f, "Map key:       {}", if self.map.has_api_key() { "set" } else { "(missing)" })?;
        write!(f, "Map center:    {}, {} @ zoom {}", self.map.center.lat, self.map.center.lng, self.map.zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_gives_defaults() {
        let config = TrackerConfig::from_toml_str("").unwrap();
        assert_eq!(config.bind_address(), ("0.0.0.0".to_string(), 8080));
        assert_eq!(config.fleet.refresh_interval_secs, 30);
        assert!(config.fleet.data_dir.is_none());
        assert_eq!(config.map.center, DEFAULT_CENTER);
        assert!(!config.map.has_api_key());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = TrackerConfig::from_toml_str(
            r#"
            [server]
            port = 9090

            [fleet]
            data_dir = "/srv/jeepney"

            [map]
            api_key = "abc"
            center = { lat = 10.33, lng = 123.90 }
            "#,
        )
        .unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.fleet.data_dir, Some(PathBuf::from("/srv/jeepney")));
        assert_eq!(config.fleet.refresh_interval_secs, 30);
        assert!(config.map.has_api_key());
        assert_eq!(config.map.zoom, 13);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = TrackerConfig::from_toml_str("[server\nport = 1").unwrap_err();
        assert!(matches!(err, TrackerError::Config(_)));
    }

    #[test]
    fn environment_overrides_file_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("JEEPNEY_PORT", "3000"),
            ("JEEPNEY_DATA_DIR", "./data"),
            ("GOOGLE_MAPS_API_KEY", "key-from-env"),
        ]);

        let mut config = TrackerConfig::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.fleet.data_dir, Some(PathBuf::from("./data")));
        assert_eq!(config.map.api_key.as_deref(), Some("key-from-env"));
    }

    #[test]
    fn bad_port_override_is_rejected() {
        let mut config = TrackerConfig::default();
        let result = config.apply_overrides(|k| (k == "JEEPNEY_PORT").then(|| "eighty".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let map = MapConfig { api_key: Some("  ".to_string()), ..MapConfig::default() };
        assert!(!map.has_api_key());
    }

    #[test]
    fn reads_config_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[fleet]\nrefresh_interval_secs = 0\n").unwrap();

        let config = TrackerConfig::from_file(&path).unwrap();
        assert_eq!(config.fleet.refresh_interval_secs, 0);
    }
}
