//! Runtime configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file, then
//! `VIEWPOINT_*` environment variables.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "viewpoint.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "VIEWPOINT_";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generation API base URL
    pub api_base_url: String,
    /// Image model used for generation
    pub model: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Settings database and fantasy map images
    pub data_dir: PathBuf,
    /// Where saved views are written
    pub gallery_dir: PathBuf,
    /// Nominatim-compatible search base URL
    pub geocoder_url: String,
    /// User-Agent sent to the geocoder
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-3-pro-image-preview".to_string(),
            connect_timeout_secs: 60,
            request_timeout_secs: 120,
            data_dir: PathBuf::from("data"),
            gallery_dir: PathBuf::from("gallery"),
            geocoder_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("viewpoint/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Build the layered figment
    ///
    /// An explicit path must exist; the default file is optional.
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = match path {
            Some(p) => Toml::file_exact(p),
            None => Toml::file(DEFAULT_CONFIG_FILE),
        };

        Figment::from(Serialized::defaults(Config::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load configuration
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    /// Path of the settings database
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("settings.db")
    }

    /// Directory holding imported fantasy map images
    pub fn fantasy_map_dir(&self) -> PathBuf {
        self.data_dir.join("fantasy_maps")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.model, "gemini-3-pro-image-preview");
        assert_eq!(config.connect_timeout_secs, 60);
        assert_eq!(config.request_timeout_secs, 120);
        assert_eq!(config.database_path(), PathBuf::from("data/settings.db"));
        assert_eq!(config.fantasy_map_dir(), PathBuf::from("data/fantasy_maps"));
    }

    #[test]
    fn test_file_then_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                model = "file-model"
                request_timeout_secs = 30
                data_dir = "/var/lib/viewpoint"
                "#,
            )?;
            jail.set_env("VIEWPOINT_MODEL", "env-model");

            let config = Config::load(None)?;
            assert_eq!(config.model, "env-model");
            assert_eq!(config.request_timeout_secs, 30);
            assert_eq!(config.connect_timeout_secs, 60);
            assert_eq!(
                config.database_path(),
                PathBuf::from("/var/lib/viewpoint/settings.db")
            );
            assert_eq!(
                config.fantasy_map_dir(),
                PathBuf::from("/var/lib/viewpoint/fantasy_maps")
            );
            Ok(())
        });
    }

    #[test]
    fn test_data_dir_is_persistent_without_file() {
        Jail::expect_with(|jail| {
            let config = Config::load(None)?;
            assert_eq!(config.data_dir, PathBuf::from("data"));

            jail.set_env("VIEWPOINT_DATA_DIR", "/srv/viewpoint");
            let config = Config::load(None)?;
            assert_eq!(
                config.database_path(),
                PathBuf::from("/srv/viewpoint/settings.db")
            );
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        Jail::expect_with(|_jail| {
            assert!(Config::load(Some(Path::new("nope.toml"))).is_err());
            Ok(())
        });
    }
}
