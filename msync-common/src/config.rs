//! Configuration loading and default path resolution
//!
//! The configuration is read once at startup into an explicit [`Config`]
//! value and passed by reference into the orchestrator and its
//! collaborators; nothing is loaded lazily or held in module globals.

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "config.toml";
const APP_DIR: &str = "msync";
const LEDGER_FILENAME: &str = "artists.json";

/// Top-level configuration, deserialized from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mpd: MpdConfig,
    pub muspy: MuspyConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// MPD connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct MpdConfig {
    #[serde(default = "default_mpd_host")]
    pub host: String,
    #[serde(default = "default_mpd_port")]
    pub port: u16,
    /// Group the library by the albumartist tag instead of artist
    #[serde(default)]
    pub use_albumartist: bool,
}

/// MuSpy account and endpoint settings
#[derive(Debug, Clone, Deserialize)]
pub struct MuspyConfig {
    #[serde(default = "default_muspy_url")]
    pub url: String,
    pub username: String,
    pub password: String,
    pub user_id: String,
    /// Skip TLS certificate verification (self-hosted instances)
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

/// Sync engine tunables
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Also remove MuSpy artists that no longer exist in the MPD library
    #[serde(default)]
    pub full_sync: bool,
    /// Worker count for identifier resolution. Kept low to stay under the
    /// MusicBrainz rate limit.
    #[serde(default = "default_resolve_workers")]
    pub resolve_workers: usize,
    /// Worker count for catalog upload/removal
    #[serde(default = "default_upload_workers")]
    pub upload_workers: usize,
    /// Artist names excluded from every sync operation (case-insensitive)
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Override for the ledger file location
    #[serde(default)]
    pub ledger_path: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            full_sync: false,
            resolve_workers: default_resolve_workers(),
            upload_workers: default_upload_workers(),
            ignore: Vec::new(),
            ledger_path: None,
        }
    }
}

fn default_mpd_host() -> String {
    "localhost".to_string()
}

fn default_mpd_port() -> u16 {
    6600
}

fn default_muspy_url() -> String {
    "https://muspy.com/api/1".to_string()
}

fn default_resolve_workers() -> usize {
    3
}

fn default_upload_workers() -> usize {
    5
}

impl Config {
    /// Load configuration from an explicit path, or from the first
    /// discovered config file (see [`Config::find_config_file`]).
    ///
    /// A missing or unparseable file is a fatal `Error::Config`; the tool
    /// refuses to start without credentials.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => Self::find_config_file()?,
        };
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Locate the configuration file, in priority order:
    /// 1. `<user config dir>/msync/config.toml`
    /// 2. `/etc/msync/config.toml` (Linux)
    pub fn find_config_file() -> Result<PathBuf> {
        if let Some(dir) = dirs::config_dir() {
            let path = dir.join(APP_DIR).join(CONFIG_FILENAME);
            if path.is_file() {
                return Ok(path);
            }
        }
        if cfg!(target_os = "linux") {
            let path = PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME);
            if path.is_file() {
                return Ok(path);
            }
        }
        Err(Error::Config(format!(
            "configuration file {} not found; create it under {}",
            CONFIG_FILENAME,
            dirs::config_dir()
                .map(|d| d.join(APP_DIR).display().to_string())
                .unwrap_or_else(|| format!("/etc/{}", APP_DIR)),
        )))
    }

    /// Ledger file location: the configured override, or
    /// `<data dir>/msync/artists.json`
    pub fn ledger_path(&self) -> PathBuf {
        if let Some(path) = &self.sync.ledger_path {
            return path.clone();
        }
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from(".").join(APP_DIR))
            .join(LEDGER_FILENAME)
    }

    /// The ignore list, lower-cased for case-insensitive membership tests
    pub fn ignore_set(&self) -> HashSet<String> {
        self.sync
            .ignore
            .iter()
            .map(|name| name.to_lowercase())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [mpd]

        [muspy]
        username = "user@example.com"
        password = "secret"
        user_id = "abcd1234"
    "#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.mpd.host, "localhost");
        assert_eq!(config.mpd.port, 6600);
        assert!(!config.mpd.use_albumartist);
        assert_eq!(config.muspy.url, "https://muspy.com/api/1");
        assert!(!config.muspy.accept_invalid_certs);
        assert!(!config.sync.full_sync);
        assert_eq!(config.sync.resolve_workers, 3);
        assert_eq!(config.sync.upload_workers, 5);
        assert!(config.sync.ignore.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r#"
            [mpd]
            host = "jukebox.local"
            port = 6601
            use_albumartist = true

            [muspy]
            url = "https://muspy.example.org/api/1"
            username = "user"
            password = "pw"
            user_id = "deadbeef"
            accept_invalid_certs = true

            [sync]
            full_sync = true
            resolve_workers = 2
            upload_workers = 8
            ignore = ["Various Artists", "soundtrack"]
            ledger_path = "/tmp/msync/artists.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.mpd.host, "jukebox.local");
        assert!(config.mpd.use_albumartist);
        assert!(config.muspy.accept_invalid_certs);
        assert!(config.sync.full_sync);
        assert_eq!(config.sync.upload_workers, 8);
        assert_eq!(
            config.ledger_path(),
            PathBuf::from("/tmp/msync/artists.json")
        );
    }

    #[test]
    fn test_missing_credentials_is_an_error() {
        assert!(Config::from_toml("[mpd]\n").is_err());
    }

    #[test]
    fn test_ignore_set_is_lowercased() {
        let config = Config::from_toml(
            r#"
            [mpd]

            [muspy]
            username = "u"
            password = "p"
            user_id = "id"

            [sync]
            ignore = ["Various Artists"]
            "#,
        )
        .unwrap();
        assert!(config.ignore_set().contains("various artists"));
        assert!(!config.ignore_set().contains("Various Artists"));
    }

    #[test]
    fn test_load_reads_an_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.muspy.user_id, "abcd1234");
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = Config::load(Some(Path::new("/nonexistent/msync.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
