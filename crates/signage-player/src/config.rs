//! Player configuration: `{cms_url, cms_key, display_name, hardware_key,
//! xmr_channel}` persisted as TOML (spec §6 "Persisted state layout").

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("writing {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("serializing configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Minimum well-formed length for `hardware_key` (§8 property 8). A key
/// shorter than this is treated as absent and regenerated.
const MIN_HARDWARE_KEY_LEN: usize = 10;
const GENERATED_HARDWARE_KEY_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub cms_url: String,
    pub cms_key: String,
    pub display_name: String,
    pub hardware_key: String,
    pub xmr_channel: Option<String>,
}

impl PlayerConfig {
    /// Loads configuration from `path`, generating and persisting a fresh
    /// `hardware_key` on first run or if the stored one is malformed. The
    /// key is never regenerated while it remains well-formed, so repeated
    /// calls across restarts return a byte-identical value.
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str::<Self>(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            Self {
                cms_url: String::new(),
                cms_key: String::new(),
                display_name: "unconfigured-display".to_string(),
                hardware_key: String::new(),
                xmr_channel: None,
            }
        };

        if config.hardware_key.len() < MIN_HARDWARE_KEY_LEN {
            config.hardware_key = generate_hardware_key();
            config.save(path)?;
        }

        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn generate_hardware_key() -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..GENERATED_HARDWARE_KEY_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_run_generates_a_well_formed_hardware_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = PlayerConfig::load_or_init(&path).unwrap();
        assert!(config.hardware_key.len() >= MIN_HARDWARE_KEY_LEN);
        assert!(path.exists());
    }

    #[test]
    fn hardware_key_is_stable_across_restarts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let first = PlayerConfig::load_or_init(&path).unwrap();
        let second = PlayerConfig::load_or_init(&path).unwrap();
        assert_eq!(first.hardware_key, second.hardware_key);
    }

    #[test]
    fn malformed_hardware_key_is_regenerated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = PlayerConfig::load_or_init(&path).unwrap();
        config.hardware_key = "short".to_string();
        config.save(&path).unwrap();

        let reloaded = PlayerConfig::load_or_init(&path).unwrap();
        assert!(reloaded.hardware_key.len() >= MIN_HARDWARE_KEY_LEN);
        assert_ne!(reloaded.hardware_key, "short");
    }
}
