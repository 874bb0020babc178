use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tokio::fs;

use crate::config::Config;
use crate::env;
use crate::error::{Result, UpdaterError};

/// Reads and writes the JSON configuration file.
#[derive(Clone, Debug)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path: path.unwrap_or_else(env::config_path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// Load the configuration, falling back to defaults when the file is absent or unreadable.
    pub async fn load(&self) -> Config {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("config: no file at {}, using defaults", self.path.display());
                return Config::default();
            }
            Err(err) => {
                warn!(
                    "config: unable to read {} ({err}); using defaults",
                    self.path.display()
                );
                return Config::default();
            }
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|err| {
            warn!(
                "config: unable to parse {} ({err}); using defaults",
                self.path.display()
            );
            Config::default()
        })
    }

    pub async fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| UpdaterError::io("unable to create config dir", parent, e))?;
        }
        let bytes = serde_json::to_vec_pretty(config)
            .map_err(|e| UpdaterError::Parse(format!("failed to serialize config: {e}")))?;
        fs::write(&self.path, bytes)
            .await
            .map_err(|e| UpdaterError::io("unable to persist config", &self.path, e))?;
        debug!("config: saved {}", self.path.display());
        Ok(())
    }

    /// Delete the stored file and return a fresh default configuration.
    pub async fn reset(&self) -> Result<Config> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(UpdaterError::io("failed to remove config", &self.path, err)),
        }
        let config = Config::default();
        self.save(&config).await?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(Some(dir.path().join("config.json")));
        assert!(!store.exists().await);
        assert_eq!(store.load().await, Config::default());
    }

    #[tokio::test]
    async fn saves_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(Some(dir.path().join("nested").join("config.json")));
        let mut config = Config::default();
        config.add_profile("modpack", "packs/one").unwrap();
        config.auto_update = false;
        store.save(&config).await.unwrap();

        assert!(store.exists().await);
        assert_eq!(store.load().await, config);
    }

    #[tokio::test]
    async fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, b"{ not json").unwrap();
        let store = ConfigStore::new(Some(path));
        assert_eq!(store.load().await, Config::default());
    }

    #[tokio::test]
    async fn reset_discards_customisations() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(Some(dir.path().join("config.json")));
        let mut config = Config::default();
        config.set("loaders", "quilt").unwrap();
        store.save(&config).await.unwrap();

        let fresh = store.reset().await.unwrap();
        assert_eq!(fresh, Config::default());
        assert_eq!(store.load().await, Config::default());
    }
}
