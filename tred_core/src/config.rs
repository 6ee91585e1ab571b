use std::path::{Path, PathBuf};

use iroh::SecretKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::info;

static DATA_DIR_NAME: &str = "tred";
static TRED_DB_NAME: &str = "tred_db.sqlite";
static CONFIG_FILE_NAME: &str = "config.json";

// data_dir_path
// |- tred
//    |- tred_db.sqlite
//    |- config.json

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no data directory on this platform")]
    NoDataDir,
    #[error("config io error")]
    Io(#[from] std::io::Error),
    #[error("malformed config file")]
    Json(#[from] serde_json::Error),
}

fn default_secret_key() -> SecretKey {
    SecretKey::generate(&mut rand::rng())
}

/// Tunables for feed paging and thread population.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Limits {
    /// Posts per home feed page.
    pub feed_page_size: u64,
    /// How many reply levels below a thread root get populated.
    pub thread_depth: usize,
    /// Minimum number of characters for a tred or comment body.
    pub min_text_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            feed_page_size: 30,
            thread_depth: 2,
            min_text_len: 3,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TredConfig {
    /// Secret key for the local node.
    #[serde(default = "default_secret_key")]
    pub(crate) secret_key: SecretKey,

    /// Secret key of the local client endpoint, separate from the node key.
    #[serde(default = "default_secret_key")]
    pub(crate) client_secret_key: SecretKey,

    pub(crate) database_path: PathBuf,

    #[serde(default)]
    pub limits: Limits,
}

impl TredConfig {
    fn new(data_dir: &Path) -> Self {
        TredConfig {
            secret_key: default_secret_key(),
            client_secret_key: default_secret_key(),
            database_path: data_dir.join(TRED_DB_NAME),
            limits: Limits::default(),
        }
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }
}

/// Gets the existing config or initializes a new one in the platform data dir.
pub async fn get_or_init() -> Result<TredConfig, ConfigError> {
    let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
    load_or_create(&data_dir.join(DATA_DIR_NAME)).await
}

/// Reads `config.json` from `dir`, writing a fresh one first if missing.
pub async fn load_or_create(dir: &Path) -> Result<TredConfig, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    fs::create_dir_all(dir).await?;

    if config_path.exists() {
        let mut file = fs::File::open(&config_path).await?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;

        let config: TredConfig = serde_json::from_str(&contents)?;
        Ok(config)
    } else {
        let config = TredConfig::new(dir);

        let json = serde_json::to_string_pretty(&config)?;
        let mut file = fs::File::create(&config_path).await?;
        file.write_all(json.as_bytes()).await?;

        info!(path = %config_path.display(), "wrote new config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("tred-config-{}", Uuid::now_v7()))
    }

    #[tokio::test]
    async fn creates_config_with_defaults() {
        let dir = scratch_dir();

        let config = load_or_create(&dir).await.unwrap();

        assert_eq!(config.database_path(), dir.join(TRED_DB_NAME));
        assert_eq!(config.limits, Limits::default());
        assert!(dir.join(CONFIG_FILE_NAME).exists());

        fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn reloads_the_same_keys() {
        let dir = scratch_dir();

        let first = load_or_create(&dir).await.unwrap();
        let second = load_or_create(&dir).await.unwrap();

        assert_eq!(first.secret_key.public(), second.secret_key.public());
        assert_eq!(
            first.client_secret_key.public(),
            second.client_secret_key.public()
        );

        fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn missing_limits_fall_back_to_defaults() {
        let dir = scratch_dir();
        fs::create_dir_all(&dir).await.unwrap();

        let written = TredConfig::new(&dir);
        let mut value = serde_json::to_value(&written).unwrap();
        value.as_object_mut().unwrap().remove("limits");
        value["database_path"] = serde_json::json!("/tmp/elsewhere.sqlite");
        fs::write(dir.join(CONFIG_FILE_NAME), value.to_string())
            .await
            .unwrap();

        let config = load_or_create(&dir).await.unwrap();
        assert_eq!(config.limits, Limits::default());
        assert_eq!(config.database_path(), Path::new("/tmp/elsewhere.sqlite"));

        fs::remove_dir_all(&dir).await.unwrap();
    }
}
