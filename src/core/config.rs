use crate::error::{Result, UpdraftError};
use crate::utils::fs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub repository_url: Option<String>,
    pub host_build: Option<String>,
    pub force_https: bool,
    pub installation_id: String,
    pub updraft_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let updraft_dir = get_updraft_dir()
            .unwrap_or_else(|_| PathBuf::from(".updraft"));

        Config {
            repository_url: None,
            host_build: None,
            force_https: false,
            installation_id: uuid::Uuid::new_v4().to_string(),
            updraft_dir,
        }
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        let updraft_dir = get_updraft_dir()?;

        Ok(Config {
            repository_url: std::env::var("UPDRAFT_REPOSITORY").ok(),
            host_build: std::env::var("UPDRAFT_BUILD").ok(),
            force_https: false,
            installation_id: uuid::Uuid::new_v4().to_string(),
            updraft_dir,
        })
    }

    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;

        if !config_path.exists() {
            let config = Self::new()?;
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config = Self::parse(&content, &config_path)?;

        // Ensure directories exist
        fs::ensure_dir_exists(&config.updraft_dir)?;
        fs::ensure_dir_exists(&config.plugins_dir())?;
        fs::ensure_dir_exists(&config.download_dir())?;

        Ok(config)
    }

    /// Parse config content, naming the offending file on failure
    fn parse(content: &str, origin: &Path) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            UpdraftError::config_error(format!("failed to parse {}: {}", origin.display(), e))
        })
    }

    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::ensure_dir_exists(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.updraft_dir.join("plugins")
    }

    /// Scratch area for in-flight downloads. Finished artifacts are renamed
    /// out of here; anything left behind is a crashed transfer.
    pub fn download_dir(&self) -> PathBuf {
        self.updraft_dir.join("tmp")
    }

    pub fn actions_path(&self) -> PathBuf {
        self.updraft_dir.join("startup-actions.json")
    }

    pub fn broken_list_path(&self) -> PathBuf {
        self.updraft_dir.join("broken-plugins.txt")
    }
}

fn get_updraft_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".updraft"))
        .ok_or(UpdraftError::HomeDirectoryNotFound)
}

fn get_config_path() -> Result<PathBuf> {
    Ok(get_updraft_dir()?.join("config.json"))
}
