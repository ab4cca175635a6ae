use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "birthday.toml";

/// Who may edit or delete a birthday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EditPolicy {
    /// Only the owner; ownerless birthdays stay editable by anyone.
    #[default]
    OwnerOnly,
    Anyone,
}

impl EditPolicy {
    pub fn allows(&self, owner: Option<&str>, requester: Option<&str>) -> bool {
        match (self, owner) {
            (EditPolicy::Anyone, _) | (EditPolicy::OwnerOnly, None) => true,
            (EditPolicy::OwnerOnly, Some(owner)) => requester == Some(owner),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub media_dir: PathBuf,
    pub page_size: usize,
    pub edit_policy: EditPolicy,
    /// Lifetime of a login session in seconds.
    pub session_ttl_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            data_dir: PathBuf::from("."),
            media_dir: PathBuf::from("media"),
            page_size: 10,
            edit_policy: EditPolicy::OwnerOnly,
            session_ttl_secs: 14 * 24 * 60 * 60,
        }
    }
}

impl AppConfig {
    /// Reads the file named by `BIRTHDAY_CONFIG` (or `birthday.toml` when it
    /// exists), then applies environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match env::var("BIRTHDAY_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            Err(_) => Self::default(),
        };

        if let Ok(bind_addr) = env::var("BIRTHDAY_BIND") {
            config.bind_addr = bind_addr;
        }
        if let Ok(data_dir) = env::var("BIRTHDAY_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(media_dir) = env::var("BIRTHDAY_MEDIA_DIR") {
            config.media_dir = PathBuf::from(media_dir);
        }
        Ok(config)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&data).with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(data: &str) -> Result<Self> {
        Ok(toml::from_str(data)?)
    }
}
