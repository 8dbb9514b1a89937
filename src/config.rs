use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveTime;
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".folio";
const CONFIG_FILE: &str = "config.json";
const HOME_ENV: &str = "FOLIO_HOME";
const DEFAULT_SYNC_TIME: &str = "03:00";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_MAX_UPLOAD_FILES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    pub storage: StorageBackend,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub max_upload_files: usize,
    pub owner_id: i64,
    pub heatmap_months: u32,
    pub heatmap_max_expected_count: u32,
    pub github_username: Option<String>,
    pub github_token: Option<String>,
    pub github_api_url: String,
    pub github_timeout_seconds: u64,
    pub github_sync_enabled: bool,
    pub github_sync_time: String,
}

impl Default for Config {
    fn default() -> Self {
        let root = default_root_dir();

        Self {
            api_host: "127.0.0.1".to_string(),
            api_port: 5000,
            storage: StorageBackend::Sqlite,
            db_path: root.join("db").join("folio.db"),
            upload_dir: root.join("uploads"),
            staging_dir: root.join("staging"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_upload_files: DEFAULT_MAX_UPLOAD_FILES,
            owner_id: 1,
            heatmap_months: 6,
            heatmap_max_expected_count: 10,
            github_username: None,
            github_token: None,
            github_api_url: "https://api.github.com/graphql".to_string(),
            github_timeout_seconds: 20,
            github_sync_enabled: false,
            github_sync_time: DEFAULT_SYNC_TIME.to_string(),
        }
    }
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(&config_path)?;

        Ok(())
    }

    pub fn ensure_bootstrap_dirs(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        [&self.upload_dir, &self.staging_dir]
            .into_iter()
            .try_for_each(|dir| {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))
            })
    }

    pub fn parse_sync_time(&self) -> Result<NaiveTime> {
        parse_hhmm(&self.github_sync_time)
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let normalized = normalize_config_key(key);

        match normalized {
            "api_host" => {
                let host = value.trim();
                if host.is_empty() {
                    bail!("api_host must not be empty");
                }
                self.api_host = host.to_string();
            }
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            "storage" => {
                self.storage = match value.trim().to_lowercase().as_str() {
                    "sqlite" => StorageBackend::Sqlite,
                    "memory" => StorageBackend::Memory,
                    _ => bail!("storage must be one of: sqlite, memory"),
                };
            }
            "db_path" => {
                self.db_path = expand_home(value);
            }
            "upload_dir" => {
                self.upload_dir = expand_home(value);
            }
            "staging_dir" => {
                self.staging_dir = expand_home(value);
            }
            "max_upload_bytes" => {
                let parsed = value
                    .parse::<u64>()
                    .map_err(|_| anyhow!("max_upload_bytes must be a number"))?;
                if parsed == 0 {
                    bail!("max_upload_bytes must be greater than zero");
                }
                self.max_upload_bytes = parsed;
            }
            "max_upload_files" => {
                let parsed = value
                    .parse::<usize>()
                    .map_err(|_| anyhow!("max_upload_files must be a number"))?;
                if parsed == 0 {
                    bail!("max_upload_files must be greater than zero");
                }
                self.max_upload_files = parsed;
            }
            "owner_id" => {
                self.owner_id = value
                    .parse::<i64>()
                    .map_err(|_| anyhow!("owner_id must be a number"))?;
            }
            "heatmap_months" => {
                self.heatmap_months = value
                    .parse::<u32>()
                    .map_err(|_| anyhow!("heatmap_months must be a number"))?
                    .clamp(1, 24);
            }
            "heatmap_max_expected_count" => {
                self.heatmap_max_expected_count = value
                    .parse::<u32>()
                    .map_err(|_| anyhow!("heatmap_max_expected_count must be a number"))?
                    .max(1);
            }
            "github_username" => {
                self.github_username = (!value.trim().is_empty()).then(|| value.trim().to_string());
            }
            "github_token" => {
                self.github_token = (!value.trim().is_empty()).then_some(value.to_string());
            }
            "github_api_url" => {
                self.github_api_url = value.trim().trim_end_matches('/').to_string();
            }
            "github_timeout_seconds" => {
                self.github_timeout_seconds = value
                    .parse::<u64>()
                    .map_err(|_| anyhow!("github_timeout_seconds must be a number"))?
                    .max(5);
            }
            "github_sync_enabled" => {
                self.github_sync_enabled = value
                    .parse::<bool>()
                    .map_err(|_| anyhow!("github_sync_enabled must be true/false"))?;
            }
            "github_sync_time" => {
                parse_hhmm(value)?;
                self.github_sync_time = value.to_string();
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: api_host|api.host, api_port|api.port, storage, db_path|db.path, upload_dir|upload.dir, staging_dir|upload.staging_dir, max_upload_bytes|upload.max_bytes, max_upload_files|upload.max_files, owner_id|owner.id, heatmap_months|heatmap.months, heatmap_max_expected_count|heatmap.max_expected_count, github_username|github.username, github_token|github.token, github_api_url|github.api_url, github_timeout_seconds|github.timeout_seconds, github_sync_enabled|github.sync_enabled, github_sync_time|github.sync_time"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "api_host" => Some(self.api_host.clone()),
            "api_port" => Some(self.api_port.to_string()),
            "storage" => Some(self.storage.as_str().to_string()),
            "db_path" => Some(self.db_path.display().to_string()),
            "upload_dir" => Some(self.upload_dir.display().to_string()),
            "staging_dir" => Some(self.staging_dir.display().to_string()),
            "max_upload_bytes" => Some(self.max_upload_bytes.to_string()),
            "max_upload_files" => Some(self.max_upload_files.to_string()),
            "owner_id" => Some(self.owner_id.to_string()),
            "heatmap_months" => Some(self.heatmap_months.to_string()),
            "heatmap_max_expected_count" => Some(self.heatmap_max_expected_count.to_string()),
            "github_username" => Some(
                self.github_username
                    .clone()
                    .unwrap_or_else(|| "not_set".to_string()),
            ),
            "github_token" => Some(
                self.github_token
                    .as_ref()
                    .map(|_| "***set***".to_string())
                    .unwrap_or_else(|| "not_set".to_string()),
            ),
            "github_api_url" => Some(self.github_api_url.clone()),
            "github_timeout_seconds" => Some(self.github_timeout_seconds.to_string()),
            "github_sync_enabled" => Some(self.github_sync_enabled.to_string()),
            "github_sync_time" => Some(self.github_sync_time.clone()),
            _ => None,
        }
    }

    /// Combined multipart body ceiling for one upload request.
    pub fn upload_body_limit(&self) -> usize {
        let files = self.max_upload_bytes.saturating_mul(self.max_upload_files as u64);
        usize::try_from(files.saturating_add(64 * 1024)).unwrap_or(usize::MAX)
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "api_host" | "api.host" => "api_host",
        "api_port" | "api.port" => "api_port",
        "storage" | "storage.backend" => "storage",
        "db_path" | "db.path" => "db_path",
        "upload_dir" | "upload.dir" => "upload_dir",
        "staging_dir" | "upload.staging_dir" => "staging_dir",
        "max_upload_bytes" | "upload.max_bytes" => "max_upload_bytes",
        "max_upload_files" | "upload.max_files" => "max_upload_files",
        "owner_id" | "owner.id" => "owner_id",
        "heatmap_months" | "heatmap.months" => "heatmap_months",
        "heatmap_max_expected_count" | "heatmap.max_expected_count" => {
            "heatmap_max_expected_count"
        }
        "github_username" | "github.username" => "github_username",
        "github_token" | "github.token" => "github_token",
        "github_api_url" | "github.api_url" => "github_api_url",
        "github_timeout_seconds" | "github.timeout_seconds" => "github_timeout_seconds",
        "github_sync_enabled" | "github.sync_enabled" => "github_sync_enabled",
        "github_sync_time" | "github.sync_time" => "github_sync_time",
        _ => key,
    }
}

pub fn parse_hhmm(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .with_context(|| format!("Invalid time format: {value}. Example: 03:00 (24-hour format)"))
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn default_root_dir() -> PathBuf {
    std::env::var_os(HOME_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
        })
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Config, StorageBackend};

    #[test]
    fn dotted_aliases_update_the_same_field() {
        let mut config = Config::default();
        config.set_value("upload.max_files", "3").expect("set max files");
        config.set_value("storage", "Memory").expect("set storage");

        assert_eq!(config.max_upload_files, 3);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.get_value("max_upload_files").as_deref(), Some("3"));
    }

    #[test]
    fn github_token_is_masked_on_read() {
        let mut config = Config::default();
        config.set_value("github.token", "ghp_secret").expect("set token");

        assert_eq!(config.get_value("github_token").as_deref(), Some("***set***"));
    }

    #[test]
    fn rejects_invalid_values() {
        let mut config = Config::default();

        assert!(config.set_value("api_port", "seventy").is_err());
        assert!(config.set_value("github.sync_time", "25:99").is_err());
        assert!(config.set_value("max_upload_bytes", "0").is_err());
        assert!(config.set_value("unknown.key", "x").is_err());
    }

    #[test]
    fn body_limit_covers_every_allowed_file() {
        let config = Config::default();
        let per_request = (config.max_upload_bytes * config.max_upload_files as u64) as usize;

        assert!(config.upload_body_limit() > per_request);
    }
}
