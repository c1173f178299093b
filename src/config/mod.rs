//! Configuration and local storage locations

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::fake::FakeBehavior;

/// Which implementation answers login, refresh and user list requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Api,
    Fake,
}

/// Where the credential record is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the `/login/` and `/refresh/` endpoints
    pub base_url: String,
    /// User list endpoint
    pub users_url: String,
    pub backend: Backend,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            users_url: "https://dummyjson.com/users".to_string(),
            backend: Backend::Api,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub storage: StorageKind,
    /// Return still-valid tokens from `get_valid_token` instead of `None`
    pub return_unexpired_token: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FakeConfig {
    pub latency_ms: u64,
    pub error_probability: f64,
    pub token_lifetime_secs: u64,
}

impl Default for FakeConfig {
    fn default() -> Self {
        Self {
            latency_ms: 0,
            error_probability: 0.0,
            token_lifetime_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsersConfig {
    pub page_size: usize,
    /// How long a fetched user list is served without refetching
    pub stale_secs: u64,
    /// Extra attempts after a failed fetch
    pub retries: u32,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            page_size: 13,
            stale_secs: 5 * 60,
            retries: 2,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub fake: FakeConfig,
    pub users: UsersConfig,
}

impl Config {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "admin-cli", "admin-cli")
            .context("Could not determine config directory")
    }

    /// Default config file path
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Path of the key-value storage file holding the session
    pub fn storage_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("storage.json"))
    }

    /// Load configuration from `path`, or the default location.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        write_private(path, &content).context("Failed to write config file")
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api.base_url)
            .with_context(|| format!("api.base_url is not a valid URL: {}", self.api.base_url))?;
        url::Url::parse(&self.api.users_url)
            .with_context(|| format!("api.users_url is not a valid URL: {}", self.api.users_url))?;
        if !(0.0..=1.0).contains(&self.fake.error_probability) {
            bail!(
                "fake.error_probability must be within [0, 1], got {}",
                self.fake.error_probability
            );
        }
        if self.users.page_size == 0 {
            bail!("users.page_size must be at least 1");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn fake_behavior(&self) -> FakeBehavior {
        FakeBehavior::new(
            Duration::from_millis(self.fake.latency_ms),
            self.fake.error_probability,
        )
    }

    pub fn token_lifetime(&self) -> Duration {
        Duration::from_secs(self.fake.token_lifetime_secs)
    }

    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.users.stale_secs)
    }
}

/// Replace the file at `path` with `contents`, readable by the owner only.
///
/// On unix the file is created with mode 0600, and an existing file is
/// narrowed to 0600 before anything is written to it.
pub fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(contents.as_bytes())?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.backend, Backend::Api);
        assert_eq!(config.session.storage, StorageKind::File);
        assert!(!config.session.return_unexpired_token);
        assert_eq!(config.users.page_size, 13);
        assert_eq!(config.stale_time(), Duration::from_secs(300));
        assert_eq!(config.users.retries, 2);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [api]
            backend = "fake"

            [fake]
            latency_ms = 250
            error_probability = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(config.api.backend, Backend::Fake);
        assert_eq!(config.api.users_url, "https://dummyjson.com/users");
        assert_eq!(config.fake.latency_ms, 250);
        assert_eq!(config.fake.token_lifetime_secs, 300);
        assert_eq!(config.fake_behavior().latency, Duration::from_millis(250));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(Config::from_toml("[api]\nbase_url = \"not a url\"").is_err());
        assert!(Config::from_toml("[fake]\nerror_probability = 1.5").is_err());
        assert!(Config::from_toml("[users]\npage_size = 0").is_err());
        assert!(Config::from_toml("[session]\nstorage = \"cloud\"").is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("config.toml");

        let mut config = Config::default();
        config.session.storage = StorageKind::Memory;
        config.session.return_unexpired_token = true;
        config.save(&path).unwrap();

        assert_eq!(Config::load(Some(&path)).unwrap(), config);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_private_narrows_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.json");
        fs::write(&path, "a much longer previous content").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        write_private(&path, "new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_config_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::default().save(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
