use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::CloudinaryConfig;

pub const CONFIG_FILE: &str = "docvault.toml";

/// Overrides `storage.api_secret` so the secret can stay out of the config file.
pub const SECRET_ENV: &str = "CLOUDINARY_API_SECRET";

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding the config file, database and local objects.
    /// Never read from the file itself.
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Public base URL for external access (e.g., "https://docs.example.com").
    /// Prefixes local media URLs. If not set, URLs are relative.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,
    pub max_upload_bytes: u64,
    pub max_files_per_upload: usize,
    pub upload_timeout_secs: u64,
    pub session_ttl_hours: i64,
    pub secure_cookies: bool,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    Local,
    Cloudinary(CloudinaryConfig),
}

impl StorageConfig {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Cloudinary(_) => "cloudinary",
        }
    }
}

impl ServerConfig {
    /// Loads `{data_dir}/docvault.toml`, then applies the environment override.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let content = fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;

        let mut config = Self::parse(&content)?;
        config.data_dir = data_dir.to_path_buf();
        config.apply_env(std::env::var(SECRET_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn save(&self) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(self.config_path(), content)?;
        Ok(())
    }

    fn apply_env(&mut self, secret: Option<String>) {
        if let (StorageConfig::Cloudinary(cloud), Some(secret)) = (&mut self.storage, secret) {
            if !secret.is_empty() {
                cloud.api_secret = secret;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            return Err(Error::Config("max_upload_bytes must be positive".into()));
        }
        if self.max_files_per_upload == 0 {
            return Err(Error::Config("max_files_per_upload must be positive".into()));
        }
        if self.session_ttl_hours <= 0 {
            return Err(Error::Config("session_ttl_hours must be positive".into()));
        }
        if let StorageConfig::Cloudinary(cloud) = &self.storage {
            if cloud.cloud_name.is_empty() || cloud.api_key.is_empty() {
                return Err(Error::Config(
                    "cloudinary storage needs cloud_name and api_key".into(),
                ));
            }
            if cloud.api_secret.is_empty() {
                return Err(Error::Config(format!(
                    "cloudinary storage needs api_secret (or {SECRET_ENV})"
                )));
            }
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("docvault.db")
    }

    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    #[must_use]
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    #[must_use]
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            public_base_url: None,
            max_upload_bytes: 100 * MIB,
            max_files_per_upload: 20,
            upload_timeout_secs: 120,
            session_ttl_hours: 24 * 14,
            secure_cookies: false,
            storage: StorageConfig::Local,
        }
    }
}
