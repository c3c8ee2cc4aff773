//! Application settings and configuration management

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::jellyfin::url::normalize_server_url;

/// Application settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Jellyfin server URL, normalized on use
    pub server_url: String,
    /// API key for authentication
    #[serde(default)]
    pub api_key: Option<String>,
    /// Accept only valid TLS certificates
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    /// Build the "upcoming media" (Next Up) payload
    #[serde(default)]
    pub generate_upcoming: bool,
    /// Build the YAMC library browser payload
    #[serde(default)]
    pub generate_yamc: bool,
    /// User whose library feeds the upcoming and YAMC payloads
    #[serde(default)]
    pub library_user_id: Option<String>,
    /// Device id reported to the server; generated on first run
    #[serde(default)]
    pub device_id: Option<String>,
}

fn default_verify_ssl() -> bool {
    true
}

/// Error types for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    IoError(io::Error),
    ParseError(String),
    ValidationError(String),
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "I/O error: {}", e),
            ConfigError::ParseError(s) => write!(f, "Parse error: {}", s),
            ConfigError::ValidationError(s) => write!(f, "Validation error: {}", s),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            server_url: "http://localhost:8096".to_string(),
            api_key: None,
            verify_ssl: default_verify_ssl(),
            generate_upcoming: false,
            generate_yamc: false,
            library_user_id: None,
            device_id: None,
        }
    }
}

impl Settings {
    /// Load settings from a file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(&self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("jellytrack").join("config.json")
    }

    /// Returns the configured device id, generating and storing one if absent.
    /// The second value tells whether a new id was generated.
    pub fn ensure_device_id(&mut self) -> (String, bool) {
        match &self.device_id {
            Some(id) if !id.is_empty() => (id.clone(), false),
            _ => {
                let id = uuid::Uuid::new_v4().to_string();
                self.device_id = Some(id.clone());
                (id, true)
            }
        }
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("Server URL cannot be empty".to_string()));
        }
        normalize_server_url(&self.server_url)
            .map_err(|e| ConfigError::ValidationError(format!("Invalid server URL: {}", e)))?;

        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => return Err(ConfigError::ValidationError("API key must be provided".to_string())),
        }

        // A missing library_user_id is tolerated here; the optional payloads
        // are skipped at refresh time instead.
        Ok(())
    }

    /// True when a payload that needs `library_user_id` is enabled without one.
    pub fn missing_user_context(&self) -> bool {
        (self.generate_upcoming || self.generate_yamc)
            && self.library_user_id.as_deref().map_or(true, str::is_empty)
    }
}
