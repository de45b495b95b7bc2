use crate::error::{ConfigError, ValidationError};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const BACKEND_URL_ENV: &str = "EMAIL_AGENT_API_URL";
const CONFIG_FILE: &str = "email-agent.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl FontSize {
    pub const ALL: [FontSize; 3] = [FontSize::Small, FontSize::Medium, FontSize::Large];

    pub fn label(self) -> &'static str {
        match self {
            FontSize::Small => "Small",
            FontSize::Medium => "Medium",
            FontSize::Large => "Large",
        }
    }

    /// Value for the `size` attribute of a Pango `<span>`.
    pub fn pango_size(self) -> &'static str {
        match self {
            FontSize::Small => "small",
            FontSize::Medium => "medium",
            FontSize::Large => "large",
        }
    }
}

/// User preferences. Missing fields in a persisted record fall back to
/// the defaults, so older or partial records still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub user_name: String,
    pub user_id: String,
    pub backend_url: String,
    pub font_size: FontSize,
    #[serde(rename = "useSupabase")]
    pub use_remote_storage: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_name: "User".into(),
            user_id: "anonymous".into(),
            backend_url: DEFAULT_BACKEND_URL.into(),
            font_size: FontSize::Medium,
            use_remote_storage: false,
        }
    }
}

/// Optional on-disk config, `email-agent.toml` in the user config dir.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub backend_url: Option<String>,
    pub data_dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

/// Environment-sourced configuration, resolved once at startup and then
/// passed explicitly to whoever needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub backend_url: String,
    pub data_dir: Option<PathBuf>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.into(),
            data_dir: None,
        }
    }
}

impl EnvConfig {
    /// Reads the config file (if any) and the process environment.
    pub fn load() -> Self {
        let file = match FileConfig::path() {
            Some(path) if path.exists() => match FileConfig::load_from(&path) {
                Ok(file) => Some(file),
                Err(e) => {
                    log::warn!("ignoring {}: {e}", path.display());
                    None
                }
            },
            _ => None,
        };
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Layers default < file < environment variable.
    pub fn from_sources<F>(file: Option<FileConfig>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(file) = file {
            if let Some(url) = file.backend_url.filter(|u| !u.trim().is_empty()) {
                config.backend_url = normalize_backend_url(&url);
            }
            config.data_dir = file.data_dir;
        }
        if let Some(url) = lookup(BACKEND_URL_ENV).filter(|u| !u.trim().is_empty()) {
            config.backend_url = normalize_backend_url(&url);
        }
        log::info!("backend URL: {}", config.backend_url);
        config
    }
}

/// Merges persisted settings over the defaults. The environment backend
/// URL replaces whatever was saved.
pub fn resolve_settings(persisted: Option<Settings>, env: &EnvConfig) -> Settings {
    let mut settings = persisted.unwrap_or_default();
    settings.backend_url = env.backend_url.clone();
    settings
}

pub fn normalize_backend_url(input: &str) -> String {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// Normalizes `input` and checks that it is an absolute http(s) URL with
/// a host.
pub fn parse_backend_url(input: &str) -> Result<String, ValidationError> {
    let normalized = normalize_backend_url(input);
    match Url::parse(&normalized) {
        Ok(url) if url.has_host() && matches!(url.scheme(), "http" | "https") => Ok(normalized),
        _ => Err(ValidationError::InvalidUrl(input.to_string())),
    }
}
