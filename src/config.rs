use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::outcome::ALTERNATE_REVIEW_REQUEST_CODE;
use crate::session::SessionOptions;
use crate::store::DEFAULT_STOREFRONT_DOMAIN;

/// Default config file, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "store-review.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identifier the app is published under. Empty means no application
    /// context is attached at startup.
    pub package_id: String,
    pub storefront_domain: String,
    /// Platform API level reported by the host.
    pub platform_version: u32,
    /// Whether the primary provider's backing services are reachable.
    pub services_reachable: bool,
    /// Foreground surface attached at startup. Empty leaves it detached.
    pub surface_id: String,
    pub primary: PrimaryConfig,
    pub alternate: AlternateConfig,
    pub navigator: NavigatorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PrimaryConfig {
    /// Executable whose presence in PATH stands for "provider package installed".
    pub package_executable: String,
    /// Prints a review token on stdout. Exit status other than 0 means declined.
    pub request_command: Vec<String>,
    /// Shows the review UI; `{token}` and `{surface}` are substituted.
    pub launch_command: Vec<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlternateConfig {
    /// Starts the alternate review UI; `{action}`, `{package}`, `{request_code}`
    /// and `{surface}` are substituted.
    pub launch_command: Vec<String>,
    pub request_code: i32,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Opens `{url}` in an external viewer.
    pub open_command: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            package_id: String::new(),
            storefront_domain: DEFAULT_STOREFRONT_DOMAIN.to_string(),
            platform_version: 0,
            services_reachable: false,
            surface_id: String::new(),
            primary: PrimaryConfig::default(),
            alternate: AlternateConfig::default(),
            navigator: NavigatorConfig::default(),
        }
    }
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            package_executable: "play-store".to_string(),
            request_command: Vec::new(),
            launch_command: Vec::new(),
            timeout_secs: 30,
        }
    }
}

impl Default for AlternateConfig {
    fn default() -> Self {
        Self {
            launch_command: Vec::new(),
            request_code: ALTERNATE_REVIEW_REQUEST_CODE,
            timeout_secs: None,
        }
    }
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            open_command: vec!["xdg-open".to_string(), "{url}".to_string()],
        }
    }
}

impl Config {
    /// Load from `$STORE_REVIEW_CONFIG` (or `store-review.toml`), then apply
    /// environment overrides. A missing or malformed file falls back to defaults.
    pub fn load() -> Self {
        let path = env::var("STORE_REVIEW_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        let mut config = Self::from_path(&path);
        config.apply_env();
        config
    }

    pub fn from_path(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config at {}, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                tracing::warn!("cannot read config {}: {e}, using defaults", path.display());
                return Self::default();
            }
        };
        match Self::from_toml_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("invalid config {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    fn apply_env(&mut self) {
        if let Ok(package_id) = env::var("STORE_REVIEW_PACKAGE_ID")
            && !package_id.trim().is_empty()
        {
            self.package_id = package_id.trim().to_string();
        }
        if let Ok(raw) = env::var("STORE_REVIEW_PLATFORM_VERSION") {
            match raw.trim().parse() {
                Ok(v) => self.platform_version = v,
                Err(e) => tracing::warn!("STORE_REVIEW_PLATFORM_VERSION={raw:?} ignored: {e}"),
            }
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            storefront_domain: self.storefront_domain.clone(),
            alternate_request_code: self.alternate.request_code,
            alternate_timeout: self.alternate.timeout_secs.map(Duration::from_secs),
        }
    }
}
