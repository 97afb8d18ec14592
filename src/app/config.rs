use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration (saved to `<config_dir>/settings.toml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub reorder: ReorderConfig,
    #[serde(default)]
    pub categories: CategoryConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Seconds between background queue fetches
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate: u64,
    /// Show the speed graph in the popup
    #[serde(default = "default_true")]
    pub enable_graph: bool,
    /// Seconds a status message stays in the popup footer
    #[serde(default = "default_notification_timeout")]
    pub notification_timeout: u64,
}

fn default_refresh_rate() -> u64 {
    15
}

fn default_notification_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            refresh_rate: default_refresh_rate(),
            enable_graph: true,
            notification_timeout: default_notification_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Whole-request timeout in seconds; 0 disables it
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

fn default_request_timeout() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl ConnectionConfig {
    pub fn timeouts(&self) -> crate::sab::Timeouts {
        crate::sab::Timeouts {
            request: (self.request_timeout > 0).then(|| Duration::from_secs(self.request_timeout)),
            connect: Duration::from_secs(self.connect_timeout),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderConfig {
    /// Upper bound in seconds on how long a move gesture may hold off refreshes
    #[serde(default = "default_suppress_timeout")]
    pub suppress_timeout: u64,
}

fn default_suppress_timeout() -> u64 {
    30
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            suppress_timeout: default_suppress_timeout(),
        }
    }
}

impl ReorderConfig {
    pub fn suppress_duration(&self) -> Duration {
        Duration::from_secs(self.suppress_timeout)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Never send a category with added URLs
    #[serde(default)]
    pub ignore_categories: bool,
    /// Use the category picked in the popup
    #[serde(default)]
    pub use_user_categories: bool,
    /// Category forced onto every added URL
    #[serde(default)]
    pub hard_coded_category: String,
    #[serde(default)]
    pub default_category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Hosts treated as newznab indexers
    #[serde(default = "default_newznab_sites")]
    pub newznab_sites: Vec<String>,
    /// Probe unknown sites for newznab markup
    #[serde(default = "default_true")]
    pub automatic_detection: bool,
}

fn default_newznab_sites() -> Vec<String> {
    vec![
        "your_newznab.com".to_string(),
        "some_other_newznab.com".to_string(),
    ]
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            newznab_sites: default_newznab_sites(),
            automatic_detection: true,
        }
    }
}

impl Config {
    /// Load `settings.toml` from the config directory; a missing file yields defaults
    pub fn load() -> anyhow::Result<Self> {
        let config_path = crate::util::paths::get_app_config_path()?;
        let config = Self::load_from(&config_path)?;

        if let Err(errors) = crate::app::settings::validate_config(&config) {
            return Err(anyhow::anyhow!(
                "Invalid configuration: {}",
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        Ok(config)
    }

    /// Save to `settings.toml` in the config directory
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = crate::util::paths::get_app_config_path()?;
        self.save_to(&config_path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        if path.exists() {
            let content =
                std::fs::read_to_string(path).context(format!("Failed to read {:?}", path))?;
            toml::from_str(&content).context(format!("Failed to parse {:?}", path))
        } else {
            tracing::info!("Config not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        use anyhow::Context;

        if let Err(errors) = crate::app::settings::validate_config(self) {
            return Err(anyhow::anyhow!(
                "Cannot save invalid config: {}",
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;

        // Atomic write using temp file + rename
        let temp_path = path.with_extension("toml.tmp");
        std::fs::write(&temp_path, &content).context("Failed to write temp config file")?;
        std::fs::rename(&temp_path, path).context("Failed to rename temp config file")?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.general.refresh_rate.max(1))
    }
}
