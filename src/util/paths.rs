use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::RwLock;

// Global config directory override (for --config flag and tests)
static CONFIG_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Environment variable consulted when no override is set
pub const CONFIG_DIR_ENV: &str = "SABREMOTE_CONFIG_DIR";

/// Set config directory override (used by --config flag and tests)
pub fn set_config_dir_override(path: Option<PathBuf>) {
    match CONFIG_DIR_OVERRIDE.write() {
        Ok(mut guard) => *guard = path,
        Err(poisoned) => *poisoned.into_inner() = path,
    }
}

/// Get current config directory override
pub fn get_config_dir_override() -> Option<PathBuf> {
    match CONFIG_DIR_OVERRIDE.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Find config directory by searching in priority order:
/// 1. Override from --config flag or set_config_dir_override() (highest priority)
/// 2. Environment variable SABREMOTE_CONFIG_DIR
/// 3. User config directory (`~/.config/sabremote/` on Unix, `%APPDATA%\sabremote\` on Windows)
/// 4. Current working directory (`./config/`)
///
/// If no config directory is found, creates one in the user config directory.
/// An override that does not exist yet is created rather than skipped.
pub fn find_config_directory() -> Result<PathBuf> {
    if let Some(override_path) = get_config_dir_override() {
        if !override_path.exists() {
            std::fs::create_dir_all(&override_path)
                .with_context(|| format!("Failed to create config directory {:?}", override_path))?;
            tracing::info!("Created config directory override at: {:?}", override_path);
        }
        return Ok(override_path);
    }

    if let Ok(env_path) = std::env::var(CONFIG_DIR_ENV) {
        let env_config = PathBuf::from(env_path);
        if env_config.exists() {
            tracing::debug!("Found config directory from {}: {:?}", CONFIG_DIR_ENV, env_config);
            return Ok(env_config);
        }
    }

    if let Ok(user_config) = get_user_config_dir() {
        if user_config.exists() {
            tracing::debug!("Found config directory at: {:?}", user_config);
            return Ok(user_config);
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        let cwd_config = cwd.join("config");
        if cwd_config.exists() {
            tracing::debug!("Found config directory at: {:?}", cwd_config);
            return Ok(cwd_config);
        }
    }

    // Fallback: Create in user config directory
    let user_config = get_user_config_dir()?;
    std::fs::create_dir_all(&user_config).context("Failed to create user config directory")?;
    tracing::info!("Created config directory at: {:?}", user_config);
    Ok(user_config)
}

/// Get platform-specific user config directory
/// - Windows: `%APPDATA%\sabremote`
/// - Unix: `~/.config/sabremote`
fn get_user_config_dir() -> Result<PathBuf> {
    let base_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine user config directory"))?;
    Ok(base_dir.join("sabremote"))
}

/// Get absolute path to settings.toml
pub fn get_app_config_path() -> Result<PathBuf> {
    Ok(find_config_directory()?.join("settings.toml"))
}

/// Get absolute path to the persistent key-value store
pub fn get_store_path() -> Result<PathBuf> {
    Ok(find_config_directory()?.join("state.json"))
}

/// Get the logs directory (not created here)
pub fn get_logs_dir() -> Result<PathBuf> {
    Ok(find_config_directory()?.join("logs"))
}
