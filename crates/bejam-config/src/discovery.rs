//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `<config dir>/config.toml` (user config)
//! 2. `./bejam.toml` (project-local)
//! 3. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use crate::{BejamConfig, ConfigError, Result};

/// Config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "bejam.toml";

/// Config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for platform directory resolution.
const APP_NAME: &str = "bejam";

/// Environment variable to override the config directory.
pub const CONFIG_DIR_ENV: &str = "BEJAM_CONFIG_DIR";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: BejamConfig,
    /// Directory the user layer was looked up in; also the default data dir.
    pub config_dir: PathBuf,
    /// Sources that were checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Layers that existed but could not be used.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }

    /// Directory where token state is kept.
    pub fn data_dir(&self) -> PathBuf {
        self.config.auth().effective_data_dir(&self.config_dir)
    }
}

/// Load configuration with explicit control over the user config directory.
///
/// `config_dir` overrides both `BEJAM_CONFIG_DIR` and the platform default.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let config_dir = match config_dir {
        Some(dir) => dir.to_path_buf(),
        None => self::config_dir().ok_or(ConfigError::NoConfigDir)?,
    };

    let mut config = BejamConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    let user_path = config_path(&config_dir);
    sources.push(load_layer(&mut config, &user_path, &mut warnings));

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    Ok(LoadedConfig {
        config,
        config_dir,
        sources,
        warnings,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<BejamConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    BejamConfig::from_toml(&contents)
}

/// Save configuration to a file, creating parent directories.
pub fn save_config(config: &BejamConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// Path of the user config file inside `config_dir`.
pub fn config_path(config_dir: &Path) -> PathBuf {
    config_dir.join(USER_CONFIG_FILE)
}

/// The BeJam config directory.
///
/// Checks `BEJAM_CONFIG_DIR` first, then falls back to the platform default
/// (`~/.config/bejam` on Linux, `~/Library/Application Support/bejam` on macOS).
pub fn config_dir() -> Option<PathBuf> {
    config_dir_from(std::env::var(CONFIG_DIR_ENV).ok())
}

fn config_dir_from(env: Option<String>) -> Option<PathBuf> {
    if let Some(dir) = env
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Try to load a config file and merge it into the existing config.
///
/// A missing file is skipped silently; an unreadable one is skipped with a
/// warning.
fn load_layer(config: &mut BejamConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }

    let loaded = match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            true
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            false
        }
    };

    ConfigSource {
        path: path.to_path_buf(),
        loaded,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
