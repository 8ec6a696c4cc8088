//! Finding and layering gateway config files.
//!
//! Layers, lowest precedence first:
//! 1. `config.toml` in the user config dir (`BUD_CONFIG_DIR`, else `~/.config/bud`)
//! 2. `bud.toml` in the project directory
//!
//! Command-line flags are applied by the binary on top of the result.

use std::path::{Path, PathBuf};

use crate::{ConfigError, GatewayConfig, Result};

/// Project-local file name.
const PROJECT_CONFIG_FILE: &str = "bud.toml";

/// File name inside the user config dir.
const USER_CONFIG_FILE: &str = "config.toml";

/// Subdirectory of the platform config dir.
const APP_NAME: &str = "bud";

/// Environment variable to override the user config directory.
const CONFIG_DIR_ENV: &str = "BUD_CONFIG_DIR";

/// One layer that was looked for.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Where the layer was looked for.
    pub path: PathBuf,
    /// Whether it existed and parsed.
    pub loaded: bool,
}

/// The merged config plus what went into it.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// All layers merged.
    pub config: GatewayConfig,
    /// Sources that were checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Layers that existed but could not be loaded.
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
}

/// Discover and merge the user and project layers.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Like [`load_config`], with the user config dir chosen by the caller.
///
/// `config_dir` overrides both `BUD_CONFIG_DIR` and the platform default.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let mut config = GatewayConfig::new();
    let mut warnings = Vec::new();
    let mut sources = Vec::with_capacity(2);

    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

/// Read exactly one file, with no layering.
pub fn load_config_file(path: &Path) -> Result<GatewayConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    GatewayConfig::from_toml(&contents)
}

/// Path of the user config file.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// The user config directory.
///
/// Checks `BUD_CONFIG_DIR` first, then falls back to the platform default.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Merge one layer into `config` if the file exists.
///
/// A file that exists but fails to load is recorded as a warning.
fn load_layer(config: &mut GatewayConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    let loaded = if !path.is_file() {
        false
    } else {
        match load_config_file(path) {
            Ok(layer) => {
                config.merge(layer);
                true
            }
            Err(e) => {
                warnings.push(format!("Failed to load {}: {}", path.display(), e));
                false
            }
        }
    };

    ConfigSource {
        path: path.to_path_buf(),
        loaded,
    }
}
