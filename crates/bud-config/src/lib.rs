//! Configuration for the Bud gateway.
//!
//! Provides TOML-based configuration with:
//! - `[server]` identity and HTTP binding
//! - `[proxy]` location of the `.mcp.json` child server file and request deadline
//! - `[logging]` log directory
//! - Config file layering (XDG user config + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options,
    xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
