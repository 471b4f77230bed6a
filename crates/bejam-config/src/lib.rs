//! Configuration system for the BeJam command-line client.
//!
//! Provides TOML-based configuration with:
//! - Provider endpoints and client registration (`[spotify]`)
//! - Login behaviour and token storage location (`[auth]`)
//! - Web API settings (`[api]`)
//! - Config file layering (user config dir + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    LoadedConfig, config_dir, config_path, load_config_file,
    load_config_with_options, save_config,
};
pub use error::{ConfigError, Result};
pub use types::*;
