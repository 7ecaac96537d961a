// src/config/mod.rs

//! TOML configuration: raw model, validation and loading.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate};
pub use model::{ConfigFile, InstallSection, UpdateSection, WorkspaceConfig};
pub use validate::parse_duration;
