// src/config/mod.rs

//! Application config files.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it and turn it into [`Task`](crate::task::Task)s
//!   (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_app, load_from_path, load_from_str, APP_CONFIG_FILE};
pub use model::{
    AppConfig, ExcludedFilesSection, FilesSection, GitFilesSection, GoSourcesSection,
    InputSection, RawAppConfig, TaskSection,
};
