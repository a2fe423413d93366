//! Infrastructure layer — concrete implementations of application port
//! traits and all I/O-performing code: HTTP, subprocess execution,
//! filesystem layout, locking, agent config files, and the session
//! database.
//!
//! Imports from `crate::domain` and `crate::application::ports` are
//! allowed. Imports from `crate::commands` or `crate::output` are
//! forbidden.

pub mod agents;
pub mod command_runner;
pub mod config_store;
pub mod db;
pub mod download;
pub mod file_lock;
pub mod lockfile;
pub mod mcp_client;
pub mod paths;
pub mod prompts;
pub mod registry;
pub mod secrets;
pub mod toml_config;
