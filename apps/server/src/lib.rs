//! imgdl Server
//!
//! HTTP front for the imgdl core: search sessions, bulk downloads and
//! image proxying, plus the settings loader shared with the CLI.

pub mod api;
pub mod config;

pub use api::{router, serve};
pub use config::load_settings;
