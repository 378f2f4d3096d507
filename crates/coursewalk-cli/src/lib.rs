//! coursewalk command line front end.

pub mod commands;
pub mod config;

pub use config::{load_filter, resolve_credentials_path, Credentials};
