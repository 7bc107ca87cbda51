//! # crossdev-core
//!
//! Core library for crossdev providing:
//! - SDK, family configuration and progress event types
//! - Error taxonomy shared by every crossdev crate
//! - Configuration file parsing (crossdev.yaml)

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use config::CrossdevConfig;
pub use error::{Error, Result};
pub use utils::get_home_dir;
