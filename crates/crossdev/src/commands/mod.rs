//! CLI command implementations

mod common;

pub mod env;
pub mod families;
pub mod install;
pub mod list;
pub mod remove;
