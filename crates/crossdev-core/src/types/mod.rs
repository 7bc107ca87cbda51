//! Type definitions for SDK records and crossdev configuration

mod config_types;
mod sdk_types;

pub use config_types::*;
pub use sdk_types::*;
