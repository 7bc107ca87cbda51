//! Common test utilities for crossdev-sdk
//!
//! - Family fixtures writing executable family scripts into a temp dir
//! - A recording session registry standing in for the UI transport

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;
pub mod sessions;

pub use fixtures::*;
pub use sessions::*;
