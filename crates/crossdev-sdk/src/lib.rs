//! Cross-compilation SDK management for crossdev
//!
//! This crate handles:
//! - SDK family loading (family scripts and configuration)
//! - Catalog reconciliation against locally installed SDKs
//! - SDK identity and validation
//! - Background install/remove jobs with streamed progress events

pub mod catalog;
pub mod family;
pub mod identity;
pub mod installer;
pub mod job;
pub mod manager;
pub mod session;

pub use catalog::{CatalogFetcher, CatalogReconciler, HttpCatalogFetcher, ListScriptFetcher};
pub use family::{ScriptRole, SdkFamily};
pub use identity::{sdk_id, validate_sdk};
pub use installer::{BufferThresholds, CrossSdk, InstallRequest, InstallSource, SdkOptions};
pub use manager::{ManagerOptions, SdkManager};
pub use session::{EventSink, NoSessions, SessionRegistry};
