//! SDK catalog, installation and progress event types
//!
//! Field names follow the JSON emitted by the family scripts and consumed by
//! the web UI, so every struct is serialized in camelCase.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport event name used for every install progress message
pub const EVT_SDK_INSTALL: &str = "event:sdk-install";

/// Installation status of an SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SdkStatus {
    /// Known from the catalog, nothing on disk
    #[default]
    #[serde(rename = "Not Installed", alias = "")]
    NotInstalled,
    /// `add` script running
    Installing,
    /// Present on disk with a usable setup file
    Installed,
    /// `remove` script running
    Uninstalling,
}

impl SdkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInstalled => "Not Installed",
            Self::Installing => "Installing",
            Self::Installed => "Installed",
            Self::Uninstalling => "Uninstalling",
        }
    }
}

impl fmt::Display for SdkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration shared by every SDK of one family, as printed by the
/// family `get-config` script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkFamilyConfig {
    #[serde(default)]
    pub family_name: String,

    #[serde(default)]
    pub description: String,

    /// Directory under which SDKs of this family get installed
    #[serde(default)]
    pub root_dir: String,

    /// File name pattern of the environment setup file (e.g. `environment-setup-*`)
    #[serde(default, alias = "envSetupFilename")]
    pub env_setup_file: String,

    /// Directory holding the family scripts (filled by the loader)
    #[serde(default)]
    pub scripts_dir: String,
}

/// One SDK, either from the catalog or discovered on disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sdk {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub profile: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub arch: String,

    /// Install directory
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub status: SdkStatus,

    /// Build/install date, `YYYY-MM-DD HH:MM`
    #[serde(default)]
    pub date: String,

    #[serde(default)]
    pub size: String,

    #[serde(default)]
    pub md5sum: String,

    /// Path of the environment setup file
    #[serde(default)]
    pub setup_file: String,

    #[serde(default)]
    pub last_error: String,

    #[serde(default)]
    pub family_conf: SdkFamilyConfig,
}

impl Sdk {
    /// Logical key used to match catalog entries against local installs
    pub fn logical_key(&self) -> (&str, &str, &str) {
        (&self.profile, &self.version, &self.arch)
    }

    pub fn is_installed(&self) -> bool {
        self.status == SdkStatus::Installed
    }

    /// First characters of the id, for log lines
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.id.len());
        &self.id[..end]
    }
}

/// Progress message emitted to the UI session while an install job runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkManagementMsg {
    pub cmd_id: String,

    pub timestamp: String,

    /// Snapshot of the SDK at emission time
    pub sdk: Sdk,

    /// Coarse milestone: 0 (buffer flush), 50 (final flush), 100 (exited)
    pub progress: u8,

    pub exited: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stdout: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl SdkManagementMsg {
    /// Output event carrying buffered stdout/stderr
    pub fn output(
        cmd_id: impl Into<String>,
        sdk: Sdk,
        progress: u8,
        stdout: String,
        stderr: String,
    ) -> Self {
        Self {
            cmd_id: cmd_id.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            sdk,
            progress,
            exited: false,
            stdout,
            stderr,
            code: None,
            error: String::new(),
        }
    }

    /// Terminal event sent once when the job is over
    pub fn exited(cmd_id: impl Into<String>, sdk: Sdk, code: i32, error: String) -> Self {
        Self {
            cmd_id: cmd_id.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            sdk,
            progress: 100,
            exited: true,
            stdout: String::new(),
            stderr: String::new(),
            code: Some(code),
            error,
        }
    }
}
