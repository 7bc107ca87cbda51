//! SDK family loading
//!
//! A family is a directory holding the five scripts that manage every SDK
//! of one toolchain vendor/target combination:
//!
//! - `get-config` prints the family configuration as JSON
//! - `list` prints the JSON array of known SDKs
//! - `add` installs one SDK (`--file <path> | --url <url> [--force]`)
//! - `remove` uninstalls the SDK found at the given path
//! - `update` refreshes an installed SDK

use crossdev_core::types::{Sdk, SdkFamilyConfig};
use crossdev_core::utils::one_line;
use crossdev_core::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, error};

/// Logical role of a family script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptRole {
    Add,
    GetConfig,
    List,
    Remove,
    Update,
}

impl ScriptRole {
    /// Every script a family directory must provide
    pub const ALL: [ScriptRole; 5] = [
        ScriptRole::Add,
        ScriptRole::GetConfig,
        ScriptRole::List,
        ScriptRole::Remove,
        ScriptRole::Update,
    ];

    /// File name of the script inside the family directory
    pub fn file_name(&self) -> &'static str {
        match self {
            ScriptRole::Add => "add",
            ScriptRole::GetConfig => "get-config",
            ScriptRole::List => "list",
            ScriptRole::Remove => "remove",
            ScriptRole::Update => "update",
        }
    }
}

impl fmt::Display for ScriptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Resolved script paths of one family
#[derive(Debug, Clone)]
pub struct FamilyScripts {
    dir: PathBuf,
}

impl FamilyScripts {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, role: ScriptRole) -> PathBuf {
        self.dir.join(role.file_name())
    }
}

/// A loaded SDK family, shared read-only by all of its SDKs
#[derive(Debug, Clone)]
pub struct SdkFamily {
    pub config: SdkFamilyConfig,
    pub scripts: FamilyScripts,
}

impl SdkFamily {
    /// Load a family from its script directory
    ///
    /// Runs `get-config`, validates the returned configuration and checks
    /// that every mandatory script exists.
    pub async fn load(scripts_dir: impl Into<PathBuf>) -> Result<Self> {
        let scripts = FamilyScripts {
            dir: scripts_dir.into(),
        };

        let get_config = scripts.path(ScriptRole::GetConfig);
        if !get_config.is_file() {
            return Err(Error::config_invalid(format!(
                "'{}' script file not found in {}",
                ScriptRole::GetConfig,
                scripts.dir.display()
            )));
        }

        let output = run_script(&get_config, &[]).await.map_err(|e| {
            Error::config_invalid(format!(
                "Cannot get sdk config using {}: {}",
                get_config.display(),
                e
            ))
        })?;
        if !output.status.success() {
            return Err(Error::config_invalid(format!(
                "Cannot get sdk config using {}: {}",
                get_config.display(),
                output.status
            )));
        }

        let mut config: SdkFamilyConfig =
            serde_json::from_slice(&output.stdout).map_err(|e| {
                error!(
                    "SDK config script output: {}",
                    one_line(&String::from_utf8_lossy(&output.stdout))
                );
                Error::config_invalid(format!("Cannot decode sdk config: {}", e))
            })?;

        check_config(&config)?;
        config.scripts_dir = scripts.dir.to_string_lossy().to_string();

        for role in ScriptRole::ALL {
            if !scripts.path(role).is_file() {
                return Err(Error::script_missing(role.file_name(), &config.family_name));
            }
        }

        debug!(
            "Loaded SDK family {} (root {}) from {}",
            config.family_name,
            config.root_dir,
            scripts.dir.display()
        );

        Ok(Self { config, scripts })
    }

    pub fn name(&self) -> &str {
        &self.config.family_name
    }

    pub fn root_dir(&self) -> &Path {
        Path::new(&self.config.root_dir)
    }

    /// Run the `list` script and parse its JSON array of SDKs
    pub async fn list_sdks(&self) -> Result<Vec<Sdk>> {
        let list = self.scripts.path(ScriptRole::List);
        let output = run_script(&list, &[])
            .await
            .map_err(|e| Error::catalog_unavailable(format!("Cannot get sdks list: {}", e)))?;
        if !output.status.success() {
            return Err(Error::catalog_unavailable(format!(
                "Cannot get sdks list: {} exited with {}",
                list.display(),
                output.status
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            error!(
                "SDK list script output: {}",
                one_line(&String::from_utf8_lossy(&output.stdout))
            );
            Error::catalog_unavailable(format!("Cannot decode sdk list: {}", e))
        })
    }
}

fn check_config(config: &SdkFamilyConfig) -> Result<()> {
    if config.family_name.is_empty() {
        return Err(Error::config_invalid("SDK config not valid (familyName not set)"));
    }
    if config.root_dir.is_empty() {
        return Err(Error::config_invalid("SDK config not valid (rootDir not set)"));
    }
    if config.env_setup_file.is_empty() {
        return Err(Error::config_invalid(
            "SDK config not valid (envSetupFile not set)",
        ));
    }

    let root = Path::new(&config.root_dir);
    if !root.is_absolute() {
        return Err(Error::config_invalid(format!(
            "SDK config not valid (rootDir {} is not absolute)",
            config.root_dir
        )));
    }
    if !root.is_dir() {
        return Err(Error::config_invalid(format!(
            "SDK config not valid (rootDir {} does not exist)",
            config.root_dir
        )));
    }
    Ok(())
}

/// Run a script to completion, capturing stdout and stderr
pub(crate) async fn run_script(script: &Path, args: &[&str]) -> std::io::Result<Output> {
    let output = Command::new(script).args(args).output().await?;
    if !output.stderr.is_empty() {
        debug!(
            "{} stderr: {}",
            script.display(),
            one_line(&String::from_utf8_lossy(&output.stderr))
        );
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_file_names() {
        let names: Vec<_> = ScriptRole::ALL.iter().map(|r| r.file_name()).collect();
        assert_eq!(names, ["add", "get-config", "list", "remove", "update"]);
    }

    #[test]
    fn test_check_config_rejects_empty_fields() {
        let mut config = SdkFamilyConfig {
            family_name: "agl".to_string(),
            root_dir: "/tmp".to_string(),
            env_setup_file: String::new(),
            ..Default::default()
        };
        let err = check_config(&config).unwrap_err();
        assert!(err.to_string().contains("envSetupFile not set"));

        config.env_setup_file = "environment-setup-*".to_string();
        config.root_dir.clear();
        let err = check_config(&config).unwrap_err();
        assert!(err.to_string().contains("rootDir not set"));
    }

    #[test]
    fn test_check_config_rejects_relative_root() {
        let config = SdkFamilyConfig {
            family_name: "agl".to_string(),
            root_dir: "sdks".to_string(),
            env_setup_file: "environment-setup-*".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            check_config(&config),
            Err(Error::ConfigInvalid { .. })
        ));
    }
}
