//! SDK identity and validation
//!
//! Every SDK gets an id derived from its name, so the same SDK keeps the
//! same id across restarts and progress events stay addressable without
//! any persisted id storage.

use crossdev_core::types::{Sdk, SdkFamilyConfig, SdkStatus};
use crossdev_core::{Error, Result};
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

/// Namespace of SDK ids. Nil, so ids match those of earlier deployments.
const SDK_ID_NAMESPACE: Uuid = Uuid::nil();

/// Derive the id of an SDK from its name, or from `profile_arch_version`
/// when the name is empty.
pub fn sdk_id(sdk: &Sdk) -> String {
    let key = if sdk.name.is_empty() {
        format!("{}_{}_{}", sdk.profile, sdk.arch, sdk.version)
    } else {
        sdk.name.clone()
    };
    Uuid::new_v3(&SDK_ID_NAMESPACE, key.as_bytes()).to_string()
}

/// Validate a raw SDK record, bind it to its family and assign its id.
///
/// Checks run in a fixed order and the first failure is returned.
pub fn validate_sdk(mut sdk: Sdk, family: &SdkFamilyConfig) -> Result<Sdk> {
    for (field, value) in [
        ("name", &sdk.name),
        ("profile", &sdk.profile),
        ("version", &sdk.version),
        ("arch", &sdk.arch),
    ] {
        if value.is_empty() {
            return Err(Error::invalid_definition(format!("{} not set", field)));
        }
    }

    if sdk.status == SdkStatus::Installed {
        check_installed_path("setupFile", &sdk.setup_file)?;
        check_installed_path("path", &sdk.path)?;
    }

    sdk.id = sdk_id(&sdk);
    sdk.last_error.clear();
    sdk.family_conf = family.clone();

    debug!(
        "New SDK: ID={}, Family={}, Name={}",
        sdk.short_id(),
        family.family_name,
        sdk.name
    );

    Ok(sdk)
}

fn check_installed_path(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::invalid_definition(format!("{} not set", field)));
    }
    if !Path::new(value).exists() {
        return Err(Error::invalid_definition(format!(
            "{} not accessible",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn raw(name: &str) -> Sdk {
        Sdk {
            name: name.to_string(),
            profile: "agl".to_string(),
            version: "7.0.0".to_string(),
            arch: "aarch64".to_string(),
            ..Default::default()
        }
    }

    fn family() -> SdkFamilyConfig {
        SdkFamilyConfig {
            family_name: "agl".to_string(),
            root_dir: "/xdt/sdk".to_string(),
            env_setup_file: "environment-setup-*".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_id_is_deterministic() {
        let a = sdk_id(&raw("agl-aarch64-7.0.0"));
        let b = sdk_id(&raw("agl-aarch64-7.0.0"));
        assert_eq!(a, b);
        assert_ne!(a, sdk_id(&raw("agl-x86_64-7.0.0")));
    }

    #[test]
    fn test_id_matches_known_value() {
        assert_eq!(
            sdk_id(&raw("agl-aarch64-7.0.0")),
            "07ccc938-2d19-313f-a8d8-26b7dfcccbcb"
        );
    }

    #[test]
    fn test_id_falls_back_to_logical_key() {
        let unnamed = raw("");
        let named = raw("agl_aarch64_7.0.0");
        assert_eq!(sdk_id(&unnamed), sdk_id(&named));
    }

    #[test]
    fn test_validation_order() {
        let mut sdk = raw("");
        sdk.arch.clear();
        let err = validate_sdk(sdk, &family()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid SDK definition (name not set)");

        let mut sdk = raw("x");
        sdk.version.clear();
        let err = validate_sdk(sdk, &family()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid SDK definition (version not set)");
    }

    #[test]
    fn test_installed_requires_existing_paths() {
        let mut sdk = raw("x");
        sdk.status = SdkStatus::Installed;
        let err = validate_sdk(sdk.clone(), &family()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid SDK definition (setupFile not set)"
        );

        sdk.setup_file = "/nonexistent/environment-setup-aarch64".to_string();
        let err = validate_sdk(sdk, &family()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid SDK definition (setupFile not accessible)"
        );
    }

    #[test]
    fn test_valid_installed_sdk() {
        let dir = TempDir::new().unwrap();
        let setup = dir.path().join("environment-setup-aarch64-agl-linux");
        std::fs::write(&setup, "export CC=gcc\n").unwrap();

        let mut sdk = raw("agl-aarch64-7.0.0");
        sdk.status = SdkStatus::Installed;
        sdk.path = dir.path().to_string_lossy().to_string();
        sdk.setup_file = setup.to_string_lossy().to_string();
        sdk.last_error = "stale".to_string();

        let sdk = validate_sdk(sdk, &family()).unwrap();
        assert_eq!(sdk.id, sdk_id(&raw("agl-aarch64-7.0.0")));
        assert!(sdk.last_error.is_empty());
        assert_eq!(sdk.family_conf.family_name, "agl");
    }
}
