//! Error types for crossdev-core

use thiserror::Error;

/// Result type alias using crossdev-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for crossdev
#[derive(Error, Debug)]
pub enum Error {
    /// Remote catalog could not be fetched or parsed
    #[error("SDK catalog unavailable: {message}")]
    CatalogUnavailable { message: String },

    /// A single local install was skipped during the filesystem scan
    #[error("Skipped SDK install at {path}: {reason}")]
    ScanEntrySkipped { path: String, reason: String },

    /// Family configuration could not be loaded
    #[error("Invalid SDK family configuration: {message}")]
    ConfigInvalid { message: String },

    /// One of the mandatory family scripts is absent
    #[error("Script named '{role}' missing in SDK family '{family}'")]
    ScriptMissing { role: String, family: String },

    /// SDK record failed validation
    #[error("Invalid SDK definition ({reason})")]
    InvalidDefinition { reason: String },

    /// Install requested for an SDK that is already installed
    #[error("SDK {name} is already installed")]
    AlreadyInstalled { name: String },

    /// Install requested while another install is running
    #[error("Installation of SDK {name} already in progress")]
    InstallInProgress { name: String },

    /// Remove requested for an SDK that is not installed
    #[error("SDK {name} is not installed")]
    NotInstalled { name: String },

    /// Abort requested with no running job
    #[error("No installation or removal in progress for SDK {name}")]
    NoOperationInProgress { name: String },

    /// Job subprocess could not be started
    #[error("Cannot start {script}: {source}")]
    ProcessSpawnFailure {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// Job exited with a failure (non-zero code, signal or timeout)
    #[error("{message}")]
    JobFailure { message: String },

    /// Remove script failed
    #[error("Error while uninstalling SDK {name}: {message}")]
    RemoveFailed { name: String, message: String },

    /// No SDK matches the requested identifier
    #[error("Unknown SDK id: {id}")]
    SdkNotFound { id: String },

    /// Identifier prefix matches more than one SDK
    #[error("Ambiguous SDK id: {id} matches {count} SDKs")]
    AmbiguousId { id: String, count: usize },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a catalog unavailable error
    pub fn catalog_unavailable(message: impl Into<String>) -> Self {
        Self::CatalogUnavailable {
            message: message.into(),
        }
    }

    /// Create a scan entry skipped error
    pub fn scan_entry_skipped(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ScanEntrySkipped {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid family configuration error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    /// Create a missing script error
    pub fn script_missing(role: impl Into<String>, family: impl Into<String>) -> Self {
        Self::ScriptMissing {
            role: role.into(),
            family: family.into(),
        }
    }

    /// Create an invalid SDK definition error
    pub fn invalid_definition(reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            reason: reason.into(),
        }
    }

    /// Create a job failure error
    pub fn job_failure(message: impl Into<String>) -> Self {
        Self::JobFailure {
            message: message.into(),
        }
    }

    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// True for errors caused by calling an operation in the wrong SDK state
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::AlreadyInstalled { .. }
                | Self::InstallInProgress { .. }
                | Self::NotInstalled { .. }
                | Self::NoOperationInProgress { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_missing_names_role_and_family() {
        let err = Error::script_missing("remove", "agl");
        assert_eq!(
            err.to_string(),
            "Script named 'remove' missing in SDK family 'agl'"
        );
    }

    #[test]
    fn test_precondition_classification() {
        assert!(Error::AlreadyInstalled {
            name: "x".to_string()
        }
        .is_precondition());
        assert!(!Error::catalog_unavailable("down").is_precondition());
    }
}
