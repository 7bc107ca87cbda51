//! Configuration types for crossdev.yaml

use serde::{Deserialize, Serialize};

/// Default install job timeout (30 minutes)
pub const DEFAULT_INSTALL_TIMEOUT_SECS: u64 = 30 * 60;

/// Default stdout buffering threshold in bytes
pub const DEFAULT_STDOUT_THRESHOLD: usize = 10;

/// Default stderr buffering threshold in bytes
pub const DEFAULT_STDERR_THRESHOLD: usize = 2000;

/// Root crossdev.yaml configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossdevConfigFile {
    /// Directory whose subdirectories are SDK families
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: String,

    /// How the SDK inventory of each family is built
    #[serde(default)]
    pub inventory: InventorySource,

    /// Catalog cache and fetch settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Abort the filesystem scan on the first unreadable install
    #[serde(default)]
    pub strict_scan: bool,

    /// Install job settings
    #[serde(default)]
    pub install: InstallConfig,
}

impl Default for CrossdevConfigFile {
    fn default() -> Self {
        Self {
            scripts_dir: default_scripts_dir(),
            inventory: InventorySource::default(),
            catalog: CatalogConfig::default(),
            strict_scan: false,
            install: InstallConfig::default(),
        }
    }
}

fn default_scripts_dir() -> String {
    "sdk-scripts".to_string()
}

/// Source of the per-family SDK inventory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventorySource {
    /// Reconcile the cached catalog with a scan of the family root directory
    #[default]
    Native,
    /// Use the JSON array printed by the family `list` script as-is
    Script,
}

impl std::fmt::Display for InventorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InventorySource::Native => write!(f, "native"),
            InventorySource::Script => write!(f, "script"),
        }
    }
}

/// Catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directory holding `<family>.json` catalog caches
    #[serde(default)]
    pub cache_dir: Option<String>,

    /// URL template of the remote catalog, `{family}` is substituted
    #[serde(default)]
    pub url: Option<String>,
}

/// Placeholder of the family name in a catalog URL template
pub const FAMILY_PLACEHOLDER: &str = "{family}";

/// Expand a catalog URL template for one family
pub fn family_catalog_url(template: &str, family: &str) -> String {
    template.replace(FAMILY_PLACEHOLDER, family)
}

/// Install job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_stdout_threshold")]
    pub stdout_threshold: usize,

    #[serde(default = "default_stderr_threshold")]
    pub stderr_threshold: usize,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_INSTALL_TIMEOUT_SECS,
            stdout_threshold: DEFAULT_STDOUT_THRESHOLD,
            stderr_threshold: DEFAULT_STDERR_THRESHOLD,
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_INSTALL_TIMEOUT_SECS
}

fn default_stdout_threshold() -> usize {
    DEFAULT_STDOUT_THRESHOLD
}

fn default_stderr_threshold() -> usize {
    DEFAULT_STDERR_THRESHOLD
}
