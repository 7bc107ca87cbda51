//! Configuration file loading and parsing

use crate::error::{Error, Result};
use crate::types::{family_catalog_url, CrossdevConfigFile, InventorySource};
use crate::utils::get_home_dir;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["crossdev.yaml", "crossdev.yml"];

/// Loaded crossdev configuration
#[derive(Debug, Clone)]
pub struct CrossdevConfig {
    /// The parsed configuration
    pub config: CrossdevConfigFile,

    /// Path to the configuration file, if one was found
    pub config_path: Option<Utf8PathBuf>,

    /// Directory relative paths in the file are resolved against
    pub working_dir: Utf8PathBuf,
}

impl CrossdevConfig {
    /// Load configuration from the specified path, or search the current
    /// directory and its parents. Without any file, defaults are used.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let found = match path {
            Some(p) => {
                let content = fs::read_to_string(p).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        Error::config_not_found(p.as_str())
                    } else {
                        Error::Io(e)
                    }
                })?;
                Some((p.to_owned(), content))
            }
            None => Self::find_config()?,
        };

        match found {
            Some((config_path, content)) => {
                let working_dir = config_path
                    .parent()
                    .map(|p| p.to_owned())
                    .unwrap_or_else(|| Utf8PathBuf::from("."));

                let config: CrossdevConfigFile = serde_yaml_ng::from_str(&content)?;
                debug!("Loaded configuration from {}", config_path);

                Ok(Self {
                    config,
                    config_path: Some(config_path),
                    working_dir,
                })
            }
            None => {
                debug!("No crossdev.yaml found, using defaults");
                Ok(Self::from_file(CrossdevConfigFile::default(), Self::cwd()?))
            }
        }
    }

    /// Wrap an already parsed configuration
    pub fn from_file(config: CrossdevConfigFile, working_dir: Utf8PathBuf) -> Self {
        Self {
            config,
            config_path: None,
            working_dir,
        }
    }

    fn cwd() -> Result<Utf8PathBuf> {
        let cwd = std::env::current_dir().map_err(Error::Io)?;
        Utf8PathBuf::try_from(cwd)
            .map_err(|_| Error::config_invalid("Current directory path is not valid UTF-8"))
    }

    /// Find configuration file in current directory or parent directories
    fn find_config() -> Result<Option<(Utf8PathBuf, String)>> {
        let cwd = Self::cwd()?;
        let mut current = cwd.as_path();

        loop {
            for name in CONFIG_FILE_NAMES {
                let path = current.join(name);
                if path.exists() {
                    let content = fs::read_to_string(&path)?;
                    return Ok(Some((path, content)));
                }
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => return Ok(None),
            }
        }
    }

    /// Get the inner configuration file
    pub fn inner(&self) -> &CrossdevConfigFile {
        &self.config
    }

    /// Directory holding one subdirectory per SDK family
    pub fn scripts_dir(&self) -> PathBuf {
        self.resolve(&self.config.scripts_dir)
    }

    pub fn inventory(&self) -> InventorySource {
        self.config.inventory
    }

    /// Directory holding the per-family catalog caches
    pub fn catalog_cache_dir(&self) -> Result<PathBuf> {
        match &self.config.catalog.cache_dir {
            Some(dir) => Ok(self.resolve(dir)),
            None => {
                let home = get_home_dir().map_err(|e| Error::config_invalid(e.to_string()))?;
                Ok(home.join(".cache").join("crossdev").join("catalog"))
            }
        }
    }

    /// Remote catalog URL for a family, if configured
    pub fn catalog_url(&self, family: &str) -> Option<String> {
        self.config
            .catalog
            .url
            .as_ref()
            .map(|template| family_catalog_url(template, family))
    }

    pub fn strict_scan(&self) -> bool {
        self.config.strict_scan
    }

    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.config.install.timeout_secs)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let p = Utf8Path::new(path);
        if p.is_absolute() {
            p.as_std_path().to_path_buf()
        } else {
            self.working_dir.join(p).into_std_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crossdev.yaml");
        fs::write(
            &path,
            "scripts_dir: scripts\ncatalog:\n  url: https://sdk.example.org/{family}.json\n",
        )
        .unwrap();

        let path = Utf8PathBuf::try_from(path).unwrap();
        let config = CrossdevConfig::load(Some(&path)).unwrap();

        assert_eq!(config.scripts_dir(), dir.path().join("scripts"));
        assert_eq!(
            config.catalog_url("agl").as_deref(),
            Some("https://sdk.example.org/agl.json")
        );
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let path = Utf8PathBuf::from("/nonexistent/crossdev.yaml");
        let err = CrossdevConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let mut file = CrossdevConfigFile::default();
        file.scripts_dir = "/opt/sdk-scripts".to_string();
        file.catalog.cache_dir = Some("/var/cache/crossdev".to_string());

        let config = CrossdevConfig::from_file(file, Utf8PathBuf::from("/work"));
        assert_eq!(config.scripts_dir(), PathBuf::from("/opt/sdk-scripts"));
        assert_eq!(
            config.catalog_cache_dir().unwrap(),
            PathBuf::from("/var/cache/crossdev")
        );
        assert_eq!(config.install_timeout(), Duration::from_secs(1800));
    }
}
