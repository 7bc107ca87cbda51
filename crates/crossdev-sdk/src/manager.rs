//! SDK manager
//!
//! Loads every family found in the scripts directory, builds their SDK
//! inventories and routes install/remove requests to the right SDK.

use crate::catalog::{CatalogFetcher, CatalogReconciler, HttpCatalogFetcher, ListScriptFetcher};
use crate::family::SdkFamily;
use crate::installer::{BufferThresholds, CrossSdk, InstallRequest, SdkOptions};
use crate::session::SessionRegistry;
use crossdev_core::types::{family_catalog_url, InventorySource, Sdk};
use crossdev_core::{CrossdevConfig, Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How the manager builds inventories and configures its SDKs
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    pub inventory: InventorySource,
    /// Directory of the `<family>.json` catalog caches
    pub cache_dir: PathBuf,
    /// Catalog URL template, `{family}` is substituted
    pub catalog_url: Option<String>,
    pub strict_scan: bool,
    pub sdk: SdkOptions,
}

impl ManagerOptions {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            inventory: InventorySource::Native,
            cache_dir: cache_dir.into(),
            catalog_url: None,
            strict_scan: false,
            sdk: SdkOptions::default(),
        }
    }

    pub fn from_config(config: &CrossdevConfig) -> Result<Self> {
        let install = &config.inner().install;
        Ok(Self {
            inventory: config.inventory(),
            cache_dir: config.catalog_cache_dir()?,
            catalog_url: config.inner().catalog.url.clone(),
            strict_scan: config.strict_scan(),
            sdk: SdkOptions {
                thresholds: BufferThresholds {
                    stdout: install.stdout_threshold,
                    stderr: install.stderr_threshold,
                },
                default_timeout: config.install_timeout(),
            },
        })
    }

    fn catalog_cache(&self, family: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", family))
    }

    /// Remote catalog URL of a family, if one is configured
    pub fn catalog_url(&self, family: &str) -> Option<String> {
        self.catalog_url
            .as_deref()
            .map(|template| family_catalog_url(template, family))
    }
}

/// A family directory that could not be used
#[derive(Debug)]
pub struct SkippedFamily {
    pub dir: PathBuf,
    pub error: Error,
}

/// All families and SDKs known to this process
pub struct SdkManager {
    families: Vec<Arc<SdkFamily>>,
    sdks: Vec<CrossSdk>,
    skipped: Vec<SkippedFamily>,
    options: ManagerOptions,
    sessions: Arc<dyn SessionRegistry>,
}

impl SdkManager {
    /// Create a manager without any family
    pub fn new(options: ManagerOptions, sessions: Arc<dyn SessionRegistry>) -> Self {
        Self {
            families: Vec::new(),
            sdks: Vec::new(),
            skipped: Vec::new(),
            options,
            sessions,
        }
    }

    /// Load every family below `scripts_dir`.
    ///
    /// Families that fail to load or whose inventory cannot be built are
    /// logged and listed by [`SdkManager::skipped_families`].
    pub async fn load(
        scripts_dir: &Path,
        options: ManagerOptions,
        sessions: Arc<dyn SessionRegistry>,
    ) -> Result<Self> {
        let mut manager = Self::new(options, sessions);

        let mut dirs: Vec<PathBuf> = std::fs::read_dir(scripts_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();

        for dir in dirs {
            if let Err(error) = manager.add_family(&dir).await {
                warn!("Skipping SDK family in {}: {}", dir.display(), error);
                manager.skipped.push(SkippedFamily { dir, error });
            }
        }

        info!(
            "{} SDK families loaded, {} SDKs known",
            manager.families.len(),
            manager.sdks.len()
        );
        Ok(manager)
    }

    /// Load one family and add its SDKs. Errors are returned to the caller.
    pub async fn add_family(&mut self, dir: &Path) -> Result<usize> {
        let family = Arc::new(SdkFamily::load(dir).await?);
        let inventory = self.inventory(&family).await?;

        let mut known: HashSet<String> = self.sdks.iter().map(|s| s.id()).collect();
        let mut added = 0;
        for raw in inventory {
            let name = raw.name.clone();
            let sdk = match CrossSdk::with_options(
                raw,
                Arc::clone(&family),
                Arc::clone(&self.sessions),
                self.options.sdk,
            ) {
                Ok(sdk) => sdk,
                Err(e) => {
                    warn!("Dropping SDK '{}' of family {}: {}", name, family.name(), e);
                    continue;
                }
            };
            if !known.insert(sdk.id()) {
                warn!("Dropping duplicate SDK '{}' of family {}", name, family.name());
                continue;
            }
            self.sdks.push(sdk);
            added += 1;
        }

        debug!("Family {}: {} SDKs", family.name(), added);
        self.families.push(family);
        Ok(added)
    }

    /// Build the raw SDK inventory of a family
    pub async fn inventory(&self, family: &SdkFamily) -> Result<Vec<Sdk>> {
        match self.options.inventory {
            InventorySource::Script => family.list_sdks().await,
            InventorySource::Native => {
                let reconciler =
                    CatalogReconciler::for_family(family)?.strict(self.options.strict_scan);
                let cache = self.options.catalog_cache(family.name());
                let fetcher: Box<dyn CatalogFetcher> =
                    match self.options.catalog_url(family.name()) {
                        Some(url) => Box::new(HttpCatalogFetcher::new(url)),
                        None => Box::new(ListScriptFetcher::new(family)),
                    };
                reconciler.reconcile(&cache, fetcher.as_ref()).await
            }
        }
    }

    pub fn families(&self) -> &[Arc<SdkFamily>] {
        &self.families
    }

    pub fn skipped_families(&self) -> &[SkippedFamily] {
        &self.skipped
    }

    /// Snapshots of every SDK, in inventory order
    pub fn list(&self) -> Vec<Sdk> {
        self.sdks.iter().map(|s| s.get()).collect()
    }

    /// Find an SDK by full id or unique id prefix
    pub fn resolve(&self, id: &str) -> Result<&CrossSdk> {
        if id.is_empty() {
            return Err(Error::SdkNotFound { id: id.to_string() });
        }
        if let Some(sdk) = self.sdks.iter().find(|s| s.id() == id) {
            return Ok(sdk);
        }

        let matches: Vec<&CrossSdk> = self
            .sdks
            .iter()
            .filter(|s| s.id().starts_with(id))
            .collect();
        match matches.as_slice() {
            [sdk] => Ok(*sdk),
            [] => Err(Error::SdkNotFound { id: id.to_string() }),
            _ => Err(Error::AmbiguousId {
                id: id.to_string(),
                count: matches.len(),
            }),
        }
    }

    pub fn get(&self, id: &str) -> Result<Sdk> {
        Ok(self.resolve(id)?.get())
    }

    pub async fn install(&self, id: &str, request: InstallRequest) -> Result<String> {
        self.resolve(id)?.install(request).await
    }

    pub async fn abort(&self, id: &str, timeout: Option<Duration>) -> Result<()> {
        self.resolve(id)?.abort_install_remove(timeout).await
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        self.resolve(id)?.remove().await
    }

    pub fn env_command(&self, id: &str) -> Result<Vec<String>> {
        Ok(self.resolve(id)?.env_command())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_url_per_family() {
        let mut options = ManagerOptions::new("/tmp/cache");
        assert_eq!(options.catalog_url("agl"), None);

        options.catalog_url = Some("https://sdk.example.org/{family}/catalog.json".to_string());
        assert_eq!(
            options.catalog_url("poky").as_deref(),
            Some("https://sdk.example.org/poky/catalog.json")
        );
        assert_eq!(
            options.catalog_cache("poky"),
            PathBuf::from("/tmp/cache/poky.json")
        );
    }
}
