//! Catalog reconciliation
//!
//! Merges the cached remote SDK catalog of a family with a scan of the
//! family root directory. Installs are laid out as
//! `<root>/<profile>/<version>/<arch>/<env setup file>`, with a
//! `version-*` metadata file next to the setup file.
//!
//! The catalog is cached as a JSON array of SDK entries. When the cache file
//! is missing, a [`CatalogFetcher`] is asked to create it first.

use crate::family::{run_script, ScriptRole, SdkFamily};
use anyhow::Context;
use chrono::NaiveDateTime;
use crossdev_core::types::{Sdk, SdkStatus};
use crossdev_core::{Error, Result};
use globset::{Glob, GlobMatcher};
use regex::Regex;
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Depth of setup files below the root: profile/version/arch/file
const SCAN_DEPTH: usize = 4;

/// Prefix of the metadata file stored next to each setup file
const METADATA_PREFIX: &str = "version-";

static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*Timestamp\s*:?\s*(\d{12})").expect("timestamp regex is valid")
});

/// Future returned by [`CatalogFetcher::fetch`]
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Retrieves the remote catalog and writes it to the cache path.
///
/// Implementors decide where the catalog comes from; tests can provide a
/// stub writing a fixed document.
pub trait CatalogFetcher: Send + Sync {
    fn fetch<'a>(&'a self, dest: &'a Path) -> FetchFuture<'a>;
}

/// Caches the output of the family `list` script as the catalog
pub struct ListScriptFetcher {
    script: PathBuf,
}

impl ListScriptFetcher {
    pub fn new(family: &SdkFamily) -> Self {
        Self {
            script: family.scripts.path(ScriptRole::List),
        }
    }
}

impl CatalogFetcher for ListScriptFetcher {
    fn fetch<'a>(&'a self, dest: &'a Path) -> FetchFuture<'a> {
        Box::pin(async move {
            debug!("Fetching SDK catalog with {}", self.script.display());
            let output = run_script(&self.script, &[]).await?;
            if !output.status.success() {
                anyhow::bail!("{} exited with {}", self.script.display(), output.status);
            }
            write_cache(dest, &output.stdout).await
        })
    }
}

/// Downloads the catalog over HTTP
pub struct HttpCatalogFetcher {
    url: String,
    client: reqwest::Client,
}

impl HttpCatalogFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl CatalogFetcher for HttpCatalogFetcher {
    fn fetch<'a>(&'a self, dest: &'a Path) -> FetchFuture<'a> {
        Box::pin(async move {
            debug!("Fetching SDK catalog from {}", self.url);
            let response = self
                .client
                .get(&self.url)
                .header("User-Agent", "crossdev")
                .send()
                .await?
                .error_for_status()?;
            let body = response.bytes().await?;
            write_cache(dest, &body).await?;
            info!("Cached SDK catalog from {}", self.url);
            anyhow::Ok(())
        })
    }
}

/// Store a fetched catalog. Documents that are not an SDK list never reach
/// the cache.
async fn write_cache(dest: &Path, content: &[u8]) -> anyhow::Result<()> {
    serde_json::from_slice::<Vec<Sdk>>(content).context("fetched catalog is not an SDK list")?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = dest.with_extension("json.tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, dest).await?;
    Ok(())
}

/// An SDK found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInstall {
    pub profile: String,
    pub version: String,
    pub arch: String,
    /// Directory holding the setup file
    pub path: PathBuf,
    pub setup_file: PathBuf,
    /// `YYYY-MM-DD HH:MM`, empty when unknown
    pub date: String,
}

impl LocalInstall {
    pub(crate) fn matches(&self, sdk: &Sdk) -> bool {
        sdk.logical_key() == (self.profile.as_str(), self.version.as_str(), self.arch.as_str())
    }

    fn into_sdk(self) -> Sdk {
        Sdk {
            name: format!("{}-{}-{}", self.profile, self.arch, self.version),
            description: format!(
                "{} {} SDK for {} (found locally)",
                self.profile, self.version, self.arch
            ),
            status: SdkStatus::Installed,
            path: self.path.to_string_lossy().to_string(),
            setup_file: self.setup_file.to_string_lossy().to_string(),
            date: self.date,
            profile: self.profile,
            version: self.version,
            arch: self.arch,
            ..Default::default()
        }
    }
}

/// Builds the unified SDK inventory of one family
#[derive(Debug, Clone)]
pub struct CatalogReconciler {
    root_dir: PathBuf,
    setup_file: GlobMatcher,
    strict: bool,
}

impl CatalogReconciler {
    /// Create a reconciler scanning `root_dir` for files matching the
    /// `env_setup_file` glob pattern
    pub fn new(root_dir: impl Into<PathBuf>, env_setup_file: &str) -> Result<Self> {
        let glob = Glob::new(env_setup_file).map_err(|e| {
            Error::config_invalid(format!("Invalid envSetupFile pattern '{}': {}", env_setup_file, e))
        })?;
        Ok(Self {
            root_dir: root_dir.into(),
            setup_file: glob.compile_matcher(),
            strict: false,
        })
    }

    pub fn for_family(family: &SdkFamily) -> Result<Self> {
        Self::new(&family.config.root_dir, &family.config.env_setup_file)
    }

    /// In strict mode an unreadable install aborts the scan instead of
    /// being skipped
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Load the catalog, scan the root directory and merge both
    pub async fn reconcile(&self, cache: &Path, fetcher: &dyn CatalogFetcher) -> Result<Vec<Sdk>> {
        let catalog = load_catalog(cache, fetcher).await?;
        let installs = self.scan()?;
        Ok(merge(catalog, installs))
    }

    /// Find every install below the root directory
    pub fn scan(&self) -> Result<Vec<LocalInstall>> {
        let mut installs = Vec::new();
        if !self.root_dir.exists() {
            debug!("SDK root {} does not exist, nothing installed", self.root_dir.display());
            return Ok(installs);
        }

        let walker = WalkDir::new(&self.root_dir)
            .max_depth(SCAN_DEPTH)
            .sort_by_file_name();

        let mut install_dirs = HashSet::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    self.skip(Error::scan_entry_skipped(path, e.to_string()))?;
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.setup_file.is_match(entry.file_name()) {
                continue;
            }

            // Multilib installs ship several setup files; the first in name
            // order stands for the directory
            if let Some(dir) = entry.path().parent() {
                if !install_dirs.insert(dir.to_path_buf()) {
                    info!(
                        "Ignoring additional setup file {} of {}",
                        entry.path().display(),
                        dir.display()
                    );
                    continue;
                }
            }

            match self.inspect(entry.path()) {
                Ok(Some(install)) => installs.push(install),
                Ok(None) => {}
                Err(e) => self.skip(e)?,
            }
        }

        debug!(
            "Found {} SDK installs below {}",
            installs.len(),
            self.root_dir.display()
        );
        Ok(installs)
    }

    fn skip(&self, err: Error) -> Result<()> {
        if self.strict {
            return Err(err);
        }
        warn!("{}", err);
        Ok(())
    }

    /// Turn one setup file into a local install, `None` when the path does
    /// not encode profile, version and arch
    fn inspect(&self, setup_file: &Path) -> Result<Option<LocalInstall>> {
        let relative = match setup_file.strip_prefix(&self.root_dir) {
            Ok(relative) => relative,
            Err(_) => return Ok(None),
        };
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        let [profile, version, arch, _file] = segments.as_slice() else {
            debug!("Ignoring {}: not at profile/version/arch depth", setup_file.display());
            return Ok(None);
        };

        let dir = match setup_file.parent() {
            Some(dir) => dir,
            None => return Ok(None),
        };
        let metadata = read_metadata(dir)
            .map_err(|reason| Error::scan_entry_skipped(dir.display().to_string(), reason))?;

        Ok(Some(LocalInstall {
            profile: profile.clone(),
            version: version.clone(),
            arch: arch.clone(),
            path: dir.to_path_buf(),
            setup_file: setup_file.to_path_buf(),
            date: parse_timestamp(&metadata).unwrap_or_default(),
        }))
    }
}

/// Read the cached catalog, fetching it first when the cache is absent.
/// Every entry starts out as not installed. A cache that does not parse is
/// removed so the next call fetches again.
pub async fn load_catalog(cache: &Path, fetcher: &dyn CatalogFetcher) -> Result<Vec<Sdk>> {
    if !cache.exists() {
        info!("No cached SDK catalog at {}, fetching", cache.display());
        fetcher
            .fetch(cache)
            .await
            .map_err(|e| Error::catalog_unavailable(format!("fetch failed: {}", e)))?;
    }

    let content = tokio::fs::read(cache).await.map_err(|e| {
        Error::catalog_unavailable(format!("cannot read {}: {}", cache.display(), e))
    })?;
    let mut catalog: Vec<Sdk> = match serde_json::from_slice(&content) {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!("Dropping unreadable SDK catalog cache {}", cache.display());
            if let Err(rm) = tokio::fs::remove_file(cache).await {
                warn!("Cannot remove {}: {}", cache.display(), rm);
            }
            return Err(Error::catalog_unavailable(format!(
                "cannot parse {}: {}",
                cache.display(),
                e
            )));
        }
    };

    for sdk in &mut catalog {
        sdk.status = SdkStatus::NotInstalled;
    }
    Ok(catalog)
}

/// Merge local installs into the catalog.
///
/// Catalog order is preserved; installs without a catalog entry are
/// appended in scan order.
pub fn merge(mut catalog: Vec<Sdk>, installs: Vec<LocalInstall>) -> Vec<Sdk> {
    let known = catalog.len();
    for install in installs {
        match catalog[..known].iter_mut().find(|sdk| install.matches(sdk)) {
            Some(sdk) => {
                sdk.status = SdkStatus::Installed;
                sdk.path = install.path.to_string_lossy().to_string();
                sdk.setup_file = install.setup_file.to_string_lossy().to_string();
                sdk.date = install.date;
            }
            None => catalog.push(install.into_sdk()),
        }
    }
    catalog
}

/// Contents of the first `version-*` file of an install directory
fn read_metadata(dir: &Path) -> std::result::Result<String, String> {
    let entries = std::fs::read_dir(dir).map_err(|e| e.to_string())?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(METADATA_PREFIX))
        })
        .collect();
    candidates.sort();

    let file = candidates
        .first()
        .ok_or_else(|| format!("no {}* metadata file", METADATA_PREFIX))?;
    std::fs::read_to_string(file).map_err(|e| format!("cannot read {}: {}", file.display(), e))
}

/// Extract the `Timestamp` field of a metadata file as `YYYY-MM-DD HH:MM`
pub fn parse_timestamp(metadata: &str) -> Option<String> {
    let digits = TIMESTAMP_RE.captures(metadata)?.get(1)?.as_str();
    let parsed = NaiveDateTime::parse_from_str(digits, "%Y%m%d%H%M").ok()?;
    Some(parsed.format("%Y-%m-%d %H:%M").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(profile: &str, version: &str, arch: &str) -> Sdk {
        Sdk {
            name: format!("{}-{}-{}", profile, arch, version),
            profile: profile.to_string(),
            version: version.to_string(),
            arch: arch.to_string(),
            ..Default::default()
        }
    }

    fn install(profile: &str, version: &str, arch: &str) -> LocalInstall {
        let path = PathBuf::from(format!("/xdt/sdk/{}/{}/{}", profile, version, arch));
        LocalInstall {
            profile: profile.to_string(),
            version: version.to_string(),
            arch: arch.to_string(),
            setup_file: path.join("environment-setup-x"),
            path,
            date: "2024-01-15 12:30".to_string(),
        }
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(
            parse_timestamp("Timestamp 202401151230\n").as_deref(),
            Some("2024-01-15 12:30")
        );
        assert_eq!(
            parse_timestamp("Distro: poky-agl\nTimestamp: 20231231235959\n").as_deref(),
            Some("2023-12-31 23:59")
        );
    }

    #[test]
    fn test_parse_timestamp_absent_or_invalid() {
        assert_eq!(parse_timestamp("Distro: poky-agl\n"), None);
        assert_eq!(parse_timestamp("Timestamp 202413991230"), None);
    }

    #[test]
    fn test_merge_marks_matching_entry_installed() {
        let catalog = vec![entry("agl", "7.0.0", "aarch64"), entry("agl", "7.0.0", "x86_64")];
        let merged = merge(catalog, vec![install("agl", "7.0.0", "x86_64")]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].status, SdkStatus::NotInstalled);
        assert_eq!(merged[1].status, SdkStatus::Installed);
        assert_eq!(merged[1].path, "/xdt/sdk/agl/7.0.0/x86_64");
        assert_eq!(merged[1].date, "2024-01-15 12:30");
    }

    #[test]
    fn test_merge_appends_local_only_installs() {
        let catalog = vec![entry("agl", "7.0.0", "aarch64")];
        let merged = merge(
            catalog,
            vec![install("agl", "8.0.0", "aarch64"), install("poky", "4.0", "arm")],
        );

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].name, "agl-aarch64-7.0.0");
        assert_eq!(merged[1].name, "agl-aarch64-8.0.0");
        assert_eq!(merged[1].status, SdkStatus::Installed);
        assert!(merged[1].url.is_empty());
        assert_eq!(merged[2].name, "poky-arm-4.0");
    }

    #[test]
    fn test_invalid_glob_is_config_error() {
        let err = CatalogReconciler::new("/xdt/sdk", "environment-setup-[").unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }
}
