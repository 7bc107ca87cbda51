//! Shared command setup

use anyhow::{Context, Result};
use camino::Utf8Path;
use crossdev_core::CrossdevConfig;
use crossdev_sdk::{ManagerOptions, SdkManager, SessionRegistry};
use std::sync::Arc;
use tracing::debug;

use crate::output;

/// Load crossdev.yaml (or defaults) and every SDK family it points to
pub(super) async fn load_manager(
    config_path: Option<&Utf8Path>,
    sessions: Arc<dyn SessionRegistry>,
) -> Result<(CrossdevConfig, SdkManager)> {
    let config = CrossdevConfig::load(config_path).context("Failed to load configuration")?;
    let options = ManagerOptions::from_config(&config)?;
    let scripts_dir = config.scripts_dir();

    let manager = SdkManager::load(&scripts_dir, options, sessions)
        .await
        .with_context(|| format!("Failed to load SDK families from {}", scripts_dir.display()))?;

    debug!(
        "{} SDK families loaded from {}",
        manager.families().len(),
        scripts_dir.display()
    );
    for skipped in manager.skipped_families() {
        output::warning(&format!(
            "SDK family in {} skipped: {}",
            skipped.dir.display(),
            skipped.error
        ));
    }
    Ok((config, manager))
}
