//! SDK remove command

use anyhow::Result;
use camino::Utf8Path;
use crossdev_sdk::NoSessions;
use std::sync::Arc;

use super::common::load_manager;
use crate::cli::RemoveArgs;
use crate::output;

pub async fn run(args: RemoveArgs, config: Option<&Utf8Path>) -> Result<()> {
    let (_, manager) = load_manager(config, Arc::new(NoSessions)).await?;
    let sdk = manager.resolve(&args.id)?;
    let record = sdk.get();

    let spinner = output::spinner(&format!("Removing {} from {}", record.name, record.path));
    let result = sdk.remove().await;
    spinner.finish_and_clear();
    result?;

    output::success(&format!("SDK {} removed", record.name));
    Ok(())
}
