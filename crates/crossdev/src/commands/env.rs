//! SDK environment command

use anyhow::{bail, Result};
use camino::Utf8Path;
use crossdev_sdk::NoSessions;
use std::sync::Arc;

use super::common::load_manager;
use crate::cli::EnvArgs;

pub async fn run(args: EnvArgs, config: Option<&Utf8Path>) -> Result<()> {
    let (_, manager) = load_manager(config, Arc::new(NoSessions)).await?;
    let sdk = manager.get(&args.id)?;
    if !sdk.is_installed() {
        bail!("SDK {} is not installed", sdk.name);
    }

    println!("{}", manager.env_command(&sdk.id)?.join(" "));
    Ok(())
}
