//! SDK family overview command

use anyhow::Result;
use camino::Utf8Path;
use crossdev_sdk::NoSessions;
use serde::Serialize;
use std::sync::Arc;

use super::common::load_manager;
use crate::cli::FamiliesArgs;
use crate::output;

#[derive(Serialize)]
struct FamilyInfo {
    name: String,
    description: String,
    root_dir: String,
    scripts_dir: String,
    env_setup_file: String,
    catalog: String,
    sdks: usize,
    installed: usize,
}

pub async fn run(args: FamiliesArgs, config: Option<&Utf8Path>) -> Result<()> {
    let (config, manager) = load_manager(config, Arc::new(NoSessions)).await?;
    let sdks = manager.list();

    let families: Vec<FamilyInfo> = manager
        .families()
        .iter()
        .map(|family| {
            let own = sdks
                .iter()
                .filter(|s| s.family_conf.family_name == family.name());
            FamilyInfo {
                name: family.name().to_string(),
                description: family.config.description.clone(),
                root_dir: family.config.root_dir.clone(),
                scripts_dir: family.config.scripts_dir.clone(),
                env_setup_file: family.config.env_setup_file.clone(),
                catalog: config
                    .catalog_url(family.name())
                    .unwrap_or_else(|| format!("{} script", crossdev_sdk::ScriptRole::List)),
                sdks: own.clone().count(),
                installed: own.filter(|s| s.is_installed()).count(),
            }
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&families)?);
        return Ok(());
    }

    if families.is_empty() {
        output::warning(&format!(
            "No SDK families found in {}",
            config.scripts_dir().display()
        ));
        return Ok(());
    }

    for family in &families {
        output::header(&family.name);
        if !family.description.is_empty() {
            output::kv("Description", &family.description);
        }
        output::kv("Root", &family.root_dir);
        output::kv("Scripts", &family.scripts_dir);
        output::kv("Setup file", &family.env_setup_file);
        output::kv("Catalog", &family.catalog);
        output::kv(
            "SDKs",
            &format!("{} ({} installed)", family.sdks, family.installed),
        );
    }
    Ok(())
}
