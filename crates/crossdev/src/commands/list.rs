//! SDK list command

use anyhow::{Context, Result};
use camino::Utf8Path;
use crossdev_core::types::Sdk;
use crossdev_sdk::NoSessions;
use std::sync::Arc;
use tabled::{
    settings::{object::Columns, Modify, Style, Width},
    Table, Tabled,
};

use super::common::load_manager;
use crate::cli::ListArgs;
use crate::output;

#[derive(Tabled)]
struct SdkRow {
    id: String,
    name: String,
    family: String,
    version: String,
    arch: String,
    status: String,
    #[tabled(rename = "install date")]
    install_date: String,
    description: String,
}

impl From<&Sdk> for SdkRow {
    fn from(sdk: &Sdk) -> Self {
        Self {
            id: sdk.short_id().to_string(),
            name: sdk.name.clone(),
            family: sdk.family_conf.family_name.clone(),
            version: sdk.version.clone(),
            arch: sdk.arch.clone(),
            status: sdk.status.to_string(),
            install_date: if sdk.date.is_empty() {
                "-".to_string()
            } else {
                sdk.date.clone()
            },
            description: sdk.description.clone(),
        }
    }
}

fn select(sdks: Vec<Sdk>, args: &ListArgs) -> Vec<Sdk> {
    sdks.into_iter()
        .filter(|sdk| !args.installed || sdk.is_installed())
        .filter(|sdk| {
            args.family
                .as_ref()
                .map(|f| &sdk.family_conf.family_name == f)
                .unwrap_or(true)
        })
        .collect()
}

pub async fn run(args: ListArgs, config: Option<&Utf8Path>) -> Result<()> {
    let (_, manager) = load_manager(config, Arc::new(NoSessions)).await?;
    let sdks = select(manager.list(), &args);

    if args.json {
        let json = serde_json::to_string_pretty(&sdks).context("Failed to serialize SDKs to JSON")?;
        println!("{}", json);
    } else if sdks.is_empty() {
        output::warning("No SDKs found matching criteria");
    } else {
        let rows: Vec<SdkRow> = sdks.iter().map(SdkRow::from).collect();
        let mut table = Table::new(rows);
        table
            .with(Style::sharp())
            .with(Modify::new(Columns::new(7..8)).with(Width::wrap(50).keep_words(true)));
        println!("{}", table);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossdev_core::types::{SdkFamilyConfig, SdkStatus};

    fn sdk(family: &str, name: &str, status: SdkStatus) -> Sdk {
        Sdk {
            id: "0123456789abcdef".to_string(),
            name: name.to_string(),
            status,
            family_conf: SdkFamilyConfig {
                family_name: family.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn args(installed: bool, family: Option<&str>) -> ListArgs {
        ListArgs {
            installed,
            family: family.map(String::from),
            json: false,
        }
    }

    #[test]
    fn test_select_filters() {
        let sdks = vec![
            sdk("agl", "a", SdkStatus::Installed),
            sdk("agl", "b", SdkStatus::NotInstalled),
            sdk("poky", "c", SdkStatus::Installed),
        ];

        assert_eq!(select(sdks.clone(), &args(false, None)).len(), 3);
        assert_eq!(select(sdks.clone(), &args(true, None)).len(), 2);
        let agl = select(sdks, &args(true, Some("agl")));
        assert_eq!(agl.len(), 1);
        assert_eq!(agl[0].name, "a");
    }

    #[test]
    fn test_row_uses_short_id_and_placeholder_date() {
        let row = SdkRow::from(&sdk("agl", "a", SdkStatus::NotInstalled));
        assert_eq!(row.id, "01234567");
        assert_eq!(row.install_date, "-");
        assert_eq!(row.status, "Not Installed");
    }
}
