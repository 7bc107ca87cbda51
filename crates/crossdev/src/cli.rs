//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// crossdev - Manage cross-compilation SDKs
#[derive(Parser, Debug)]
#[command(name = "crossdev")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to crossdev.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List known SDKs
    List(ListArgs),

    /// Show loaded SDK families
    Families(FamiliesArgs),

    /// Install an SDK
    Install(InstallArgs),

    /// Remove an installed SDK
    Remove(RemoveArgs),

    /// Print the command initialising a shell for an SDK
    Env(EnvArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show installed SDKs
    #[arg(long)]
    pub installed: bool,

    /// Only show SDKs of this family
    #[arg(short, long)]
    pub family: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct FamiliesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// SDK id or unique id prefix
    pub id: String,

    /// Install from a local SDK installer file
    #[arg(long, conflicts_with = "url")]
    pub file: Option<Utf8PathBuf>,

    /// Download the SDK installer from this URL instead of the catalog URL
    #[arg(long)]
    pub url: Option<String>,

    /// Overwrite an existing installation
    #[arg(short, long)]
    pub force: bool,

    /// Abort the install after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// SDK id or unique id prefix
    pub id: String,
}

#[derive(Args, Debug)]
pub struct EnvArgs {
    /// SDK id or unique id prefix
    pub id: String,
}
