use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod args;

pub use args::{AnalyzeArgs, AutoLinkArgs, DeadLinksArgs};

#[derive(Debug, Parser)]
#[command(name = "vaultorg")]
#[command(about = "Link analysis and auto-linking for markdown vaults", version)]
pub struct Cli {
    /// Vault root directory.
    #[arg(long, default_value = ".")]
    pub vault: PathBuf,

    /// Processing configuration file (YAML). Missing file means defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Emit machine-readable JSON instead of a console summary.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Turn unlinked mentions of note titles and aliases into wikilinks.
    AutoLink(AutoLinkArgs),
    /// Report links whose targets do not resolve within the vault.
    DeadLinks(DeadLinksArgs),
    /// Link density metrics for the vault or a single note.
    Analyze(AnalyzeArgs),
}
