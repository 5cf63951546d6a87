use std::path::PathBuf;

use clap::Args;

#[derive(Debug, Args)]
pub struct AutoLinkArgs {
    /// Write changes to disk. Without this flag the pass is a dry run.
    #[arg(long, default_value_t = false)]
    pub apply: bool,

    /// Limit the rewrite to these files (relative to the vault root).
    #[arg(long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// Maximum wikilinks added per file.
    #[arg(long)]
    pub max_links: Option<usize>,

    /// Skip the timestamped backup written before each modified file.
    #[arg(long, default_value_t = false)]
    pub no_backup: bool,

    /// Treat markdown table rows as excluded content.
    #[arg(long, default_value_t = false)]
    pub exclude_tables: bool,
}

#[derive(Debug, Args)]
pub struct DeadLinksArgs {
    /// Treat markdown table rows as excluded content.
    #[arg(long, default_value_t = false)]
    pub exclude_tables: bool,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Analyze a single note instead of the whole vault.
    pub file: Option<PathBuf>,
}
