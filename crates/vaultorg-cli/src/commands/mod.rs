use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use vaultorg_core::analyze::link_density_metrics;
use vaultorg_core::models::LinkDensityMetrics;
use vaultorg_core::{
    AutoLinkOutcome, AutoLinkRequest, DeadLinkReport, ProcessingConfig, VaultRepository,
    auto_link_vault, detect_vault_dead_links,
};

use crate::cli::{AnalyzeArgs, AutoLinkArgs, Commands, DeadLinksArgs};

pub(crate) fn run(
    vault: &Path,
    config_path: Option<&Path>,
    json: bool,
    command: Commands,
) -> Result<()> {
    let config = match config_path {
        Some(path) => ProcessingConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ProcessingConfig::default(),
    };

    match command {
        Commands::AutoLink(args) => run_auto_link(vault, config, json, &args),
        Commands::DeadLinks(args) => run_dead_links(vault, config, json, &args),
        Commands::Analyze(args) => run_analyze(vault, config, json, &args),
    }
}

fn run_auto_link(
    vault: &Path,
    mut config: ProcessingConfig,
    json: bool,
    args: &AutoLinkArgs,
) -> Result<()> {
    if let Some(max_links) = args.max_links {
        config.max_links_per_file = max_links;
    }
    if args.no_backup {
        config.backup_enabled = false;
    }
    if args.exclude_tables {
        config.exclude_tables = true;
    }

    let mut request = AutoLinkRequest::new(vault);
    request.dry_run = !args.apply;
    request.target_files = args.files.clone();
    request.config = config;

    let outcome = auto_link_vault(&request).context("auto-link pass failed")?;
    if json {
        print_json(&outcome)
    } else {
        print_auto_link_summary(&outcome)
    }
}

fn print_auto_link_summary(outcome: &AutoLinkOutcome) -> Result<()> {
    let mut stdout = io::stdout().lock();
    let verb = if outcome.dry_run {
        "would add"
    } else {
        "added"
    };
    writeln!(
        stdout,
        "Scanned {} files, {} {} links in {} files",
        outcome.files_scanned, verb, outcome.links_added, outcome.files_modified
    )?;
    for file in &outcome.files {
        writeln!(
            stdout,
            "  {}: +{} links ({} skipped, {} conflicts resolved)",
            file.path, file.links_added, file.links_skipped, file.conflicts_resolved
        )?;
        for replacement in &file.replacements {
            writeln!(
                stdout,
                "    line {}: {} -> {}",
                replacement.position.line_number,
                replacement.original_text,
                replacement.replacement_text
            )?;
        }
    }
    if !outcome.alias_updates.is_empty() {
        writeln!(stdout, "Alias updates ({}):", outcome.aliases_added)?;
        for (target_id, aliases) in &outcome.alias_updates {
            writeln!(stdout, "  {}: {}", target_id, aliases.join(", "))?;
        }
    }
    for error in &outcome.errors {
        writeln!(stdout, "Skipped {}: {}", error.path, error.error)?;
    }
    if outcome.dry_run {
        writeln!(stdout, "Dry run, no files were written. Pass --apply to write.")?;
    }
    Ok(())
}

fn run_dead_links(
    vault: &Path,
    mut config: ProcessingConfig,
    json: bool,
    args: &DeadLinksArgs,
) -> Result<()> {
    if args.exclude_tables {
        config.exclude_tables = true;
    }
    let report = detect_vault_dead_links(vault, &config).context("dead-link scan failed")?;
    if json {
        print_json(&report)
    } else {
        print_dead_link_summary(&report)
    }
}

fn print_dead_link_summary(report: &DeadLinkReport) -> Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(
        stdout,
        "Scanned {} files, {} dead links in {} files",
        report.total_files_scanned, report.total_dead_links, report.files_with_dead_links
    )?;
    for (link_type, count) in &report.dead_links_by_type {
        writeln!(stdout, "  {link_type}: {count}")?;
    }
    for dead_link in &report.dead_links {
        writeln!(
            stdout,
            "  {}:{} {}",
            dead_link.source_file, dead_link.line_number, dead_link.link_text
        )?;
        if !dead_link.suggested_fixes.is_empty() {
            writeln!(stdout, "    did you mean: {}", dead_link.suggested_fixes.join(", "))?;
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct NoteAnalysis {
    path: String,
    #[serde(flatten)]
    metrics: LinkDensityMetrics,
}

#[derive(Debug, Serialize)]
struct VaultAnalysis {
    vault_path: String,
    total_notes: usize,
    total_links: usize,
    notes: Vec<NoteAnalysis>,
}

fn run_analyze(
    vault: &Path,
    config: ProcessingConfig,
    json: bool,
    args: &AnalyzeArgs,
) -> Result<()> {
    let repo = VaultRepository::new(vault, config).context("failed to open vault")?;

    if let Some(file) = &args.file {
        let note = repo
            .load_file(file)
            .with_context(|| format!("failed to load {}", file.display()))?;
        let analysis = NoteAnalysis {
            path: note.path.display().to_string(),
            metrics: link_density_metrics(&note),
        };
        return if json {
            print_json(&analysis)
        } else {
            print_note_analysis(&analysis)
        };
    }

    let scan = repo.load_vault().context("vault scan failed")?;
    let notes: Vec<NoteAnalysis> = scan
        .notes
        .iter()
        .map(|note| NoteAnalysis {
            path: note.path.display().to_string(),
            metrics: link_density_metrics(note),
        })
        .collect();
    let analysis = VaultAnalysis {
        vault_path: vault.display().to_string(),
        total_notes: notes.len(),
        total_links: notes.iter().map(|n| n.metrics.total_links).sum(),
        notes,
    };
    if json {
        print_json(&analysis)
    } else {
        print_vault_analysis(&analysis)
    }
}

fn print_note_analysis(analysis: &NoteAnalysis) -> Result<()> {
    let mut stdout = io::stdout().lock();
    write_note_line(&mut stdout, analysis)?;
    Ok(())
}

fn print_vault_analysis(analysis: &VaultAnalysis) -> Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(
        stdout,
        "{}: {} notes, {} links",
        analysis.vault_path, analysis.total_notes, analysis.total_links
    )?;
    for note in &analysis.notes {
        write_note_line(&mut stdout, note)?;
    }
    Ok(())
}

fn write_note_line(out: &mut impl Write, analysis: &NoteAnalysis) -> Result<()> {
    writeln!(
        out,
        "  {}: {} links / {} words ({:.1} per 100 words), {} unique targets",
        analysis.path,
        analysis.metrics.total_links,
        analysis.metrics.total_words,
        analysis.metrics.link_density,
        analysis.metrics.unique_targets
    )?;
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
