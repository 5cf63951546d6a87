use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::candidates::{CandidateOptions, build_registry, find_link_candidates};
use crate::config::ProcessingConfig;
use crate::conflicts::select_candidates;
use crate::deadlinks::{DeadLinkReport, build_report, detect_dead_links};
use crate::error::Result;
use crate::models::Note;
use crate::rewrite::{AppliedReplacement, apply_link_replacements};
use crate::vault::VaultRepository;
use crate::zones::{ZoneScanOptions, extract_exclusion_zones};

/// One auto-link pass over a vault (or a subset of its files).
#[derive(Debug, Clone)]
pub struct AutoLinkRequest {
    pub vault_path: PathBuf,
    /// Report what would change without touching any file. On by default.
    pub dry_run: bool,
    /// When non-empty, only these files (relative to the vault root or
    /// absolute) are rewritten. The whole vault still feeds the registry.
    pub target_files: Vec<PathBuf>,
    pub config: ProcessingConfig,
}

impl AutoLinkRequest {
    #[must_use]
    pub fn new(vault_path: impl Into<PathBuf>) -> Self {
        Self {
            vault_path: vault_path.into(),
            dry_run: true,
            target_files: Vec::new(),
            config: ProcessingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub path: String,
    pub links_added: usize,
    pub links_skipped: usize,
    pub conflicts_resolved: usize,
    pub replacements: Vec<AppliedReplacement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileError {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoLinkOutcome {
    pub vault_path: String,
    pub dry_run: bool,
    pub files_scanned: usize,
    pub files_modified: usize,
    pub links_added: usize,
    pub aliases_added: usize,
    /// Per-file results, only for files where something happened.
    pub files: Vec<FileOutcome>,
    /// Aliases appended to target notes' frontmatter (target id to new
    /// aliases), from links whose surface text was not yet an alias there.
    pub alias_updates: BTreeMap<String, Vec<String>>,
    pub errors: Vec<FileError>,
}

/// Scans the vault, finds unlinked references to known note titles and
/// aliases, and turns them into wikilinks. Linking `[[id|alias]]` also
/// records `alias` on the target note so the reference stays searchable
/// from both sides. A failing file is recorded and the pass continues.
pub fn auto_link_vault(request: &AutoLinkRequest) -> Result<AutoLinkOutcome> {
    let repo = VaultRepository::new(&request.vault_path, request.config.clone())?;
    let scan = repo.load_vault()?;
    let registry = build_registry(&scan.notes);

    let zone_options = ZoneScanOptions {
        exclude_tables: request.config.exclude_tables,
    };
    let candidate_options = CandidateOptions::from(&request.config);

    let mut outcome = AutoLinkOutcome {
        vault_path: request.vault_path.display().to_string(),
        dry_run: request.dry_run,
        files_scanned: 0,
        files_modified: 0,
        links_added: 0,
        aliases_added: 0,
        files: Vec::new(),
        alias_updates: BTreeMap::new(),
        errors: Vec::new(),
    };
    for skipped in &scan.skipped {
        outcome.errors.push(FileError {
            path: skipped.path.display().to_string(),
            error: skipped.reason.clone(),
        });
    }

    let mut pending_aliases: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for note in &scan.notes {
        if !is_target(note, &request.vault_path, &request.target_files) {
            continue;
        }
        outcome.files_scanned += 1;

        let zones = extract_exclusion_zones(&note.content, zone_options);
        let candidates = find_link_candidates(
            &note.content,
            &registry,
            &zones,
            note.file_id.as_deref(),
            &candidate_options,
        );
        let (selected, conflicts) = select_candidates(candidates);
        let result = apply_link_replacements(
            &note.content,
            selected,
            request.config.max_links_per_file,
        );
        if result.applied_replacements.is_empty() {
            continue;
        }

        if !request.dry_run
            && let Err(err) = repo.save_content(&note.path, &result.processed_content)
        {
            outcome.errors.push(FileError {
                path: note.path.display().to_string(),
                error: err.to_string(),
            });
            continue;
        }

        for replacement in &result.applied_replacements {
            if let Some(novel) = novel_alias(replacement, &registry) {
                let entry = pending_aliases
                    .entry(replacement.target_file_id.clone())
                    .or_default();
                if !entry
                    .iter()
                    .any(|a| a.eq_ignore_ascii_case(&novel))
                {
                    entry.push(novel);
                }
            }
        }

        outcome.files_modified += 1;
        outcome.links_added += result.applied_replacements.len();
        outcome.files.push(FileOutcome {
            path: note.path.display().to_string(),
            links_added: result.applied_replacements.len(),
            links_skipped: result.skipped_candidates.len(),
            conflicts_resolved: conflicts.len(),
            replacements: result.applied_replacements,
        });
    }

    for (target_id, aliases) in pending_aliases {
        let Some(target) = registry.get(target_id.as_str()) else {
            continue;
        };
        if request.dry_run {
            outcome.aliases_added += aliases.len();
            outcome.alias_updates.insert(target_id, aliases);
            continue;
        }
        match repo.append_aliases(&target.path, &aliases) {
            Ok(added) if added > 0 => {
                outcome.aliases_added += added;
                outcome.alias_updates.insert(target_id, aliases);
            }
            Ok(_) => {}
            Err(err) => outcome.errors.push(FileError {
                path: target.path.display().to_string(),
                error: err.to_string(),
            }),
        }
    }

    Ok(outcome)
}

/// Classifies every existing link in the vault against its registry.
pub fn detect_vault_dead_links(
    vault_path: &Path,
    config: &ProcessingConfig,
) -> Result<DeadLinkReport> {
    let repo = VaultRepository::new(vault_path, config.clone())?;
    let scan = repo.load_vault()?;
    let registry = build_registry(&scan.notes);
    let zone_options = ZoneScanOptions {
        exclude_tables: config.exclude_tables,
    };

    let mut dead_links = Vec::new();
    for note in &scan.notes {
        let zones = extract_exclusion_zones(&note.content, zone_options);
        dead_links.extend(detect_dead_links(note, &registry, &zones));
    }
    Ok(build_report(
        &vault_path.display().to_string(),
        scan.notes.len(),
        dead_links,
    ))
}

fn is_target(note: &Note, vault_path: &Path, target_files: &[PathBuf]) -> bool {
    if target_files.is_empty() {
        return true;
    }
    target_files.iter().any(|target| {
        let resolved = if target.is_absolute() {
            target.clone()
        } else {
            vault_path.join(target)
        };
        note.path == resolved
    })
}

/// The alias used in an aliased wikilink, when the target note does not
/// already know it as its title or one of its aliases (case-insensitive).
/// Plain `[[id]]` links never produce alias updates.
fn novel_alias(
    replacement: &AppliedReplacement,
    registry: &crate::candidates::NoteRegistry<'_>,
) -> Option<String> {
    let inner = replacement
        .replacement_text
        .strip_prefix("[[")?
        .strip_suffix("]]")?;
    let (_, alias) = inner.split_once('|')?;
    let alias = alias.trim();
    if alias.is_empty() {
        return None;
    }
    let target = registry.get(replacement.target_file_id.as_str())?;
    let known = target
        .searchable_strings()
        .any(|s| s.to_lowercase() == alias.to_lowercase());
    if known { None } else { Some(alias.to_string()) }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn write_note(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).expect("write note");
        path
    }

    fn target_note(dir: &TempDir) -> PathBuf {
        write_note(
            dir,
            "20230727234718.md",
            "---\ntitle: Amazon EC2\naliases: [EC2]\nid: '20230727234718'\n---\n\n# Amazon EC2\n",
        )
    }

    #[test]
    fn dry_run_reports_without_writing() {
        let dir = TempDir::new().expect("tempdir");
        target_note(&dir);
        let source = write_note(
            &dir,
            "20230727234800.md",
            "---\nid: '20230727234800'\n---\n\nWe use Amazon EC2 daily.\n",
        );
        let before = fs::read_to_string(&source).expect("read");

        let outcome = auto_link_vault(&AutoLinkRequest::new(dir.path())).expect("auto link");

        assert!(outcome.dry_run);
        assert_eq!(outcome.links_added, 1);
        assert_eq!(outcome.files_modified, 1);
        assert_eq!(fs::read_to_string(&source).expect("read"), before);
    }

    #[test]
    fn wet_run_rewrites_source_files() {
        let dir = TempDir::new().expect("tempdir");
        target_note(&dir);
        let source = write_note(
            &dir,
            "20230727234800.md",
            "---\nid: '20230727234800'\n---\n\nWe use Amazon EC2 daily.\n",
        );

        let mut request = AutoLinkRequest::new(dir.path());
        request.dry_run = false;
        let outcome = auto_link_vault(&request).expect("auto link");

        assert_eq!(outcome.links_added, 1);
        let after = fs::read_to_string(&source).expect("read");
        assert!(after.contains("[[20230727234718]] daily."));
    }

    #[test]
    fn linking_through_a_known_alias_adds_no_alias_update() {
        let dir = TempDir::new().expect("tempdir");
        let target = target_note(&dir);
        write_note(
            &dir,
            "20230727234800.md",
            "---\nid: '20230727234800'\ntitle: Ops\n---\n\nSpin up an EC2 instance.\n",
        );

        let mut request = AutoLinkRequest::new(dir.path());
        request.dry_run = false;
        let outcome = auto_link_vault(&request).expect("auto link");

        assert_eq!(outcome.links_added, 1);
        assert_eq!(outcome.aliases_added, 0);
        assert!(outcome.alias_updates.is_empty());
        let target_content = fs::read_to_string(&target).expect("read");
        assert!(target_content.contains("aliases: [EC2]"));
    }

    #[test]
    fn novel_alias_comes_only_from_aliased_markup() {
        let dir = TempDir::new().expect("tempdir");
        target_note(&dir);
        let repo = VaultRepository::new(dir.path(), ProcessingConfig::default()).expect("repo");
        let scan = repo.load_vault().expect("scan");
        let registry = build_registry(&scan.notes);

        let aliased = AppliedReplacement {
            original_text: "Elastic Compute".to_string(),
            replacement_text: "[[20230727234718|Elastic Compute]]".to_string(),
            position: crate::models::TextPosition::new(1, 0, 15),
            target_file_id: "20230727234718".to_string(),
        };
        assert_eq!(
            novel_alias(&aliased, &registry),
            Some("Elastic Compute".to_string())
        );

        let known = AppliedReplacement {
            replacement_text: "[[20230727234718|ec2]]".to_string(),
            original_text: "ec2".to_string(),
            ..aliased.clone()
        };
        assert_eq!(novel_alias(&known, &registry), None);

        let plain = AppliedReplacement {
            replacement_text: "[[20230727234718]]".to_string(),
            original_text: "Amazon EC2".to_string(),
            ..aliased
        };
        assert_eq!(novel_alias(&plain, &registry), None);
    }

    #[test]
    fn second_pass_is_idempotent() {
        let dir = TempDir::new().expect("tempdir");
        target_note(&dir);
        write_note(
            &dir,
            "20230727234800.md",
            "---\nid: '20230727234800'\n---\n\nWe use Amazon EC2 daily.\n",
        );

        let mut request = AutoLinkRequest::new(dir.path());
        request.dry_run = false;
        request.config.backup_enabled = false;
        let first = auto_link_vault(&request).expect("first pass");
        assert_eq!(first.links_added, 1);

        let second = auto_link_vault(&request).expect("second pass");
        assert_eq!(second.links_added, 0);
        assert_eq!(second.files_modified, 0);
    }

    #[test]
    fn target_files_limit_the_rewrite_scope() {
        let dir = TempDir::new().expect("tempdir");
        target_note(&dir);
        let a = write_note(
            &dir,
            "a.md",
            "---\ntitle: A\n---\n\nAmazon EC2 appears here.\n",
        );
        let b = write_note(
            &dir,
            "b.md",
            "---\ntitle: B\n---\n\nAmazon EC2 appears here too.\n",
        );

        let mut request = AutoLinkRequest::new(dir.path());
        request.dry_run = false;
        request.config.backup_enabled = false;
        request.target_files = vec![PathBuf::from("a.md")];
        let outcome = auto_link_vault(&request).expect("auto link");

        assert_eq!(outcome.files_scanned, 1);
        assert!(fs::read_to_string(&a).expect("read").contains("[[20230727234718]]"));
        assert!(!fs::read_to_string(&b).expect("read").contains("[["));
    }

    #[test]
    fn dead_link_report_spans_the_vault() {
        let dir = TempDir::new().expect("tempdir");
        target_note(&dir);
        write_note(
            &dir,
            "notes.md",
            "---\ntitle: Notes\n---\n\nGood [[20230727234718]] and bad [[20230727234999]].\n",
        );

        let report = detect_vault_dead_links(dir.path(), &ProcessingConfig::default())
            .expect("report");
        assert_eq!(report.total_files_scanned, 2);
        assert_eq!(report.total_dead_links, 1);
        assert_eq!(report.dead_links[0].target, "20230727234999");
    }
}
