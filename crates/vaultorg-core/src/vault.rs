use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;
use crate::error::{Result, VaultError};
use crate::models::Note;
use crate::note::parse_note;
use crate::zones::frontmatter_zone;

/// A markdown file the scan could not load. The scan keeps going; callers
/// decide whether skipped files are worth reporting.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct VaultScan {
    pub notes: Vec<Note>,
    pub skipped: Vec<SkippedFile>,
}

/// Filesystem access for one vault root. All reads and writes stay within
/// the root; paths are matched against the configured include and exclude
/// globs relative to it.
#[derive(Debug, Clone)]
pub struct VaultRepository {
    root: PathBuf,
    config: ProcessingConfig,
}

impl VaultRepository {
    pub fn new(root: impl Into<PathBuf>, config: ProcessingConfig) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(VaultError::InvalidVaultRoot(root.display().to_string()));
        }
        Ok(Self { root, config })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Walks the vault and parses every file matching the include globs.
    /// Unreadable files are recorded as skipped, never fatal. Notes come
    /// back sorted by path so repeated scans are comparable.
    pub fn load_vault(&self) -> Result<VaultScan> {
        let include = build_globset(&self.config.include_patterns)?;
        let exclude = build_globset(&self.config.exclude_patterns)?;

        let mut scan = VaultScan::default();
        for item in WalkDir::new(&self.root).follow_links(false) {
            let item = match item {
                Ok(item) => item,
                Err(err) => {
                    let path = err.path().map_or_else(PathBuf::new, Path::to_path_buf);
                    scan.skipped.push(SkippedFile {
                        path,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            if !item.file_type().is_file() {
                continue;
            }
            let rel = item
                .path()
                .strip_prefix(&self.root)
                .map_err(|e| VaultError::Internal(e.to_string()))?;
            if !include.is_match(rel) || exclude.is_match(rel) {
                continue;
            }
            match fs::read_to_string(item.path()) {
                Ok(content) => scan.notes.push(parse_note(item.path().to_path_buf(), &content)),
                Err(err) => scan.skipped.push(SkippedFile {
                    path: item.path().to_path_buf(),
                    reason: err.to_string(),
                }),
            }
        }
        scan.notes.sort_by(|a, b| a.path.cmp(&b.path));
        scan.skipped.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(scan)
    }

    pub fn load_file(&self, path: &Path) -> Result<Note> {
        let path = self.resolve(path)?;
        if !path.is_file() {
            return Err(VaultError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(&path)?;
        Ok(parse_note(path, &content))
    }

    /// Replaces a note's content on disk. When backups are enabled a
    /// timestamped copy of the previous content is written next to the
    /// file first, then the new content lands via temp file and rename so
    /// a crash never leaves a half-written note.
    pub fn save_content(&self, path: &Path, content: &str) -> Result<()> {
        let path = self.resolve(path)?;
        if !path.is_file() {
            return Err(VaultError::NotFound(path.display().to_string()));
        }
        if self.config.backup_enabled {
            self.write_backup(&path)?;
        }
        write_atomic(&path, content)
    }

    /// Adds aliases to a note's frontmatter, creating the `aliases:` list
    /// (or the frontmatter block itself) when missing. Aliases already
    /// present are not added again. Returns how many were appended.
    pub fn append_aliases(&self, path: &Path, aliases: &[String]) -> Result<usize> {
        let note = self.load_file(path)?;
        let existing_lower: Vec<String> = note
            .frontmatter
            .aliases
            .iter()
            .map(|a| a.to_lowercase())
            .collect();
        let mut fresh: Vec<&String> = Vec::new();
        for alias in aliases {
            if alias.trim().is_empty() || existing_lower.contains(&alias.to_lowercase()) {
                continue;
            }
            if !fresh.iter().any(|f| f.to_lowercase() == alias.to_lowercase()) {
                fresh.push(alias);
            }
        }
        if fresh.is_empty() {
            return Ok(0);
        }

        let updated = splice_aliases(&note.content, &fresh);
        let appended = fresh.len();
        self.save_content(path, &updated)?;
        Ok(appended)
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        if !path.starts_with(&self.root) {
            return Err(VaultError::Validation(format!(
                "path is outside vault root: {}",
                path.display()
            )));
        }
        Ok(path)
    }

    fn write_backup(&self, path: &Path) -> Result<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| VaultError::Validation(format!("invalid filename: {}", path.display())))?;
        let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
        let backup_path = path.with_file_name(format!("{file_name}.{stamp}.bak"));
        fs::copy(path, backup_path)?;
        Ok(())
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).map_err(|e| VaultError::Validation(e.to_string()))?);
    }
    builder
        .build()
        .map_err(|e| VaultError::Validation(e.to_string()))
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| VaultError::Validation(format!("target has no parent: {}", path.display())))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| VaultError::Validation(format!("invalid filename: {}", path.display())))?;
    let tmp_name = format!(".{file_name}.vaultorg.tmp.{}", uuid::Uuid::new_v4().simple());
    let tmp_path = parent.join(tmp_name);

    {
        let mut tmp = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&tmp_path)?;
        tmp.write_all(content.as_bytes())?;
        tmp.sync_all()?;
    }

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(VaultError::from(err));
    }

    if let Ok(dir) = fs::File::open(parent) {
        let _ = dir.sync_all();
    }
    Ok(())
}

/// Inserts aliases into the frontmatter text without disturbing any other
/// line. Handles block lists, inline flow lists, and notes with no
/// frontmatter at all.
fn splice_aliases(content: &str, fresh: &[&String]) -> String {
    let Some(zone) = frontmatter_zone(content) else {
        let mut block = String::from("---\naliases:\n");
        for alias in fresh {
            block.push_str(&format!("  - {}\n", quote_if_needed(alias)));
        }
        block.push_str("---\n");
        block.push_str(content);
        return block;
    };

    let lines: Vec<&str> = content.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len() + fresh.len());
    let mut inserted = false;

    let mut idx = 0;
    while idx < lines.len() {
        let line = lines[idx];
        let line_number = idx + 1;
        let in_frontmatter = line_number > zone.start_line && line_number < zone.end_line;

        if in_frontmatter && !inserted && is_aliases_key(line) {
            if let Some(flow) = inline_flow_items(line) {
                // `aliases: [a, b]` stays a one-line flow list.
                let mut items = flow;
                items.extend(fresh.iter().map(|a| quote_if_needed(a)));
                out.push(format!("aliases: [{}]", items.join(", ")));
                idx += 1;
            } else {
                out.push(line.to_string());
                idx += 1;
                // Copy existing block entries, then append after the last.
                while idx < lines.len()
                    && idx + 1 < zone.end_line
                    && lines[idx].trim_start().starts_with('-')
                {
                    out.push(lines[idx].to_string());
                    idx += 1;
                }
                for alias in fresh {
                    out.push(format!("  - {}", quote_if_needed(alias)));
                }
            }
            inserted = true;
            continue;
        }

        if line_number == zone.end_line && !inserted {
            out.push("aliases:".to_string());
            for alias in fresh {
                out.push(format!("  - {}", quote_if_needed(alias)));
            }
            inserted = true;
        }
        out.push(line.to_string());
        idx += 1;
    }
    out.join("\n")
}

fn is_aliases_key(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed == "aliases:" || trimmed.starts_with("aliases:")
}

/// Items of an inline `aliases: [a, b]` list, or `None` for block form.
fn inline_flow_items(line: &str) -> Option<Vec<String>> {
    let rest = line.trim_start().strip_prefix("aliases:")?.trim();
    let inner = rest.strip_prefix('[')?.strip_suffix(']')?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    Some(
        inner
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
    )
}

fn quote_if_needed(alias: &str) -> String {
    let needs_quotes = alias
        .chars()
        .any(|c| matches!(c, ':' | '#' | '[' | ']' | '{' | '}' | ',' | '&' | '*' | '\''))
        || alias.starts_with(['"', '@', '`', '-'])
        || alias.trim() != alias;
    if needs_quotes {
        format!("\"{}\"", alias.replace('"', "\\\""))
    } else {
        alias.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_note(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).expect("write note");
        path
    }

    fn repo(dir: &TempDir) -> VaultRepository {
        VaultRepository::new(dir.path(), ProcessingConfig::default()).expect("repo")
    }

    #[test]
    fn rejects_missing_vault_root() {
        let err = VaultRepository::new("/nonexistent/vault", ProcessingConfig::default())
            .expect_err("missing root");
        assert_eq!(err.code(), "INVALID_VAULT_ROOT");
    }

    #[test]
    fn load_vault_honors_include_and_exclude_globs() {
        let dir = TempDir::new().expect("tempdir");
        write_note(&dir, "a.md", "# A\n");
        write_note(&dir, "notes.txt", "not markdown\n");
        fs::create_dir_all(dir.path().join(".obsidian")).expect("mkdir");
        fs::write(dir.path().join(".obsidian/workspace.md"), "# hidden\n").expect("write");

        let scan = repo(&dir).load_vault().expect("scan");
        assert_eq!(scan.notes.len(), 1);
        assert!(scan.notes[0].path.ends_with("a.md"));
        assert!(scan.skipped.is_empty());
    }

    #[test]
    fn load_vault_returns_notes_sorted_by_path() {
        let dir = TempDir::new().expect("tempdir");
        write_note(&dir, "c.md", "# C\n");
        write_note(&dir, "a.md", "# A\n");
        write_note(&dir, "b.md", "# B\n");

        let scan = repo(&dir).load_vault().expect("scan");
        let names: Vec<_> = scan
            .notes
            .iter()
            .filter_map(|n| n.path.file_name())
            .collect();
        assert_eq!(names, vec!["a.md", "b.md", "c.md"]);
    }

    #[test]
    fn save_content_writes_backup_then_replaces() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_note(&dir, "note.md", "old content\n");

        repo(&dir).save_content(&path, "new content\n").expect("save");

        assert_eq!(fs::read_to_string(&path).expect("read"), "new content\n");
        let backups: Vec<_> = fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".bak"))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(
            fs::read_to_string(backups[0].path()).expect("read backup"),
            "old content\n"
        );
    }

    #[test]
    fn save_content_without_backup_when_disabled() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_note(&dir, "note.md", "old\n");
        let config = ProcessingConfig {
            backup_enabled: false,
            ..ProcessingConfig::default()
        };
        let repo = VaultRepository::new(dir.path(), config).expect("repo");

        repo.save_content(&path, "new\n").expect("save");
        let backups = fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".bak"))
            .count();
        assert_eq!(backups, 0);
    }

    #[test]
    fn append_aliases_extends_block_list() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_note(
            &dir,
            "note.md",
            "---\ntitle: T\naliases:\n  - First\n---\nBody\n",
        );

        let added = repo(&dir)
            .append_aliases(&path, &["Second".to_string(), "First".to_string()])
            .expect("append");
        assert_eq!(added, 1);

        let content = fs::read_to_string(&path).expect("read");
        assert!(content.contains("  - First\n  - Second\n"));
        assert!(content.ends_with("---\nBody\n"));
    }

    #[test]
    fn append_aliases_extends_inline_flow_list() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_note(&dir, "note.md", "---\naliases: [One]\n---\nBody\n");

        let added = repo(&dir)
            .append_aliases(&path, &["Two".to_string()])
            .expect("append");
        assert_eq!(added, 1);
        let content = fs::read_to_string(&path).expect("read");
        assert!(content.contains("aliases: [One, Two]"));
    }

    #[test]
    fn append_aliases_creates_key_when_absent() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_note(&dir, "note.md", "---\ntitle: T\n---\nBody\n");

        repo(&dir)
            .append_aliases(&path, &["New Alias".to_string()])
            .expect("append");
        let content = fs::read_to_string(&path).expect("read");
        assert!(content.contains("title: T\naliases:\n  - New Alias\n---"));
    }

    #[test]
    fn append_aliases_is_case_insensitive_about_duplicates() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_note(&dir, "note.md", "---\naliases: [EC2]\n---\n");

        let added = repo(&dir)
            .append_aliases(&path, &["ec2".to_string()])
            .expect("append");
        assert_eq!(added, 0);
        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            "---\naliases: [EC2]\n---\n"
        );
    }
}
