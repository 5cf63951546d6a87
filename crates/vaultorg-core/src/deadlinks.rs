use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::candidates::NoteRegistry;
use crate::models::{Note, TextPosition};
use crate::zones::{ExclusionZone, ZoneType, span_is_excluded};

const MAX_SUGGESTED_FIXES: usize = 3;
const SUGGESTION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadLinkType {
    Wikilink,
    RegularLink,
    LinkRefDef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLink {
    pub source_file: String,
    pub link_text: String,
    pub link_type: DeadLinkType,
    pub line_number: usize,
    pub target: String,
    /// Near-miss registry entries, best first, empty when nothing clears
    /// the similarity threshold.
    pub suggested_fixes: Vec<String>,
}

/// Classifies the links already present in `note` against the registry.
/// Links inside structural exclusion zones (code blocks, templates, inline
/// code) are never classified; a Templater snippet is not a dead link.
#[must_use]
pub fn detect_dead_links(
    note: &Note,
    registry: &NoteRegistry<'_>,
    zones: &[ExclusionZone],
) -> Vec<DeadLink> {
    let source_file = note.path.display().to_string();
    let mut dead_links = Vec::new();

    for wiki_link in &note.wiki_links {
        if in_structural_zone(&wiki_link.position, zones) {
            continue;
        }
        if !registry.contains_key(&wiki_link.target_id) {
            dead_links.push(DeadLink {
                source_file: source_file.clone(),
                link_text: wiki_link.to_string(),
                link_type: DeadLinkType::Wikilink,
                line_number: wiki_link.position.line_number,
                target: wiki_link.target_id.clone(),
                suggested_fixes: suggest_fixes(&wiki_link.target_id, registry),
            });
        }
    }

    for regular_link in &note.regular_links {
        if in_structural_zone(&regular_link.position, zones) {
            continue;
        }
        if let Some(target) = dead_regular_target(&regular_link.url, registry) {
            dead_links.push(DeadLink {
                source_file: source_file.clone(),
                link_text: format!("[{}]({})", regular_link.text, regular_link.url),
                link_type: DeadLinkType::RegularLink,
                line_number: regular_link.position.line_number,
                suggested_fixes: suggest_fixes(&target, registry),
                target,
            });
        }
    }

    for link_ref in &note.link_ref_defs {
        if in_structural_zone(&link_ref.position, zones) {
            continue;
        }
        let resolved = resolve_internal_target(&link_ref.path);
        if resolved.as_deref().is_none_or(|id| !registry.contains_key(id)) {
            dead_links.push(DeadLink {
                source_file: source_file.clone(),
                link_text: format!("[{}|{}]: {}", link_ref.id, link_ref.alias, link_ref.path),
                link_type: DeadLinkType::LinkRefDef,
                line_number: link_ref.position.line_number,
                target: link_ref.path.clone(),
                suggested_fixes: suggest_fixes(&link_ref.path, registry),
            });
        }
    }

    dead_links
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLinkReport {
    pub vault_path: String,
    pub total_files_scanned: usize,
    pub files_with_dead_links: usize,
    pub total_dead_links: usize,
    pub dead_links_by_type: BTreeMap<String, usize>,
    pub dead_links: Vec<DeadLink>,
}

#[must_use]
pub fn build_report(vault_path: &str, notes_scanned: usize, dead_links: Vec<DeadLink>) -> DeadLinkReport {
    let mut by_type = BTreeMap::new();
    for dead_link in &dead_links {
        let key = match dead_link.link_type {
            DeadLinkType::Wikilink => "wikilink",
            DeadLinkType::RegularLink => "regular_link",
            DeadLinkType::LinkRefDef => "link_ref_def",
        };
        *by_type.entry(key.to_string()).or_insert(0) += 1;
    }
    let files_with_dead_links = {
        let mut files: Vec<&str> = dead_links.iter().map(|d| d.source_file.as_str()).collect();
        files.sort_unstable();
        files.dedup();
        files.len()
    };

    DeadLinkReport {
        vault_path: vault_path.to_string(),
        total_files_scanned: notes_scanned,
        files_with_dead_links,
        total_dead_links: dead_links.len(),
        dead_links_by_type: by_type,
        dead_links,
    }
}

/// Structural zones hide links from classification; link zones themselves
/// do not (they are what we classify).
fn in_structural_zone(position: &TextPosition, zones: &[ExclusionZone]) -> bool {
    let structural: Vec<ExclusionZone> = zones
        .iter()
        .filter(|z| {
            matches!(
                z.zone_type,
                ZoneType::CodeBlock | ZoneType::InlineCode | ZoneType::Template
            )
        })
        .cloned()
        .collect();
    span_is_excluded(position, &structural)
}

/// Returns the unresolvable target of a regular link, or `None` when the
/// link is fine or outside this engine's responsibility. External
/// `http(s)` URLs are never flagged; web liveness is out of scope.
fn dead_regular_target(url: &str, registry: &NoteRegistry<'_>) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Some(String::new());
    }
    if trimmed.contains("://") {
        return None;
    }
    if let Some(fragment) = trimmed.strip_prefix('#') {
        return fragment.is_empty().then(|| trimmed.to_string());
    }
    let id = resolve_internal_target(trimmed)?;
    if looks_like_note_id(&id) && !registry.contains_key(id.as_str()) {
        return Some(trimmed.to_string());
    }
    None
}

/// File stem of an internal path, extension stripped: `notes/ec2.md` -> `ec2`.
fn resolve_internal_target(path: &str) -> Option<String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return None;
    }
    let base = trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed);
    let base = base.split('#').next().unwrap_or(base);
    let stem = base.strip_suffix(".md").unwrap_or(base);
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

fn looks_like_note_id(value: &str) -> bool {
    value.len() == crate::models::NOTE_ID_LENGTH && value.bytes().all(|b| b.is_ascii_digit())
}

/// Ranks registry ids and titles by normalized edit-distance similarity to
/// the dead target. Deterministic: score descending, then lexicographic.
fn suggest_fixes(target: &str, registry: &NoteRegistry<'_>) -> Vec<String> {
    let needle = target.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(f64, String)> = Vec::new();
    for (id, note) in registry {
        let mut best = similarity(&needle, &id.to_lowercase());
        let mut label = id.clone();
        if let Some(title) = &note.frontmatter.title {
            let title_score = similarity(&needle, &title.to_lowercase());
            if title_score > best {
                best = title_score;
                label = format!("{id} ({title})");
            }
        }
        if best >= SUGGESTION_THRESHOLD {
            scored.push((best, label));
        }
    }

    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    scored
        .into_iter()
        .take(MAX_SUGGESTED_FIXES)
        .map(|(_, label)| label)
        .collect()
}

fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    let distance = levenshtein(a, b);
    1.0 - (distance as f64 / longest as f64)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() {
        return b_chars.len();
    }

    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let substitution = previous[j] + usize::from(a_char != b_char);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b_chars.len()]
}
