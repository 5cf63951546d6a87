use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{ProcessingConfig, WordBoundaryMode};
use crate::models::{Note, TextPosition};
use crate::zones::{ExclusionZone, span_is_excluded};

/// Confidence assigned to literal title/alias matches. Semantic candidates,
/// when merged by a caller, carry their own scores.
pub const EXACT_MATCH_CONFIDENCE: f64 = 1.0;

/// Read-only note registry keyed by file id. Ordered so candidate discovery
/// is deterministic regardless of load order.
pub type NoteRegistry<'a> = BTreeMap<String, &'a Note>;

#[must_use]
pub fn build_registry(notes: &[Note]) -> NoteRegistry<'_> {
    notes
        .iter()
        .filter_map(|note| note.file_id.clone().map(|id| (id, note)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkCandidate {
    pub text: String,
    pub target_file_id: String,
    /// Set when the matched surface text differs from the canonical title,
    /// so the rewritten link keeps the original wording behind a pipe.
    pub suggested_alias: Option<String>,
    pub position: TextPosition,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct CandidateOptions {
    /// Titles/aliases with fewer characters than this are ignored.
    pub min_match_len: usize,
    pub word_boundaries: WordBoundaryMode,
}

impl Default for CandidateOptions {
    fn default() -> Self {
        Self {
            min_match_len: 3,
            word_boundaries: WordBoundaryMode::Strict,
        }
    }
}

impl From<&ProcessingConfig> for CandidateOptions {
    fn from(config: &ProcessingConfig) -> Self {
        Self {
            min_match_len: config.min_match_len,
            word_boundaries: config.word_boundaries,
        }
    }
}

/// Finds every substring of `content` that could become a wiki link to a
/// registered note. Occurrences inside exclusion zones are dropped, as are
/// self-references from `current_file_id`. Output order is deterministic:
/// by position, longer match first.
#[must_use]
pub fn find_link_candidates(
    content: &str,
    registry: &NoteRegistry<'_>,
    zones: &[ExclusionZone],
    current_file_id: Option<&str>,
    options: &CandidateOptions,
) -> Vec<LinkCandidate> {
    let mut candidates = Vec::new();

    for (file_id, note) in registry {
        if current_file_id == Some(file_id.as_str()) {
            continue;
        }
        for needle in note.searchable_strings() {
            if needle.chars().count() < options.min_match_len {
                continue;
            }
            collect_matches(
                content,
                needle,
                file_id,
                note,
                zones,
                options.word_boundaries,
                &mut candidates,
            );
        }
    }

    candidates.sort_by(|a, b| {
        (a.position.line_number, a.position.column_start)
            .cmp(&(b.position.line_number, b.position.column_start))
            .then(b.text.len().cmp(&a.text.len()))
            .then(a.target_file_id.cmp(&b.target_file_id))
    });
    candidates
}

fn collect_matches(
    content: &str,
    needle: &str,
    file_id: &str,
    note: &Note,
    zones: &[ExclusionZone],
    boundaries: WordBoundaryMode,
    out: &mut Vec<LinkCandidate>,
) {
    for (idx, line) in content.split('\n').enumerate() {
        let line_number = idx + 1;
        let mut cursor = 0;
        while cursor < line.len() {
            let Some((start, matched_len)) = next_match(line, cursor, needle) else {
                break;
            };
            let end = start + matched_len;
            cursor = end;

            if !has_word_boundaries(line, start, end, needle, boundaries) {
                continue;
            }
            let position = TextPosition::new(line_number, start, end);
            if span_is_excluded(&position, zones) {
                continue;
            }

            let surface = &line[start..end];
            out.push(LinkCandidate {
                text: surface.to_string(),
                target_file_id: file_id.to_string(),
                suggested_alias: suggest_alias(surface, note),
                position,
                confidence: EXACT_MATCH_CONFIDENCE,
            });
        }
    }
}

/// First case-insensitive occurrence of `needle` in `line` at or after
/// `from`. Returns the match start and its byte length in `line`.
fn next_match(line: &str, from: usize, needle: &str) -> Option<(usize, usize)> {
    let mut start = from;
    while start < line.len() {
        if !line.is_char_boundary(start) {
            start += 1;
            continue;
        }
        if let Some(len) = match_len_ignore_case(&line[start..], needle) {
            return Some((start, len));
        }
        start += 1;
    }
    None
}

/// Byte length of a case-insensitive prefix match of `needle` in `hay`,
/// character by character.
fn match_len_ignore_case(hay: &str, needle: &str) -> Option<usize> {
    let mut len = 0;
    let mut hay_chars = hay.chars();
    for needle_char in needle.chars() {
        let hay_char = hay_chars.next()?;
        if !hay_char.to_lowercase().eq(needle_char.to_lowercase()) {
            return None;
        }
        len += hay_char.len_utf8();
    }
    Some(len)
}

/// Word-boundary test for a match span. A boundary is only demanded on a
/// side where the needle itself ends in a word character, mirroring `\b`.
fn has_word_boundaries(
    line: &str,
    start: usize,
    end: usize,
    needle: &str,
    mode: WordBoundaryMode,
) -> bool {
    let needle_first = needle.chars().next();
    let needle_last = needle.chars().next_back();

    if needle_first.is_some_and(|c| is_word_char(c, mode)) {
        let prev = line[..start].chars().next_back();
        if prev.is_some_and(|c| is_word_char(c, mode)) {
            return false;
        }
    }
    if needle_last.is_some_and(|c| is_word_char(c, mode)) {
        let next = line[end..].chars().next();
        if next.is_some_and(|c| is_word_char(c, mode)) {
            return false;
        }
    }
    true
}

fn is_word_char(c: char, mode: WordBoundaryMode) -> bool {
    if !c.is_alphanumeric() {
        return false;
    }
    match mode {
        WordBoundaryMode::Strict => true,
        WordBoundaryMode::RelaxCjk => !is_cjk(c),
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{309F}'      // hiragana
        | '\u{30A0}'..='\u{30FF}'    // katakana
        | '\u{3400}'..='\u{4DBF}'    // CJK extension A
        | '\u{4E00}'..='\u{9FFF}'    // CJK unified ideographs
        | '\u{AC00}'..='\u{D7AF}' // hangul syllables
    )
}

/// No alias when the surface text already is the canonical title (ignoring
/// case); otherwise the surface text itself becomes the alias so casing and
/// wording survive the rewrite.
fn suggest_alias(surface: &str, note: &Note) -> Option<String> {
    if let Some(title) = &note.frontmatter.title
        && title.to_lowercase() == surface.to_lowercase()
    {
        return None;
    }
    Some(surface.to_string())
}
