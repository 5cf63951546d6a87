use serde::{Deserialize, Serialize};

use crate::candidates::LinkCandidate;
use crate::models::TextPosition;

/// Audit record for one candidate turned into wiki-link markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedReplacement {
    pub original_text: String,
    pub replacement_text: String,
    pub position: TextPosition,
    pub target_file_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteResult {
    pub processed_content: String,
    pub applied_replacements: Vec<AppliedReplacement>,
    /// Candidates not applied: beyond the per-file cap, or whose span no
    /// longer holds the expected text.
    pub skipped_candidates: Vec<LinkCandidate>,
}

#[must_use]
pub fn wikilink_markup(candidate: &LinkCandidate) -> String {
    match &candidate.suggested_alias {
        Some(alias) => format!("[[{}|{}]]", candidate.target_file_id, alias),
        None => format!("[[{}]]", candidate.target_file_id),
    }
}

/// Applies conflict-resolved candidates to `content` as positional
/// replacements. Candidates are capped at `max_links_per_file` in document
/// order; within a line, splices run right-to-left so earlier column offsets
/// stay valid. Bytes outside the replaced spans are preserved exactly.
#[must_use]
pub fn apply_link_replacements(
    content: &str,
    candidates: Vec<LinkCandidate>,
    max_links_per_file: usize,
) -> RewriteResult {
    let mut ordered = candidates;
    ordered.sort_by_key(|c| (c.position.line_number, c.position.column_start));

    let mut skipped_candidates = if ordered.len() > max_links_per_file {
        ordered.split_off(max_links_per_file)
    } else {
        Vec::new()
    };

    let mut lines: Vec<&str> = content.split('\n').collect();
    let mut patched: Vec<(usize, String)> = Vec::new();
    let mut applied_replacements = Vec::new();

    // Right-to-left within each line: iterate the capped set in reverse
    // document order so byte offsets computed on the original line survive
    // earlier (leftward) splices.
    for candidate in ordered.into_iter().rev() {
        let line_idx = candidate.position.line_number - 1;
        let Some(line) = lines.get(line_idx) else {
            skipped_candidates.push(candidate);
            continue;
        };
        let current = patched
            .iter()
            .find(|(idx, _)| *idx == line_idx)
            .map_or(*line, |(_, text)| text.as_str());

        let start = candidate.position.column_start;
        let end = candidate.position.column_end;
        if end > current.len() || current.get(start..end) != Some(candidate.text.as_str()) {
            skipped_candidates.push(candidate);
            continue;
        }

        let replacement_text = wikilink_markup(&candidate);
        let mut rewritten = String::with_capacity(current.len() + replacement_text.len());
        rewritten.push_str(&current[..start]);
        rewritten.push_str(&replacement_text);
        rewritten.push_str(&current[end..]);

        match patched.iter_mut().find(|(idx, _)| *idx == line_idx) {
            Some(entry) => entry.1 = rewritten,
            None => patched.push((line_idx, rewritten)),
        }

        applied_replacements.push(AppliedReplacement {
            original_text: candidate.text,
            replacement_text,
            position: candidate.position,
            target_file_id: candidate.target_file_id,
        });
    }

    for (idx, text) in &patched {
        lines[*idx] = text.as_str();
    }
    let processed_content = lines.join("\n");

    // Audit lists read best in document order.
    applied_replacements.sort_by_key(|r| (r.position.line_number, r.position.column_start));
    skipped_candidates.sort_by_key(|c| (c.position.line_number, c.position.column_start));

    RewriteResult {
        processed_content,
        applied_replacements,
        skipped_candidates,
    }
}
