use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::candidates::LinkCandidate;

/// A group of overlapping candidates and the one that survives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConflict {
    pub conflicting_candidates: Vec<LinkCandidate>,
    pub resolved_candidate: LinkCandidate,
}

/// Groups candidates by transitive span overlap and picks one winner per
/// group. Deterministic under any input order: groups are built from a
/// position-sorted sweep and the winner comes from a total tie-break chain.
#[must_use]
pub fn resolve_conflicts(candidates: &[LinkCandidate]) -> Vec<LinkConflict> {
    overlap_groups(candidates)
        .into_iter()
        .filter(|group| group.len() > 1)
        .map(|group| {
            let resolved_candidate = pick_winner(&group);
            LinkConflict {
                conflicting_candidates: group,
                resolved_candidate,
            }
        })
        .collect()
}

/// Splits candidates into the ones that may be rewritten (group winners and
/// unconflicted candidates, in document order) and the audit record of every
/// resolved conflict.
#[must_use]
pub fn select_candidates(candidates: Vec<LinkCandidate>) -> (Vec<LinkCandidate>, Vec<LinkConflict>) {
    let mut survivors = Vec::new();
    let mut conflicts = Vec::new();

    for group in overlap_groups(&candidates) {
        if group.len() == 1 {
            survivors.extend(group);
        } else {
            let winner = pick_winner(&group);
            survivors.push(winner.clone());
            conflicts.push(LinkConflict {
                conflicting_candidates: group,
                resolved_candidate: winner,
            });
        }
    }

    survivors.sort_by_key(|c| (c.position.line_number, c.position.column_start));
    (survivors, conflicts)
}

/// Two candidates conflict iff their half-open column ranges overlap on the
/// same line; adjacency is not overlap. Grouping is transitive.
fn overlap_groups(candidates: &[LinkCandidate]) -> Vec<Vec<LinkCandidate>> {
    let mut sorted: Vec<LinkCandidate> = candidates.to_vec();
    sorted.sort_by(|a, b| {
        (
            a.position.line_number,
            a.position.column_start,
            a.position.column_end,
        )
            .cmp(&(
                b.position.line_number,
                b.position.column_start,
                b.position.column_end,
            ))
            .then_with(|| a.target_file_id.cmp(&b.target_file_id))
    });

    let mut groups: Vec<Vec<LinkCandidate>> = Vec::new();
    let mut group_line = 0;
    let mut group_end = 0;

    for candidate in sorted {
        let starts_new_group = groups.is_empty()
            || candidate.position.line_number != group_line
            || candidate.position.column_start >= group_end;
        if starts_new_group {
            group_line = candidate.position.line_number;
            group_end = candidate.position.column_end;
            groups.push(vec![candidate]);
        } else if let Some(group) = groups.last_mut() {
            group_end = group_end.max(candidate.position.column_end);
            group.push(candidate);
        }
    }
    groups
}

fn pick_winner(group: &[LinkCandidate]) -> LinkCandidate {
    let mut best = &group[0];
    for candidate in &group[1..] {
        if beats(candidate, best) {
            best = candidate;
        }
    }
    best.clone()
}

/// Tie-break chain: longer text, then exact-title match (no alias), then
/// higher confidence, then leftmost column.
fn beats(challenger: &LinkCandidate, incumbent: &LinkCandidate) -> bool {
    let by_length = challenger
        .text
        .chars()
        .count()
        .cmp(&incumbent.text.chars().count());
    if by_length != Ordering::Equal {
        return by_length == Ordering::Greater;
    }

    let exactness =
        |c: &LinkCandidate| usize::from(c.suggested_alias.is_none());
    let by_exactness = exactness(challenger).cmp(&exactness(incumbent));
    if by_exactness != Ordering::Equal {
        return by_exactness == Ordering::Greater;
    }

    let by_confidence = challenger.confidence.total_cmp(&incumbent.confidence);
    if by_confidence != Ordering::Equal {
        return by_confidence == Ordering::Greater;
    }

    challenger.position.column_start < incumbent.position.column_start
}
