use std::collections::BTreeSet;

use crate::models::{LinkDensityMetrics, Note};
use crate::note::body_text;

/// Links per 100 body words. Words are whitespace-separated tokens of the
/// body only; frontmatter never counts toward density.
#[must_use]
pub fn link_density_metrics(note: &Note) -> LinkDensityMetrics {
    let total_words = body_text(&note.content).split_whitespace().count();

    let wiki_links = note.wiki_links.len();
    let regular_links = note.regular_links.len();
    let link_ref_defs = note.link_ref_defs.len();
    let total_links = wiki_links + regular_links + link_ref_defs;

    let link_density = if total_words == 0 {
        0.0
    } else {
        total_links as f64 * 100.0 / total_words as f64
    };

    let unique_targets: BTreeSet<&str> = note
        .wiki_links
        .iter()
        .map(|link| link.target_id.as_str())
        .chain(note.regular_links.iter().map(|link| link.url.as_str()))
        .chain(note.link_ref_defs.iter().map(|link| link.path.as_str()))
        .collect();

    LinkDensityMetrics {
        total_words,
        total_links,
        wiki_links,
        regular_links,
        link_ref_defs,
        link_density,
        unique_targets: unique_targets.len(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::note::parse_note;

    #[test]
    fn counts_links_and_words_in_body_only() {
        let content = "---\ntitle: Note with many frontmatter words\n---\n\none two three four five\nsix seven [[20230101120000]] eight\n[docs](https://example.com) nine ten\n";
        let note = parse_note(PathBuf::from("note.md"), content);
        let metrics = link_density_metrics(&note);

        assert_eq!(metrics.wiki_links, 1);
        assert_eq!(metrics.regular_links, 1);
        assert_eq!(metrics.total_links, 2);
        assert_eq!(metrics.total_words, 12);
        assert_eq!(metrics.unique_targets, 2);
    }

    #[test]
    fn empty_body_has_zero_density() {
        let note = parse_note(PathBuf::from("note.md"), "---\ntitle: T\n---\n");
        let metrics = link_density_metrics(&note);
        assert_eq!(metrics.total_words, 0);
        assert_eq!(metrics.link_density, 0.0);
    }

    #[test]
    fn repeated_targets_count_once() {
        let content = "[[20230101120000]] and [[20230101120000|again]]\n";
        let note = parse_note(PathBuf::from("note.md"), content);
        let metrics = link_density_metrics(&note);
        assert_eq!(metrics.wiki_links, 2);
        assert_eq!(metrics.unique_targets, 1);
    }
}
