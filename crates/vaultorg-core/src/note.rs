use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_norway::Value;

use crate::models::{Frontmatter, LinkRefDef, NOTE_ID_LENGTH, Note, RegularLink, TextPosition, WikiLink};
use crate::zones::{find_byte, find_link_ref_defs, find_regular_links, find_wiki_links, frontmatter_zone, matching_bracket};

/// Parses a raw markdown document into a [`Note`]. Never fails: malformed
/// frontmatter degrades to empty metadata and the body is kept verbatim.
#[must_use]
pub fn parse_note(path: PathBuf, content: &str) -> Note {
    let frontmatter = parse_frontmatter(content);
    let file_id = frontmatter
        .id
        .clone()
        .or_else(|| id_from_stem(&path));

    let mut note = Note {
        path,
        file_id,
        frontmatter,
        content: content.to_string(),
        wiki_links: Vec::new(),
        regular_links: Vec::new(),
        link_ref_defs: Vec::new(),
    };
    extract_links(&mut note);
    note
}

/// The body of a document: everything after the frontmatter block, or the
/// whole document when there is none.
#[must_use]
pub fn body_text(content: &str) -> &str {
    let Some(zone) = frontmatter_zone(content) else {
        return content;
    };
    let skipped: usize = content
        .split_inclusive('\n')
        .take(zone.end_line)
        .map(str::len)
        .sum();
    &content[skipped.min(content.len())..]
}

fn id_from_stem(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    (stem.len() == NOTE_ID_LENGTH && stem.bytes().all(|b| b.is_ascii_digit()))
        .then(|| stem.to_string())
}

/// YAML text between the frontmatter delimiters, parsed tolerantly:
/// common field-name variations are folded into the canonical schema and
/// scalar values are accepted where lists are expected.
fn parse_frontmatter(content: &str) -> Frontmatter {
    let Some(zone) = frontmatter_zone(content) else {
        return Frontmatter::default();
    };
    let yaml_text: String = content
        .split('\n')
        .skip(zone.start_line)
        .take(zone.end_line - zone.start_line - 1)
        .collect::<Vec<&str>>()
        .join("\n");

    match serde_norway::from_str::<Value>(&yaml_text) {
        Ok(Value::Mapping(mapping)) => frontmatter_from_mapping(mapping),
        _ => Frontmatter::default(),
    }
}

fn frontmatter_from_mapping(mapping: serde_norway::Mapping) -> Frontmatter {
    let mut frontmatter = Frontmatter::default();
    let mut extra = BTreeMap::new();

    for (key, value) in mapping {
        let Value::String(raw_key) = key else {
            continue;
        };
        match raw_key.trim().to_lowercase().as_str() {
            "title" => frontmatter.title = scalar_string(&value),
            "aliases" | "alias" | "aka" => frontmatter.aliases = string_list(&value),
            "tags" | "tag" | "category" | "categories" => {
                frontmatter.tags = string_list(&value);
            }
            "id" => frontmatter.id = scalar_string(&value),
            "date" | "created" | "created_date" | "creation_date" => {
                frontmatter.date = scalar_string(&value);
            }
            "publish" | "public" => frontmatter.publish = truthy(&value),
            _ => {
                extra.insert(raw_key, value);
            }
        }
    }
    frontmatter.extra = extra;
    frontmatter
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    let mut out: Vec<String> = match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_string).collect(),
        _ => scalar_string(value).into_iter().collect(),
    };
    // Dedup preserving first occurrence.
    let mut seen = Vec::new();
    out.retain(|item| {
        if seen.contains(item) {
            false
        } else {
            seen.push(item.clone());
            true
        }
    });
    out
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
        Value::Number(n) => n.as_i64() == Some(1),
        _ => false,
    }
}

/// Populates the note's existing-link inventories with positions. Lines
/// inside the frontmatter block are metadata, not link material.
fn extract_links(note: &mut Note) {
    let body_start = frontmatter_zone(&note.content).map_or(0, |z| z.end_line);

    let content = note.content.clone();
    for (idx, line) in content.split('\n').enumerate() {
        let line_number = idx + 1;
        if line_number <= body_start {
            continue;
        }

        for (start, end) in find_wiki_links(line) {
            if let Some(link) = parse_wiki_link(line, start, end, line_number) {
                note.wiki_links.push(link);
            }
        }
        for (start, end) in find_regular_links(line) {
            if let Some(link) = parse_regular_link(line, start, end, line_number) {
                note.regular_links.push(link);
            }
        }
        for (start, end) in find_link_ref_defs(line) {
            if let Some(link_ref) = parse_link_ref_def(line, start, end, line_number) {
                note.link_ref_defs.push(link_ref);
            }
        }
    }
}

fn parse_wiki_link(line: &str, start: usize, end: usize, line_number: usize) -> Option<WikiLink> {
    let inner = line.get(start + 2..end - 2)?;
    let (target, alias) = match inner.split_once('|') {
        Some((target, alias)) => (target, Some(alias.to_string())),
        None => (inner, None),
    };
    if target.is_empty() {
        return None;
    }
    Some(WikiLink {
        target_id: target.to_string(),
        alias,
        position: TextPosition::new(line_number, start, end),
    })
}

fn parse_regular_link(
    line: &str,
    start: usize,
    end: usize,
    line_number: usize,
) -> Option<RegularLink> {
    let bytes = line.as_bytes();
    let text_end = matching_bracket(bytes, start)?;
    let text = line.get(start + 1..text_end)?;
    let url = line.get(text_end + 2..end - 1)?;
    Some(RegularLink {
        text: text.to_string(),
        url: url.to_string(),
        position: TextPosition::new(line_number, start, end),
    })
}

fn parse_link_ref_def(
    line: &str,
    start: usize,
    end: usize,
    line_number: usize,
) -> Option<LinkRefDef> {
    let bytes = line.as_bytes();
    let pipe = find_byte(bytes, start + 1, b'|')?;
    let close = find_byte(bytes, pipe + 1, b']')?;
    let id = line.get(start + 1..pipe)?.to_string();
    let alias = line.get(pipe + 1..close)?.to_string();

    let rest = line.get(close + 2..end)?;
    let rest = rest.trim_start();
    let (path, title) = match rest.split_once('"') {
        Some((path_part, title_part)) => (
            path_part.trim_end().to_string(),
            Some(title_part.trim_end_matches('"').to_string()),
        ),
        None => (rest.trim_end().to_string(), None),
    };
    Some(LinkRefDef {
        id,
        alias,
        path,
        title,
        position: TextPosition::new(line_number, start, end),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_frontmatter_and_body_links() {
        let content = "---\ntitle: Source Note\naliases: [Source]\ntags: [test]\nid: '20251012100000'\n---\n\n# Source Note\n\nSee [[20251012100100|Target]] and [site](https://example.com).\n";
        let note = parse_note(PathBuf::from("source.md"), content);

        assert_eq!(note.frontmatter.title.as_deref(), Some("Source Note"));
        assert_eq!(note.frontmatter.aliases, vec!["Source"]);
        assert_eq!(note.file_id.as_deref(), Some("20251012100000"));
        assert_eq!(note.wiki_links.len(), 1);
        assert_eq!(note.wiki_links[0].target_id, "20251012100100");
        assert_eq!(note.wiki_links[0].alias.as_deref(), Some("Target"));
        assert_eq!(note.regular_links.len(), 1);
        assert_eq!(note.regular_links[0].url, "https://example.com");
    }

    #[test]
    fn numeric_id_and_scalar_alias_are_normalized() {
        let content = "---\nid: 20251012100000\nalias: Solo\ntag: one\npublic: yes\n---\nBody\n";
        let note = parse_note(PathBuf::from("note.md"), content);
        assert_eq!(note.frontmatter.id.as_deref(), Some("20251012100000"));
        assert_eq!(note.frontmatter.aliases, vec!["Solo"]);
        assert_eq!(note.frontmatter.tags, vec!["one"]);
        assert!(note.frontmatter.publish);
    }

    #[test]
    fn unknown_fields_are_preserved_in_extra() {
        let content = "---\ntitle: T\ncustom_field: kept\n---\nBody\n";
        let note = parse_note(PathBuf::from("note.md"), content);
        assert_eq!(
            note.frontmatter.extra.get("custom_field"),
            Some(&Value::String("kept".to_string()))
        );
    }

    #[test]
    fn malformed_yaml_degrades_to_empty_frontmatter() {
        let content = "---\ntitle: [unclosed\n---\nBody\n";
        let note = parse_note(PathBuf::from("note.md"), content);
        assert_eq!(note.frontmatter, Frontmatter::default());
        assert_eq!(note.content, content);
    }

    #[test]
    fn file_id_falls_back_to_fourteen_digit_stem() {
        let note = parse_note(PathBuf::from("20230727234718.md"), "No frontmatter\n");
        assert_eq!(note.file_id.as_deref(), Some("20230727234718"));

        let other = parse_note(PathBuf::from("readme.md"), "No frontmatter\n");
        assert_eq!(other.file_id, None);
    }

    #[test]
    fn duplicate_aliases_are_removed_in_order() {
        let content = "---\naliases: [A, B, A]\n---\n";
        let note = parse_note(PathBuf::from("note.md"), content);
        assert_eq!(note.frontmatter.aliases, vec!["A", "B"]);
    }

    #[test]
    fn frontmatter_wiki_syntax_is_not_a_link() {
        let content = "---\ntitle: \"[[not a link]]\"\n---\nBody\n";
        let note = parse_note(PathBuf::from("note.md"), content);
        assert!(note.wiki_links.is_empty());
    }

    #[test]
    fn link_ref_def_components_are_parsed() {
        let content = "[20230727234718|EC2]: 20230727234718 \"Amazon EC2\"\n";
        let note = parse_note(PathBuf::from("note.md"), content);
        assert_eq!(note.link_ref_defs.len(), 1);
        let lrd = &note.link_ref_defs[0];
        assert_eq!(lrd.id, "20230727234718");
        assert_eq!(lrd.alias, "EC2");
        assert_eq!(lrd.path, "20230727234718");
        assert_eq!(lrd.title.as_deref(), Some("Amazon EC2"));
    }

    #[test]
    fn body_text_strips_only_well_formed_frontmatter() {
        assert_eq!(body_text("---\nt: 1\n---\nBody\n"), "Body\n");
        let unterminated = "---\nt: 1\nBody\n";
        assert_eq!(body_text(unterminated), unterminated);
    }
}
