use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Obsidian-style note ids are 14-digit timestamps (`20230727234718`).
pub const NOTE_ID_LENGTH: usize = 14;

/// A span within a single line. `line_number` is 1-based; columns are byte
/// offsets into the line, start inclusive, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPosition {
    pub line_number: usize,
    pub column_start: usize,
    pub column_end: usize,
}

impl TextPosition {
    #[must_use]
    pub const fn new(line_number: usize, column_start: usize, column_end: usize) -> Self {
        Self {
            line_number,
            column_start,
            column_end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiLink {
    pub target_id: String,
    pub alias: Option<String>,
    pub position: TextPosition,
}

impl std::fmt::Display for WikiLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "[[{}|{}]]", self.target_id, alias),
            None => write!(f, "[[{}]]", self.target_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularLink {
    pub text: String,
    pub url: String,
    pub position: TextPosition,
}

/// A link reference definition line: `[id|alias]: path "optional title"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRefDef {
    pub id: String,
    pub alias: String,
    pub path: String,
    pub title: Option<String>,
    pub position: TextPosition,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    pub title: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub id: Option<String>,
    pub date: Option<String>,
    #[serde(default)]
    pub publish: bool,
    /// Fields outside the known schema, preserved verbatim on rewrite.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_norway::Value>,
}

/// A markdown note as loaded from the vault. `content` is the raw file text,
/// frontmatter block included, with `\n` separators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub path: PathBuf,
    pub file_id: Option<String>,
    pub frontmatter: Frontmatter,
    pub content: String,
    #[serde(default)]
    pub wiki_links: Vec<WikiLink>,
    #[serde(default)]
    pub regular_links: Vec<RegularLink>,
    #[serde(default)]
    pub link_ref_defs: Vec<LinkRefDef>,
}

impl Note {
    /// Searchable surface strings for this note: the title plus every alias.
    pub fn searchable_strings(&self) -> impl Iterator<Item = &str> {
        self.frontmatter
            .title
            .as_deref()
            .into_iter()
            .chain(self.frontmatter.aliases.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkDensityMetrics {
    pub total_words: usize,
    pub total_links: usize,
    pub wiki_links: usize,
    pub regular_links: usize,
    pub link_ref_defs: usize,
    /// Links per 100 body words.
    pub link_density: f64,
    pub unique_targets: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wiki_link_renders_with_and_without_alias() {
        let plain = WikiLink {
            target_id: "20230101120000".to_string(),
            alias: None,
            position: TextPosition::new(1, 0, 18),
        };
        assert_eq!(plain.to_string(), "[[20230101120000]]");

        let aliased = WikiLink {
            target_id: "20230101120000".to_string(),
            alias: Some("EC2".to_string()),
            position: TextPosition::new(1, 0, 22),
        };
        assert_eq!(aliased.to_string(), "[[20230101120000|EC2]]");
    }

    #[test]
    fn searchable_strings_cover_title_and_aliases() {
        let note = Note {
            path: PathBuf::from("a.md"),
            file_id: Some("20230727234718".to_string()),
            frontmatter: Frontmatter {
                title: Some("Amazon EC2".to_string()),
                aliases: vec!["EC2".to_string(), "Elastic Compute".to_string()],
                ..Frontmatter::default()
            },
            content: String::new(),
            wiki_links: Vec::new(),
            regular_links: Vec::new(),
            link_ref_defs: Vec::new(),
        };
        let strings: Vec<&str> = note.searchable_strings().collect();
        assert_eq!(strings, vec!["Amazon EC2", "EC2", "Elastic Compute"]);
    }
}
