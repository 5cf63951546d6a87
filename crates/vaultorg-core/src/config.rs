use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How candidate matches are bounded against surrounding text.
///
/// `Strict` requires non-alphanumeric neighbors on both sides, which also
/// rejects matches embedded in CJK compounds (CJK ideographs count as word
/// characters). `RelaxCjk` treats a CJK neighbor as a boundary, allowing
/// title matches inside mixed Japanese/English prose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordBoundaryMode {
    #[default]
    Strict,
    RelaxCjk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub exclude_tables: bool,
    pub max_links_per_file: usize,
    /// Titles/aliases shorter than this are never treated as link targets.
    pub min_match_len: usize,
    pub word_boundaries: WordBoundaryMode,
    pub backup_enabled: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            include_patterns: vec!["**/*.md".to_string()],
            exclude_patterns: vec![
                "**/.obsidian/**".to_string(),
                "**/.git/**".to_string(),
                "**/node_modules/**".to_string(),
            ],
            exclude_tables: false,
            max_links_per_file: 50,
            min_match_len: 3,
            word_boundaries: WordBoundaryMode::Strict,
            backup_enabled: true,
        }
    }
}

impl ProcessingConfig {
    /// Loads configuration from a YAML file; a missing file yields defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_norway::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_standard_vault_layout() {
        let config = ProcessingConfig::default();
        assert_eq!(config.include_patterns, vec!["**/*.md"]);
        assert!(
            config
                .exclude_patterns
                .iter()
                .any(|p| p.contains(".obsidian"))
        );
        assert_eq!(config.max_links_per_file, 50);
        assert_eq!(config.word_boundaries, WordBoundaryMode::Strict);
        assert!(config.backup_enabled);
    }

    #[test]
    fn partial_yaml_overrides_keep_remaining_defaults() {
        let config: ProcessingConfig =
            serde_norway::from_str("max_links_per_file: 5\nexclude_tables: true\n")
                .expect("parse config");
        assert_eq!(config.max_links_per_file, 5);
        assert!(config.exclude_tables);
        assert_eq!(config.min_match_len, 3);
        assert_eq!(config.include_patterns, vec!["**/*.md"]);
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let config = ProcessingConfig::from_file(Path::new("/nonexistent/config.yaml"))
            .expect("defaults for missing file");
        assert_eq!(config.max_links_per_file, 50);
    }

    #[test]
    fn word_boundary_mode_parses_snake_case() {
        let config: ProcessingConfig =
            serde_norway::from_str("word_boundaries: relax_cjk\n").expect("parse config");
        assert_eq!(config.word_boundaries, WordBoundaryMode::RelaxCjk);
    }
}
