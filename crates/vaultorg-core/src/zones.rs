use serde::{Deserialize, Serialize};

use crate::models::TextPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    Frontmatter,
    CodeBlock,
    InlineCode,
    WikiLink,
    RegularLink,
    LinkRefDef,
    Template,
    Table,
}

/// A region of the document where automatic linking must not occur.
/// Columns are byte offsets; multi-line zones cover whole lines between
/// `start_line` and `end_line`. Zones may overlap; consumers only ask
/// "does this span intersect any zone".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionZone {
    pub zone_type: ZoneType,
    pub start_line: usize,
    pub end_line: usize,
    pub start_column: usize,
    pub end_column: usize,
}

impl ExclusionZone {
    fn single_line(zone_type: ZoneType, line: usize, start: usize, end: usize) -> Self {
        Self {
            zone_type,
            start_line: line,
            end_line: line,
            start_column: start,
            end_column: end,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ZoneScanOptions {
    pub exclude_tables: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontmatterDelimiter {
    Dashes,
    Pluses,
}

impl FrontmatterDelimiter {
    fn matches(self, trimmed: &str) -> bool {
        match self {
            Self::Dashes => trimmed == "---",
            Self::Pluses => trimmed == "+++",
        }
    }

    fn open(trimmed: &str) -> Option<Self> {
        match trimmed {
            "---" => Some(Self::Dashes),
            "+++" => Some(Self::Pluses),
            _ => None,
        }
    }
}

/// Frontmatter scanner state, threaded through a line-by-line fold.
/// Frontmatter can only open on line 1 and close with the delimiter family
/// that opened it; once `Done`, the state is inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontmatterState {
    NotStarted,
    InFrontmatter {
        delimiter: FrontmatterDelimiter,
        start_line: usize,
    },
    Done,
}

/// Pure transition: `state x line -> state x closed-block?`. The returned
/// span is `(start_line, end_line)` of a completed frontmatter block.
#[must_use]
pub fn frontmatter_step(
    state: FrontmatterState,
    line_number: usize,
    line: &str,
) -> (FrontmatterState, Option<(usize, usize)>) {
    let trimmed = line.trim();
    match state {
        FrontmatterState::NotStarted => {
            if line_number == 1
                && let Some(delimiter) = FrontmatterDelimiter::open(trimmed)
            {
                (
                    FrontmatterState::InFrontmatter {
                        delimiter,
                        start_line: line_number,
                    },
                    None,
                )
            } else {
                (FrontmatterState::Done, None)
            }
        }
        FrontmatterState::InFrontmatter {
            delimiter,
            start_line,
        } => {
            if delimiter.matches(trimmed) {
                (FrontmatterState::Done, Some((start_line, line_number)))
            } else {
                (state, None)
            }
        }
        FrontmatterState::Done => (FrontmatterState::Done, None),
    }
}

/// Locates the frontmatter block, if the document has a well-formed one.
/// An opening delimiter that never closes is not frontmatter; the block
/// degrades to ordinary content.
#[must_use]
pub fn frontmatter_zone(content: &str) -> Option<ExclusionZone> {
    let mut state = FrontmatterState::NotStarted;
    for (idx, line) in content.split('\n').enumerate() {
        let line_number = idx + 1;
        let (next, closed) = frontmatter_step(state, line_number, line);
        if let Some((start_line, end_line)) = closed {
            return Some(ExclusionZone {
                zone_type: ZoneType::Frontmatter,
                start_line,
                end_line,
                start_column: 0,
                end_column: line.len(),
            });
        }
        if next == FrontmatterState::Done {
            return None;
        }
        state = next;
    }
    None
}

/// Extracts every zone in which auto-linking is forbidden. Single forward
/// scan per concern; matchers run in a fixed precedence order (inline code,
/// wiki link, regular link, LRD, template, table).
#[must_use]
pub fn extract_exclusion_zones(content: &str, options: ZoneScanOptions) -> Vec<ExclusionZone> {
    let mut zones = Vec::new();

    let frontmatter = frontmatter_zone(content);
    let in_frontmatter =
        |line: usize| frontmatter.as_ref().is_some_and(|z| line <= z.end_line);
    if let Some(zone) = frontmatter.clone() {
        zones.push(zone);
    }

    let code_blocks = code_block_zones(content, &in_frontmatter);
    let in_code_block = |line: usize| {
        code_blocks
            .iter()
            .any(|z| z.start_line <= line && line <= z.end_line)
    };

    for (idx, line) in content.split('\n').enumerate() {
        let line_number = idx + 1;
        if in_frontmatter(line_number) || in_code_block(line_number) {
            continue;
        }

        for (start, end) in find_inline_code(line) {
            zones.push(ExclusionZone::single_line(
                ZoneType::InlineCode,
                line_number,
                start,
                end,
            ));
        }
        for (start, end) in find_wiki_links(line) {
            zones.push(ExclusionZone::single_line(
                ZoneType::WikiLink,
                line_number,
                start,
                end,
            ));
        }
        for (start, end) in find_regular_links(line) {
            zones.push(ExclusionZone::single_line(
                ZoneType::RegularLink,
                line_number,
                start,
                end,
            ));
        }
        for (start, end) in find_link_ref_defs(line) {
            zones.push(ExclusionZone::single_line(
                ZoneType::LinkRefDef,
                line_number,
                start,
                end,
            ));
        }
        for (start, end) in find_templates(line) {
            zones.push(ExclusionZone::single_line(
                ZoneType::Template,
                line_number,
                start,
                end,
            ));
        }
        if options.exclude_tables && is_table_row(line) {
            zones.push(ExclusionZone::single_line(
                ZoneType::Table,
                line_number,
                0,
                line.len(),
            ));
        }
    }

    zones.extend(code_blocks);
    zones
}

/// True when the candidate span intersects any zone. Single-line zones use
/// half-open column overlap; boundary lines of multi-line zones compare
/// against the zone's edge columns.
#[must_use]
pub fn span_is_excluded(position: &TextPosition, zones: &[ExclusionZone]) -> bool {
    zones.iter().any(|zone| {
        if position.line_number < zone.start_line || position.line_number > zone.end_line {
            return false;
        }
        if zone.start_line == zone.end_line {
            return position.column_start < zone.end_column
                && zone.start_column < position.column_end;
        }
        if position.line_number == zone.start_line {
            return position.column_end > zone.start_column;
        }
        if position.line_number == zone.end_line {
            return position.column_start < zone.end_column;
        }
        true
    })
}

fn code_block_zones(content: &str, in_frontmatter: &dyn Fn(usize) -> bool) -> Vec<ExclusionZone> {
    let mut zones = Vec::new();
    let mut open: Option<(char, usize)> = None;

    for (idx, line) in content.split('\n').enumerate() {
        let line_number = idx + 1;
        if in_frontmatter(line_number) {
            continue;
        }
        let Some(marker) = fence_marker(line) else {
            continue;
        };
        match open {
            None => open = Some((marker, line_number)),
            Some((open_marker, start_line)) if open_marker == marker => {
                zones.push(ExclusionZone {
                    zone_type: ZoneType::CodeBlock,
                    start_line,
                    end_line: line_number,
                    start_column: 0,
                    end_column: line.len(),
                });
                open = None;
            }
            // A mismatched fence inside an open block is block content.
            Some(_) => {}
        }
    }

    // An unterminated fence is not a code block; its lines degrade to
    // ordinary content.
    zones
}

fn fence_marker(line: &str) -> Option<char> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("```") {
        Some('`')
    } else if trimmed.starts_with("~~~") {
        Some('~')
    } else {
        None
    }
}

fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() > 1 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

/// Backtick-delimited spans, backticks included. First match wins, scan
/// continues after the closing backtick.
fn find_inline_code(line: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut pos = 0;
    while let Some(open) = find_from(line, pos, "`") {
        let Some(close) = find_from(line, open + 1, "`") else {
            break;
        };
        spans.push((open, close + 1));
        pos = close + 1;
    }
    spans
}

/// `[[target]]` / `[[target|alias]]` spans, non-greedy to the matching `]]`.
pub(crate) fn find_wiki_links(line: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut pos = 0;
    while let Some(open) = find_from(line, pos, "[[") {
        let Some(close) = find_from(line, open + 2, "]]") else {
            break;
        };
        spans.push((open, close + 2));
        pos = close + 2;
    }
    spans
}

/// `[text](url)` spans. The text part tolerates nested single brackets;
/// the URL part does not tolerate nested parens.
pub(crate) fn find_regular_links(line: &str) -> Vec<(usize, usize)> {
    let bytes = line.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'[' {
            i += 1;
            continue;
        }
        if i + 1 < bytes.len() && bytes[i + 1] == b'[' {
            // Wiki link territory; skip past the opening pair.
            i += 2;
            continue;
        }
        let Some(text_end) = matching_bracket(bytes, i) else {
            i += 1;
            continue;
        };
        if text_end + 1 >= bytes.len() || bytes[text_end + 1] != b'(' {
            i = text_end + 1;
            continue;
        }
        let Some(url_end) = find_byte(bytes, text_end + 2, b')') else {
            i = text_end + 1;
            continue;
        };
        spans.push((i, url_end + 1));
        i = url_end + 1;
    }
    spans
}

/// Link reference definitions: `[id|alias]: path "optional title"`. The
/// matcher scans the whole line (find-all), never anchoring to column 0, so
/// indented definitions and multiple definitions per line are all found.
pub(crate) fn find_link_ref_defs(line: &str) -> Vec<(usize, usize)> {
    let bytes = line.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let Some(open) = find_byte(bytes, i, b'[') else {
            break;
        };
        match parse_link_ref_def_at(line, open) {
            Some(end) => {
                spans.push((open, end));
                i = end;
            }
            None => i = open + 1,
        }
    }
    spans
}

/// Parses one LRD starting at byte `open` (which holds `[`). Returns the
/// exclusive end of the match.
pub(crate) fn parse_link_ref_def_at(line: &str, open: usize) -> Option<usize> {
    let bytes = line.as_bytes();
    let pipe = find_byte(bytes, open + 1, b'|')?;
    if pipe == open + 1 || bytes[open + 1..pipe].contains(&b']') {
        return None;
    }
    let close = find_byte(bytes, pipe + 1, b']')?;
    if close == pipe + 1 {
        return None;
    }
    if close + 1 >= bytes.len() || bytes[close + 1] != b':' {
        return None;
    }

    let mut cursor = close + 2;
    while cursor < bytes.len() && bytes[cursor] == b' ' {
        cursor += 1;
    }
    let path_start = cursor;
    while cursor < bytes.len() && !bytes[cursor].is_ascii_whitespace() {
        cursor += 1;
    }
    if cursor == path_start {
        return None;
    }
    let mut end = cursor;

    // Optional quoted title.
    let mut after = cursor;
    while after < bytes.len() && bytes[after] == b' ' {
        after += 1;
    }
    if after < bytes.len()
        && bytes[after] == b'"'
        && let Some(quote_close) = find_byte(bytes, after + 1, b'"')
    {
        end = quote_close + 1;
    }
    Some(end)
}

/// Template-engine placeholders: `${...}`, `{{...}}`, `<%...%>` (including
/// the `<%*...*%>` form) and bare `tp.`-prefixed expressions, so Templater
/// snippets are never treated as link material.
fn find_templates(line: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    collect_delimited(line, "${", "}", &mut spans);
    collect_delimited(line, "{{", "}}", &mut spans);
    collect_delimited(line, "<%", "%>", &mut spans);
    collect_tp_expressions(line, &mut spans);
    spans
}

fn collect_delimited(line: &str, open: &str, close: &str, spans: &mut Vec<(usize, usize)>) {
    let mut pos = 0;
    while let Some(start) = find_from(line, pos, open) {
        let Some(end) = find_from(line, start + open.len(), close) else {
            break;
        };
        spans.push((start, end + close.len()));
        pos = end + close.len();
    }
}

fn collect_tp_expressions(line: &str, spans: &mut Vec<(usize, usize)>) {
    let bytes = line.as_bytes();
    let mut pos = 0;
    while let Some(start) = find_from(line, pos, "tp.") {
        let preceded_by_word = start > 0 && is_ident_byte(bytes[start - 1]);
        if preceded_by_word {
            pos = start + 3;
            continue;
        }
        let mut end = start + 3;
        while end < bytes.len() && (is_ident_byte(bytes[end]) || bytes[end] == b'.') {
            end += 1;
        }
        if end == start + 3 {
            pos = start + 3;
            continue;
        }
        if end < bytes.len() && bytes[end] == b'(' {
            let mut depth = 1usize;
            let mut cursor = end + 1;
            while cursor < bytes.len() && depth > 0 {
                match bytes[cursor] {
                    b'(' => depth += 1,
                    b')' => depth -= 1,
                    _ => {}
                }
                cursor += 1;
            }
            if depth == 0 {
                end = cursor;
            }
        }
        spans.push((start, end));
        pos = end;
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn find_from(haystack: &str, from: usize, needle: &str) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..].find(needle).map(|i| from + i)
}

pub(crate) fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes
        .iter()
        .skip(from)
        .position(|b| *b == needle)
        .map(|i| from + i)
}

/// Matching `]` for the `[` at `open`, tolerating nested single brackets.
pub(crate) fn matching_bracket(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}
