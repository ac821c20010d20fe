//! Diagram grammar parsing.
//!
//! Each diagram view is a restricted, line-oriented grammar inside a fenced
//! ```mermaid block. Parsing runs in two passes: a shared scanner classifies
//! each line into a tagged [`ScanLine`] variant, and a per-dialect semantic
//! pass builds model entities from the variants it cares about. Anything the
//! scanner cannot classify becomes `Unrecognized` and is skipped by every
//! semantic pass: the parsers are tolerant extractors, not validating
//! grammars, so malformed documents degrade to partial models.

pub mod arch;
pub mod deps;
pub mod frontmatter;
pub mod timeline;
pub mod tree;

/// One classified line of diagram text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanLine {
    /// Dialect headers and styling: `flowchart LR`, `gantt`, `classDef ...`,
    /// `title ...`, `dateFormat ...`, `axisFormat ...`
    Header(String),
    /// `ID["label"]` with an optional `:::class` tag
    Node {
        id: String,
        label: String,
        class: Option<String>,
    },
    /// `A --> B` or `A -->|"label"| B`
    Edge {
        from: String,
        to: String,
        label: Option<String>,
    },
    /// `subgraph ID["Title"]`
    SubgraphStart { id: String, title: String },
    /// `end`
    SubgraphEnd,
    /// `section <rest>`
    Section { rest: String },
    /// A gantt task: `<left> :<field>, <field>, ...`
    Task { left: String, fields: Vec<String> },
    /// `| cell | cell | ... |`
    TableRow { cells: Vec<String> },
    Blank,
    Unrecognized(String),
}

/// Classify every line of a diagram body.
pub fn scan(body: &str) -> Vec<ScanLine> {
    body.lines().map(scan_line).collect()
}

fn scan_line(raw: &str) -> ScanLine {
    let line = raw.trim();
    if line.is_empty() {
        return ScanLine::Blank;
    }
    if line.starts_with('|') {
        let cells: Vec<String> = line
            .trim_matches('|')
            .split('|')
            .map(|c| c.trim().to_string())
            .collect();
        return ScanLine::TableRow { cells };
    }
    if let Some(rest) = line.strip_prefix("subgraph ") {
        if let Some((id, label, _)) = parse_node_syntax(rest.trim()) {
            return ScanLine::SubgraphStart { id, title: label };
        }
        return ScanLine::SubgraphStart {
            id: rest.trim().to_string(),
            title: String::new(),
        };
    }
    if line == "end" {
        return ScanLine::SubgraphEnd;
    }
    if let Some(rest) = line.strip_prefix("section ") {
        return ScanLine::Section {
            rest: rest.trim().to_string(),
        };
    }
    let first = line.split_whitespace().next().unwrap_or("");
    if matches!(
        first,
        "flowchart" | "graph" | "gantt" | "classDef" | "title" | "dateFormat" | "axisFormat"
    ) {
        return ScanLine::Header(line.to_string());
    }
    if let Some(edge) = parse_edge_syntax(line) {
        return edge;
    }
    if let Some((id, label, class)) = parse_node_syntax(line) {
        return ScanLine::Node { id, label, class };
    }
    if let Some((left, right)) = line.split_once(" :") {
        let fields: Vec<String> = right.split(',').map(|f| f.trim().to_string()).collect();
        if !fields.is_empty() && !left.trim().is_empty() {
            return ScanLine::Task {
                left: left.trim().to_string(),
                fields,
            };
        }
    }
    ScanLine::Unrecognized(line.to_string())
}

/// Parse `ID["label"]` with an optional `:::class` suffix.
fn parse_node_syntax(line: &str) -> Option<(String, String, Option<String>)> {
    let bracket = line.find("[\"")?;
    let id = &line[..bracket];
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let rest = &line[bracket + 2..];
    let close = rest.find("\"]")?;
    let label = &rest[..close];
    let tail = rest[close + 2..].trim();
    let class = match tail.strip_prefix(":::") {
        Some(c) if !c.is_empty() => Some(c.to_string()),
        Some(_) => None,
        None if tail.is_empty() => None,
        None => return None,
    };
    Some((id.to_string(), label.to_string(), class))
}

/// Parse `A --> B` or `A -->|"label"| B`.
fn parse_edge_syntax(line: &str) -> Option<ScanLine> {
    let (left, right) = line.split_once("-->")?;
    let from = left.trim();
    if from.is_empty() || !from.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let right = right.trim();
    let (label, to) = match right.strip_prefix('|') {
        Some(rest) => {
            let close = rest.find('|')?;
            let label = rest[..close].trim().trim_matches('"').to_string();
            (Some(label).filter(|l| !l.is_empty()), rest[close + 1..].trim())
        }
        None => (None, right),
    };
    if to.is_empty() || !to.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some(ScanLine::Edge {
        from: from.to_string(),
        to: to.to_string(),
        label,
    })
}

/// Extract the body of the first fenced ```mermaid block, if any.
pub fn diagram_body(text: &str) -> Option<String> {
    let mut in_fence = false;
    let mut body = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if !in_fence {
            if trimmed == "```mermaid" {
                in_fence = true;
            }
        } else {
            if trimmed == "```" {
                return Some(body.join("\n"));
            }
            body.push(line);
        }
    }
    None
}

/// True when a token follows the `<PREFIX>-<suffix>` entity id convention
/// (letters, a dash, then an alphanumeric tail: `US-001`, `EXT-2`, `M-yyy`).
pub fn is_entity_id(token: &str) -> bool {
    match token.split_once('-') {
        Some((prefix, suffix)) => {
            !prefix.is_empty()
                && prefix.chars().all(|c| c.is_ascii_alphabetic())
                && !suffix.is_empty()
                && suffix.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

/// Split an entity label into `(id, title)` per the `<ENTITY-ID> <title>`
/// convention. A label whose first token is not an entity id is untitled:
/// id empty, title the whole label.
pub fn split_entity_label(label: &str) -> (String, String) {
    let label = label.trim();
    match label.split_once(char::is_whitespace) {
        Some((first, rest)) if is_entity_id(first) => {
            (first.to_string(), rest.trim().to_string())
        }
        None if is_entity_id(label) => (label.to_string(), String::new()),
        _ => (String::new(), label.to_string()),
    }
}

/// Strip a trailing ` (...)` display suffix from a label, returning the bare
/// label and the suffix interior. Display suffixes carry derived values
/// (percentages, status classes) that the parsers discard or re-derive.
pub fn strip_display_suffix(label: &str) -> (String, Option<String>) {
    let label = label.trim_end();
    if label.ends_with(')') {
        if let Some(open) = label.rfind('(') {
            let bare = label[..open].trim_end();
            if !bare.is_empty() {
                let inner = &label[open + 1..label.len() - 1];
                return (bare.to_string(), Some(inner.to_string()));
            }
        }
    }
    (label.to_string(), None)
}
