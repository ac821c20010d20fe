//! Blueprint tree parsing: `flowchart LR` with `ROOT --> epic --> capability
//! --> story` edges. Epic and capability nodes carry the `level` class; story
//! nodes carry a status class. Display suffixes (`(45%)`, `(doing, 50%)`)
//! are parsed back for tooling but progress and status are authoritative in
//! the story headers, not here.

use std::collections::BTreeMap;

use crate::models::{Story, StoryStatus};
use crate::parse::{diagram_body, scan, split_entity_label, strip_display_suffix, ScanLine};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeView {
    pub epics: Vec<TreeEpic>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeEpic {
    pub id: String,
    pub title: String,
    pub progress: u8,
    pub capabilities: Vec<TreeCapability>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeCapability {
    pub id: String,
    pub title: String,
    pub progress: u8,
    pub stories: Vec<TreeStory>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeStory {
    pub id: String,
    pub title: String,
    pub status: StoryStatus,
    pub progress: u8,
}

#[derive(Debug, Clone)]
struct TreeNode {
    entity_id: String,
    title: String,
    class: Option<String>,
    suffix: Option<String>,
}

/// Parse a tree document (markdown text containing the mermaid fence).
/// Returns an empty view when no fence or no recognizable nodes exist.
pub fn parse_tree(text: &str) -> TreeView {
    let body = match diagram_body(text) {
        Some(b) => b,
        None => return TreeView::default(),
    };
    let mut nodes: BTreeMap<String, TreeNode> = BTreeMap::new();
    let mut order: Vec<String> = Vec::new();
    let mut edges: Vec<(String, String)> = Vec::new();
    for line in scan(&body) {
        match line {
            ScanLine::Node { id, label, class } => {
                let (bare, suffix) = strip_display_suffix(&label);
                let (entity_id, title) = split_entity_label(&bare);
                if !nodes.contains_key(&id) {
                    order.push(id.clone());
                }
                nodes.insert(
                    id,
                    TreeNode {
                        entity_id,
                        title,
                        class,
                        suffix,
                    },
                );
            }
            ScanLine::Edge { from, to, .. } => edges.push((from, to)),
            _ => {}
        }
    }

    let mut view = TreeView::default();
    // node key -> (epic index, capability index within that epic)
    let mut epic_of: BTreeMap<String, usize> = BTreeMap::new();
    let mut cap_of: BTreeMap<String, (usize, usize)> = BTreeMap::new();

    // First pass places epics and capabilities, second attaches stories, so
    // edge order inside the fence does not matter for ownership.
    for (from, to) in &edges {
        let (Some(src), Some(dst)) = (nodes.get(from), nodes.get(to)) else {
            continue;
        };
        if is_level(src) && src.entity_id.is_empty() && is_level(dst) {
            // ROOT --> epic
            let ei = view.epics.len();
            view.epics.push(TreeEpic {
                id: dst.entity_id.clone(),
                title: dst.title.clone(),
                progress: suffix_progress(dst.suffix.as_deref()),
                capabilities: Vec::new(),
            });
            epic_of.insert(to.clone(), ei);
        }
    }
    for (from, to) in &edges {
        let (Some(_), Some(dst)) = (nodes.get(from), nodes.get(to)) else {
            continue;
        };
        if let Some(&ei) = epic_of.get(from) {
            if is_level(dst) {
                let ci = view.epics[ei].capabilities.len();
                view.epics[ei].capabilities.push(TreeCapability {
                    id: dst.entity_id.clone(),
                    title: dst.title.clone(),
                    progress: suffix_progress(dst.suffix.as_deref()),
                    stories: Vec::new(),
                });
                cap_of.insert(to.clone(), (ei, ci));
            }
        }
    }
    for (from, to) in &edges {
        let Some(dst) = nodes.get(to) else { continue };
        if let Some(&(ei, ci)) = cap_of.get(from) {
            if !is_level(dst) {
                let (status, progress) = story_suffix(dst);
                view.epics[ei].capabilities[ci].stories.push(TreeStory {
                    id: dst.entity_id.clone(),
                    title: dst.title.clone(),
                    status,
                    progress,
                });
            }
        }
    }
    view
}

/// Flatten a tree view into stories carrying their epic/capability lineage.
pub fn tree_to_stories(view: &TreeView) -> Vec<Story> {
    let mut stories = Vec::new();
    for epic in &view.epics {
        for cap in &epic.capabilities {
            for ts in &cap.stories {
                let mut story = Story::new(
                    ts.id.clone(),
                    epic.id.clone(),
                    cap.id.clone(),
                    String::new(),
                    ts.title.clone(),
                );
                story.epic_title = Some(epic.title.clone()).filter(|t| !t.is_empty());
                story.capability_title = Some(cap.title.clone()).filter(|t| !t.is_empty());
                story.status = ts.status;
                story.progress = ts.progress;
                stories.push(story);
            }
        }
    }
    stories
}

fn is_level(node: &TreeNode) -> bool {
    node.class.as_deref() == Some("level") || node.class.is_none()
}

/// `(45%)` -> 45
fn suffix_progress(suffix: Option<&str>) -> u8 {
    suffix
        .and_then(|s| s.trim().strip_suffix('%'))
        .and_then(|p| p.trim().parse::<u8>().ok())
        .map(|p| p.min(100))
        .unwrap_or(0)
}

/// `(doing, 50%)` -> (Doing, 50); the class tag wins over the suffix word
/// when they disagree.
fn story_suffix(node: &TreeNode) -> (StoryStatus, u8) {
    let status = node
        .class
        .as_deref()
        .map(StoryStatus::normalize)
        .unwrap_or_default();
    let progress = match node.suffix.as_deref() {
        Some(inner) => {
            let last = inner.rsplit(',').next().unwrap_or("");
            suffix_progress(Some(last))
        }
        None => 0,
    };
    (status, progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"# Blueprint Tree

```mermaid
flowchart LR
    classDef level fill:#eef;
    classDef todo fill:#f5f5f5;
    classDef doing fill:#fff3cd;
    ROOT["Blueprint Tree"]:::level
    E_1["E-1 Core engine (45%)"]:::level
    ROOT --> E_1
    C_1["C-1 Data layer (60%)"]:::level
    E_1 --> C_1
    US_1["US-1 Persist records (doing, 60%)"]:::doing
    C_1 --> US_1
    US_2["US-2 Query records (0%)"]:::todo
    C_1 --> US_2
```
"#;

    #[test]
    fn test_parse_tree_structure() {
        let view = parse_tree(DOC);
        assert_eq!(view.epics.len(), 1);
        let epic = &view.epics[0];
        assert_eq!(epic.id, "E-1");
        assert_eq!(epic.title, "Core engine");
        assert_eq!(epic.progress, 45);
        assert_eq!(epic.capabilities.len(), 1);
        let cap = &epic.capabilities[0];
        assert_eq!(cap.id, "C-1");
        assert_eq!(cap.progress, 60);
        assert_eq!(cap.stories.len(), 2);
        assert_eq!(cap.stories[0].id, "US-1");
        assert_eq!(cap.stories[0].status, StoryStatus::Doing);
        assert_eq!(cap.stories[0].progress, 60);
        assert_eq!(cap.stories[1].status, StoryStatus::Todo);
    }

    #[test]
    fn test_tree_to_stories_lineage() {
        let stories = tree_to_stories(&parse_tree(DOC));
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].epic, "E-1");
        assert_eq!(stories[0].capability, "C-1");
        assert_eq!(stories[0].capability_title.as_deref(), Some("Data layer"));
    }

    #[test]
    fn test_parse_tree_without_fence() {
        assert_eq!(parse_tree("no diagram here"), TreeView::default());
    }

    #[test]
    fn test_parse_tree_skips_dangling_edges() {
        let doc = "```mermaid\nflowchart LR\nROOT[\"Tree\"]:::level\nROOT --> MISSING\n```";
        assert_eq!(parse_tree(doc), TreeView::default());
    }
}
