//! Layered/boundary architecture parsing: `subgraph <id>["<title>"]` blocks
//! group member nodes, with edges collected at top level. The same grammar
//! serves both the layers view and the containers view.

use crate::models::{ArchEdge, ArchGroup, ArchNode};
use crate::parse::{diagram_body, scan, ScanLine};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArchView {
    pub groups: Vec<ArchGroup>,
    pub edges: Vec<ArchEdge>,
}

/// Parse an architecture document (markdown text containing the mermaid
/// fence). Nodes outside any subgraph are skipped.
pub fn parse_arch(text: &str) -> ArchView {
    let body = match diagram_body(text) {
        Some(b) => b,
        None => return ArchView::default(),
    };
    let mut view = ArchView::default();
    let mut open: Option<ArchGroup> = None;
    for line in scan(&body) {
        match line {
            ScanLine::SubgraphStart { id, title } => {
                if let Some(group) = open.take() {
                    view.groups.push(group);
                }
                open = Some(ArchGroup {
                    id,
                    title,
                    nodes: Vec::new(),
                });
            }
            ScanLine::SubgraphEnd => {
                if let Some(group) = open.take() {
                    view.groups.push(group);
                }
            }
            ScanLine::Node { id, label, .. } => {
                if let Some(group) = open.as_mut() {
                    // Member labels repeat the node id in front of the title.
                    let title = label
                        .strip_prefix(id.as_str())
                        .map(|rest| rest.trim().to_string())
                        .filter(|rest| !rest.is_empty())
                        .unwrap_or(label);
                    group.nodes.push(ArchNode { id, title });
                }
            }
            ScanLine::Edge { from, to, label } => {
                view.edges.push(ArchEdge { from, to, label });
            }
            _ => {}
        }
    }
    if let Some(group) = open {
        view.groups.push(group);
    }
    view
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"# Architecture: Layers

```mermaid
flowchart TB
    subgraph L1["Presentation"]
        cli["cli Command surface"]
    end
    subgraph L2["Domain"]
        merge["merge Merge engine"]
        model["model Project model"]
    end
    L1 --> L2
    cli -->|"invokes"| merge
```
"#;

    #[test]
    fn test_parse_groups_and_members() {
        let view = parse_arch(DOC);
        assert_eq!(view.groups.len(), 2);
        assert_eq!(view.groups[0].id, "L1");
        assert_eq!(view.groups[0].title, "Presentation");
        assert_eq!(view.groups[0].nodes.len(), 1);
        assert_eq!(view.groups[0].nodes[0].id, "cli");
        assert_eq!(view.groups[0].nodes[0].title, "Command surface");
        assert_eq!(view.groups[1].nodes.len(), 2);
    }

    #[test]
    fn test_edges_collected_at_top_level() {
        let view = parse_arch(DOC);
        assert_eq!(view.edges.len(), 2);
        assert_eq!(view.edges[0].from, "L1");
        assert_eq!(view.edges[1].label.as_deref(), Some("invokes"));
    }

    #[test]
    fn test_unclosed_subgraph_still_recorded() {
        let doc = "```mermaid\nflowchart TB\nsubgraph L1[\"Only\"]\n    a[\"a Thing\"]\n```";
        let view = parse_arch(doc);
        assert_eq!(view.groups.len(), 1);
        assert_eq!(view.groups[0].nodes.len(), 1);
    }
}
