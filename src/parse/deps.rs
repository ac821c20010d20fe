//! Dependency graph parsing: `flowchart LR` where node classes pick the
//! entity kind (`ext` for externals, `risk` for blocked capabilities,
//! `normal` otherwise) and edge direction reads "A --> B" as "B depends on
//! A". Capability-to-capability edges land in the target's `depends_on`
//! list; edges touching an external stay in the loose edge list.

use std::collections::BTreeMap;

use crate::models::{Capability, CapabilityStatus, DependencyEdge, DependsOn, External};
use crate::parse::{diagram_body, scan, split_entity_label, ScanLine};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepsView {
    pub capabilities: Vec<Capability>,
    pub externals: Vec<External>,
    pub edges: Vec<DependencyEdge>,
}

impl DepsView {
    fn is_external(&self, id: &str) -> bool {
        self.externals.iter().any(|e| e.id == id)
    }

    fn capability_mut(&mut self, id: &str) -> &mut Capability {
        let pos = match self.capabilities.iter().position(|c| c.id == id) {
            Some(i) => i,
            None => {
                self.capabilities.push(Capability::stub(id.to_string()));
                self.capabilities.len() - 1
            }
        };
        &mut self.capabilities[pos]
    }
}

/// Parse a dependency document (markdown text containing the mermaid fence).
pub fn parse_deps(text: &str) -> DepsView {
    let body = match diagram_body(text) {
        Some(b) => b,
        None => return DepsView::default(),
    };
    let mut view = DepsView::default();
    // diagram node id -> entity id, for resolving edge endpoints
    let mut ids: BTreeMap<String, String> = BTreeMap::new();
    let mut edges: Vec<(String, String, Option<String>)> = Vec::new();

    for line in scan(&body) {
        match line {
            ScanLine::Node { id, label, class } => {
                let (entity_id, title) = split_entity_label(&label);
                if entity_id.is_empty() {
                    continue;
                }
                ids.insert(id, entity_id.clone());
                match class.as_deref() {
                    Some("ext") => view.externals.push(External {
                        id: entity_id,
                        title,
                    }),
                    Some("risk") => {
                        let (title, reason) = split_blocked_suffix(&title);
                        view.capabilities.push(Capability {
                            id: entity_id,
                            title,
                            status: Some(CapabilityStatus::Blocked),
                            blocked_reason: reason,
                            depends_on: Vec::new(),
                        });
                    }
                    _ => view.capabilities.push(Capability {
                        id: entity_id,
                        title,
                        status: None,
                        blocked_reason: None,
                        depends_on: Vec::new(),
                    }),
                }
            }
            ScanLine::Edge { from, to, label } => edges.push((from, to, label)),
            _ => {}
        }
    }

    for (from, to, reason) in edges {
        // Endpoints not declared as nodes keep their raw diagram id; the
        // resulting stub still participates in the dependency set.
        let from_id = ids.get(&from).cloned().unwrap_or(from);
        let to_id = ids.get(&to).cloned().unwrap_or(to);
        if view.is_external(&from_id) || view.is_external(&to_id) {
            view.edges.push(DependencyEdge {
                from: from_id,
                to: to_id,
                reason,
            });
        } else {
            let target = view.capability_mut(&to_id);
            if !target.depends_on.iter().any(|d| d.id == from_id && d.reason == reason) {
                target.depends_on.push(DependsOn {
                    id: from_id.clone(),
                    reason,
                });
            }
            // Source side may also be undeclared; materialize its stub too.
            view.capability_mut(&from_id);
        }
    }
    view
}

/// Split `<title> [blocked: <reason>]` into title + reason.
fn split_blocked_suffix(title: &str) -> (String, Option<String>) {
    if let Some(open) = title.rfind("[blocked:") {
        if title.trim_end().ends_with(']') {
            let reason = title[open + "[blocked:".len()..title.trim_end().len() - 1]
                .trim()
                .to_string();
            let bare = title[..open].trim_end().to_string();
            return (bare, Some(reason).filter(|r| !r.is_empty()));
        }
    }
    (title.to_string(), None)
}
