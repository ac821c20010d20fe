//! Data models for Blueprint entities.
//!
//! This module defines the unified project model:
//! - `Story` - leaf work items with status and progress
//! - `Capability` - mid-level units, the addressing unit of the dependency view
//! - `External` - dependency sources outside the tree (sink-only)
//! - `Milestone` - time-boxed delivery units with line items and a checkpoint
//! - `Architecture` - layered and boundary/container groupings with edges
//!
//! Epics are not first-class merge entities: they are implied by `Story::epic`
//! and materialized only when rendering the tree view. The complete types here
//! are distinct from the partial patch types in [`patch`]; defaulting of
//! missing fields happens once, at the patch boundary, never here.

pub mod patch;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Story status in the workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    #[default]
    Todo,
    Doing,
    Blocked,
    Done,
}

impl StoryStatus {
    /// Normalize a free-form status string. Unrecognized values become `Todo`.
    pub fn normalize(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "doing" => StoryStatus::Doing,
            "blocked" => StoryStatus::Blocked,
            "done" => StoryStatus::Done,
            _ => StoryStatus::Todo,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoryStatus::Todo => "todo",
            StoryStatus::Doing => "doing",
            StoryStatus::Blocked => "blocked",
            StoryStatus::Done => "done",
        }
    }
}

impl fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a milestone line item. Maps to the timeline status tokens
/// `active`, `done`, and `crit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Doing,
    Done,
    Blocked,
}

impl ItemStatus {
    /// The timeline dialect token for this status.
    pub fn token(&self) -> &'static str {
        match self {
            ItemStatus::Doing => "active",
            ItemStatus::Done => "done",
            ItemStatus::Blocked => "crit",
        }
    }

    /// Parse a timeline dialect token. Unknown tokens yield `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "active" => Some(ItemStatus::Doing),
            "done" => Some(ItemStatus::Done),
            "crit" => Some(ItemStatus::Blocked),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Doing => "doing",
            ItemStatus::Done => "done",
            ItemStatus::Blocked => "blocked",
        }
    }
}

/// Capability status. Only `blocked` is meaningful; absence means normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityStatus {
    Blocked,
}

/// Project-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Project display name
    #[serde(default)]
    pub name: String,
}

/// The one-sentence user-story framing rendered into each item file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStory {
    /// Target user ("as a ...")
    #[serde(rename = "as", default)]
    pub as_role: String,
    /// Desired capability ("I want ...")
    #[serde(default)]
    pub want: String,
    /// Business value ("so that ...")
    #[serde(default)]
    pub so_that: String,
}

/// Structured notes carried on a story for downstream breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notes {
    #[serde(default)]
    pub data_model: String,
    #[serde(default)]
    pub api: String,
    #[serde(default)]
    pub edge_cases: String,
    #[serde(default)]
    pub rollback: String,
}

/// A leaf work item. Every story resolves to a capability id and a milestone
/// id; the assembler fabricates placeholders rather than dropping a story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    /// Unique identifier (e.g., "US-001")
    pub id: String,

    /// Owning epic id (e.g., "E-001")
    pub epic: String,

    /// Owning capability id (e.g., "C-001")
    pub capability: String,

    /// Delivery milestone id (e.g., "M-001")
    pub milestone: String,

    /// Story title
    pub title: String,

    /// Current status
    #[serde(default)]
    pub status: StoryStatus,

    /// Completion percentage (0-100)
    #[serde(default)]
    pub progress: u8,

    /// Relative effort estimate
    #[serde(default = "default_effort")]
    pub effort: u32,

    /// Tags for categorization
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Epic display title, used when materializing the tree view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epic_title: Option<String>,

    /// Capability display title, used when materializing the tree view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability_title: Option<String>,

    /// User-story framing for the item file body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_story: Option<UserStory>,

    /// Acceptance criteria checklist
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acceptance: Vec<String>,

    /// Structured notes for the item file body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Notes>,
}

fn default_effort() -> u32 {
    1
}

impl Story {
    /// Create a new story with required ids and title; everything else defaults.
    pub fn new(id: String, epic: String, capability: String, milestone: String, title: String) -> Self {
        Self {
            id,
            epic,
            capability,
            milestone,
            title,
            status: StoryStatus::default(),
            progress: 0,
            effort: 1,
            tags: Vec::new(),
            epic_title: None,
            capability_title: None,
            user_story: None,
            acceptance: Vec::new(),
            notes: None,
        }
    }
}

/// A dependency reference carried on a capability.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependsOn {
    /// Id of the depended-upon entity
    pub id: String,

    /// Why the dependency exists (rendered as the edge label)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A mid-level planning unit. Owned by exactly one epic in the tree view, but
/// addressed purely by id in the dependency view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    /// Unique identifier (e.g., "C-001")
    pub id: String,

    /// Capability title
    #[serde(default)]
    pub title: String,

    /// Only `blocked` is representable; `None` means normal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CapabilityStatus>,

    /// Why the capability is blocked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,

    /// Entities this capability depends on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<DependsOn>,
}

impl Capability {
    /// Create a minimal capability stub for an id referenced only by edges.
    pub fn stub(id: String) -> Self {
        Self {
            id,
            title: String::new(),
            status: None,
            blocked_reason: None,
            depends_on: Vec::new(),
        }
    }
}

/// A dependency source outside the planning tree. Sink-only: externals never
/// carry their own `depends_on`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct External {
    /// Unique identifier (e.g., "EXT-001")
    pub id: String,

    /// External title
    #[serde(default)]
    pub title: String,
}

/// A directed "depends upon" edge. Direction runs from the depended-upon
/// entity to the dependent capability.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DependencyEdge {
    /// Dedup key: edges are a set over this triple.
    pub fn key(&self) -> (String, String, String) {
        (
            self.from.clone(),
            self.to.clone(),
            self.reason.clone().unwrap_or_default(),
        )
    }
}

/// A single line item on a milestone timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneItem {
    /// Item id (usually a capability id)
    pub id: String,

    /// Item title
    #[serde(default)]
    pub title: String,

    /// Window start (YYYY-MM-DD)
    #[serde(default)]
    pub start: String,

    /// Window end (YYYY-MM-DD)
    #[serde(default)]
    pub end: String,

    /// Optional status shading for the timeline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
}

/// The single exit checkpoint on a milestone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: String,
}

/// A time-boxed delivery unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Unique identifier (e.g., "M-001")
    pub id: String,

    /// Milestone title
    #[serde(default)]
    pub title: String,

    /// Window start (YYYY-MM-DD)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    /// Window end (YYYY-MM-DD)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,

    /// Ordered line items
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<MilestoneItem>,

    /// Optional single checkpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<Checkpoint>,

    /// Scope list for the overlay table
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<String>,

    /// Definition of done
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dod: Option<String>,
}

impl Milestone {
    /// Create an empty milestone with just an id.
    pub fn stub(id: String) -> Self {
        Self {
            id,
            title: String::new(),
            start: None,
            end: None,
            items: Vec::new(),
            checkpoint: None,
            scope: Vec::new(),
            dod: None,
        }
    }
}

/// A member module or node inside an architecture grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchNode {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// An architecture grouping: a layer in the layered view, or a boundary in
/// the container view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchGroup {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<ArchNode>,
}

/// An edge between architecture nodes, collected outside the groupings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArchEdge {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ArchEdge {
    pub fn key(&self) -> (String, String, String) {
        (
            self.from.clone(),
            self.to.clone(),
            self.label.clone().unwrap_or_default(),
        )
    }
}

/// The boundary/container sub-view of the architecture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Containers {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boundaries: Vec<ArchGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<ArchEdge>,
}

/// Both architecture views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layers: Vec<ArchGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layer_edges: Vec<ArchEdge>,
    #[serde(default)]
    pub containers: Containers,
}

/// The unified project model. Always reconstructed fresh from document text
/// for each merge invocation; it persists only as the rendered text itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    #[serde(default)]
    pub project: Project,
    #[serde(default)]
    pub stories: Vec<Story>,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub externals: Vec<External>,
    #[serde(default)]
    pub edges: Vec<DependencyEdge>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub architecture: Architecture,
}

impl Model {
    /// All dependency edges as a set, combining explicit edges with edges
    /// implied by capability `depends_on` lists. Used for dedup and for
    /// order-insensitive equality in round-trip checks.
    pub fn dependency_edge_set(&self) -> std::collections::BTreeSet<(String, String, String)> {
        let mut set: std::collections::BTreeSet<(String, String, String)> = self
            .edges
            .iter()
            .map(|e| e.key())
            .collect();
        for cap in &self.capabilities {
            for dep in &cap.depends_on {
                set.insert((
                    dep.id.clone(),
                    cap.id.clone(),
                    dep.reason.clone().unwrap_or_default(),
                ));
            }
        }
        set
    }

    /// True if the model carries an external with this id.
    pub fn is_external(&self, id: &str) -> bool {
        self.externals.iter().any(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_story_status_normalize() {
        assert_eq!(StoryStatus::normalize("doing"), StoryStatus::Doing);
        assert_eq!(StoryStatus::normalize("DONE"), StoryStatus::Done);
        assert_eq!(StoryStatus::normalize(" blocked "), StoryStatus::Blocked);
        assert_eq!(StoryStatus::normalize("todo"), StoryStatus::Todo);
        // Unrecognized values normalize to todo, never an error.
        assert_eq!(StoryStatus::normalize("in_review"), StoryStatus::Todo);
        assert_eq!(StoryStatus::normalize(""), StoryStatus::Todo);
    }

    #[test]
    fn test_story_status_serialization() {
        let json = serde_json::to_string(&StoryStatus::Doing).unwrap();
        assert_eq!(json, r#""doing""#);
    }

    #[test]
    fn test_item_status_tokens() {
        assert_eq!(ItemStatus::Doing.token(), "active");
        assert_eq!(ItemStatus::Blocked.token(), "crit");
        assert_eq!(ItemStatus::from_token("done"), Some(ItemStatus::Done));
        assert_eq!(ItemStatus::from_token("milestone"), None);
    }

    #[test]
    fn test_story_serialization_roundtrip() {
        let story = Story::new(
            "US-001".to_string(),
            "E-001".to_string(),
            "C-001".to_string(),
            "M-001".to_string(),
            "First story".to_string(),
        );
        let json = serde_json::to_string(&story).unwrap();
        let back: Story = serde_json::from_str(&json).unwrap();
        assert_eq!(story, back);
    }

    #[test]
    fn test_story_default_effort() {
        let json = r#"{"id":"US-9","epic":"E-1","capability":"C-1","milestone":"M-1","title":"t"}"#;
        let story: Story = serde_json::from_str(json).unwrap();
        assert_eq!(story.effort, 1);
        assert_eq!(story.status, StoryStatus::Todo);
        assert_eq!(story.progress, 0);
    }

    #[test]
    fn test_edge_key_and_set() {
        let mut model = Model::default();
        model.capabilities.push(Capability {
            id: "C-2".to_string(),
            title: "Two".to_string(),
            status: None,
            blocked_reason: None,
            depends_on: vec![DependsOn {
                id: "C-1".to_string(),
                reason: Some("needs data".to_string()),
            }],
        });
        model.edges.push(DependencyEdge {
            from: "C-1".to_string(),
            to: "C-2".to_string(),
            reason: Some("needs data".to_string()),
        });
        // The explicit edge and the depends_on entry describe the same edge.
        assert_eq!(model.dependency_edge_set().len(), 1);
    }

    #[test]
    fn test_model_snapshot_roundtrip() {
        let mut model = Model::default();
        model.project.name = "Demo".to_string();
        model.milestones.push(Milestone {
            id: "M-1".to_string(),
            title: "Alpha".to_string(),
            start: Some("2026-01-01".to_string()),
            end: Some("2026-02-01".to_string()),
            items: vec![MilestoneItem {
                id: "C-1".to_string(),
                title: "Data layer".to_string(),
                start: "2026-01-01".to_string(),
                end: "2026-01-15".to_string(),
                status: Some(ItemStatus::Doing),
            }],
            checkpoint: Some(Checkpoint {
                title: "Alpha exit review".to_string(),
                date: "2026-02-05".to_string(),
            }),
            scope: vec!["E-001".to_string()],
            dod: Some("All acceptance criteria pass".to_string()),
        });
        let json = serde_json::to_string(&model).unwrap();
        let back: Model = serde_json::from_str(&json).unwrap();
        assert_eq!(model, back);
    }
}
