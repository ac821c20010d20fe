//! Partial input types for incoming models.
//!
//! A patch is deliberately distinct from a complete entity: every field is
//! optional, and defaulting happens exactly once, when a patch is promoted to
//! a complete entity, producing warning entries instead of scattered per-field
//! fallbacks. The root input (YAML or JSON) deserializes into [`ModelPatch`];
//! a non-object root is a fatal input error.

use crate::merge::ReportEntry;
use crate::models::{
    ArchEdge, ArchGroup, ArchNode, Architecture, Capability, CapabilityStatus, Checkpoint,
    Containers, DependencyEdge, DependsOn, External, ItemStatus, Milestone, MilestoneItem, Model,
    Notes, Project, Story, StoryStatus, UserStory,
};
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Incoming (possibly partial) model, as supplied by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelPatch {
    #[serde(default)]
    pub project: Option<ProjectPatch>,
    #[serde(default)]
    pub stories: Vec<StoryPatch>,
    #[serde(default)]
    pub dependencies: DependenciesPatch,
    #[serde(default)]
    pub milestones: Vec<MilestonePatch>,
    #[serde(default)]
    pub architecture: ArchitecturePatch,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectPatch {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoryPatch {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub epic: Option<String>,
    #[serde(default)]
    pub capability: Option<String>,
    #[serde(default)]
    pub milestone: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub progress: Option<i64>,
    #[serde(default)]
    pub effort: Option<i64>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub epic_title: Option<String>,
    #[serde(default)]
    pub capability_title: Option<String>,
    #[serde(default)]
    pub user_story: Option<UserStory>,
    #[serde(default)]
    pub acceptance: Option<Vec<String>>,
    #[serde(default)]
    pub notes: Option<Notes>,
}

/// A `depends_on` entry: either a bare id or an id with a reason.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DependsOnPatch {
    Id(String),
    Full {
        id: String,
        #[serde(default)]
        reason: Option<String>,
    },
}

impl DependsOnPatch {
    pub fn into_depends_on(self) -> DependsOn {
        match self {
            DependsOnPatch::Id(id) => DependsOn { id, reason: None },
            DependsOnPatch::Full { id, reason } => DependsOn {
                id,
                reason: reason.filter(|r| !r.trim().is_empty()),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CapabilityPatch {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub blocked_reason: Option<String>,
    #[serde(default)]
    pub depends_on: Option<Vec<DependsOnPatch>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalPatch {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EdgePatch {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DependenciesPatch {
    #[serde(default)]
    pub capabilities: Vec<CapabilityPatch>,
    #[serde(default)]
    pub externals: Vec<ExternalPatch>,
    #[serde(default)]
    pub edges: Vec<EdgePatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemPatch {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckpointPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MilestonePatch {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<ItemPatch>>,
    #[serde(default)]
    pub checkpoint: Option<CheckpointPatch>,
    #[serde(default)]
    pub scope: Option<Vec<String>>,
    #[serde(default)]
    pub dod: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodePatch {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupPatch {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    // The layered view historically calls its members "modules".
    #[serde(default, alias = "modules")]
    pub nodes: Option<Vec<NodePatch>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchEdgePatch {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainersPatch {
    #[serde(default)]
    pub boundaries: Vec<GroupPatch>,
    #[serde(default)]
    pub edges: Vec<ArchEdgePatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchitecturePatch {
    #[serde(default)]
    pub layers: Vec<GroupPatch>,
    #[serde(default)]
    pub layer_edges: Vec<ArchEdgePatch>,
    #[serde(default)]
    pub containers: ContainersPatch,
}

impl ModelPatch {
    /// Load a patch from a `.yaml`/`.yml`/`.json` file. The root must be an
    /// object; anything else is a fatal input error.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if json {
            Self::from_json(&raw)
        } else {
            Self::from_yaml(&raw)
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(Error::InvalidInput(
                "input root must be an object".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(raw)?;
        if !value.is_mapping() {
            return Err(Error::InvalidInput(
                "input root must be an object".to_string(),
            ));
        }
        Ok(serde_yaml::from_value(value)?)
    }

    /// Promote the patch to a complete model, defaulting every missing field
    /// exactly once and collecting warnings. Used by generate mode; append
    /// mode promotes individual entities only when they are newly created.
    pub fn into_model(self, warnings: &mut Vec<ReportEntry>) -> Model {
        let mut model = Model {
            project: Project {
                name: self
                    .project
                    .and_then(|p| p.name)
                    .unwrap_or_else(|| "Project".to_string()),
            },
            ..Model::default()
        };

        for story in self.stories {
            match story.id.clone() {
                Some(id) => model.stories.push(story.into_story(&id, warnings)),
                None => warnings.push(ReportEntry::warning(
                    "story",
                    "",
                    "story without id skipped",
                )),
            }
        }
        for cap in self.dependencies.capabilities {
            match cap.id.clone() {
                Some(id) => model.capabilities.push(cap.into_capability(&id)),
                None => warnings.push(ReportEntry::warning(
                    "capability",
                    "",
                    "capability without id skipped",
                )),
            }
        }
        for ext in self.dependencies.externals {
            match ext.id.clone() {
                Some(id) => model.externals.push(ext.into_external(&id)),
                None => warnings.push(ReportEntry::warning(
                    "external",
                    "",
                    "external without id skipped",
                )),
            }
        }
        for edge in self.dependencies.edges {
            if let Some(edge) = edge.into_edge() {
                model.edges.push(edge);
            }
        }
        for ms in self.milestones {
            match ms.id.clone() {
                Some(id) => model.milestones.push(ms.into_milestone(&id)),
                None => warnings.push(ReportEntry::warning(
                    "milestone",
                    "",
                    "milestone without id skipped",
                )),
            }
        }
        model.architecture = self.architecture.into_architecture(warnings);
        model
    }
}

/// Clamp a raw progress value to 0..=100, warning when it was out of range.
/// Applied once, at the patch boundary.
pub fn clamp_progress(
    raw: i64,
    entity_type: &str,
    id: &str,
    warnings: &mut Vec<ReportEntry>,
) -> u8 {
    if (0..=100).contains(&raw) {
        raw as u8
    } else {
        let clamped = raw.clamp(0, 100) as u8;
        warnings.push(ReportEntry::warning(
            entity_type,
            id,
            &format!("progress {} out of range, clamped to {}", raw, clamped),
        ));
        clamped
    }
}

impl StoryPatch {
    /// Promote to a complete story. Missing capability/milestone/title are
    /// filled with synthesized defaults and a warning; a story is never
    /// silently dropped.
    pub fn into_story(self, id: &str, warnings: &mut Vec<ReportEntry>) -> Story {
        let capability = match self.capability.filter(|c| !c.trim().is_empty()) {
            Some(c) => c,
            None => {
                warnings.push(ReportEntry::warning(
                    "story",
                    id,
                    "missing capability, defaulted to C-unknown",
                ));
                "C-unknown".to_string()
            }
        };
        let milestone = match self.milestone.filter(|m| !m.trim().is_empty()) {
            Some(m) => m,
            None => {
                warnings.push(ReportEntry::warning(
                    "story",
                    id,
                    "missing milestone, defaulted to M-yyy",
                ));
                "M-yyy".to_string()
            }
        };
        let title = match self.title.filter(|t| !t.trim().is_empty()) {
            Some(t) => t,
            None => {
                warnings.push(ReportEntry::warning(
                    "story",
                    id,
                    "missing title, defaulted to Story",
                ));
                "Story".to_string()
            }
        };
        Story {
            id: id.to_string(),
            epic: self.epic.unwrap_or_else(|| "E-001".to_string()),
            capability,
            milestone,
            title,
            status: StoryStatus::normalize(self.status.as_deref().unwrap_or("todo")),
            progress: self
                .progress
                .map(|p| clamp_progress(p, "story", id, warnings))
                .unwrap_or(0),
            effort: self.effort.map(|e| e.max(0) as u32).unwrap_or(1),
            tags: self.tags.unwrap_or_default(),
            epic_title: self.epic_title,
            capability_title: self.capability_title,
            user_story: self.user_story,
            acceptance: self.acceptance.unwrap_or_default(),
            notes: self.notes,
        }
    }
}

impl CapabilityPatch {
    pub fn into_capability(self, id: &str) -> Capability {
        let blocked_reason = self.blocked_reason.filter(|r| !r.trim().is_empty());
        // A blocked reason implies blocked status, as in the dependency view.
        let status = match self.status.as_deref() {
            Some(s) if s.eq_ignore_ascii_case("blocked") => Some(CapabilityStatus::Blocked),
            _ if blocked_reason.is_some() => Some(CapabilityStatus::Blocked),
            _ => None,
        };
        Capability {
            id: id.to_string(),
            title: self.title.unwrap_or_default(),
            status,
            blocked_reason,
            depends_on: self
                .depends_on
                .unwrap_or_default()
                .into_iter()
                .map(DependsOnPatch::into_depends_on)
                .filter(|d| !d.id.trim().is_empty())
                .collect(),
        }
    }
}

impl ExternalPatch {
    pub fn into_external(self, id: &str) -> External {
        External {
            id: id.to_string(),
            title: self.title.unwrap_or_default(),
        }
    }
}

impl EdgePatch {
    /// Edges without both endpoints are dropped silently, matching the
    /// tolerant parse policy.
    pub fn into_edge(self) -> Option<DependencyEdge> {
        let from = self.from.filter(|f| !f.trim().is_empty())?;
        let to = self.to.filter(|t| !t.trim().is_empty())?;
        Some(DependencyEdge {
            from,
            to,
            reason: self.reason.filter(|r| !r.trim().is_empty()),
        })
    }
}

impl MilestonePatch {
    pub fn into_milestone(self, id: &str) -> Milestone {
        Milestone {
            id: id.to_string(),
            title: self.title.unwrap_or_default(),
            start: self.start.filter(|s| !s.trim().is_empty()),
            end: self.end.filter(|e| !e.trim().is_empty()),
            items: self
                .items
                .unwrap_or_default()
                .into_iter()
                .filter_map(ItemPatch::into_item)
                .collect(),
            checkpoint: self.checkpoint.and_then(CheckpointPatch::into_checkpoint),
            scope: self.scope.unwrap_or_default(),
            dod: self.dod.filter(|d| !d.trim().is_empty()),
        }
    }
}

impl ItemPatch {
    pub fn into_item(self) -> Option<MilestoneItem> {
        let id = self.id.filter(|i| !i.trim().is_empty())?;
        Some(MilestoneItem {
            id,
            title: self.title.unwrap_or_default(),
            start: self.start.unwrap_or_default(),
            end: self.end.unwrap_or_default(),
            status: self
                .status
                .as_deref()
                .and_then(|s| match s.trim().to_lowercase().as_str() {
                    "doing" => Some(ItemStatus::Doing),
                    "done" => Some(ItemStatus::Done),
                    "blocked" => Some(ItemStatus::Blocked),
                    _ => None,
                }),
        })
    }
}

impl CheckpointPatch {
    /// A checkpoint without a date is meaningless and dropped.
    pub fn into_checkpoint(self) -> Option<Checkpoint> {
        let date = self.date.filter(|d| !d.trim().is_empty())?;
        Some(Checkpoint {
            title: self.title.unwrap_or_default(),
            date,
        })
    }
}

impl NodePatch {
    pub fn into_node(self) -> Option<ArchNode> {
        let id = self.id.filter(|i| !i.trim().is_empty())?;
        Some(ArchNode {
            id,
            title: self.title.unwrap_or_default(),
        })
    }
}

impl GroupPatch {
    pub fn into_group(self, id: &str) -> ArchGroup {
        ArchGroup {
            id: id.to_string(),
            title: self.title.unwrap_or_default(),
            nodes: self
                .nodes
                .unwrap_or_default()
                .into_iter()
                .filter_map(NodePatch::into_node)
                .collect(),
        }
    }
}

impl ArchEdgePatch {
    pub fn into_edge(self) -> Option<ArchEdge> {
        let from = self.from.filter(|f| !f.trim().is_empty())?;
        let to = self.to.filter(|t| !t.trim().is_empty())?;
        Some(ArchEdge {
            from,
            to,
            label: self.label.filter(|l| !l.trim().is_empty()),
        })
    }
}

impl ArchitecturePatch {
    pub fn into_architecture(self, warnings: &mut Vec<ReportEntry>) -> Architecture {
        let mut arch = Architecture::default();
        for layer in self.layers {
            match layer.id.clone() {
                Some(id) => arch.layers.push(layer.into_group(&id)),
                None => warnings.push(ReportEntry::warning(
                    "layer",
                    "",
                    "layer without id skipped",
                )),
            }
        }
        arch.layer_edges = self
            .layer_edges
            .into_iter()
            .filter_map(ArchEdgePatch::into_edge)
            .collect();
        let mut containers = Containers::default();
        for boundary in self.containers.boundaries {
            match boundary.id.clone() {
                Some(id) => containers.boundaries.push(boundary.into_group(&id)),
                None => warnings.push(ReportEntry::warning(
                    "boundary",
                    "",
                    "boundary without id skipped",
                )),
            }
        }
        containers.edges = self
            .containers
            .edges
            .into_iter()
            .filter_map(ArchEdgePatch::into_edge)
            .collect();
        arch.containers = containers;
        arch
    }
}
