//! The merge engine: reconciles an existing model with an incoming patch.
//!
//! Two modes. **Generate** wholly replaces the existing model with the
//! promoted patch, used for first-time scaffolding. **Append** reconciles
//! field by field, per entity collection, keyed by id: new ids are created,
//! missing ids are warned and skipped, and changed fields either apply
//! unconditionally (safe fields) or raise a conflict (conflict-sensitive
//! fields) when the current value is non-empty.
//!
//! Conflict resolution precedence: an explicit per-conflict resolution
//! (keyed `entity_type:id:field`) wins; otherwise the invocation's default
//! policy applies; `prompt` with no matching resolution leaves the conflict
//! unresolved, which turns the overall status to `needs_resolution` and
//! gates the write path.

mod report;

pub use report::{MergeReport, MergeStatus, ReportEntry};

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::models::patch::{clamp_progress, ModelPatch};
use crate::models::{CapabilityStatus, DependsOn, Model, StoryStatus};
use crate::{Error, Result};

/// How a merge treats the existing model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Incoming model wholly replaces the existing one.
    Generate,
    /// Field-level reconciliation against the existing model.
    Append,
}

/// Default disposition for conflicts without an explicit resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Policy {
    /// Keep the existing value.
    #[default]
    KeepOld,
    /// Take the incoming value.
    UseNew,
    /// Leave unresolved; the caller must supply resolutions and re-invoke.
    Prompt,
}

impl Policy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::KeepOld => "keep-old",
            Policy::UseNew => "use-new",
            Policy::Prompt => "prompt",
        }
    }
}

/// Disposition for one specific conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionAction {
    KeepOld,
    UseNew,
    Manual(String),
}

/// Explicit per-conflict resolutions, keyed `entity_type:id:field`.
#[derive(Debug, Clone, Default)]
pub struct Resolutions {
    map: BTreeMap<String, ResolutionAction>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawResolution {
    Token(String),
    Object {
        action: String,
        #[serde(default)]
        value: Option<String>,
    },
}

impl Resolutions {
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn insert(&mut self, key: String, action: ResolutionAction) {
        self.map.insert(key, action);
    }

    pub fn get(&self, key: &str) -> Option<&ResolutionAction> {
        self.map.get(key)
    }

    /// Load a resolutions mapping from a YAML or JSON file. Values are
    /// either a bare action token or `{action: manual, value: ...}`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let entries: BTreeMap<String, RawResolution> = serde_yaml::from_str(&raw)?;
        let mut resolutions = Self::default();
        for (key, raw) in entries {
            let action = match raw {
                RawResolution::Token(token) => action_from_token(&token, None)?,
                RawResolution::Object { action, value } => action_from_token(&action, value)?,
            };
            resolutions.insert(key, action);
        }
        Ok(resolutions)
    }

    /// Parse a command-line resolution spec:
    /// `entity_type:id:field=keep_old|use_new|manual:<value>`.
    pub fn parse_spec(spec: &str) -> Result<(String, ResolutionAction)> {
        let (key, action) = spec.split_once('=').ok_or_else(|| {
            Error::InvalidInput(format!("resolution '{}' is missing '='", spec))
        })?;
        if key.splitn(3, ':').count() != 3 {
            return Err(Error::InvalidInput(format!(
                "resolution key '{}' must be entity_type:id:field",
                key
            )));
        }
        let action = match action.split_once(':') {
            Some(("manual", value)) => ResolutionAction::Manual(value.to_string()),
            _ => action_from_token(action, None)?,
        };
        Ok((key.to_string(), action))
    }
}

fn action_from_token(token: &str, value: Option<String>) -> Result<ResolutionAction> {
    match token {
        "keep_old" => Ok(ResolutionAction::KeepOld),
        "use_new" => Ok(ResolutionAction::UseNew),
        "manual" => value.map(ResolutionAction::Manual).ok_or_else(|| {
            Error::InvalidInput("manual resolution requires a value".to_string())
        }),
        other => Err(Error::InvalidInput(format!(
            "unknown resolution action '{}'",
            other
        ))),
    }
}

/// Merge an incoming patch into an existing model. Always returns the
/// best-effort merged model and a full report; unresolved conflicts are
/// reflected in the report status, never as an error.
pub fn merge(
    existing: &Model,
    patch: ModelPatch,
    mode: MergeMode,
    policy: Policy,
    resolutions: &Resolutions,
) -> (Model, MergeReport) {
    let mut merger = Merger {
        policy,
        resolutions,
        report: MergeReport::default(),
    };
    let model = match mode {
        MergeMode::Generate => merger.generate(patch),
        MergeMode::Append => merger.append(existing.clone(), patch),
    };
    let mut report = merger.report;
    report.finalize();
    (model, report)
}

struct Merger<'a> {
    policy: Policy,
    resolutions: &'a Resolutions,
    report: MergeReport,
}

impl Merger<'_> {
    fn generate(&mut self, patch: ModelPatch) -> Model {
        let model = patch.into_model(&mut self.report.warnings);
        for story in &model.stories {
            self.report.created.push(ReportEntry::entity("story", &story.id));
        }
        for cap in &model.capabilities {
            self.report
                .created
                .push(ReportEntry::entity("capability", &cap.id));
        }
        for ext in &model.externals {
            self.report
                .created
                .push(ReportEntry::entity("external", &ext.id));
        }
        for ms in &model.milestones {
            self.report
                .created
                .push(ReportEntry::entity("milestone", &ms.id));
        }
        for layer in &model.architecture.layers {
            self.report.created.push(ReportEntry::entity("layer", &layer.id));
        }
        for boundary in &model.architecture.containers.boundaries {
            self.report
                .created
                .push(ReportEntry::entity("boundary", &boundary.id));
        }
        model
    }

    fn append(&mut self, mut model: Model, patch: ModelPatch) -> Model {
        if let Some(name) = patch.project.and_then(|p| p.name) {
            if !name.trim().is_empty() && name != model.project.name {
                model.project.name = name;
                self.report.updated.push(ReportEntry::entity("project", ""));
            }
        }
        self.merge_stories(&mut model, patch.stories);
        self.merge_capabilities(&mut model, patch.dependencies.capabilities);
        self.merge_externals(&mut model, patch.dependencies.externals);
        self.merge_edges(&mut model, patch.dependencies.edges);
        self.merge_milestones(&mut model, patch.milestones);
        self.merge_architecture(&mut model, patch.architecture);
        model
    }

    fn merge_stories(&mut self, model: &mut Model, patches: Vec<crate::models::patch::StoryPatch>) {
        for sp in patches {
            let Some(id) = sp.id.clone().filter(|i| !i.trim().is_empty()) else {
                self.report.warnings.push(ReportEntry::warning(
                    "story",
                    "",
                    "story without id skipped",
                ));
                continue;
            };
            let Some(pos) = model.stories.iter().position(|s| s.id == id) else {
                let story = sp.into_story(&id, &mut self.report.warnings);
                model.stories.push(story);
                self.report.created.push(ReportEntry::entity("story", &id));
                continue;
            };
            let mut changed = false;
            {
                // Conflict-sensitive fields first.
                let story = &mut model.stories[pos];
                let mut title = story.title.clone();
                let mut capability = story.capability.clone();
                let mut milestone = story.milestone.clone();
                let mut epic = story.epic.clone();
                if let Some(v) = sp.title.filter(|v| !v.trim().is_empty()) {
                    changed |= self.sensitive("story", &id, "title", &mut title, v);
                }
                if let Some(v) = sp.capability.filter(|v| !v.trim().is_empty()) {
                    changed |= self.sensitive("story", &id, "capability", &mut capability, v);
                }
                if let Some(v) = sp.milestone.filter(|v| !v.trim().is_empty()) {
                    changed |= self.sensitive("story", &id, "milestone", &mut milestone, v);
                }
                if let Some(v) = sp.epic.filter(|v| !v.trim().is_empty()) {
                    changed |= self.sensitive("story", &id, "epic", &mut epic, v);
                }
                model.stories[pos].title = title;
                model.stories[pos].capability = capability;
                model.stories[pos].milestone = milestone;
                model.stories[pos].epic = epic;
            }
            let progress = sp
                .progress
                .map(|p| clamp_progress(p, "story", &id, &mut self.report.warnings));
            let story = &mut model.stories[pos];
            // Safe fields apply unconditionally.
            if let Some(v) = sp.status {
                let status = StoryStatus::normalize(&v);
                if story.status != status {
                    story.status = status;
                    changed = true;
                }
            }
            if let Some(p) = progress {
                if story.progress != p {
                    story.progress = p;
                    changed = true;
                }
            }
            if let Some(e) = sp.effort {
                let e = e.max(0) as u32;
                if story.effort != e {
                    story.effort = e;
                    changed = true;
                }
            }
            if let Some(tags) = sp.tags {
                if story.tags != tags {
                    story.tags = tags;
                    changed = true;
                }
            }
            changed |= apply_opt(&mut story.epic_title, sp.epic_title);
            changed |= apply_opt(&mut story.capability_title, sp.capability_title);
            if let Some(us) = sp.user_story {
                if story.user_story.as_ref() != Some(&us) {
                    story.user_story = Some(us);
                    changed = true;
                }
            }
            if let Some(acceptance) = sp.acceptance {
                if story.acceptance != acceptance {
                    story.acceptance = acceptance;
                    changed = true;
                }
            }
            if let Some(notes) = sp.notes {
                if story.notes.as_ref() != Some(&notes) {
                    story.notes = Some(notes);
                    changed = true;
                }
            }
            self.touched("story", &id, changed);
        }
    }

    fn merge_capabilities(
        &mut self,
        model: &mut Model,
        patches: Vec<crate::models::patch::CapabilityPatch>,
    ) {
        for cp in patches {
            let Some(id) = cp.id.clone().filter(|i| !i.trim().is_empty()) else {
                self.report.warnings.push(ReportEntry::warning(
                    "capability",
                    "",
                    "capability without id skipped",
                ));
                continue;
            };
            let Some(pos) = model.capabilities.iter().position(|c| c.id == id) else {
                model.capabilities.push(cp.into_capability(&id));
                self.report
                    .created
                    .push(ReportEntry::entity("capability", &id));
                continue;
            };
            let mut changed = false;
            let cap = &mut model.capabilities[pos];
            let mut title = cap.title.clone();
            if let Some(v) = cp.title.filter(|v| !v.trim().is_empty()) {
                changed |= self.sensitive("capability", &id, "title", &mut title, v);
            }
            model.capabilities[pos].title = title;

            if let Some(v) = cp.status {
                // Only `blocked` is representable; anything else clears it.
                let mut current = match model.capabilities[pos].status {
                    Some(CapabilityStatus::Blocked) => "blocked".to_string(),
                    None => String::new(),
                };
                let incoming = if v.trim().eq_ignore_ascii_case("blocked") {
                    "blocked".to_string()
                } else {
                    String::new()
                };
                changed |= self.sensitive("capability", &id, "status", &mut current, incoming);
                model.capabilities[pos].status = if current == "blocked" {
                    Some(CapabilityStatus::Blocked)
                } else {
                    None
                };
            }
            if let Some(v) = cp.blocked_reason.filter(|v| !v.trim().is_empty()) {
                let mut current = model.capabilities[pos]
                    .blocked_reason
                    .clone()
                    .unwrap_or_default();
                changed |=
                    self.sensitive("capability", &id, "blocked_reason", &mut current, v);
                model.capabilities[pos].blocked_reason =
                    Some(current).filter(|r| !r.is_empty());
                if model.capabilities[pos].blocked_reason.is_some() {
                    model.capabilities[pos].status = Some(CapabilityStatus::Blocked);
                }
            }
            if let Some(deps) = cp.depends_on {
                let cap = &mut model.capabilities[pos];
                for dep in deps {
                    let dep = dep.into_depends_on();
                    if dep.id.trim().is_empty() {
                        continue;
                    }
                    if !cap
                        .depends_on
                        .iter()
                        .any(|d| d.id == dep.id && d.reason == dep.reason)
                    {
                        cap.depends_on.push(dep);
                        changed = true;
                    }
                }
            }
            self.touched("capability", &id, changed);
        }
    }

    fn merge_externals(
        &mut self,
        model: &mut Model,
        patches: Vec<crate::models::patch::ExternalPatch>,
    ) {
        for ep in patches {
            let Some(id) = ep.id.clone().filter(|i| !i.trim().is_empty()) else {
                self.report.warnings.push(ReportEntry::warning(
                    "external",
                    "",
                    "external without id skipped",
                ));
                continue;
            };
            let Some(pos) = model.externals.iter().position(|e| e.id == id) else {
                model.externals.push(ep.into_external(&id));
                self.report
                    .created
                    .push(ReportEntry::entity("external", &id));
                continue;
            };
            let mut changed = false;
            if let Some(title) = ep.title.filter(|t| !t.trim().is_empty()) {
                if model.externals[pos].title != title {
                    model.externals[pos].title = title;
                    changed = true;
                }
            }
            self.touched("external", &id, changed);
        }
    }

    /// Edges merge by set union over (from, to, reason); duplicates collapse
    /// silently and no conflict is possible. Capability-to-capability edges
    /// land on the target's `depends_on`; edges touching an external stay in
    /// the loose edge list.
    fn merge_edges(&mut self, model: &mut Model, patches: Vec<crate::models::patch::EdgePatch>) {
        for ep in patches {
            let Some(edge) = ep.into_edge() else { continue };
            let existing = model.dependency_edge_set();
            if existing.contains(&edge.key()) {
                continue;
            }
            let label = format!("{}->{}", edge.from, edge.to);
            if model.is_external(&edge.from) || model.is_external(&edge.to) {
                model.edges.push(edge);
            } else {
                if !model.capabilities.iter().any(|c| c.id == edge.to) {
                    model
                        .capabilities
                        .push(crate::models::Capability::stub(edge.to.clone()));
                    self.report
                        .created
                        .push(ReportEntry::entity("capability", &edge.to));
                }
                if !model.capabilities.iter().any(|c| c.id == edge.from) {
                    model
                        .capabilities
                        .push(crate::models::Capability::stub(edge.from.clone()));
                    self.report
                        .created
                        .push(ReportEntry::entity("capability", &edge.from));
                }
                if let Some(target) = model.capabilities.iter_mut().find(|c| c.id == edge.to) {
                    target.depends_on.push(DependsOn {
                        id: edge.from,
                        reason: edge.reason,
                    });
                }
            }
            self.report.created.push(ReportEntry::entity("edge", &label));
        }
    }

    fn merge_milestones(
        &mut self,
        model: &mut Model,
        patches: Vec<crate::models::patch::MilestonePatch>,
    ) {
        for mp in patches {
            let Some(id) = mp.id.clone().filter(|i| !i.trim().is_empty()) else {
                self.report.warnings.push(ReportEntry::warning(
                    "milestone",
                    "",
                    "milestone without id skipped",
                ));
                continue;
            };
            let Some(pos) = model.milestones.iter().position(|m| m.id == id) else {
                model.milestones.push(mp.into_milestone(&id));
                self.report
                    .created
                    .push(ReportEntry::entity("milestone", &id));
                continue;
            };
            let mut changed = false;
            let mut title = model.milestones[pos].title.clone();
            if let Some(v) = mp.title.filter(|v| !v.trim().is_empty()) {
                changed |= self.sensitive("milestone", &id, "title", &mut title, v);
            }
            model.milestones[pos].title = title;

            let mut start = model.milestones[pos].start.clone().unwrap_or_default();
            if let Some(v) = mp.start.filter(|v| !v.trim().is_empty()) {
                changed |= self.sensitive("milestone", &id, "start", &mut start, v);
            }
            model.milestones[pos].start = Some(start).filter(|s| !s.is_empty());

            let mut end = model.milestones[pos].end.clone().unwrap_or_default();
            if let Some(v) = mp.end.filter(|v| !v.trim().is_empty()) {
                changed |= self.sensitive("milestone", &id, "end", &mut end, v);
            }
            model.milestones[pos].end = Some(end).filter(|e| !e.is_empty());

            let mut dod = model.milestones[pos].dod.clone().unwrap_or_default();
            if let Some(v) = mp.dod.filter(|v| !v.trim().is_empty()) {
                changed |= self.sensitive("milestone", &id, "dod", &mut dod, v);
            }
            model.milestones[pos].dod = Some(dod).filter(|d| !d.is_empty());

            let milestone = &mut model.milestones[pos];
            if let Some(items) = mp.items {
                for ip in items {
                    let Some(item) = ip.into_item() else { continue };
                    match milestone.items.iter_mut().find(|i| i.id == item.id) {
                        Some(existing) => {
                            if !item.title.is_empty() && existing.title != item.title {
                                existing.title = item.title;
                                changed = true;
                            }
                            if !item.start.is_empty() && existing.start != item.start {
                                existing.start = item.start;
                                changed = true;
                            }
                            if !item.end.is_empty() && existing.end != item.end {
                                existing.end = item.end;
                                changed = true;
                            }
                            if item.status.is_some() && existing.status != item.status {
                                existing.status = item.status;
                                changed = true;
                            }
                        }
                        None => {
                            milestone.items.push(item);
                            changed = true;
                        }
                    }
                }
            }
            if let Some(cp) = mp.checkpoint {
                if let Some(checkpoint) = cp.into_checkpoint() {
                    if milestone.checkpoint.as_ref() != Some(&checkpoint) {
                        milestone.checkpoint = Some(checkpoint);
                        changed = true;
                    }
                }
            }
            if let Some(scope) = mp.scope {
                if !scope.is_empty() && milestone.scope != scope {
                    milestone.scope = scope;
                    changed = true;
                }
            }
            self.touched("milestone", &id, changed);
        }
    }

    fn merge_architecture(
        &mut self,
        model: &mut Model,
        patch: crate::models::patch::ArchitecturePatch,
    ) {
        Self::merge_groups(
            &mut self.report,
            "layer",
            &mut model.architecture.layers,
            patch.layers,
        );
        Self::merge_arch_edges(&mut model.architecture.layer_edges, patch.layer_edges);
        Self::merge_groups(
            &mut self.report,
            "boundary",
            &mut model.architecture.containers.boundaries,
            patch.containers.boundaries,
        );
        Self::merge_arch_edges(
            &mut model.architecture.containers.edges,
            patch.containers.edges,
        );
    }

    /// Architecture groups merge as id-keyed lists; titles and member titles
    /// are safe fields.
    fn merge_groups(
        report: &mut MergeReport,
        entity_type: &str,
        groups: &mut Vec<crate::models::ArchGroup>,
        patches: Vec<crate::models::patch::GroupPatch>,
    ) {
        for gp in patches {
            let Some(id) = gp.id.clone().filter(|i| !i.trim().is_empty()) else {
                report.warnings.push(ReportEntry::warning(
                    entity_type,
                    "",
                    &format!("{} without id skipped", entity_type),
                ));
                continue;
            };
            let Some(pos) = groups.iter().position(|g| g.id == id) else {
                groups.push(gp.into_group(&id));
                report.created.push(ReportEntry::entity(entity_type, &id));
                continue;
            };
            let mut changed = false;
            let group = &mut groups[pos];
            if let Some(title) = gp.title.filter(|t| !t.trim().is_empty()) {
                if group.title != title {
                    group.title = title;
                    changed = true;
                }
            }
            for np in gp.nodes.unwrap_or_default() {
                let Some(node) = np.into_node() else { continue };
                match group.nodes.iter_mut().find(|n| n.id == node.id) {
                    Some(existing) => {
                        if !node.title.is_empty() && existing.title != node.title {
                            existing.title = node.title;
                            changed = true;
                        }
                    }
                    None => {
                        group.nodes.push(node);
                        changed = true;
                    }
                }
            }
            if changed {
                report.updated.push(ReportEntry::entity(entity_type, &id));
            } else {
                report.unchanged.push(ReportEntry::entity(entity_type, &id));
            }
        }
    }

    /// Loose architecture edge lists merge as value unions over
    /// (from, to, label).
    fn merge_arch_edges(
        edges: &mut Vec<crate::models::ArchEdge>,
        patches: Vec<crate::models::patch::ArchEdgePatch>,
    ) {
        for ep in patches {
            let Some(edge) = ep.into_edge() else { continue };
            if !edges.iter().any(|e| e.key() == edge.key()) {
                edges.push(edge);
            }
        }
    }

    /// Merge one conflict-sensitive field. An empty current value is filled
    /// silently; a differing non-empty current value raises a conflict and
    /// goes through resolution. Returns whether the value changed.
    fn sensitive(
        &mut self,
        entity_type: &str,
        id: &str,
        field: &str,
        current: &mut String,
        incoming: String,
    ) -> bool {
        if incoming == *current {
            return false;
        }
        if current.trim().is_empty() {
            *current = incoming;
            return true;
        }
        let mut entry = ReportEntry::conflict(entity_type, id, field, current, &incoming);
        let key = entry.conflict_key();
        let outcome = match self.resolutions.get(&key) {
            Some(ResolutionAction::KeepOld) => {
                entry.action = Some("keep_old".to_string());
                Some(None)
            }
            Some(ResolutionAction::UseNew) => {
                entry.action = Some("use_new".to_string());
                Some(Some(incoming))
            }
            Some(ResolutionAction::Manual(value)) => {
                entry.action = Some("manual".to_string());
                Some(Some(value.clone()))
            }
            None => match self.policy {
                Policy::KeepOld => {
                    entry.action = Some("keep_old(default)".to_string());
                    Some(None)
                }
                Policy::UseNew => {
                    entry.action = Some("use_new(default)".to_string());
                    Some(Some(incoming))
                }
                Policy::Prompt => None,
            },
        };
        match outcome {
            Some(resolution) => {
                entry.resolved = Some(true);
                self.report.conflicts.push(entry.clone());
                self.report.conflicts_resolved.push(entry);
                match resolution {
                    Some(value) if value != *current => {
                        *current = value;
                        true
                    }
                    _ => false,
                }
            }
            None => {
                entry.resolved = Some(false);
                self.report.conflicts.push(entry.clone());
                self.report.conflicts_unresolved.push(entry);
                false
            }
        }
    }

    fn touched(&mut self, entity_type: &str, id: &str, changed: bool) {
        if changed {
            self.report.updated.push(ReportEntry::entity(entity_type, id));
        } else {
            self.report
                .unchanged
                .push(ReportEntry::entity(entity_type, id));
        }
    }
}

/// Apply an optional incoming value over an optional current value; empty
/// incoming strings are ignored.
fn apply_opt(current: &mut Option<String>, incoming: Option<String>) -> bool {
    match incoming.filter(|v| !v.trim().is_empty()) {
        Some(v) if current.as_deref() != Some(v.as_str()) => {
            *current = Some(v);
            true
        }
        _ => false,
    }
}
