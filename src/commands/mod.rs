//! Command implementations for the blueprint CLI.
//!
//! Each command returns a typed result implementing [`Output`], so the
//! binary can print JSON for tooling or a human-readable summary. Commands
//! never print themselves.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::assemble::assemble;
use crate::docset::{self, Layout};
use crate::markers::Markers;
use crate::merge::{merge, MergeMode, MergeReport, MergeStatus, Policy, Resolutions};
use crate::models::patch::ModelPatch;
use crate::models::Model;
use crate::Result;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

/// Outcome of a `generate` or `append` invocation.
#[derive(Debug, Serialize)]
pub struct MergeOutcome {
    pub report: MergeReport,
    /// Files a real run would create, rewrite, or delete
    pub changed_files: Vec<PathBuf>,
    pub dry_run: bool,
    /// False when unresolved conflicts gated the write
    pub written: bool,
}

impl MergeOutcome {
    pub fn status(&self) -> MergeStatus {
        self.report.status
    }
}

impl Output for MergeOutcome {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
    }

    fn to_human(&self) -> String {
        let r = &self.report;
        let mut out = format!(
            "status: {}\ncreated: {}  updated: {}  unchanged: {}\nconflicts: {} ({} resolved, {} unresolved)\nwarnings: {}\n",
            r.status.as_str(),
            r.created.len(),
            r.updated.len(),
            r.unchanged.len(),
            r.conflicts.len(),
            r.conflicts_resolved.len(),
            r.conflicts_unresolved.len(),
            r.warnings.len(),
        );
        for c in &r.conflicts_unresolved {
            out.push_str(&format!(
                "  unresolved {}: '{}' vs '{}'\n",
                c.conflict_key(),
                c.old_value.as_deref().unwrap_or(""),
                c.new_value.as_deref().unwrap_or(""),
            ));
        }
        for w in &r.warnings {
            out.push_str(&format!(
                "  warning {} {}: {}\n",
                w.entity_type,
                w.id,
                w.message.as_deref().unwrap_or(""),
            ));
        }
        if self.dry_run {
            out.push_str("dry run: no files written\n");
        }
        out.push_str(&format!("changed files: {}\n", self.changed_files.len()));
        for path in &self.changed_files {
            out.push_str(&format!("  {}\n", path.display()));
        }
        out
    }
}

/// Scaffold or re-scaffold the document set: the incoming model wholly
/// replaces whatever the documents currently describe.
pub fn generate(dir: &Path, input: &Path, dry_run: bool) -> Result<MergeOutcome> {
    let patch = ModelPatch::load(input)?;
    run_merge(
        dir,
        patch,
        MergeMode::Generate,
        Policy::default(),
        &Resolutions::default(),
        dry_run,
    )
}

/// Merge an incremental patch into the existing document set.
pub fn append(
    dir: &Path,
    input: &Path,
    policy: Policy,
    resolutions: &Resolutions,
    dry_run: bool,
) -> Result<MergeOutcome> {
    let patch = ModelPatch::load(input)?;
    run_merge(dir, patch, MergeMode::Append, policy, resolutions, dry_run)
}

fn run_merge(
    dir: &Path,
    patch: ModelPatch,
    mode: MergeMode,
    policy: Policy,
    resolutions: &Resolutions,
    dry_run: bool,
) -> Result<MergeOutcome> {
    let layout = Layout::new(dir);
    let markers = Markers::default();
    let (existing, assembly_warnings) = match mode {
        // Generate replaces everything; the existing model is irrelevant.
        MergeMode::Generate => (Model::default(), Vec::new()),
        MergeMode::Append => assemble(&layout, &markers)?,
    };
    let (model, mut report) = merge(&existing, patch, mode, policy, resolutions);
    report.warnings.splice(0..0, assembly_warnings);

    if !report.is_clean() {
        // Unresolved conflicts gate the write path entirely.
        return Ok(MergeOutcome {
            report,
            changed_files: Vec::new(),
            dry_run,
            written: false,
        });
    }
    let plan = docset::plan(&layout, &model, &markers, mode)?;
    let changed_files = plan.changed()?;
    if !dry_run {
        plan.apply()?;
    }
    Ok(MergeOutcome {
        report,
        changed_files,
        dry_run,
        written: !dry_run,
    })
}

/// The assembled model, for inspection and scripting.
#[derive(Debug, Serialize)]
pub struct ModelOutcome {
    pub model: Model,
    #[serde(skip)]
    pretty: bool,
}

impl Output for ModelOutcome {
    fn to_json(&self) -> String {
        let result = if self.pretty {
            serde_json::to_string_pretty(&self.model)
        } else {
            serde_json::to_string(&self.model)
        };
        result.unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
    }

    fn to_human(&self) -> String {
        let m = &self.model;
        format!(
            "project: {}\nstories: {}\ncapabilities: {}\nexternals: {}\nmilestones: {}\nlayers: {}\nboundaries: {}\n",
            m.project.name,
            m.stories.len(),
            m.capabilities.len(),
            m.externals.len(),
            m.milestones.len(),
            m.architecture.layers.len(),
            m.architecture.containers.boundaries.len(),
        )
    }
}

/// Print the model assembled from the current document set.
pub fn model(dir: &Path, pretty: bool) -> Result<ModelOutcome> {
    let layout = Layout::new(dir);
    let (model, _) = assemble(&layout, &Markers::default())?;
    Ok(ModelOutcome { model, pretty })
}

/// Outcome of a `check` invocation.
#[derive(Debug, Serialize)]
pub struct CheckOutcome {
    pub project: String,
    pub stories: usize,
    pub capabilities: usize,
    pub milestones: usize,
    pub warnings: Vec<crate::merge::ReportEntry>,
}

impl Output for CheckOutcome {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
    }

    fn to_human(&self) -> String {
        let mut out = format!(
            "project: {}\nstories: {}  capabilities: {}  milestones: {}\nwarnings: {}\n",
            self.project,
            self.stories,
            self.capabilities,
            self.milestones,
            self.warnings.len(),
        );
        for w in &self.warnings {
            out.push_str(&format!(
                "  {} {}: {}\n",
                w.entity_type,
                w.id,
                w.message.as_deref().unwrap_or(""),
            ));
        }
        out
    }
}

/// Assemble the document set and report anything that needed defaulting or
/// was skipped, without writing.
pub fn check(dir: &Path) -> Result<CheckOutcome> {
    let layout = Layout::new(dir);
    let (model, warnings) = assemble(&layout, &Markers::default())?;
    Ok(CheckOutcome {
        project: model.project.name.clone(),
        stories: model.stories.len(),
        capabilities: model.capabilities.len(),
        milestones: model.milestones.len(),
        warnings,
    })
}
