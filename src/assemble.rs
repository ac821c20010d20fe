//! Model assembly: rebuild the unified model from the current document set.
//!
//! The embedded full-model snapshot in the summary document is the
//! authoritative source when present; per-view parsing is the fallback for
//! document sets that predate the snapshot or whose snapshot is damaged.
//! Missing optional documents yield empty sub-models, never errors: a clean
//! document set with no stories yet is valid.

use std::path::Path;

use crate::docset::Layout;
use crate::markers::Markers;
use crate::merge::ReportEntry;
use crate::models::patch::StoryPatch;
use crate::models::{Model, Story};
use crate::parse::frontmatter::{parse_header, Header};
use crate::parse::{arch::parse_arch, deps::parse_deps, timeline::parse_timeline};
use crate::regions::{extract_generated, extract_snapshot};
use crate::Result;

/// Rebuild the model from the document set at `layout`. Returns the model
/// plus assembly warnings (fabricated defaults, skipped files).
pub fn assemble(layout: &Layout, markers: &Markers) -> Result<(Model, Vec<ReportEntry>)> {
    let mut warnings = Vec::new();

    if let Some(readme) = read_optional(&layout.readme())? {
        let generated = extract_generated(&readme, markers);
        if let Some(snapshot) = extract_snapshot(&generated, markers) {
            match serde_json::from_str::<Model>(&snapshot) {
                Ok(model) => {
                    // The snapshot wins over the per-view diagrams; any hand
                    // edits to those diagrams are bypassed and will be
                    // overwritten on the next write.
                    warnings.push(ReportEntry::warning(
                        "model",
                        "snapshot",
                        "model taken from embedded snapshot; per-view diagram edits are ignored",
                    ));
                    return Ok((model, warnings));
                }
                Err(err) => warnings.push(ReportEntry::warning(
                    "model",
                    "snapshot",
                    &format!("embedded snapshot unreadable, falling back to views: {}", err),
                )),
            }
        }
    }

    let mut model = Model::default();
    if let Some(readme) = read_optional(&layout.readme())? {
        model.project.name = project_name(&extract_generated(&readme, markers));
    }
    collect_stories(layout, markers, &mut model, &mut warnings)?;

    if let Some(text) = read_optional(&layout.dependencies())? {
        let view = parse_deps(&extract_generated(&text, markers));
        model.capabilities = view.capabilities;
        model.externals = view.externals;
        model.edges = view.edges;
    }
    if let Some(text) = read_optional(&layout.milestones())? {
        model.milestones = parse_timeline(&extract_generated(&text, markers));
    }
    if let Some(text) = read_optional(&layout.layers())? {
        let view = parse_arch(&extract_generated(&text, markers));
        model.architecture.layers = view.groups;
        model.architecture.layer_edges = view.edges;
    }
    if let Some(text) = read_optional(&layout.containers())? {
        let view = parse_arch(&extract_generated(&text, markers));
        model.architecture.containers.boundaries = view.groups;
        model.architecture.containers.edges = view.edges;
    }
    Ok((model, warnings))
}

/// Scan the summary's generated region for the `Project: <name>` line.
fn project_name(generated: &str) -> String {
    for line in generated.lines() {
        if let Some(name) = line.trim().strip_prefix("Project:") {
            let name = name.trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }
    }
    String::new()
}

fn collect_stories(
    layout: &Layout,
    markers: &Markers,
    model: &mut Model,
    warnings: &mut Vec<ReportEntry>,
) -> Result<()> {
    let dir = layout.stories_dir();
    if !dir.is_dir() {
        return Ok(());
    }
    let mut names: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if layout.is_story_file(&name) {
            names.push(name);
        }
    }
    names.sort();
    for name in names {
        let path = dir.join(&name);
        let Some(text) = read_optional(&path)? else { continue };
        let stem = name.trim_end_matches(".md");
        match story_from_text(&text, markers, stem, warnings) {
            Some(story) => model.stories.push(story),
            None => warnings.push(ReportEntry::warning(
                "story",
                stem,
                "item file has no metadata header, skipped",
            )),
        }
    }
    Ok(())
}

/// Parse one item file into a story. The header id wins over the filename
/// when both are present.
fn story_from_text(
    text: &str,
    markers: &Markers,
    file_id: &str,
    warnings: &mut Vec<ReportEntry>,
) -> Option<Story> {
    let generated = extract_generated(text, markers);
    let header = parse_header(&generated)?;
    let id = header
        .get("id")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(file_id)
        .to_string();
    Some(story_from_header(&header, &id, warnings))
}

fn story_from_header(header: &Header, id: &str, warnings: &mut Vec<ReportEntry>) -> Story {
    let get = |key: &str| {
        header
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .filter(|s| !s.trim().is_empty())
    };
    let patch = StoryPatch {
        id: Some(id.to_string()),
        epic: get("epic"),
        capability: get("capability"),
        milestone: get("milestone"),
        title: get("title"),
        status: get("status"),
        progress: header.get("progress").and_then(|v| v.as_int()),
        effort: header.get("effort").and_then(|v| v.as_int()),
        tags: header.get("tags").map(|v| v.as_list()),
        ..StoryPatch::default()
    };
    patch.into_story(id, warnings)
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::frontmatter::HeaderValue;

    #[test]
    fn test_project_name() {
        assert_eq!(project_name("# Blueprint\n\nProject: Demo\n"), "Demo");
        assert_eq!(project_name("no name line"), "");
    }

    #[test]
    fn test_story_from_header_defaults_and_warns() {
        let mut header = Header::new();
        header.insert("id".to_string(), HeaderValue::Str("US-5".to_string()));
        header.insert("status".to_string(), HeaderValue::Str("doing".to_string()));
        let mut warnings = Vec::new();
        let story = story_from_header(&header, "US-5", &mut warnings);
        assert_eq!(story.id, "US-5");
        assert_eq!(story.capability, "C-unknown");
        assert_eq!(story.milestone, "M-yyy");
        // capability, milestone, and title were all fabricated
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn test_story_from_text_header_id_wins() {
        let text = "---\nid: US-9\ntitle: From header\ncapability: C-1\nmilestone: M-1\n---\n";
        let mut warnings = Vec::new();
        let story = story_from_text(text, &Markers::default(), "US-2", &mut warnings).unwrap();
        assert_eq!(story.id, "US-9");
        assert!(warnings.is_empty());
    }
}
