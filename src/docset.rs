//! Document set layout and the write plan.
//!
//! A write plan is computed identically for real and dry runs: the full
//! final text of every managed document plus the stale item files to prune.
//! Only `apply` touches the filesystem, so a dry run reports exactly the
//! same changed-file list as a real run would.

use std::path::{Path, PathBuf};

use crate::markers::Markers;
use crate::merge::MergeMode;
use crate::models::Model;
use crate::regions::{compose, split};
use crate::render;
use crate::Result;

const TEMPLATE_FILE: &str = "US-xxx.md";

const TEMPLATE_CONTENT: &str = "---\nid: US-xxx\nepic: E-001\ncapability: C-001\nmilestone: M-001\ntitle: Story title\nstatus: todo\nprogress: 0\neffort: 1\n---\n\n# US-xxx Story title\n\n## User Story\n\n- As a: \n- I want: \n- So that: \n\n## Acceptance Criteria\n\n- [ ] TBD\n\n## Notes\n\n- Data model: \n- API: \n- Edge cases: \n- Rollback: \n";

fn stories_template(layout: &Layout) -> PathBuf {
    layout.stories_dir().join(TEMPLATE_FILE)
}

/// Path layout of one blueprint document set.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn readme(&self) -> PathBuf {
        self.root.join("README.md")
    }

    pub fn tree(&self) -> PathBuf {
        self.root.join("Roadmap").join("Blueprint Tree.md")
    }

    pub fn dependencies(&self) -> PathBuf {
        self.root.join("Roadmap").join("Dependencies.md")
    }

    pub fn milestones(&self) -> PathBuf {
        self.root.join("Roadmap").join("Milestones.md")
    }

    pub fn layers(&self) -> PathBuf {
        self.root.join("Architecture").join("Layers.md")
    }

    pub fn containers(&self) -> PathBuf {
        self.root.join("Architecture").join("Containers.md")
    }

    pub fn stories_dir(&self) -> PathBuf {
        self.root.join("Stories")
    }

    pub fn stories_index(&self) -> PathBuf {
        self.stories_dir().join("README.md")
    }

    pub fn story(&self, id: &str) -> PathBuf {
        self.stories_dir().join(format!("{}.md", id))
    }

    /// True for per-item files: `US-<something>.md`, never the index and
    /// never the literal template file.
    pub fn is_story_file(&self, name: &str) -> bool {
        if name == TEMPLATE_FILE {
            return false;
        }
        let Some(stem) = name.strip_suffix(".md") else {
            return false;
        };
        match stem.strip_prefix("US-") {
            Some(tail) => !tail.is_empty() && tail.chars().all(|c| c.is_ascii_alphanumeric()),
            None => false,
        }
    }
}

/// One final document: full composed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub path: PathBuf,
    pub content: String,
}

/// Everything one merge invocation would write or delete.
#[derive(Debug, Clone, Default)]
pub struct WritePlan {
    pub files: Vec<PlannedFile>,
    pub deletions: Vec<PathBuf>,
}

impl WritePlan {
    /// Paths whose on-disk state differs from the plan. Computed without
    /// mutating anything, so dry runs and real runs report identically.
    pub fn changed(&self) -> Result<Vec<PathBuf>> {
        let mut changed = Vec::new();
        for file in &self.files {
            if read_optional(&file.path)?.as_deref() != Some(file.content.as_str()) {
                changed.push(file.path.clone());
            }
        }
        for path in &self.deletions {
            if path.exists() {
                changed.push(path.clone());
            }
        }
        Ok(changed)
    }

    /// Write every planned file and remove every stale item file.
    pub fn apply(&self) -> Result<()> {
        for file in &self.files {
            if let Some(parent) = file.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&file.path, &file.content)?;
        }
        for path in &self.deletions {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

/// Compute the write plan for a merged model.
pub fn plan(
    layout: &Layout,
    model: &Model,
    markers: &Markers,
    mode: MergeMode,
) -> Result<WritePlan> {
    let display = render::with_render_defaults(model);
    let mut plan = WritePlan::default();

    // Summary first: its human region is reset on first-time scaffolding so
    // demonstration content is not duplicated into every regenerated set.
    let readme_generated = render::render_readme(&display, markers)?;
    plan.files.push(planned(
        layout.readme(),
        readme_generated,
        markers,
        mode,
        mode == MergeMode::Generate,
    )?);
    plan.files.push(planned(
        layout.tree(),
        render::render_tree(&display),
        markers,
        mode,
        false,
    )?);
    plan.files.push(planned(
        layout.dependencies(),
        render::render_deps(&display),
        markers,
        mode,
        false,
    )?);
    plan.files.push(planned(
        layout.milestones(),
        render::render_milestones(&display),
        markers,
        mode,
        false,
    )?);
    plan.files.push(planned(
        layout.layers(),
        render::render_layers(&display),
        markers,
        mode,
        false,
    )?);
    plan.files.push(planned(
        layout.containers(),
        render::render_containers(&display),
        markers,
        mode,
        false,
    )?);
    plan.files.push(planned(
        layout.stories_index(),
        render::render_stories_index(&display),
        markers,
        mode,
        false,
    )?);
    for story in &display.stories {
        plan.files.push(planned(
            layout.story(&story.id),
            render::render_story(story),
            markers,
            mode,
            false,
        )?);
    }

    // The literal template file is scaffolded once and then left alone:
    // it is never parsed and never pruned.
    let template_path = stories_template(layout);
    if !template_path.exists() {
        plan.files.push(PlannedFile {
            path: template_path,
            content: TEMPLATE_CONTENT.to_string(),
        });
    }

    // Stale item pruning: files matching the item pattern with no surviving
    // story. The template file never matches the pattern.
    let stories_dir = layout.stories_dir();
    if stories_dir.is_dir() {
        let mut names: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(&stories_dir)? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        for name in names {
            if !layout.is_story_file(&name) {
                continue;
            }
            let stem = name.trim_end_matches(".md");
            if !display.stories.iter().any(|s| s.id == stem) {
                plan.deletions.push(stories_dir.join(name));
            }
        }
    }
    Ok(plan)
}

/// Compose one final document, preserving the human region of an existing
/// managed file. A pre-existing unmanaged file becomes the human region
/// under append mode and is discarded under generate mode.
fn planned(
    path: PathBuf,
    generated: String,
    markers: &Markers,
    mode: MergeMode,
    reset_human: bool,
) -> Result<PlannedFile> {
    let human = if reset_human {
        String::new()
    } else {
        match read_optional(&path)? {
            Some(existing) => match split(&existing, markers) {
                Some(regions) => regions.human,
                None if mode == MergeMode::Append => existing.trim().to_string(),
                None => String::new(),
            },
            None => String::new(),
        }
    };
    Ok(PlannedFile {
        path,
        content: compose(&generated, &human, markers),
    })
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

    #[test]
    fn test_is_story_file() {
        let layout = Layout::new("blueprint");
        assert!(layout.is_story_file("US-001.md"));
        assert!(layout.is_story_file("US-12.md"));
        assert!(!layout.is_story_file("US-xxx.md"));
        assert!(!layout.is_story_file("README.md"));
        assert!(!layout.is_story_file("US-.md"));
        assert!(!layout.is_story_file("US-001.txt"));
        assert!(!layout.is_story_file("notes.md"));
    }

    #[test]
    fn test_layout_paths() {
        let layout = Layout::new("bp");
        assert_eq!(layout.readme(), PathBuf::from("bp/README.md"));
        assert_eq!(
            layout.tree(),
            PathBuf::from("bp/Roadmap/Blueprint Tree.md")
        );
        assert_eq!(layout.story("US-1"), PathBuf::from("bp/Stories/US-1.md"));
    }
}
