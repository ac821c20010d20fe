//! Common test utilities for blueprint integration tests.
//!
//! Provides `TestEnv` for isolated test environments: each test gets its own
//! temporary directory holding a blueprint document set.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// A test environment with an isolated blueprint directory.
pub struct TestEnv {
    pub root: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the bp binary pointed at this environment's
    /// blueprint directory. Sets `BP_DIR` per-command for parallel safety.
    pub fn bp(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_bp"));
        cmd.current_dir(self.root.path());
        cmd.env("BP_DIR", self.blueprint_dir());
        cmd
    }

    /// The blueprint directory inside the environment.
    pub fn blueprint_dir(&self) -> PathBuf {
        self.root.path().join("blueprint")
    }

    /// Write an input model/patch file and return its path.
    pub fn write_input(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Read a document from the blueprint directory.
    pub fn read_doc(&self, rel: &str) -> String {
        std::fs::read_to_string(self.blueprint_dir().join(rel)).unwrap()
    }

    /// Path of a document inside the blueprint directory.
    pub fn doc_path(&self, rel: &str) -> PathBuf {
        self.blueprint_dir().join(rel)
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// A minimal but complete model for scaffolding tests.
pub const FULL_MODEL_YAML: &str = r#"project:
  name: Demo
stories:
  - id: US-1
    epic: E-1
    epic_title: Core engine
    capability: C-1
    capability_title: Data layer
    milestone: M-1
    title: Persist records
    status: doing
    progress: 60
  - id: US-2
    epic: E-1
    epic_title: Core engine
    capability: C-1
    capability_title: Data layer
    milestone: M-1
    title: Query records
dependencies:
  capabilities:
    - id: C-1
      title: Data layer
    - id: C-2
      title: API layer
      status: blocked
      blocked_reason: waiting on schema
      depends_on:
        - id: C-1
          reason: needs data
  externals:
    - id: EXT-1
      title: Vendor feed
  edges:
    - from: EXT-1
      to: C-1
milestones:
  - id: M-1
    title: Alpha
    start: 2026-01-01
    end: 2026-02-01
    items:
      - id: C-1
        title: Data layer
        start: 2026-01-01
        end: 2026-01-15
        status: doing
    checkpoint:
      title: Alpha freeze
      date: 2026-02-01
    scope: [C-1]
    dod: demo passes
architecture:
  layers:
    - id: L1
      title: Presentation
      nodes:
        - id: cli
          title: Command surface
    - id: L2
      title: Domain
      nodes:
        - id: engine
          title: Merge engine
  layer_edges:
    - from: L1
      to: L2
  containers:
    boundaries:
      - id: PUBLIC
        title: Public surface
        nodes:
          - id: api
            title: Entry points
    edges: []
"#;
