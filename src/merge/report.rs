//! Structured merge reporting. Every user-visible outcome of a merge is an
//! entry in one of the report's lists; conflicts are a designed, resolvable
//! state, not errors, and they gate only the write step.

use serde::{Deserialize, Serialize};

/// Overall outcome of a merge invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStatus {
    #[default]
    Ok,
    NeedsResolution,
}

impl MergeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStatus::Ok => "ok",
            MergeStatus::NeedsResolution => "needs_resolution",
        }
    }
}

/// One report line: a created/updated/unchanged entity, a conflict, or a
/// warning. Optional fields are populated per entry kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub entity_type: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReportEntry {
    pub fn entity(entity_type: &str, id: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
            ..Self::default()
        }
    }

    pub fn warning(entity_type: &str, id: &str, message: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
            message: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn conflict(
        entity_type: &str,
        id: &str,
        field: &str,
        old_value: &str,
        new_value: &str,
    ) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
            field: Some(field.to_string()),
            old_value: Some(old_value.to_string()),
            new_value: Some(new_value.to_string()),
            ..Self::default()
        }
    }

    /// The composite key used to look up an explicit resolution.
    pub fn conflict_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.entity_type,
            self.id,
            self.field.as_deref().unwrap_or("")
        )
    }
}

/// Full merge report. `conflicts` lists every conflict; each one also lands
/// in either `conflicts_resolved` or `conflicts_unresolved`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeReport {
    pub status: MergeStatus,
    pub created: Vec<ReportEntry>,
    pub updated: Vec<ReportEntry>,
    pub unchanged: Vec<ReportEntry>,
    pub conflicts: Vec<ReportEntry>,
    pub conflicts_resolved: Vec<ReportEntry>,
    pub conflicts_unresolved: Vec<ReportEntry>,
    pub warnings: Vec<ReportEntry>,
}

impl MergeReport {
    /// Set the overall status from the unresolved conflict list.
    pub fn finalize(&mut self) {
        self.status = if self.conflicts_unresolved.is_empty() {
            MergeStatus::Ok
        } else {
            MergeStatus::NeedsResolution
        };
    }

    /// True when nothing blocks the write path.
    pub fn is_clean(&self) -> bool {
        self.conflicts_unresolved.is_empty()
    }
}
