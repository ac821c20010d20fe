//! Region marker vocabulary for managed documents.
//!
//! Every managed document carries a machine-owned generated region followed by
//! a human-owned notes region, each delimited by an HTML comment pair that is
//! invisible in rendered markdown. The top-level summary additionally embeds a
//! full-model snapshot between its own marker pair.
//!
//! The vocabulary is a value object passed explicitly into the splitter,
//! parsers, and renderer rather than a set of ambient constants, so tests can
//! substitute their own markers.

/// The marker strings that delimit document regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub generated_start: String,
    pub generated_end: String,
    pub human_start: String,
    pub human_end: String,
    pub snapshot_start: String,
    pub snapshot_end: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            generated_start: "<!-- bp:generated:start -->".to_string(),
            generated_end: "<!-- bp:generated:end -->".to_string(),
            human_start: "<!-- bp:notes:start -->".to_string(),
            human_end: "<!-- bp:notes:end -->".to_string(),
            snapshot_start: "<!-- bp:model:start -->".to_string(),
            snapshot_end: "<!-- bp:model:end -->".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_markers_are_distinct() {
        let m = Markers::default();
        let all = [
            &m.generated_start,
            &m.generated_end,
            &m.human_start,
            &m.human_end,
            &m.snapshot_start,
            &m.snapshot_end,
        ];
        for (i, a) in all.iter().enumerate() {
            for (j, b) in all.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b);
                }
            }
        }
    }
}
