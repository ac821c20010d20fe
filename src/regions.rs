//! Region splitting for managed documents.
//!
//! A document is *managed* when it carries, in order: a generated-region
//! start marker, generated content, a generated-region end marker, a
//! human-region start marker, human content, and a human-region end marker.
//! `split` and `compose` are inverses up to whitespace trimming of each
//! region's inner content: leading/trailing blank lines are normalized away,
//! interior formatting is preserved verbatim.

use crate::markers::Markers;

/// The two regions of a managed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regions {
    pub generated: String,
    pub human: String,
}

/// Find `marker` on a line of its own and return the byte ranges of the line.
fn find_marker_line(text: &str, from: usize, marker: &str) -> Option<(usize, usize)> {
    let mut offset = from;
    for line in text[from..].split_inclusive('\n') {
        let end = offset + line.len();
        if line.trim_end_matches('\n').trim() == marker {
            return Some((offset, end));
        }
        offset = end;
    }
    None
}

/// Split a document into its generated and human regions. Returns `None`
/// when the document is not in managed form.
pub fn split(text: &str, markers: &Markers) -> Option<Regions> {
    let (_, gs_end) = find_marker_line(text, 0, &markers.generated_start)?;
    let (ge_start, ge_end) = find_marker_line(text, gs_end, &markers.generated_end)?;
    let (_, hs_end) = find_marker_line(text, ge_end, &markers.human_start)?;
    let (he_start, _) = find_marker_line(text, hs_end, &markers.human_end)?;
    Some(Regions {
        generated: text[gs_end..ge_start].trim().to_string(),
        human: text[hs_end..he_start].trim().to_string(),
    })
}

/// Compose a managed document from its regions. Exact inverse of [`split`]
/// up to inner-content trimming.
pub fn compose(generated: &str, human: &str, markers: &Markers) -> String {
    let mut out = String::new();
    out.push_str(&markers.generated_start);
    out.push('\n');
    let generated = generated.trim();
    if !generated.is_empty() {
        out.push_str(generated);
        out.push('\n');
    }
    out.push_str(&markers.generated_end);
    out.push('\n');
    out.push_str(&markers.human_start);
    out.push('\n');
    let human = human.trim();
    if !human.is_empty() {
        out.push_str(human);
        out.push('\n');
    }
    out.push_str(&markers.human_end);
    out.push('\n');
    out
}

/// Return the generated region when markers are present, else the entire
/// text. Supports bootstrapping from legacy unmarked files.
pub fn extract_generated(text: &str, markers: &Markers) -> String {
    match split(text, markers) {
        Some(regions) => regions.generated,
        None => text.to_string(),
    }
}

/// Recover the embedded full-model snapshot from a generated region: the
/// content between the snapshot marker pair, with any fence lines stripped.
/// This is the splitter applied nested, with the snapshot vocabulary.
pub fn extract_snapshot(generated: &str, markers: &Markers) -> Option<String> {
    let (_, start_end) = find_marker_line(generated, 0, &markers.snapshot_start)?;
    let (end_start, _) = find_marker_line(generated, start_end, &markers.snapshot_end)?;
    let inner = generated[start_end..end_start].trim();
    let body: Vec<&str> = inner
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect();
    Some(body.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn managed(generated: &str, human: &str) -> String {
        compose(generated, human, &Markers::default())
    }

    #[test]
    fn test_split_compose_roundtrip() {
        let markers = Markers::default();
        let text = managed("# Heading\n\nbody line", "my notes");
        let regions = split(&text, &markers).unwrap();
        assert_eq!(regions.generated, "# Heading\n\nbody line");
        assert_eq!(regions.human, "my notes");
        assert_eq!(
            compose(&regions.generated, &regions.human, &markers),
            text
        );
    }

    #[test]
    fn test_split_trims_blank_lines_but_preserves_interior() {
        let markers = Markers::default();
        let text = format!(
            "{}\n\n\nfirst\n\n  indented\n\n\n{}\n{}\nnotes\n{}\n",
            markers.generated_start, markers.generated_end, markers.human_start, markers.human_end
        );
        let regions = split(&text, &markers).unwrap();
        assert_eq!(regions.generated, "first\n\n  indented");
    }

    #[test]
    fn test_split_rejects_unmanaged() {
        let markers = Markers::default();
        assert!(split("just some markdown\n", &markers).is_none());
        // Markers out of order are not managed form.
        let out_of_order = format!(
            "{}\n{}\n{}\n{}\n",
            markers.human_start, markers.human_end, markers.generated_start, markers.generated_end
        );
        assert!(split(&out_of_order, &markers).is_none());
    }

    #[test]
    fn test_extract_generated_falls_back_to_whole_text() {
        let markers = Markers::default();
        assert_eq!(
            extract_generated("legacy content\n", &markers),
            "legacy content\n"
        );
        let text = managed("gen", "hum");
        assert_eq!(extract_generated(&text, &markers), "gen");
    }

    #[test]
    fn test_extract_snapshot_strips_fence() {
        let markers = Markers::default();
        let generated = format!(
            "# Summary\n\n{}\n```json\n{{\"a\": 1}}\n```\n{}\n\nmore",
            markers.snapshot_start, markers.snapshot_end
        );
        assert_eq!(
            extract_snapshot(&generated, &markers).unwrap(),
            "{\"a\": 1}"
        );
    }

    #[test]
    fn test_extract_snapshot_absent() {
        let markers = Markers::default();
        assert!(extract_snapshot("# Summary\n", &markers).is_none());
    }

    #[test]
    fn test_marker_requires_own_line() {
        let markers = Markers::default();
        let text = format!(
            "prefix {} suffix\n{}\n{}\n{}\n",
            markers.generated_start, markers.generated_end, markers.human_start, markers.human_end
        );
        assert!(split(&text, &markers).is_none());
    }
}
