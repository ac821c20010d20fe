//! Timeline parsing: a gantt fence where `section <M-id> <title>` opens a
//! milestone, task lines add line-items, and a `:milestone,` task sets the
//! checkpoint. A markdown table after the fence overlays window, scope, and
//! definition-of-done onto the same milestones by id.

use crate::models::{Checkpoint, ItemStatus, Milestone, MilestoneItem};
use crate::parse::{diagram_body, is_entity_id, scan, split_entity_label, ScanLine};

/// Parse a timeline document (markdown text containing the gantt fence and
/// an optional detail table).
pub fn parse_timeline(text: &str) -> Vec<Milestone> {
    let mut milestones: Vec<Milestone> = Vec::new();

    if let Some(body) = diagram_body(text) {
        for line in scan(&body) {
            match line {
                ScanLine::Section { rest } => {
                    let (id, title) = split_entity_label(&rest);
                    if id.is_empty() {
                        milestones.push(Milestone::stub(rest));
                    } else {
                        let mut m = Milestone::stub(id);
                        m.title = title;
                        milestones.push(m);
                    }
                }
                ScanLine::Task { left, fields } => {
                    let Some(current) = milestones.last_mut() else {
                        continue;
                    };
                    apply_task(current, &left, &fields);
                }
                _ => {}
            }
        }
    }

    // Table overlay runs over the whole document, not just the fence.
    for line in scan(text) {
        if let ScanLine::TableRow { cells } = line {
            apply_table_row(&mut milestones, &cells);
        }
    }
    milestones
}

fn apply_task(milestone: &mut Milestone, left: &str, fields: &[String]) {
    let mut fields = fields.iter().map(String::as_str);
    let first = fields.next().unwrap_or("");
    if first == "milestone" {
        // `<title> :milestone, <safe-id>, <date>, 1d`
        let _safe_id = fields.next();
        let date = fields.next().unwrap_or("").to_string();
        if !date.is_empty() {
            milestone.checkpoint = Some(Checkpoint {
                title: left.to_string(),
                date,
            });
        }
        return;
    }
    let (status, safe_id) = match ItemStatus::from_token(first) {
        Some(s) => (Some(s), fields.next().unwrap_or("")),
        None => (None, first),
    };
    let start = fields.next().unwrap_or("").to_string();
    let end = fields.next().unwrap_or("").to_string();
    let (id, title) = split_entity_label(left);
    let id = if id.is_empty() {
        safe_id.to_string()
    } else {
        id
    };
    let title = if title.is_empty() && !is_entity_id(left) {
        left.to_string()
    } else {
        title
    };
    milestone.items.push(MilestoneItem {
        id,
        title,
        start,
        end,
        status,
    });
}

fn apply_table_row(milestones: &mut Vec<Milestone>, cells: &[String]) {
    // | Milestone | Title | Window | Scope | DoD |
    if cells.len() < 5 || !is_entity_id(&cells[0]) {
        return;
    }
    let id = cells[0].clone();
    let pos = match milestones.iter().position(|m| m.id == id) {
        Some(i) => i,
        None => {
            milestones.push(Milestone::stub(id));
            milestones.len() - 1
        }
    };
    let milestone = &mut milestones[pos];
    if milestone.title.is_empty() && cells[1] != "-" {
        milestone.title = cells[1].clone();
    }
    let window = cells[2].trim_matches('`');
    if window != "-" {
        if let Some((start, end)) = window.split_once('~') {
            milestone.start = Some(start.trim().to_string());
            milestone.end = Some(end.trim().to_string());
        }
    }
    if cells[3] != "-" {
        milestone.scope = cells[3]
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if cells[4] != "-" {
        milestone.dod = Some(cells[4].clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"# Milestones

```mermaid
gantt
    title Milestones
    dateFormat YYYY-MM-DD
    axisFormat %m-%d
    section M-1 Alpha
    C-1 Data layer :active, C_1, 2026-01-01, 2026-01-15
    C-2 API layer :C_2, 2026-01-10, 2026-02-01
    Alpha freeze :milestone, M_1_checkpoint, 2026-02-01, 1d
    section M-2 Beta
    C-3 Hardening :crit, C_3, 2026-02-02, 2026-03-01
```

| Milestone | Title | Window | Scope | DoD |
|---|---|---|---|---|
| M-1 | Alpha | `2026-01-01 ~ 2026-02-01` | C-1, C-2 | demo passes |
| M-2 | Beta | - | - | - |
"#;

    #[test]
    fn test_parse_sections_and_items() {
        let ms = parse_timeline(DOC);
        assert_eq!(ms.len(), 2);
        assert_eq!(ms[0].id, "M-1");
        assert_eq!(ms[0].title, "Alpha");
        assert_eq!(ms[0].items.len(), 2);
        assert_eq!(ms[0].items[0].id, "C-1");
        assert_eq!(ms[0].items[0].title, "Data layer");
        assert_eq!(ms[0].items[0].status, Some(ItemStatus::Doing));
        assert_eq!(ms[0].items[0].start, "2026-01-01");
        assert_eq!(ms[0].items[1].status, None);
        assert_eq!(ms[1].items[0].status, Some(ItemStatus::Blocked));
    }

    #[test]
    fn test_parse_checkpoint() {
        let ms = parse_timeline(DOC);
        let cp = ms[0].checkpoint.as_ref().unwrap();
        assert_eq!(cp.title, "Alpha freeze");
        assert_eq!(cp.date, "2026-02-01");
    }

    #[test]
    fn test_table_overlay() {
        let ms = parse_timeline(DOC);
        assert_eq!(ms[0].start.as_deref(), Some("2026-01-01"));
        assert_eq!(ms[0].end.as_deref(), Some("2026-02-01"));
        assert_eq!(ms[0].scope, vec!["C-1".to_string(), "C-2".to_string()]);
        assert_eq!(ms[0].dod.as_deref(), Some("demo passes"));
        assert!(ms[1].start.is_none());
        assert!(ms[1].scope.is_empty());
        assert!(ms[1].dod.is_none());
    }

    #[test]
    fn test_table_row_without_section_creates_milestone() {
        let doc = "| Milestone | Title | Window | Scope | DoD |\n|---|---|---|---|---|\n| M-7 | Gamma | - | - | ship |\n";
        let ms = parse_timeline(doc);
        assert_eq!(ms.len(), 1);
        assert_eq!(ms[0].id, "M-7");
        assert_eq!(ms[0].title, "Gamma");
        assert_eq!(ms[0].dod.as_deref(), Some("ship"));
    }

    #[test]
    fn test_no_fence_no_table() {
        assert!(parse_timeline("plain prose").is_empty());
    }
}
