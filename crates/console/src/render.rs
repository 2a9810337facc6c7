//! Text rendering of messages and exhibits

use mock_interview_core::{Exhibit, ExhibitId, ExhibitKind, Message, Role};
use serde_json::Value;

const BAR_WIDTH: f64 = 30.0;

pub fn message_line(message: &Message) -> String {
    let speaker = match message.role {
        Role::Interviewer => "Interviewer",
        Role::Candidate => "You",
    };

    match message.exhibit_ref {
        Some(id) if message.content.is_empty() => format!("{}: [exhibit #{}]", speaker, id),
        Some(id) => format!("{}: {}  [exhibit #{}]", speaker, message.content, id),
        None => format!("{}: {}", speaker, message.content),
    }
}

/// Log entry for a new message
///
/// Exhibits appear as markers only; `/exhibit <id>` renders them in full.
pub fn message_entry(message: &Message, introduced: &[ExhibitId]) -> String {
    let mut entry = message_line(message);
    if introduced.len() > 1 {
        entry.push_str(&format!("\n  ({} exhibits, see /exhibits)", introduced.len()));
    }
    entry
}

/// Multi-line rendering of an exhibit
pub fn exhibit_block(exhibit: &Exhibit) -> String {
    let mut out = format!("── Exhibit #{}: {} ({}) ──\n", exhibit.id, exhibit.title, exhibit.kind);

    let body = match exhibit.kind {
        ExhibitKind::Table => table(&exhibit.payload),
        ExhibitKind::Image => exhibit.image_source().map(|src| format!("image: {}\n", src)),
        ExhibitKind::Bar | ExhibitKind::Line | ExhibitKind::Pie => exhibit.series().map(|points| {
            let max = points.iter().map(|p| p.value.abs()).fold(0.0, f64::max);
            let label_width = points.iter().map(|p| p.label.chars().count()).max().unwrap_or(0);

            points
                .iter()
                .map(|p| {
                    let len = if max > 0.0 { (p.value.abs() / max * BAR_WIDTH).round() as usize } else { 0 };
                    format!("{:<width$} | {} {}\n", p.label, "#".repeat(len), p.value, width = label_width)
                })
                .collect()
        }),
    };

    // fall back to raw JSON for payloads of another shape
    out.push_str(&body.unwrap_or_else(|| format!("{}\n", exhibit.payload)));
    out
}

/// `{"columns": [...], "rows": [[...], ...]}` or a list of row arrays
fn table(payload: &Value) -> Option<String> {
    let (columns, rows) = match payload {
        Value::Object(map) => (map.get("columns").and_then(Value::as_array), map.get("rows")?.as_array()?),
        Value::Array(rows) => (None, rows),
        _ => return None,
    };

    let mut out = String::new();
    if let Some(columns) = columns {
        let header: Vec<String> = columns.iter().map(cell).collect();
        out.push_str(&header.join(" | "));
        out.push('\n');
        out.push_str(&"-".repeat(out.trim_end().chars().count()));
        out.push('\n');
    }
    for row in rows {
        let line: Vec<String> = match row {
            Value::Array(cells) => cells.iter().map(cell).collect(),
            other => vec![cell(other)],
        };
        out.push_str(&line.join(" | "));
        out.push('\n');
    }
    Some(out)
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
