use std::fmt::Write;

use crate::model::Transcript;

/// Render transcripts into the flat context block fed to the language
/// generator. Pure formatting: byte-identical output for identical input,
/// transcripts emitted in the order given.
pub fn render(transcripts: &[Transcript]) -> String {
    let mut out = String::new();

    for t in transcripts {
        let _ = writeln!(
            out,
            "Meeting: {} ({})",
            t.title,
            t.date.format("%Y-%m-%d %H:%M")
        );
        let _ = writeln!(out, "Department: {}", t.department);
        out.push('\n');

        out.push_str("Participants:\n");
        for p in &t.participants {
            let _ = writeln!(out, "- {} ({})", p.name, p.role);
        }

        out.push_str("\nDialogue:\n");
        for entry in &t.dialogue {
            let _ = writeln!(
                out,
                "[{}] {}: {}",
                entry.timestamp.format("%H:%M"),
                t.speaker_name(entry),
                entry.text
            );
        }

        if !t.decisions.is_empty() {
            out.push_str("\nDecisions:\n");
            for d in &t.decisions {
                let _ = writeln!(out, "- {}: {}", d.topic, d.decision);
            }
        }

        if !t.action_items.is_empty() {
            out.push_str("\nAction Items:\n");
            for a in &t.action_items {
                let _ = writeln!(out, "- {} (Assignee: {})", a.description, a.assignee);
            }
        }

        out.push_str("\n---\n\n");
    }

    out
}
