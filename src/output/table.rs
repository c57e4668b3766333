use unicode_width::UnicodeWidthStr;

use crate::analysis::{DecisionReference, MeetingReference};
use crate::db::DbStats;
use crate::model::Transcript;

/// Truncate a string to fit within max_width (respecting unicode width).
fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + cw + 3 > max_width {
            result.push_str("...");
            break;
        }
        result.push(ch);
        width += cw;
    }
    result
}

/// Format the transcript list as a table.
pub fn print_transcript_list(transcripts: &[Transcript]) {
    if transcripts.is_empty() {
        println!("No transcripts found.");
        return;
    }

    println!(
        "{} transcript{}:\n",
        transcripts.len(),
        if transcripts.len() == 1 { "" } else { "s" }
    );

    println!(
        "  {:<42} {:<17} {:<16} {:<8}",
        "TITLE", "DATE", "DEPARTMENT", "ENTRIES"
    );
    println!("  {}", "-".repeat(86));

    for t in transcripts {
        println!(
            "  {:<42} {:<17} {:<16} {:<8}",
            truncate(&t.title, 40),
            t.date.format("%Y-%m-%d %H:%M"),
            truncate(&t.department, 14),
            t.dialogue.len(),
        );
        println!("  id: {}\n", t.id);
    }
}

/// Format a single transcript's details for `tqa show`.
pub fn print_transcript_detail(t: &Transcript) {
    println!("Transcript: {}", t.title);
    println!("  ID:         {}", t.id);
    println!("  Date:       {}", t.date.format("%Y-%m-%d %H:%M"));
    println!("  Department: {}", t.department);
    println!("  Dialogue:   {} entries", t.dialogue.len());

    if !t.participants.is_empty() {
        let names: Vec<String> = t
            .participants
            .iter()
            .map(|p| format!("{} ({})", p.name, p.role))
            .collect();
        println!("  Roster:     {}", truncate(&names.join(", "), 72));
    }
    if !t.tags.is_empty() {
        println!("  Tags:       {}", truncate(&t.tags.join(", "), 72));
    }
    if !t.metadata.is_empty() {
        let pairs: Vec<String> = t
            .metadata
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        println!("  Metadata:   {}", truncate(&pairs.join(", "), 72));
    }

    if !t.decisions.is_empty() {
        println!("\nDecisions ({}):", t.decisions.len());
        for d in &t.decisions {
            println!("  - {}: {}", d.topic, truncate(&d.decision, 60));
        }
    }

    if !t.action_items.is_empty() {
        println!("\nAction Items ({}):", t.action_items.len());
        for a in &t.action_items {
            println!(
                "  - [{}] {} (Assignee: {})",
                a.status,
                truncate(&a.description, 50),
                a.assignee
            );
        }
    }
}

/// Print ranked meeting references for `tqa analyze`.
pub fn print_meeting_references(refs: &[MeetingReference]) {
    if refs.is_empty() {
        println!("No matching meetings.");
        return;
    }

    println!(
        "{} meeting{} by relevance:\n",
        refs.len(),
        if refs.len() == 1 { "" } else { "s" }
    );

    for r in refs {
        println!(
            "{:>6.2}  {} ({})",
            r.relevance_score,
            truncate(&r.title, 50),
            r.date.format("%Y-%m-%d")
        );
        println!("        id: {}", r.meeting_id);

        if !r.key_topics.is_empty() {
            println!("        topics: {}", r.key_topics.join(", "));
        }

        for p in &r.participants {
            println!(
                "        {:<24} {:<12} {} contribution{}",
                truncate(&p.name, 22),
                format!("({})", p.role),
                p.contribution_count,
                if p.contribution_count == 1 { "" } else { "s" }
            );
        }

        for s in &r.snippets {
            println!(
                "        [{:>5.1}] {}: {}",
                s.relevance_score,
                s.speaker_name,
                truncate(&s.text, 56)
            );
        }
        println!();
    }
}

/// Print consolidated decision references for `tqa decisions`.
pub fn print_decision_references(refs: &[DecisionReference]) {
    if refs.is_empty() {
        println!("No decisions found.");
        return;
    }

    println!(
        "{} decision{} by relevance:\n",
        refs.len(),
        if refs.len() == 1 { "" } else { "s" }
    );

    for r in refs {
        println!(
            "{:>6.2}  [{}] {}",
            r.relevance_score,
            r.status.as_str(),
            truncate(&r.topic, 50)
        );
        println!("        {}", truncate(&r.decision, 70));
        println!(
            "        {} — {} ({})",
            r.decision_id,
            truncate(&r.meeting_title, 40),
            r.timestamp.format("%Y-%m-%d %H:%M")
        );

        if !r.stakeholders.is_empty() {
            println!("        stakeholders: {}", r.stakeholders.join(", "));
        }
        if !r.impacted_areas.is_empty() {
            println!("        impacted: {}", r.impacted_areas.join(", "));
        }
        for item in &r.related_action_items {
            println!(
                "        action: [{}] {} (Assignee: {})",
                item.status,
                truncate(&item.description, 44),
                item.assignee
            );
        }
        if !r.related_decisions.is_empty() {
            println!("        related: {}", r.related_decisions.join(", "));
        }
        println!();
    }
}

/// Print database stats.
pub fn print_stats(stats: &DbStats) {
    println!("Database Statistics:");
    println!("  Transcripts:     {}", stats.transcripts);
    println!("  Participants:    {}", stats.participants);
    println!("  Dialogue:        {} entries", stats.dialogue_entries);
    println!("  Decisions:       {}", stats.decisions);
    println!("  Action Items:    {}", stats.action_items);
    println!("  Tags:            {}", stats.tags);
    println!("  DB Size:         {}", format_bytes(stats.db_size_bytes));
    println!("\n  Departments:");
    for dc in &stats.departments {
        println!("    {:<16} {}", dc.department, dc.count);
    }
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}
