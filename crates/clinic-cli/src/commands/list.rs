//! `clinic-audit list` command implementation

use chrono::Local;
use clinic_audit::{paginate, AuditTrail, EventRecord, Page};
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

use crate::error::Result;
use crate::FilterArgs;

/// Longest details cell before truncation
const DETAILS_WIDTH: usize = 60;

/// List matching events, newest first
pub async fn run(
    trail: &AuditTrail,
    filters: &FilterArgs,
    page: usize,
    per_page: usize,
    json: bool,
) -> Result<()> {
    let records = trail.query(&filters.to_query());
    let page = paginate(records, page, per_page);

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.items.is_empty() {
        println!("{} No audit events found", "→".cyan());
        return Ok(());
    }

    println!("{}", render_table(&page));
    println!(
        "{} Page {} of {} ({} events)",
        "→".cyan(),
        page.page,
        page.total_pages,
        page.total_items
    );
    if page.has_next() {
        println!("  {} --page {}", "Next:".dimmed(), page.page + 1);
    }

    Ok(())
}

fn render_table(page: &Page<EventRecord>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Time", "User", "Role", "Action", "Entity", "Entity ID", "Details"]);

    for record in &page.items {
        let actor = record.actor();
        table.add_row(vec![
            record
                .timestamp()
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            actor.map_or_else(|| "System".to_string(), |a| a.name.clone()),
            actor.map_or_else(|| "-".to_string(), |a| a.role.clone()),
            record.action().to_string(),
            record.entity_type().to_string(),
            record.entity_id().unwrap_or("-").to_string(),
            details_cell(record),
        ]);
    }

    table
}

fn details_cell(record: &EventRecord) -> String {
    if record.details().is_empty() {
        return String::new();
    }

    let text = serde_json::to_string(record.details()).unwrap_or_default();
    if text.chars().count() > DETAILS_WIDTH {
        let cut: String = text.chars().take(DETAILS_WIDTH - 1).collect();
        format!("{}…", cut)
    } else {
        text
    }
}
