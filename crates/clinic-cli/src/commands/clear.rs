//! `clinic-audit clear` command implementation

use clinic_audit::AuditTrail;
use colored::Colorize;
use std::io::{self, Write};

use crate::error::Result;

/// Delete every retained event
pub async fn run(trail: &AuditTrail, yes: bool) -> Result<()> {
    let count = trail.store().len();

    if count == 0 {
        println!("{} Audit trail is already empty", "→".cyan());
        return Ok(());
    }

    // Confirmation prompt (unless --yes flag is used)
    if !yes {
        println!(
            "{}",
            format!("This will permanently delete {} audit events.", count).yellow()
        );
        print!("Continue? [y/N]: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        let input = input.trim().to_lowercase();
        if input != "y" && input != "yes" {
            println!("Clear cancelled.");
            return Ok(());
        }
    }

    trail.clear()?;
    println!("{} Removed {} audit events", "✓".green().bold(), count);

    Ok(())
}
