//! Uninstall command implementation
//!
//! Removes only category directories bearing the ownership marker file, so
//! a storage root shared with other content is never clobbered. The
//! registry database goes with them. The config file is left in place.

use colored::Colorize;
use dialoguer::{Confirm, theme::ColorfulTheme};

use crate::cli::context::CommandContext;
use crate::error::Result;

pub async fn run(ctx: CommandContext, yes: bool) -> Result<()> {
    let root = ctx.config.storage_root.clone();

    if !yes
        && !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Remove all mirrored assets and the registry under {}?",
                root.display()
            ))
            .default(false)
            .interact()?
    {
        println!("Aborted.");
        return Ok(());
    }

    let mirror = ctx.mirror()?;
    let report = mirror.uninstall()?;

    for dir in &report.removed {
        println!("{} Removed {}", "✓".green(), dir.display());
    }
    for dir in &report.skipped {
        println!(
            "{} Skipped {} (no ownership marker; not created by cdnless)",
            "○".dimmed(),
            dir.display()
        );
    }
    if report.removed.is_empty() && report.skipped.is_empty() {
        println!("Nothing to remove under {}.", root.display());
    }

    println!(
        "\nPages will fall back to the original external URLs. The config file was kept;\ndelete it manually or run {} to start over.",
        "cdnless init".cyan()
    );
    Ok(())
}
