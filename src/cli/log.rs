//! Error log commands

use colored::Colorize;

use crate::cli::OutputFormat;
use crate::cli::context::CommandContext;
use crate::error::Result;
use crate::output::Formattable;
use crate::output::rows::ErrorRow;

/// List recorded warnings and errors, newest first.
pub async fn list(ctx: CommandContext, limit: usize) -> Result<()> {
    let mirror = ctx.mirror()?;
    let rows: Vec<ErrorRow> = mirror
        .list_errors(limit)
        .await?
        .into_iter()
        .map(ErrorRow::from)
        .collect();
    rows.print(ctx.format)
}

/// Clear the error log.
pub async fn clear(ctx: CommandContext) -> Result<()> {
    let mirror = ctx.mirror()?;
    let cleared = mirror.clear_errors().await?;

    match ctx.format {
        OutputFormat::Json => {
            let json = serde_json::json!({ "entries_removed": cleared });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => {
            if cleared > 0 {
                println!("{} Cleared {} log entries", "✓".green(), cleared);
            } else {
                println!("Log was already empty");
            }
        }
    }
    Ok(())
}
