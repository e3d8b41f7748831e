//! Cached-asset management commands

use colored::Colorize;
use dialoguer::{Confirm, theme::ColorfulTheme};

use crate::category::Category;
use crate::cli::OutputFormat;
use crate::cli::context::CommandContext;
use crate::error::Result;
use crate::output::Formattable;
use crate::output::rows::AssetRow;

/// List every cached asset tracked by the registry.
pub async fn list(ctx: CommandContext) -> Result<()> {
    let mirror = ctx.mirror()?;
    let rows: Vec<AssetRow> = mirror
        .list_assets()
        .await?
        .into_iter()
        .map(AssetRow::from)
        .collect();
    rows.print(ctx.format)
}

/// Delete one cached asset: the registry row and the file on disk.
pub async fn delete(ctx: CommandContext, url: &str, category: Category, yes: bool) -> Result<()> {
    if !yes
        && !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Delete cached copy of {url} ({category})?"))
            .default(false)
            .interact()?
    {
        println!("Aborted.");
        return Ok(());
    }

    let mirror = ctx.mirror()?;
    let removed = mirror.delete_asset(url, category).await?;

    match ctx.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "url": url,
                "category": category,
                "removed": removed,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => {
            if removed {
                println!("{} Removed cached copy of {}", "✓".green(), url);
                println!("  The original external URL will be used until the next sync.");
            } else {
                println!("Nothing cached for {url} ({category}).");
            }
        }
    }
    Ok(())
}
