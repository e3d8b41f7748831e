//! Render command implementation
//!
//! The read path: substitute already-cached copies into a manifest by
//! probing the registry and filesystem only. Never touches the network, so
//! it is safe to run on every page build.

use std::path::Path;

use colored::Colorize;

use crate::cli::OutputFormat;
use crate::cli::context::CommandContext;
use crate::error::Result;
use crate::manifest::Manifest;
use crate::output::Formattable;
use crate::output::rows::PlanRow;

pub async fn run(ctx: CommandContext, manifest_path: &Path, output: Option<&Path>) -> Result<()> {
    let manifest = Manifest::load(manifest_path)?;
    let mirror = ctx.mirror()?;

    let plan = mirror.render(&manifest).await?;

    let rows: Vec<PlanRow> = plan.outcomes.iter().map(PlanRow::from).collect();
    rows.print(ctx.format)?;

    if matches!(ctx.format, OutputFormat::Pretty) {
        println!(
            "\n{} of {} handles served locally (no network I/O performed)",
            plan.localized_count(),
            plan.outcomes.len()
        );
    }

    if let Some(out) = output {
        manifest.with_plan(&plan).save(out)?;
        if matches!(ctx.format, OutputFormat::Pretty) {
            println!("{} Rewritten manifest written to {}", "✓".green(), out.display());
        }
    }
    Ok(())
}
