//! Sync and refresh command implementations

use std::path::Path;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use crate::cli::OutputFormat;
use crate::cli::context::CommandContext;
use crate::error::Result;
use crate::manifest::{Manifest, RegistrationPlan};
use crate::output::Formattable;
use crate::output::rows::PlanRow;
use crate::queue;
use crate::service::Mirror;

/// Run one sync pass, or keep running on the configured schedule.
pub async fn run(
    mut ctx: CommandContext,
    manifest_path: &Path,
    force: bool,
    output: Option<&Path>,
    watch: bool,
    deferred: bool,
) -> Result<()> {
    ctx.config.validate_for_sync()?;
    let deferred = deferred || ctx.config.deferred_queue;

    // A pending one-shot refresh flag is consumed by the first pass.
    let force = force || consume_refresh_flag(&mut ctx)?;

    let mirror = ctx.mirror()?;
    mirror.provision().await?;

    run_pass(&ctx, &mirror, manifest_path, force, output, deferred).await?;

    if watch {
        let interval = ctx.config.cron_schedule.interval();
        println!(
            "\nWatching: next pass in {} ({} schedule). Ctrl-C to stop.",
            humanize(interval),
            ctx.config.cron_schedule.as_str()
        );
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // first tick fires immediately

        loop {
            ticker.tick().await;
            // Each scheduled pass consumes any refresh flag set since the
            // last one.
            let force = consume_refresh_flag(&mut ctx)?;
            info!("scheduled pass starting (force={})", force);
            run_pass(&ctx, &mirror, manifest_path, force, output, deferred).await?;
        }
    }

    Ok(())
}

/// Set the one-shot force-refresh flag for the next sync run.
pub fn refresh(mut ctx: CommandContext) -> Result<()> {
    ctx.config.force_refresh = true;
    ctx.save_config()?;
    println!(
        "{} Next sync run will re-fetch everything regardless of freshness.",
        "✓".green()
    );
    Ok(())
}

async fn run_pass(
    ctx: &CommandContext,
    mirror: &Mirror,
    manifest_path: &Path,
    force: bool,
    output: Option<&Path>,
    deferred: bool,
) -> Result<()> {
    let manifest = Manifest::load(manifest_path)?;

    let spinner = spinner_for(ctx.format);
    let plan = if deferred {
        let summary = queue::run(mirror, &manifest, force).await?;
        info!(
            "deferred pass: {} processed, {} fetched, {} requeued, {} dropped, {} rewritten",
            summary.processed, summary.fetched, summary.requeued, summary.dropped, summary.rewritten
        );
        // The drain finalized files and registry rows; the plan comes from
        // the read path against those.
        mirror.render(&manifest).await?
    } else {
        mirror.sync(&manifest, force).await?
    };
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    print_plan(ctx.format, &plan)?;

    if let Some(out) = output {
        manifest.with_plan(&plan).save(out)?;
        if matches!(ctx.format, OutputFormat::Pretty) {
            println!("\n{} Rewritten manifest written to {}", "✓".green(), out.display());
        }
    }
    Ok(())
}

fn consume_refresh_flag(ctx: &mut CommandContext) -> Result<bool> {
    if ctx.config.take_force_refresh() {
        ctx.save_config()?;
        Ok(true)
    } else {
        Ok(false)
    }
}

fn print_plan(format: OutputFormat, plan: &RegistrationPlan) -> Result<()> {
    let rows: Vec<PlanRow> = plan.outcomes.iter().map(PlanRow::from).collect();
    rows.print(format)?;

    if matches!(format, OutputFormat::Pretty) {
        let failed = plan.failed_count();
        let summary = format!(
            "{} of {} handles served locally",
            plan.localized_count(),
            plan.outcomes.len()
        );
        if failed > 0 {
            println!(
                "\n{} ({} failed; see {})",
                summary,
                failed.to_string().red(),
                "cdnless log list".cyan()
            );
        } else {
            println!("\n{}", summary.green());
        }
    }
    Ok(())
}

fn spinner_for(format: OutputFormat) -> Option<ProgressBar> {
    if !matches!(format, OutputFormat::Pretty) {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Resolving external assets...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    Some(spinner)
}

fn humanize(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs % (24 * 3600) == 0 && secs >= 24 * 3600 {
        format!("{}d", secs / (24 * 3600))
    } else if secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}m", secs / 60)
    }
}
