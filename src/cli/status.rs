//! Status command implementation

use colored::Colorize;

use crate::cli::OutputFormat;
use crate::cli::context::CommandContext;
use crate::error::Result;
use crate::output::format_table;
use crate::output::rows::StatRow;

/// Show configuration, storage, and registry status.
pub async fn run(ctx: CommandContext) -> Result<()> {
    let mirror = ctx.mirror()?;
    let report = mirror.status().await?;

    if matches!(ctx.format, OutputFormat::Json) {
        println!("{}", crate::output::format_json(&report)?);
        return Ok(());
    }

    println!("{}\n", "cdnless Status".bold());
    println!("Config file:  {}", ctx.config_path()?.display().to_string().cyan());
    println!("Storage root: {}", report.storage_root.display().to_string().cyan());

    match &ctx.config.site_host {
        Some(host) if !host.is_empty() => println!("{} Site host: {}", "✓".green(), host),
        _ => {
            println!("{} Site host not configured", "✗".red());
            println!("  → Run 'cdnless init' to set up");
        }
    }
    match &ctx.config.public_base {
        Some(base) => println!("{} Public base: {}", "✓".green(), base),
        None => {
            println!("{} Public base not configured", "✗".red());
            println!("  → Run 'cdnless init' to set up");
        }
    }

    println!(
        "Mirroring:    stylesheets {}, scripts {}, fonts on",
        on_off(ctx.config.self_host_css),
        on_off(ctx.config.self_host_js)
    );
    println!("Schedule:     {}", ctx.config.cron_schedule.as_str());
    if ctx.config.force_refresh {
        println!("{} Force refresh pending for the next sync run", "⚠".yellow());
    }

    println!();
    let rows: Vec<StatRow> = report.categories.iter().map(StatRow::from).collect();
    println!("{}", format_table(&rows));

    println!();
    println!("Tracked assets: {}", report.tracked_assets);
    if report.error_count > 0 {
        println!(
            "Logged errors:  {} (see {})",
            report.error_count.to_string().yellow(),
            "cdnless log list".cyan()
        );
    } else {
        println!("Logged errors:  0");
    }
    if report.pending_tasks > 0 {
        println!(
            "Pending tasks:  {} (deferred queue; drained on the next sync)",
            report.pending_tasks
        );
    }

    Ok(())
}

fn on_off(enabled: bool) -> colored::ColoredString {
    if enabled { "on".green() } else { "off".dimmed() }
}
