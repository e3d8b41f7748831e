//! Init command implementation

use std::path::PathBuf;

use colored::Colorize;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};

use crate::cli::OutputFormat;
use crate::cli::context::CommandContext;
use crate::config::Config;
use crate::error::Result;
use crate::manifest::Manifest;

/// Flag-supplied answers; whatever is missing gets prompted for, unless
/// `yes` accepts the defaults wholesale.
pub struct InitOptions {
    pub site_host: Option<String>,
    pub public_base: Option<String>,
    pub storage_root: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub yes: bool,
}

/// Run the init command: build a config interactively (or from flags),
/// save it, and provision the storage directories and registry.
pub async fn run(opts: InitOptions, config_path: Option<&str>) -> Result<()> {
    println!("{}", "Welcome to cdnless!".bold().green());
    println!("Let's set up asset self-hosting for your site.\n");

    let mut config = Config::default();

    config.site_host = match opts.site_host {
        Some(host) => Some(host),
        None if opts.yes => None,
        None => {
            let host: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt("Your site's host (e.g. example.com)")
                .interact_text()?;
            Some(host)
        }
    };

    config.public_base = match opts.public_base {
        Some(base) => Some(base),
        None if opts.yes => None,
        None => {
            let base: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt("Public URL prefix for mirrored assets (e.g. https://example.com/cdnless-assets)")
                .interact_text()?;
            Some(base)
        }
    };

    if let Some(root) = opts.storage_root {
        config.storage_root = root;
    } else if !opts.yes {
        let root: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Storage directory for mirrored assets")
            .default(config.storage_root.display().to_string())
            .interact_text()?;
        config.storage_root = PathBuf::from(root);
    }

    if !opts.yes {
        config.self_host_js = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Also mirror external scripts? (stylesheets and fonts are always on)")
            .default(false)
            .interact()?;
    }

    config.normalize();

    let path = match config_path {
        Some(path) => PathBuf::from(path),
        None => Config::default_path()?,
    };
    config.save_to(path.clone())?;

    println!(
        "\n{} Configuration saved to: {}",
        "✓".green(),
        path.display()
    );

    // Provision storage now so a read-only location fails here, not during
    // the first scheduled run.
    let ctx = CommandContext::new(OutputFormat::Pretty, config_path)?;
    let mirror = ctx.mirror()?;
    mirror.provision().await?;
    println!(
        "{} Asset storage provisioned at: {}",
        "✓".green(),
        ctx.config.storage_root.display()
    );

    // Activation also means an initial forced resolution when a manifest
    // was supplied.
    if let Some(manifest_path) = opts.manifest {
        ctx.config.validate_for_sync()?;
        println!("\n{}", "Running initial resolution...".cyan());
        let manifest = Manifest::load(&manifest_path)?;
        let plan = mirror.sync(&manifest, true).await?;
        println!(
            "{} {} of {} handles now served locally",
            "✓".green(),
            plan.localized_count(),
            plan.outcomes.len()
        );
    }

    println!("\n{}", "You're all set! Try running:".bold());
    println!(
        "  {} - Resolve a manifest's external assets",
        "cdnless sync <manifest>".cyan()
    );
    println!("  {} - Show storage status", "cdnless status".cyan());

    Ok(())
}
