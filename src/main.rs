//! cdnless - self-host external stylesheets, scripts, and web fonts

use clap::{CommandFactory, Parser};
use clap_complete::env::CompleteEnv;

mod category;
mod cli;
mod config;
mod css;
mod error;
mod fetch;
mod manifest;
mod output;
mod queue;
mod service;
mod store;
mod urls;

use cli::{AssetsCommands, Cli, CommandContext, Commands, LogCommands};
use cli::init::InitOptions;
use error::Result;

#[tokio::main]
async fn main() {
    // Dynamic shell completions take over the process when COMPLETE is set.
    CompleteEnv::with_factory(Cli::command).complete();

    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter),
    )
    .init();

    match cli.command {
        Commands::Init {
            site_host,
            public_base,
            storage_root,
            manifest,
            yes,
        } => {
            cli::init::run(
                InitOptions {
                    site_host,
                    public_base,
                    storage_root,
                    manifest,
                    yes,
                },
                cli.config.as_deref(),
            )
            .await
        }
        Commands::Sync {
            manifest,
            force,
            output,
            watch,
            deferred,
        } => {
            let ctx = CommandContext::new(cli.format, cli.config.as_deref())?;
            cli::sync::run(ctx, &manifest, force, output.as_deref(), watch, deferred).await
        }
        Commands::Refresh => {
            let ctx = CommandContext::new(cli.format, cli.config.as_deref())?;
            cli::sync::refresh(ctx)
        }
        Commands::Render { manifest, output } => {
            let ctx = CommandContext::new(cli.format, cli.config.as_deref())?;
            cli::render::run(ctx, &manifest, output.as_deref()).await
        }
        Commands::Assets(assets_cmd) => {
            let ctx = CommandContext::new(cli.format, cli.config.as_deref())?;
            match assets_cmd {
                AssetsCommands::List => cli::assets::list(ctx).await,
                AssetsCommands::Delete { url, category, yes } => {
                    cli::assets::delete(ctx, &url, category, yes).await
                }
            }
        }
        Commands::Log(log_cmd) => {
            let ctx = CommandContext::new(cli.format, cli.config.as_deref())?;
            match log_cmd {
                LogCommands::List { limit } => cli::log::list(ctx, limit).await,
                LogCommands::Clear => cli::log::clear(ctx).await,
            }
        }
        Commands::Status => {
            let ctx = CommandContext::new(cli.format, cli.config.as_deref())?;
            cli::status::run(ctx).await
        }
        Commands::Uninstall { yes } => {
            let ctx = CommandContext::new(cli.format, cli.config.as_deref())?;
            cli::uninstall::run(ctx, yes).await
        }
        Commands::Version => {
            println!("cdnless version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "cdnless", &mut std::io::stdout());
            Ok(())
        }
    }
}
