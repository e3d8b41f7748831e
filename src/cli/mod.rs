//! CLI command definitions and handlers

use std::path::PathBuf;

use clap::{Parser, Subcommand};
pub use clap_complete::Shell;

use crate::category::Category;
use completions::asset_url_candidates;

pub mod assets;
pub mod completions;
pub mod context;
pub mod init;
pub mod log;
pub mod render;
pub mod status;
pub mod sync;
pub mod uninstall;

pub use context::CommandContext;

/// Output format options
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty format - human-optimized rich formatting
    #[default]
    Pretty,
    /// Table format - machine-parseable, one row per entry
    Table,
    /// JSON format - structured for scripts/APIs
    Json,
}

/// cdnless - self-host external stylesheets, scripts, and web fonts
#[derive(Parser, Debug)]
#[command(name = "cdnless")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "CDNLESS_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "CDNLESS_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "CDNLESS_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize cdnless configuration and provision asset storage
    Init {
        /// Site host (e.g. example.com); skips the prompt
        #[arg(long)]
        site_host: Option<String>,

        /// Public URL prefix the storage root is served from
        #[arg(long)]
        public_base: Option<String>,

        /// Directory for mirrored assets and the registry database
        #[arg(long)]
        storage_root: Option<PathBuf>,

        /// Run an initial forced resolution of this manifest after setup
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Accept defaults for everything not given as a flag
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Resolve a manifest's external assets into the local cache
    #[command(after_help = "\
EXAMPLES:
  cdnless sync manifest.yaml                 # One resolution pass
  cdnless sync manifest.yaml --force         # Ignore freshness windows
  cdnless sync manifest.yaml -o out.yaml     # Write the rewritten manifest
  cdnless sync manifest.yaml --watch         # Keep running on the configured schedule")]
    Sync {
        /// Handle manifest (YAML or JSON)
        manifest: PathBuf,

        /// Re-fetch everything regardless of freshness
        #[arg(long, short = 'f')]
        force: bool,

        /// Write the rewritten manifest here after the pass
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Run forever, repeating the pass on the configured schedule
        #[arg(long, short = 'w')]
        watch: bool,

        /// Resolve through the persisted task queue instead of inline
        /// recursion, even when the config does not ask for it
        #[arg(long)]
        deferred: bool,
    },

    /// Flag the next sync run to ignore freshness windows
    Refresh,

    /// Substitute cached copies into a manifest without any network I/O
    Render {
        /// Handle manifest (YAML or JSON)
        manifest: PathBuf,

        /// Write the rewritten manifest here
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Inspect and manage cached assets
    #[command(subcommand)]
    Assets(AssetsCommands),

    /// View the error log
    #[command(subcommand)]
    Log(LogCommands),

    /// Show storage and registry status
    Status,

    /// Remove cdnless-owned storage directories and the registry
    Uninstall {
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Display version information
    Version,

    /// Generate shell completions (static)
    #[command(after_help = "\
Static completions (subcommands/flags only):
  bash:   cdnless completion bash > /etc/bash_completion.d/cdnless
  zsh:    cdnless completion zsh > \"${fpath[1]}/_cdnless\"
  fish:   cdnless completion fish > ~/.config/fish/completions/cdnless.fish

Dynamic completions (includes cached asset URLs from the registry):
  bash:   echo 'source <(COMPLETE=bash cdnless)' >> ~/.bashrc
  zsh:    echo 'source <(COMPLETE=zsh cdnless)' >> ~/.zshrc
  fish:   echo 'COMPLETE=fish cdnless | source' >> ~/.config/fish/config.fish

Re-source completions after upgrading cdnless.")]
    Completion {
        /// Shell to generate completions for (static only)
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Cached-asset subcommands
#[derive(Subcommand, Debug)]
pub enum AssetsCommands {
    /// List every cached asset in the registry
    #[command(visible_alias = "ls")]
    List,

    /// Delete one cached asset (registry row and file)
    #[command(after_help = "EXAMPLES:\n  \
        cdnless assets delete https://cdn.example/a.css\n  \
        cdnless assets delete https://cdn.example/f.woff2 --category font --yes")]
    Delete {
        /// Original external URL of the asset
        #[arg(add = asset_url_candidates())]
        url: String,

        /// Asset category the URL was cached under
        #[arg(long, short = 'c', default_value = "stylesheet")]
        category: Category,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

/// Error log subcommands
#[derive(Subcommand, Debug)]
pub enum LogCommands {
    /// List recorded warnings and errors, newest first
    List {
        /// Maximum entries to show
        #[arg(long, short = 'n', default_value_t = 50)]
        limit: usize,
    },

    /// Clear the error log
    Clear,
}
