//! Shell completions for the cdnless CLI
//!
//! Static completions cover subcommands and flags. Dynamic completions add
//! cached asset URLs for `assets delete`, read straight from the registry
//! database, with no network involved.
//!
//! Shell support:
//! - Fish/Zsh: Full support with descriptions
//! - Bash: Values only (no description display)

use clap_complete::engine::{ArgValueCandidates, CompletionCandidate};

use crate::config::Config;
use crate::output::formatters::format_timestamp;
use crate::store::Registry;

/// Maximum number of completion candidates to return
const MAX_COMPLETIONS: usize = 25;

/// Complete original URLs of cached assets.
///
/// Format: `{url}` with help `{category} | {cached-at}`
///
/// Completions should never break the shell, so every failure (missing
/// config, missing database) silently yields nothing. clap_complete
/// handles prefix filtering - we return all candidates.
pub fn complete_asset_urls() -> Vec<CompletionCandidate> {
    let Ok(config) = Config::load() else {
        return vec![];
    };
    let Ok(registry) = Registry::open_at(&config.storage_root.join(Registry::DB_FILE)) else {
        return vec![];
    };
    let Ok(records) = registry.list_all() else {
        return vec![];
    };

    records
        .into_iter()
        .take(MAX_COMPLETIONS)
        .map(|record| {
            let help = format!("{} | {}", record.category, format_timestamp(record.cached_at));
            CompletionCandidate::new(record.original_url).help(Some(help.into()))
        })
        .collect()
}

/// Create completion candidates for cached asset URLs.
pub fn asset_url_candidates() -> ArgValueCandidates {
    ArgValueCandidates::new(complete_asset_urls)
}
