//! CLI subcommand implementations.

pub mod fetch;
pub mod report;
pub mod status;

use anyhow::{Context, Result, bail};
use chrono_tz::Tz;

use calrep_core::PeriodKind;
use calrep_db::PeriodStore;

use crate::Config;
use crate::cli::PeriodArgs;

/// Opens the period cache, creating its parent directory if needed.
pub(crate) fn open_store(config: &Config) -> Result<PeriodStore> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    PeriodStore::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

/// Parses the configured IANA timezone.
pub(crate) fn timezone(config: &Config) -> Result<Tz> {
    config
        .timezone
        .parse()
        .map_err(|err| anyhow::anyhow!("invalid timezone {}: {err}", config.timezone))
}

/// Resolves the period selection into a [`PeriodKind`].
///
/// Explicit `--start`/`--end` dates always select a custom period; clap
/// guarantees they come as a pair.
pub(crate) fn resolve_kind(args: &PeriodArgs) -> Result<PeriodKind> {
    match (args.start, args.end) {
        (Some(start), Some(end)) => Ok(PeriodKind::Custom { start, end }),
        _ if args.period == "custom" => {
            bail!("custom periods require --start and --end")
        }
        _ => Ok(args.period.parse()?),
    }
}
