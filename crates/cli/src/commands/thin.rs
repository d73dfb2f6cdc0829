use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use thinner_core::config::ThinConfig;
use thinner_core::thinner::{BinaryStatus, ThinReport};
use thinner_core::{AppProgress, StripStrategy, Thinner};
use tracing::info;

use crate::{canonicalize_or_current, display_name, format_bytes};

/// Arguments for `thin`; any flag left unset falls back to the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct ThinArgs {
    /// Directory to search (default: /Applications).
    pub search_directory: Option<String>,

    /// Remove unused framework versions.
    #[arg(long, default_value_t = false)]
    pub remove_unused_framework_versions: bool,

    /// Search app bundles and thin each one separately.
    #[arg(long, default_value_t = false)]
    pub apps_only: bool,

    /// Do everything except actually modifying files.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Write each thinned binary to a temp file and rename it into place.
    #[arg(long, default_value_t = false)]
    pub atomic: bool,

    /// Thin for this architecture instead of the detected one (e.g. x86_64).
    #[arg(long)]
    pub arch: Option<String>,

    /// Load defaults from a JSON or YAML config file.
    #[arg(long)]
    pub config: Option<String>,

    /// Emit JSON reports instead of human-readable text.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

/// Merge the optional config file with explicit command-line flags.
pub fn resolve_config(args: &ThinArgs) -> Result<ThinConfig> {
    let mut config = match &args.config {
        Some(path) => ThinConfig::load(Path::new(path))
            .with_context(|| format!("Failed to load config {}", path))?,
        None => ThinConfig::default(),
    };

    if let Some(dir) = &args.search_directory {
        config.search_directory = PathBuf::from(dir);
    }
    config.dry_run |= args.dry_run;
    config.remove_unused_framework_versions |= args.remove_unused_framework_versions;
    config.apps_only |= args.apps_only;
    if args.atomic {
        config.strategy = StripStrategy::AtomicRename;
    }
    if args.arch.is_some() {
        config.arch = args.arch.clone();
    }
    Ok(config)
}

/// Thin binaries (and optionally frameworks) under the search directory.
///
/// Returns the reports so callers can inspect them; human or JSON output is
/// printed as a side effect.
pub fn thin_command(args: &ThinArgs) -> Result<Vec<ThinReport>> {
    let config = resolve_config(args)?;
    let host = config.host_arch().context("Failed to resolve host architecture")?;
    let search_dir = canonicalize_or_current(&config.search_directory.to_string_lossy())?;
    if !search_dir.is_dir() {
        return Err(anyhow!("Search directory does not exist: {}", search_dir.display()));
    }

    info!(
        search_dir = %search_dir.display(),
        host = %host,
        dry_run = config.dry_run,
        apps_only = config.apps_only,
        "starting thin run"
    );
    let thinner = Thinner::new(host, config.thin_options());
    let human = !args.json;
    if human && config.dry_run {
        println!("{}", "Dry run: no files will be modified.".yellow());
    }

    let reports = if config.apps_only {
        if human {
            println!("Searching apps...");
        }
        thinner.thin_apps_with(&search_dir, |progress| {
            if !human {
                return;
            }
            match progress {
                AppProgress::Started(app) => {
                    println!("Search fat binaries for: {}...", display_name(app))
                }
                AppProgress::Finished(report) => print_report(report),
            }
        })
    } else {
        if human {
            println!("Search and strip fat binaries...");
        }
        let report = thinner.thin_path(&search_dir);
        if human {
            print_report(&report);
        }
        vec![report]
    };

    if args.json {
        let serialized = serde_json::to_string_pretty(&reports)?;
        println!("{}", serialized);
        return Ok(reports);
    }

    let total: u64 = reports.iter().map(|r| r.saved_bytes).sum();
    if total > 0 {
        let verb = if config.dry_run { "Would save you" } else { "Totally saved you" };
        let message = format!("{verb} {}", format_bytes(total));
        println!("{}", "-".repeat(message.chars().count()));
        println!("{}", message.bright_green().bold());
    } else {
        println!("Nothing to thin.");
    }

    Ok(reports)
}

/// Print one report the way the tool always has: green per binary, red per
/// removed framework version, errors on stderr.
fn print_report(report: &ThinReport) {
    for error in &report.scan_errors {
        eprintln!(
            "{}",
            format!("Search fat binary error: {}: {}", error.path.display(), error.message).red()
        );
    }

    for binary in &report.binaries {
        match &binary.status {
            BinaryStatus::Stripped { original_size, new_size } => {
                println!(
                    "{}",
                    format!(
                        "{} ({} → {})",
                        binary.path.display(),
                        format_bytes(*original_size),
                        format_bytes(*new_size)
                    )
                    .green()
                );
            }
            BinaryStatus::NoMatch => {
                println!(
                    "{}",
                    format!("{} has no {} slice, skipped.", binary.path.display(), report.host)
                        .yellow()
                );
            }
            BinaryStatus::Removed => {}
            BinaryStatus::Failed { error } => {
                eprintln!(
                    "{}",
                    format!("Strip binary error: {}: {}", binary.path.display(), error).red()
                );
            }
        }
    }

    for framework in &report.frameworks {
        for removed in &framework.prune.removed {
            println!(
                "{}",
                format!(
                    "Removing unused framework version: {} ({}) in {}",
                    removed.name.bold(),
                    format_bytes(removed.size),
                    framework.framework.display()
                )
                .red()
            );
        }
        for failure in &framework.prune.failures {
            eprintln!(
                "{}",
                format!("Remove unused framework versions error: {}", failure.error).red()
            );
        }
    }
    for failure in &report.framework_errors {
        eprintln!("{}", format!("Remove unused framework versions error: {}", failure.error).red());
    }

    if report.saved_bytes > 0 {
        let message = format!(
            "Saved you {} for {} ({} → {})",
            format_bytes(report.saved_bytes),
            display_name(&report.root),
            format_bytes(report.size_before),
            format_bytes(if report.dry_run {
                report.size_before.saturating_sub(report.saved_bytes)
            } else {
                report.size_after
            })
        );
        println!("{}", message.green().bold());
    }
}
