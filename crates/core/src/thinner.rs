//! Runs the whole pipeline over a search root and aggregates a report.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::arch::HostArch;
use crate::prune::{thin_framework, FsRemover, PruneReport, Remover};
use crate::scan::{find_app_bundles, scan_candidates, ScanError, ScanOptions};
use crate::size::disk_usage;
use crate::strip::{strip_binary, StripOptions, StripOutcome, StripStrategy};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinOptions {
    pub dry_run: bool,
    pub remove_unused_framework_versions: bool,
    pub strategy: StripStrategy,
}

/// What happened to one fat binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BinaryStatus {
    Stripped { original_size: u64, new_size: u64 },
    /// Host slice missing at strip time; the file was left alone.
    NoMatch,
    /// The file lived inside a framework version that was just pruned.
    Removed,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryOutcome {
    pub path: PathBuf,
    /// Architectures present before thinning, in table order.
    pub archs: Vec<String>,
    #[serde(flatten)]
    pub status: BinaryStatus,
}

impl BinaryOutcome {
    pub fn saved(&self) -> u64 {
        match self.status {
            BinaryStatus::Stripped { original_size, new_size } => {
                original_size.saturating_sub(new_size)
            }
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkOutcome {
    pub framework: PathBuf,
    #[serde(flatten)]
    pub prune: PruneReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkFailure {
    pub framework: PathBuf,
    pub error: String,
}

/// Aggregate result of thinning one search root (or one app bundle).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinReport {
    pub root: PathBuf,
    pub host: String,
    pub dry_run: bool,
    pub started_at: String,
    pub finished_at: String,
    pub size_before: u64,
    pub size_after: u64,
    /// Bytes reclaimed (or that would be reclaimed in a dry run).
    pub saved_bytes: u64,
    pub binaries: Vec<BinaryOutcome>,
    pub frameworks: Vec<FrameworkOutcome>,
    pub framework_errors: Vec<FrameworkFailure>,
    pub scan_errors: Vec<ScanError>,
}

/// Per-bundle events emitted by [`Thinner::thin_apps_with`].
#[derive(Debug, Clone, Copy)]
pub enum AppProgress<'a> {
    Started(&'a Path),
    Finished(&'a ThinReport),
}

/// Coordinator tying the host architecture, options, and a remover together.
pub struct Thinner {
    host: HostArch,
    options: ThinOptions,
    remover: Box<dyn Remover>,
}

impl Thinner {
    pub fn new(host: HostArch, options: ThinOptions) -> Self {
        Self { host, options, remover: Box::new(FsRemover) }
    }

    /// Replace the filesystem remover (used to simulate deletion failures).
    pub fn with_remover<R: Remover + 'static>(mut self, remover: R) -> Self {
        self.remover = Box::new(remover);
        self
    }

    pub fn host(&self) -> &HostArch {
        &self.host
    }

    pub fn options(&self) -> &ThinOptions {
        &self.options
    }

    /// Thin every candidate under `root`.
    ///
    /// Frameworks are pruned before binaries are stripped so that binaries
    /// living in a removed version are not rewritten only to be deleted.
    pub fn thin_path(&self, root: &Path) -> ThinReport {
        let started_at = Utc::now().to_rfc3339();
        let size_before = disk_usage(root);
        let scan = scan_candidates(
            root,
            &self.host,
            ScanOptions { include_frameworks: self.options.remove_unused_framework_versions },
        );
        debug!(
            root = %root.display(),
            fat_files = scan.fat_files.len(),
            frameworks = scan.frameworks.len(),
            "scan finished"
        );

        let mut frameworks = Vec::new();
        let mut framework_errors = Vec::new();
        let mut removed_paths: Vec<PathBuf> = Vec::new();
        for framework in &scan.frameworks {
            // Already counted in the enclosing version that was removed.
            if removed_paths.iter().any(|removed| framework.starts_with(removed)) {
                debug!(framework = %framework.display(), "inside a removed version, skipping");
                continue;
            }
            match thin_framework(framework, self.remover.as_ref(), self.options.dry_run) {
                Ok(Some(prune)) => {
                    removed_paths.extend(prune.removed.iter().map(|r| r.path.clone()));
                    frameworks.push(FrameworkOutcome { framework: framework.clone(), prune });
                }
                Ok(None) => {}
                Err(err) => {
                    warn!("{err}");
                    framework_errors.push(FrameworkFailure {
                        framework: framework.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        let strip_options =
            StripOptions { dry_run: self.options.dry_run, strategy: self.options.strategy };
        let mut binaries = Vec::new();
        for fat in &scan.fat_files {
            let archs = fat.slices.iter().map(|s| s.arch_name().to_string()).collect();
            let status = if removed_paths.iter().any(|removed| fat.path.starts_with(removed)) {
                BinaryStatus::Removed
            } else {
                match strip_binary(
                    &fat.path,
                    fat.size,
                    fat.slice_for(self.host.cpu_type),
                    &strip_options,
                ) {
                    Ok(StripOutcome::Stripped(report)) => BinaryStatus::Stripped {
                        original_size: report.original_size,
                        new_size: report.new_size,
                    },
                    Ok(StripOutcome::NoMatch) => BinaryStatus::NoMatch,
                    Err(err) => {
                        warn!(path = %fat.path.display(), "strip failed: {err}");
                        BinaryStatus::Failed { error: err.to_string() }
                    }
                }
            };
            binaries.push(BinaryOutcome { path: fat.path.clone(), archs, status });
        }

        let saved_bytes = binaries.iter().map(BinaryOutcome::saved).sum::<u64>()
            + frameworks.iter().map(|f| f.prune.freed_bytes).sum::<u64>();
        let size_after = if self.options.dry_run { size_before } else { disk_usage(root) };
        info!(root = %root.display(), saved_bytes, dry_run = self.options.dry_run, "thinning done");

        ThinReport {
            root: root.to_path_buf(),
            host: self.host.cpu_type.to_string(),
            dry_run: self.options.dry_run,
            started_at,
            finished_at: Utc::now().to_rfc3339(),
            size_before,
            size_after,
            saved_bytes,
            binaries,
            frameworks,
            framework_errors,
            scan_errors: scan.errors,
        }
    }

    /// Thin each top-level app bundle under `root` separately.
    pub fn thin_apps(&self, root: &Path) -> Vec<ThinReport> {
        self.thin_apps_with(root, |_| {})
    }

    /// Like [`Thinner::thin_apps`], reporting progress as each bundle starts
    /// and finishes.
    pub fn thin_apps_with<F>(&self, root: &Path, mut progress: F) -> Vec<ThinReport>
    where
        F: FnMut(AppProgress<'_>),
    {
        let apps = find_app_bundles(root);
        debug!(root = %root.display(), apps = apps.len(), "found app bundles");
        let mut reports = Vec::with_capacity(apps.len());
        for app in &apps {
            progress(AppProgress::Started(app));
            let report = self.thin_path(app);
            progress(AppProgress::Finished(&report));
            reports.push(report);
        }
        reports
    }
}
