use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{error, info, warn};
use regex::Regex;
use tokio::fs;

use crate::backup;
use crate::error::{Result, UpdaterError};
use crate::registry::RegistryClient;
use crate::resolver::{Resolution, SkipReason, UpdateDecision};
use crate::util::file_name;

const TEMP_PREFIX: &str = "UPDATING_";

// Applied in order; each strips a trailing version-and-loader suffix.
static VERSION_SUFFIX_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"-\d+\.\d+\.\d+.*\.jar$",
        r"-\d+\.\d+.*\.jar$",
        r"_v\d+\.\d+\.\d+.*\.jar$",
        r"_v\d+\.\d+.*\.jar$",
    ]
    .into_iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Name for an updated mod: the original minus its version suffix, plus the new
/// version and the loader tag the original carried.
///
/// `sodium-fabric-1.2.3.jar` updated to `1.3.0` with loader `fabric` becomes
/// `sodium-fabric-1.3.0-fabric.jar`.
pub fn updated_file_name(original: &str, version: &str, loaders: &[String]) -> String {
    let mut base = original.to_owned();
    for pattern in VERSION_SUFFIX_PATTERNS.iter() {
        base = pattern.replace(&base, ".jar").into_owned();
    }

    let lowered = original.to_lowercase();
    let loader_suffix = loaders
        .iter()
        .map(|loader| loader.to_lowercase())
        .find(|loader| lowered.contains(&format!("-{loader}")))
        .map(|loader| format!("-{loader}"))
        .unwrap_or_default();

    let stem = base.strip_suffix(".jar").unwrap_or(&base);
    format!("{stem}-{version}{loader_suffix}.jar")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenamedMod {
    pub old_name: String,
    pub new_name: String,
}

impl fmt::Display for RenamedMod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.old_name, self.new_name)
    }
}

/// Terminal state of one file after a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Updated(RenamedMod),
    Failed(PathBuf),
    Skipped(PathBuf),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub updated: Vec<RenamedMod>,
    pub failed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub backup: Option<PathBuf>,
    /// Set when the backup could not be written and nothing was touched.
    pub aborted: bool,
}

impl UpdateReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Updated(renamed) => self.updated.push(renamed),
            Outcome::Failed(path) => self.failed.push(path),
            Outcome::Skipped(path) => self.skipped.push(path),
        }
    }

    pub fn total(&self) -> usize {
        self.updated.len() + self.failed.len() + self.skipped.len()
    }
}

pub struct UpdateOptions<'a> {
    pub loaders: &'a [String],
    /// Where to snapshot the folder first; `None` disables the backup.
    pub backup_to: Option<PathBuf>,
}

/// Downloads, replaces and renames every file resolved for update, one at a time.
pub struct FetchReplacePipeline<'a> {
    registry: &'a RegistryClient,
    folder: &'a Path,
}

impl<'a> FetchReplacePipeline<'a> {
    pub fn new(registry: &'a RegistryClient, folder: &'a Path) -> Self {
        Self { registry, folder }
    }

    pub async fn run<F>(
        &self,
        resolutions: &[Resolution],
        options: &UpdateOptions<'_>,
        mut progress: F,
    ) -> UpdateReport
    where
        F: FnMut(&str),
    {
        let mut report = UpdateReport::default();

        let plausible = resolutions
            .iter()
            .any(|r| r.decision != UpdateDecision::Skip(SkipReason::NoInfo));
        if plausible && let Some(dest) = options.backup_to.as_deref() {
            match backup::create_backup_at(self.folder, dest) {
                Ok(path) => report.backup = Some(path),
                Err(err) => {
                    error!("pipeline: {err}; no files were changed");
                    report.aborted = true;
                    report.skipped = resolutions.iter().map(|r| r.path.clone()).collect();
                    return report;
                }
            }
        }

        for resolution in resolutions {
            progress(&file_name(&resolution.path));
            let outcome = match &resolution.decision {
                UpdateDecision::Skip(_) => Outcome::Skipped(resolution.path.clone()),
                UpdateDecision::Update {
                    download_url,
                    target_version,
                } => {
                    self.replace(&resolution.path, download_url, target_version, options.loaders)
                        .await
                }
            };
            report.record(outcome);
        }

        info!(
            "pipeline: {} updated, {} failed, {} skipped",
            report.updated.len(),
            report.failed.len(),
            report.skipped.len()
        );
        report
    }

    async fn replace(
        &self,
        path: &Path,
        download_url: &str,
        version: &str,
        loaders: &[String],
    ) -> Outcome {
        let old_name = file_name(path);
        let temp_path = self.folder.join(format!("{TEMP_PREFIX}{old_name}"));

        if let Err(err) = self
            .registry
            .download_to_path(download_url, &temp_path, |_, _| {})
            .await
        {
            warn!("pipeline: failed to download {download_url}: {err}");
            return Outcome::Failed(path.to_path_buf());
        }

        let new_name = updated_file_name(&old_name, version, loaders);
        match self.swap_in(path, &temp_path, &new_name).await {
            Ok(()) => {
                info!("pipeline: {old_name} → {new_name}");
                Outcome::Updated(RenamedMod { old_name, new_name })
            }
            Err(err) => {
                error!("pipeline: error updating {old_name}: {err}");
                Outcome::Failed(path.to_path_buf())
            }
        }
    }

    /// Delete the original, then move the download into its final name.
    /// A failed rename leaves the download in place under its temporary name.
    async fn swap_in(&self, original: &Path, temp_path: &Path, new_name: &str) -> Result<()> {
        if let Err(err) = fs::remove_file(original).await {
            if let Err(cleanup) = fs::remove_file(temp_path).await {
                warn!(
                    "pipeline: unable to remove {}: {cleanup}",
                    temp_path.display()
                );
            }
            return Err(UpdaterError::io("failed to remove old file", original, err));
        }
        let final_path = self.folder.join(new_name);
        fs::rename(temp_path, &final_path)
            .await
            .map_err(|e| UpdaterError::io("failed to rename download", temp_path, e))
    }
}
