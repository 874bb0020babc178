use std::fmt;
use std::path::PathBuf;

use crate::hashing::HashIndex;
use crate::registry::{VersionMap, VersionRecord};
use crate::util::file_name;
use crate::version::{extract_version, is_newer};

const MISSING_VERSION: &str = "0.0.0";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The registry knows nothing about the current or latest build.
    NoInfo,
    UpToDate,
    /// An update exists but has no primary file to fetch.
    NoDownloadUrl,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::NoInfo => "no info",
            SkipReason::UpToDate => "up to date",
            SkipReason::NoDownloadUrl => "no download url",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateDecision {
    Update {
        download_url: String,
        target_version: String,
    },
    Skip(SkipReason),
}

/// Decision for one indexed file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub hash: String,
    pub path: PathBuf,
    pub decision: UpdateDecision,
}

/// Whether `latest_version` should replace the installed file.
///
/// The registry versions are compared first. When they say no, the version parsed from
/// the local filename is compared against `latest_version` and can still force an
/// update; this covers registry metadata that lags behind the installed build.
pub fn needs_update(current_version: &str, latest_version: &str, filename: &str) -> bool {
    if latest_version.is_empty() {
        return false;
    }
    if !current_version.is_empty() && is_newer(current_version, latest_version) {
        return true;
    }
    extract_version(filename).is_some_and(|from_name| is_newer(&from_name, latest_version))
}

pub fn decide(
    filename: &str,
    current: Option<&VersionRecord>,
    latest: Option<&VersionRecord>,
) -> UpdateDecision {
    let (Some(current), Some(latest)) = (current, latest) else {
        return UpdateDecision::Skip(SkipReason::NoInfo);
    };
    let current_version = current.version_number.as_deref().unwrap_or(MISSING_VERSION);
    let latest_version = latest.version_number.as_deref().unwrap_or(MISSING_VERSION);

    if !needs_update(current_version, latest_version, filename) {
        return UpdateDecision::Skip(SkipReason::UpToDate);
    }
    match latest.primary_url() {
        Some(url) => UpdateDecision::Update {
            download_url: url.to_owned(),
            target_version: latest_version.to_owned(),
        },
        None => UpdateDecision::Skip(SkipReason::NoDownloadUrl),
    }
}

/// Classify every indexed file, in index order.
pub fn resolve_all(index: &HashIndex, current: &VersionMap, latest: &VersionMap) -> Vec<Resolution> {
    index
        .iter()
        .map(|(hash, path)| Resolution {
            hash: hash.to_owned(),
            path: path.to_path_buf(),
            decision: decide(&file_name(path), current.get(hash), latest.get(hash)),
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModStatus {
    NotFound,
    NoUpdateInfo,
    Unknown,
    UpdateAvailable,
    UpToDate,
}

impl ModStatus {
    pub fn label(self) -> &'static str {
        match self {
            ModStatus::NotFound => "Not found in registry",
            ModStatus::NoUpdateInfo => "No update info",
            ModStatus::Unknown => "Unknown status",
            ModStatus::UpdateAvailable => "Update available",
            ModStatus::UpToDate => "Up to date",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModSummary {
    pub name: String,
    pub current_version: Option<String>,
    pub latest_version: Option<String>,
    pub status: ModStatus,
}

/// Per-file status rows for the pre-update summary.
pub fn summarize(index: &HashIndex, current: &VersionMap, latest: &VersionMap) -> Vec<ModSummary> {
    index
        .iter()
        .map(|(hash, path)| {
            let name = file_name(path);
            let current_record = current.get(hash);
            let latest_record = latest.get(hash);
            let current_version = current_record.and_then(|r| r.version_number.clone());
            let latest_version = latest_record.and_then(|r| r.version_number.clone());

            let status = match (current_record, latest_record) {
                (None, _) => ModStatus::NotFound,
                (Some(_), None) => ModStatus::NoUpdateInfo,
                (Some(_), Some(_)) => {
                    match (current_version.as_deref(), latest_version.as_deref()) {
                        (Some(current_v), Some(latest_v)) => {
                            if needs_update(current_v, latest_v, &name) {
                                ModStatus::UpdateAvailable
                            } else {
                                ModStatus::UpToDate
                            }
                        }
                        _ => ModStatus::Unknown,
                    }
                }
            };

            ModSummary {
                name,
                current_version,
                latest_version,
                status,
            }
        })
        .collect()
}

pub fn updates_available(summary: &[ModSummary]) -> bool {
    summary
        .iter()
        .any(|row| row.status == ModStatus::UpdateAvailable)
}
