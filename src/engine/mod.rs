use chrono::Utc;
use log::{debug, info, warn};

use crate::backup;
use crate::config::Config;
use crate::engine::state::{CheckOptions, CheckOutcome};
use crate::env;
use crate::error::{Result, UpdaterError};
use crate::hashing::{self, HashIndex};
use crate::pipeline::{FetchReplacePipeline, UpdateOptions};
use crate::registry::{RegistryClient, VersionMap};
use crate::resolver;
use crate::storage::ConfigStore;
use crate::ui;

pub mod state;

/// Per-process context: configuration, its store and the registry client.
pub struct UpdaterEngine {
    config: Config,
    store: ConfigStore,
    registry: RegistryClient,
}

impl UpdaterEngine {
    pub fn new(config: Config, store: ConfigStore) -> Self {
        let registry = RegistryClient::new(&config.api_url);
        Self {
            config,
            store,
            registry,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run hash -> lookup -> summary -> update for one profile.
    ///
    /// `confirm` answers yes/no questions (interval override, update confirmation).
    pub async fn check_profile<F>(
        &mut self,
        profile: Option<&str>,
        options: CheckOptions,
        mut confirm: F,
    ) -> Result<CheckOutcome>
    where
        F: FnMut(&str, bool) -> bool,
    {
        let name = profile
            .map(str::to_owned)
            .unwrap_or_else(|| self.config.current_folder.clone());
        let folder = self
            .config
            .profile(&name)
            .map(|p| env::expand_tilde(&p.folder))
            .ok_or_else(|| UpdaterError::Config(format!("no profile named '{name}'")))?;
        info!("check: profile '{name}' ({})", folder.display());

        let now = Utc::now();
        if !options.force && !self.config.check_due(now) {
            let days_since = self.config.days_since_check(now).unwrap_or_default();
            let question = format!(
                "Last check was {days_since} days ago (interval {} days). Check anyway?",
                self.config.check_interval_days
            );
            if !confirm(&question, false) {
                return Ok(CheckOutcome::NotDue { days_since });
            }
        }
        self.config.mark_checked(now);
        if let Err(err) = self.store.save(&self.config).await {
            warn!("check: unable to record check time: {err}");
        }

        let files = hashing::list_mod_files(&folder)?;
        if files.is_empty() {
            return Ok(CheckOutcome::NoModFiles);
        }

        let bar = ui::progress_bar(files.len(), "Hashing");
        let index = hashing::build_hash_index(&files, |path| {
            bar.set_message(crate::util::file_name(path));
            bar.inc(1);
        });
        bar.finish_and_clear();
        if index.is_empty() {
            return Ok(CheckOutcome::NothingHashed);
        }
        info!("check: hashed {} of {} files", index.len(), files.len());

        let (current, latest) = self.lookup(&index).await;
        let summary = resolver::summarize(&index, &current, &latest);
        ui::print_summary(&summary);
        if !resolver::updates_available(&summary) {
            return Ok(CheckOutcome::UpToDate { summary });
        }
        if options.dry_run {
            return Ok(CheckOutcome::DryRun { summary });
        }
        if !self.config.auto_update
            && !options.assume_yes
            && !confirm("Do you want to update the mods?", true)
        {
            return Ok(CheckOutcome::Declined);
        }

        let resolutions = resolver::resolve_all(&index, &current, &latest);
        for resolution in &resolutions {
            if let resolver::UpdateDecision::Skip(reason) = &resolution.decision {
                debug!("check: {} skipped ({reason})", resolution.path.display());
            }
        }

        let backup_to = self
            .config
            .backup_mods
            .then(|| backup::backup_path(&folder, &backup::timestamp()));
        let update_options = UpdateOptions {
            loaders: &self.config.loaders,
            backup_to,
        };
        let pipeline = FetchReplacePipeline::new(&self.registry, &folder);
        let bar = ui::progress_bar(resolutions.len(), "Updating");
        let report = pipeline
            .run(&resolutions, &update_options, |name| {
                bar.set_message(name.to_owned());
                bar.inc(1);
            })
            .await;
        bar.finish_and_clear();
        Ok(CheckOutcome::Applied(report))
    }

    /// Both registry lookups; a failed call is reported and treated as an empty result.
    async fn lookup(&self, index: &HashIndex) -> (VersionMap, VersionMap) {
        let hashes = index.hashes();

        let current = self
            .registry
            .lookup_current(&hashes)
            .await
            .unwrap_or_else(|err| {
                warn!("check: current version lookup failed: {err}");
                ui::warning(&format!("Error checking current versions: {err}"));
                VersionMap::new()
            });

        let latest = self
            .registry
            .lookup_latest(&hashes, &self.config.loaders, &self.config.game_versions)
            .await
            .unwrap_or_else(|err| {
                warn!("check: latest version lookup failed: {err}");
                ui::warning(&format!("Error checking latest versions: {err}"));
                VersionMap::new()
            });

        debug!(
            "check: registry knows {} current / {} latest of {} hashes",
            current.len(),
            latest.len(),
            hashes.len()
        );
        (current, latest)
    }
}
