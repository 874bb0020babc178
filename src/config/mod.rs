use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::env;
use crate::error::{Result, UpdaterError};

pub const MAX_PROFILES: usize = 10;
pub const DEFAULT_API_URL: &str = "https://api.modrinth.com/v2";
const DEFAULT_LOADERS: &[&str] = &["fabric"];
const DEFAULT_GAME_VERSIONS: &[&str] = &["1.21.5"];
const DEFAULT_CHECK_INTERVAL_DAYS: u32 = 7;

/// A named mods folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub folder: String,
}

impl Profile {
    fn new(name: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            folder: folder.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(with = "profile_map")]
    pub mod_folders: Vec<Profile>,
    pub current_folder: String,
    pub game_versions: Vec<String>,
    pub loaders: Vec<String>,
    pub auto_update: bool,
    pub backup_mods: bool,
    pub check_interval_days: u32,
    pub last_check: Option<String>,
    pub api_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mod_folders: vec![
                Profile::new(
                    "client",
                    env::default_minecraft_mods_dir().display().to_string(),
                ),
                Profile::new("server", "mods-server"),
            ],
            current_folder: "client".into(),
            game_versions: DEFAULT_GAME_VERSIONS.iter().map(|v| v.to_string()).collect(),
            loaders: DEFAULT_LOADERS.iter().map(|v| v.to_string()).collect(),
            auto_update: true,
            backup_mods: true,
            check_interval_days: DEFAULT_CHECK_INTERVAL_DAYS,
            last_check: None,
            api_url: DEFAULT_API_URL.into(),
        }
    }
}

impl Config {
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.mod_folders.iter().find(|p| p.name == name)
    }

    fn profile_mut(&mut self, name: &str) -> Result<&mut Profile> {
        self.mod_folders
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| UpdaterError::Config(format!("no profile named '{name}'")))
    }

    pub fn add_profile(&mut self, name: &str, folder: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(UpdaterError::Config("profile name cannot be empty".into()));
        }
        if self.mod_folders.len() >= MAX_PROFILES {
            return Err(UpdaterError::Config(format!(
                "maximum of {MAX_PROFILES} profiles reached"
            )));
        }
        if self.profile(name).is_some() {
            return Err(UpdaterError::Config(format!(
                "profile '{name}' already exists"
            )));
        }
        self.mod_folders.push(Profile::new(name, folder));
        Ok(())
    }

    pub fn rename_profile(&mut self, old: &str, new: &str) -> Result<()> {
        let new = new.trim();
        if new.is_empty() {
            return Err(UpdaterError::Config("profile name cannot be empty".into()));
        }
        if old != new && self.profile(new).is_some() {
            return Err(UpdaterError::Config(format!(
                "profile '{new}' already exists"
            )));
        }
        self.profile_mut(old)?.name = new.to_owned();
        if self.current_folder == old {
            self.current_folder = new.to_owned();
        }
        Ok(())
    }

    pub fn set_profile_path(&mut self, name: &str, folder: &str) -> Result<()> {
        self.profile_mut(name)?.folder = folder.to_owned();
        Ok(())
    }

    pub fn delete_profile(&mut self, name: &str) -> Result<()> {
        let before = self.mod_folders.len();
        self.mod_folders.retain(|p| p.name != name);
        if self.mod_folders.len() == before {
            return Err(UpdaterError::Config(format!("no profile named '{name}'")));
        }
        if self.current_folder == name
            && let Some(first) = self.mod_folders.first()
        {
            self.current_folder = first.name.clone();
        }
        Ok(())
    }

    pub fn use_profile(&mut self, name: &str) -> Result<()> {
        if self.profile(name).is_none() {
            return Err(UpdaterError::Config(format!("no profile named '{name}'")));
        }
        self.current_folder = name.to_owned();
        Ok(())
    }

    /// Update a scalar setting from its command-line spelling.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "loaders" => self.loaders = parse_list(value),
            "game-versions" | "game_versions" => self.game_versions = parse_list(value),
            "auto-update" | "auto_update" => self.auto_update = parse_flag(value)?,
            "backup" | "backup_mods" => self.backup_mods = parse_flag(value)?,
            "check-interval" | "check_interval_days" => {
                self.check_interval_days = value.trim().parse().map_err(|_| {
                    UpdaterError::Config(format!("invalid check interval '{value}'"))
                })?;
            }
            "api-url" | "api_url" => self.api_url = value.trim().trim_end_matches('/').to_owned(),
            other => return Err(UpdaterError::Config(format!("unknown setting '{other}'"))),
        }
        Ok(())
    }

    /// Whole days elapsed since the last recorded check.
    pub fn days_since_check(&self, now: DateTime<Utc>) -> Option<i64> {
        let last = parse_timestamp(self.last_check.as_deref()?)?;
        Some((now - last).num_days())
    }

    /// True when no check happened within the configured interval.
    pub fn check_due(&self, now: DateTime<Utc>) -> bool {
        self.days_since_check(now)
            .is_none_or(|days| days >= i64::from(self.check_interval_days))
    }

    pub fn mark_checked(&mut self, now: DateTime<Utc>) {
        self.last_check = Some(now.to_rfc3339());
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Timestamps without an offset are read as UTC.
    raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(UpdaterError::Config(format!("expected yes/no, got '{other}'"))),
    }
}

/// Serializes profiles as a JSON object while keeping their order.
mod profile_map {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::{Deserializer, Serializer};

    use super::Profile;

    pub fn serialize<S: Serializer>(profiles: &[Profile], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(profiles.iter().map(|p| (&p.name, &p.folder)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Profile>, D::Error> {
        struct ProfileVisitor;

        impl<'de> Visitor<'de> for ProfileVisitor {
            type Value = Vec<Profile>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of profile names to folders")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut profiles: Vec<Profile> = Vec::new();
                while let Some((name, folder)) = access.next_entry::<String, String>()? {
                    match profiles.iter_mut().find(|p| p.name == name) {
                        Some(existing) => existing.folder = folder,
                        None => profiles.push(Profile { name, folder }),
                    }
                }
                Ok(profiles)
            }
        }

        deserializer.deserialize_map(ProfileVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn config_with(profiles: &[(&str, &str)]) -> Config {
        Config {
            mod_folders: profiles.iter().map(|(n, f)| Profile::new(*n, *f)).collect(),
            current_folder: profiles.first().map(|(n, _)| n.to_string()).unwrap_or_default(),
            ..Config::default()
        }
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"loaders": ["quilt"]}"#).unwrap();
        assert_eq!(cfg.loaders, vec!["quilt"]);
        assert_eq!(cfg.game_versions, vec!["1.21.5"]);
        assert!(cfg.auto_update);
        assert!(cfg.backup_mods);
        assert_eq!(cfg.check_interval_days, 7);
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.mod_folders.len(), 2);
    }

    #[test]
    fn profile_order_survives_serialization() {
        let cfg = config_with(&[("zeta", "z"), ("alpha", "a"), ("mid", "m")]);
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains(r#""mod_folders":{"zeta":"z","alpha":"a","mid":"m"}"#));
        let back: Config = serde_json::from_str(&json).unwrap();
        let names: Vec<_> = back.mod_folders.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn add_profile_rejects_duplicates_and_overflow() {
        let mut cfg = config_with(&[("client", "mods")]);
        assert!(cfg.add_profile("client", "elsewhere").is_err());
        for i in 0..(MAX_PROFILES - 1) {
            cfg.add_profile(&format!("p{i}"), "x").unwrap();
        }
        assert_eq!(cfg.mod_folders.len(), MAX_PROFILES);
        assert!(cfg.add_profile("one-too-many", "x").is_err());
    }

    #[test]
    fn rename_carries_active_marker() {
        let mut cfg = config_with(&[("client", "mods"), ("server", "srv")]);
        cfg.rename_profile("client", "laptop").unwrap();
        assert_eq!(cfg.current_folder, "laptop");
        assert!(cfg.rename_profile("laptop", "server").is_err());
        assert!(cfg.rename_profile("ghost", "other").is_err());
    }

    #[test]
    fn delete_repoints_active_profile() {
        let mut cfg = config_with(&[("client", "mods"), ("server", "srv")]);
        cfg.delete_profile("client").unwrap();
        assert_eq!(cfg.current_folder, "server");
        assert!(cfg.delete_profile("client").is_err());
    }

    #[test]
    fn set_parses_lists_and_flags() {
        let mut cfg = Config::default();
        cfg.set("loaders", "fabric, quilt").unwrap();
        cfg.set("game-versions", "1.21.4,1.21.5").unwrap();
        cfg.set("auto-update", "no").unwrap();
        cfg.set("check-interval", "3").unwrap();
        assert_eq!(cfg.loaders, vec!["fabric", "quilt"]);
        assert_eq!(cfg.game_versions, vec!["1.21.4", "1.21.5"]);
        assert!(!cfg.auto_update);
        assert_eq!(cfg.check_interval_days, 3);
        assert!(cfg.set("backup", "maybe").is_err());
        assert!(cfg.set("colour", "blue").is_err());
    }

    #[test]
    fn check_due_follows_interval() {
        let now = Utc::now();
        let mut cfg = Config::default();
        assert!(cfg.check_due(now));

        cfg.mark_checked(now - Duration::days(2));
        assert!(!cfg.check_due(now));
        assert_eq!(cfg.days_since_check(now), Some(2));

        cfg.mark_checked(now - Duration::days(7));
        assert!(cfg.check_due(now));

        cfg.last_check = Some("not a date".into());
        assert!(cfg.check_due(now));
    }

    #[test]
    fn reads_timestamps_without_offset() {
        let parsed = parse_timestamp("2025-04-01T10:30:00.123456").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-04-01T10:30:00.123456+00:00");
    }
}
