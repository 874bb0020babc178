use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "MOD_UPDATER_CONFIG";

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

/// Per-user data root (`%LOCALAPPDATA%`, `~/Library/Application Support` or `~/.local/share`).
fn user_data_root() -> PathBuf {
    match env::consts::OS {
        "windows" => env::var_os("LOCALAPPDATA")
            .or_else(|| env::var_os("APPDATA"))
            .map(PathBuf::from),
        "macos" => home_dir().map(|home| home.join("Library").join("Application Support")),
        _ => home_dir().map(|home| home.join(".local").join("share")),
    }
    .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the directory holding the updater's own files.
pub fn default_app_dir() -> PathBuf {
    user_data_root().join("mod-updater")
}

/// Location of the persisted configuration, honouring `MOD_UPDATER_CONFIG`.
pub fn config_path() -> PathBuf {
    env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| default_app_dir().join("config.json"))
}

/// The game's stock mods folder, used as the default "client" profile.
pub fn default_minecraft_mods_dir() -> PathBuf {
    let game_dir = match env::consts::OS {
        "windows" => env::var_os("APPDATA")
            .map(PathBuf::from)
            .map(|appdata| appdata.join(".minecraft")),
        "macos" => home_dir().map(|home| {
            home.join("Library")
                .join("Application Support")
                .join("minecraft")
        }),
        _ => home_dir().map(|home| home.join(".minecraft")),
    }
    .unwrap_or_else(|| PathBuf::from(".minecraft"));

    game_dir.join("mods")
}

/// Expand a leading `~` into the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if !path.starts_with('~') {
        return PathBuf::from(path);
    }
    let Some(home) = home_dir() else {
        return PathBuf::from(path);
    };
    if path == "~" {
        return home;
    }
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        return home.join(rest);
    }
    PathBuf::from(path)
}
