use std::path::PathBuf;

/// Returns the base directory for relay data.
///
/// Uses `$LAUNCH_RELAY_HOME` if set, otherwise defaults to `~/.launch-relay`.
pub fn relay_home() -> PathBuf {
    if let Ok(home) = std::env::var("LAUNCH_RELAY_HOME") {
        return PathBuf::from(home);
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".launch-relay")
}

/// Returns the path to the default configuration file.
pub fn config_path() -> PathBuf {
    relay_home().join("config.toml")
}
