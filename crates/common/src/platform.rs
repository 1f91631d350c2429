use std::path::PathBuf;

/// Gets the default configuration file path for Authleiber.
/// - Linux: ~/.config/authleiber/config.toml
/// - macOS: ~/Library/Application Support/authleiber/config.toml
/// - Windows: %APPDATA%/authleiber/config.toml
pub fn get_config_path() -> Option<PathBuf> {
    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("authleiber/config.toml"))
}

/// Gets the default log file path.
/// Falls back to the temp directory when the platform has no cache dir.
pub fn get_log_path() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("authleiber"))
        .unwrap_or_else(std::env::temp_dir)
        .join("authleiber.log")
}

/// Returns a human-readable string for the current OS.
pub fn get_os_name() -> &'static str {
    #[cfg(target_os = "linux")]
    return "Linux";

    #[cfg(target_os = "macos")]
    return "macOS";

    #[cfg(target_os = "windows")]
    return "Windows";

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    return "Unknown";
}
