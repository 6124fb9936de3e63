use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Get XDG config directory for the bridge
/// Returns ~/.config/onvif-bridge or $XDG_CONFIG_HOME/onvif-bridge
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|p| p.join("onvif-bridge"))
        .ok_or(ConfigError::NoConfigDir)
}

/// Get default config file path
/// Returns ~/.config/onvif-bridge/bridge.toml
pub fn bridge_config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("bridge.toml"))
}

/// Ensure the directory exists, creating it if necessary.
/// On Unix, sets directory permissions to 0700 (owner only).
pub fn ensure_dir(dir: &Path) -> Result<(), ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            std::fs::set_permissions(dir, perms)?;
        }
    }
    Ok(())
}

/// Write content to a file with restrictive permissions (0600 on Unix).
/// The bridge config carries the ONVIF password, so it always goes through here.
pub fn write_secure(path: &Path, content: &str) -> Result<(), ConfigError> {
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600) // rw------- (owner only)
            .open(path)?;

        file.write_all(content.as_bytes())?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        std::fs::write(path, content)?;
        Ok(())
    }
}
