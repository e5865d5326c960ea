//! Configuration file discovery and root folder resolution
//!
//! Both follow the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file / per-user and system config locations
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Name of the SQLite database file kept in the root folder
pub const DATABASE_FILE: &str = "echotag.db";

/// Application directory name used under the platform config/data dirs
const APP_DIR: &str = "echotag";

/// Locate the TOML configuration file for a service
///
/// Returns `None` when no file exists at any candidate location; callers then
/// run on defaults.
///
/// # Arguments
/// * `cli_arg` - Path passed on the command line
/// * `env_var_name` - Environment variable holding a path (e.g. `ECHOTAG_CONFIG`)
/// * `file_name` - File name searched in the config directories (e.g. `echotag-ed.toml`)
pub fn locate_config_file(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> Option<PathBuf> {
    // An explicit path is returned even if missing so the load reports it
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR).join(file_name));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc").join(APP_DIR).join(file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load and deserialize a TOML configuration file
///
/// `None` yields `T::default()`. A path that was given but cannot be read or
/// parsed is an error: silently ignoring an explicit config file hides typos.
pub fn load_toml_config<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        return Ok(T::default());
    };

    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    toml::from_str(&content).map_err(|source| Error::TomlParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve the root folder holding the service database
///
/// # Arguments
/// * `cli_arg` - `--root-folder` value
/// * `env_var_name` - Environment variable name (e.g. `ECHOTAG_ROOT_FOLDER`)
/// * `toml_value` - `root_folder` key from the loaded TOML file
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_value: Option<&str>,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = toml_value {
        return PathBuf::from(path);
    }

    default_root_folder()
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/echotag (or /var/lib/echotag for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/var/lib/echotag"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/echotag"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\echotag"))
    } else {
        PathBuf::from("./echotag_data")
    }
}

/// Create the root folder if missing and return the database path inside it
pub fn prepare_root_folder(root_folder: &Path) -> Result<PathBuf> {
    if !root_folder.exists() {
        std::fs::create_dir_all(root_folder)?;
        tracing::info!(root_folder = %root_folder.display(), "Created root folder");
    } else if !root_folder.is_dir() {
        return Err(Error::Config(format!(
            "Root folder is not a directory: {}",
            root_folder.display()
        )));
    }

    Ok(root_folder.join(DATABASE_FILE))
}
