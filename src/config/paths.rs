use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use super::APP_NAME;
use crate::error::{Result, TopicError};

struct BaseLocations();
impl BaseLocations {
    fn proj_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", APP_NAME)
    }
}

trait ConfigPath {
    fn get_root_path() -> Result<PathBuf>;

    /// Get a subdir under the root path, creating as necessary.
    fn get_or_create_subdir<P: AsRef<Path>>(subpath: Option<P>) -> Result<PathBuf> {
        let root_path = Self::get_root_path()?;
        let full_path = subpath
            .map(|p| root_path.join(p))
            .unwrap_or(root_path);
        std::fs::create_dir_all(&full_path)?;
        Ok(full_path)
    }
}

/// Where persisted state (the cluster label catalog) lives.
pub(crate) struct AppData();
impl ConfigPath for AppData {
    fn get_root_path() -> Result<PathBuf> {
        BaseLocations::proj_dirs()
            .map(|d| d.data_dir().to_owned())
            .ok_or_else(|| TopicError::configuration("Unable to determine app data dir!"))
    }
}
impl AppData {
    pub(crate) fn get_data_path<P: AsRef<Path>>(subpath: Option<P>) -> Result<PathBuf> {
        Self::get_or_create_subdir(subpath)
    }
}

/// Where the user's `temas.toml` lives.
pub(crate) struct UserConfig();
impl ConfigPath for UserConfig {
    fn get_root_path() -> Result<PathBuf> {
        BaseLocations::proj_dirs()
            .map(|d| d.config_dir().to_owned())
            .ok_or_else(|| TopicError::configuration("Unable to determine config dir!"))
    }
}
impl UserConfig {
    pub(crate) fn get_config_path<P: AsRef<Path>>(subpath: Option<P>) -> Result<PathBuf> {
        Self::get_or_create_subdir(subpath)
    }
}
