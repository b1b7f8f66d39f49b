use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use serde::Deserialize;

use crate::env::{self, InstallLayout};
use crate::error::{LauncherError, Result};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ARCHIVE_TIMEOUT_SECS: u64 = 30 * 60;

/// Settings read from `launcher.json`, then overridden from the command line.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LauncherConfig {
    /// Remote base location; resources are appended to it verbatim.
    pub download_link: String,
    /// Entry point, relative to the install root.
    pub exe_name: String,
    pub install_dir: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub archive_timeout_secs: u64,
    /// Treat a failed patch-note fetch as an update failure.
    pub strict_patch_notes: bool,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            download_link: String::new(),
            exe_name: String::new(),
            install_dir: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            archive_timeout_secs: DEFAULT_ARCHIVE_TIMEOUT_SECS,
            strict_patch_notes: false,
        }
    }
}

impl LauncherConfig {
    /// Load `path`. A missing file yields defaults so the command line can
    /// supply everything; an unreadable or invalid file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("config: {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|e| {
            LauncherError::Config(format!("unable to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            LauncherError::Config(format!("{} parse error: {e}", path.display()))
        })?;
        info!("config: loaded {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.download_link.trim().is_empty() {
            return Err(LauncherError::Config("downloadLink is not set".into()));
        }
        if self.exe_name.trim().is_empty() {
            return Err(LauncherError::Config("exeName is not set".into()));
        }
        let exe = Path::new(&self.exe_name);
        if exe.is_absolute()
            || exe
                .components()
                .any(|part| !matches!(part, Component::Normal(_) | Component::CurDir))
        {
            return Err(LauncherError::Config(
                "exeName must stay inside the install directory".into(),
            ));
        }
        Ok(())
    }

    pub fn layout(&self) -> InstallLayout {
        let root = self
            .install_dir
            .clone()
            .unwrap_or_else(env::default_install_root);
        InstallLayout::new(root, &self.exe_name)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn archive_timeout(&self) -> Duration {
        Duration::from_secs(self.archive_timeout_secs)
    }
}
