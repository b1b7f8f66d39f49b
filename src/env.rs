use std::env;
use std::path::{Path, PathBuf};

use crate::networking::locations::{ARCHIVE_SUFFIX, VERSION_SUFFIX};

pub const DEFAULT_INSTALL_DIR: &str = "Game";
pub const DEFAULT_CONFIG_FILE: &str = "launcher.json";
const STAGING_DIR: &str = ".staging";

/// Returns the install root used when none is configured: `./Game`.
pub fn default_install_root() -> PathBuf {
    env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(DEFAULT_INSTALL_DIR)
}

/// On-disk locations of everything the launcher owns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
    entry_point: PathBuf,
}

impl InstallLayout {
    pub fn new(root: impl Into<PathBuf>, exe_name: impl AsRef<Path>) -> Self {
        let root = root.into();
        let entry_point = root.join(exe_name);
        Self { root, entry_point }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn version_file(&self) -> PathBuf {
        self.root.join(VERSION_SUFFIX)
    }

    /// Where the archive is streamed before extraction.
    pub fn archive_path(&self) -> PathBuf {
        self.root.join(ARCHIVE_SUFFIX)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    pub fn entry_point(&self) -> &Path {
        &self.entry_point
    }
}
