use std::path::Path;
use std::process::{Command, Stdio};

use log::{debug, info};

use crate::error::{LauncherError, Result};

/// Outbound hand-off to the installed program. Fire-and-forget: the exit
/// code is never observed.
pub trait Handoff: Send + Sync {
    fn launch(&self, entry_point: &Path, working_dir: &Path) -> Result<()>;
}

#[derive(Clone, Debug, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl Handoff for ProcessLauncher {
    fn launch(&self, entry_point: &Path, working_dir: &Path) -> Result<()> {
        info!("launch: starting {}", entry_point.display());
        debug!("launch: working_dir={}", working_dir.display());

        let mut cmd = Command::new(entry_point);
        cmd.current_dir(working_dir);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());

        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            // CREATE_NO_WINDOW | DETACHED_PROCESS
            cmd.creation_flags(0x08000000 | 0x00000008);
        }

        cmd.spawn().map_err(|source| LauncherError::Launch {
            path: entry_point.to_path_buf(),
            source,
        })?;
        info!("launch: process started");
        Ok(())
    }
}
