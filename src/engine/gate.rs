use std::path::PathBuf;

use crate::engine::state::LauncherStatus;
use crate::storage::LocalInstallState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LaunchDecision {
    Launch {
        entry_point: PathBuf,
        working_dir: PathBuf,
    },
    RetryUpdate,
    NoOp,
}

/// Arbitrate a launch request. Launching requires a `Ready` status, an entry
/// point on disk and no leftover download; a `Failed` status turns the
/// request into a retry.
pub fn request_launch(
    status: Option<LauncherStatus>,
    install: &LocalInstallState,
) -> LaunchDecision {
    match status {
        Some(LauncherStatus::Ready)
            if install.entry_point_exists() && !install.has_temp_archive() =>
        {
            LaunchDecision::Launch {
                entry_point: install.entry_point().to_path_buf(),
                working_dir: install.layout().root().to_path_buf(),
            }
        }
        Some(LauncherStatus::Failed) => LaunchDecision::RetryUpdate,
        _ => LaunchDecision::NoOp,
    }
}
