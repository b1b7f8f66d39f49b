use std::path::PathBuf;

use crate::engine::models::TransferProgress;
use crate::engine::version::VersionCode;
use crate::util::{bytes_to_mb, progress_percent};

pub const FALLBACK_PATCH_NOTE: &str = "Connection to remote server failed...";
pub const EXTRACTING_LABEL: &str = "Extracting Content...";
const CHECKING_LABEL: &str = "Checking for updates...";

// The single source of truth for what the launch control may do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LauncherStatus {
    Ready,
    Failed,
    DownloadingGame,
    DownloadingUpdate,
}

impl LauncherStatus {
    pub fn is_downloading(self) -> bool {
        matches!(
            self,
            LauncherStatus::DownloadingGame | LauncherStatus::DownloadingUpdate
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            LauncherStatus::Ready => "Play",
            LauncherStatus::Failed => "Update Failed - Retry",
            LauncherStatus::DownloadingGame => "Downloading Game",
            LauncherStatus::DownloadingUpdate => "Downloading Update",
        }
    }

    /// Whether the launch control accepts clicks in this status.
    pub fn control_enabled(self) -> bool {
        matches!(self, LauncherStatus::Ready | LauncherStatus::Failed)
    }
}

/// Text shown on the launch control for a status and the latest transfer
/// snapshot. `None` status means the first check has not finished yet.
pub fn control_label(status: Option<LauncherStatus>, progress: Option<&TransferProgress>) -> String {
    match (status, progress) {
        (Some(status), Some(progress)) if status.is_downloading() => {
            let received = bytes_to_mb(progress.received);
            match progress.total {
                Some(total) => format!(
                    "{received}MB / {}MB ( {:.0}% )",
                    bytes_to_mb(total),
                    progress_percent(progress.received, Some(total)).floor()
                ),
                None => format!("{received}MB / ?MB"),
            }
        }
        (Some(status), _) => status.label().to_owned(),
        (None, _) => CHECKING_LABEL.to_owned(),
    }
}

// Events published by the engine to whoever renders it.
#[derive(Clone, Debug, PartialEq)]
pub enum LauncherEvent {
    Status(LauncherStatus),
    PatchNotes(String),
    Progress {
        status: LauncherStatus,
        progress: TransferProgress,
    },
    Extracting,
    /// The version currently installed, as read from or written to the marker.
    Version(VersionCode),
    Launched {
        entry_point: PathBuf,
    },
    Error(String),
}

// Actions triggered by the user from the front end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserAction {
    Activate,
    CheckForUpdates,
    ClickPlay,
}
