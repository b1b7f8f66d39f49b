use std::path::PathBuf;

use crate::engine::version::VersionCode;
use crate::networking::locations::RemoteLocations;

/// One progress notification from an archive transfer. `total` is `None`
/// when the server did not announce a content length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferProgress {
    pub received: u64,
    pub total: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallKind {
    FreshGame,
    Update,
}

/// Per-attempt bookkeeping for one download → extract → commit run.
#[derive(Clone, Debug)]
pub struct UpdateSession {
    pub locations: RemoteLocations,
    pub archive_path: PathBuf,
    pub target: VersionCode,
    pub kind: InstallKind,
    received: u64,
}

impl UpdateSession {
    pub fn new(
        locations: RemoteLocations,
        archive_path: PathBuf,
        target: VersionCode,
        kind: InstallKind,
    ) -> Self {
        Self {
            locations,
            archive_path,
            target,
            kind,
            received: 0,
        }
    }

    /// Fold a transfer snapshot into the session. Returns the snapshot to
    /// publish, with `received` clamped so it never moves backwards.
    pub fn record(&mut self, progress: TransferProgress) -> TransferProgress {
        self.received = self.received.max(progress.received);
        TransferProgress {
            received: self.received,
            total: progress.total,
        }
    }
}
