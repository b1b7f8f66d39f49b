use std::path::Path;

use log::{debug, warn};
use tokio::fs;

use crate::engine::version::VersionCode;
use crate::env::InstallLayout;
use crate::error::{LauncherError, Result};

const MARKER_TMP_EXTENSION: &str = "txt.tmp";

/// The launcher's only persisted state: the version marker next to the
/// installed tree, plus presence checks on the entry point and temp archive.
#[derive(Clone, Debug)]
pub struct LocalInstallState {
    layout: InstallLayout,
}

impl LocalInstallState {
    pub fn new(layout: InstallLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    pub async fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(self.layout.root())
            .await
            .map_err(|source| LauncherError::StateWrite {
                path: self.layout.root().to_path_buf(),
                source,
            })
    }

    pub fn has_recorded_version(&self) -> bool {
        self.layout.version_file().is_file()
    }

    /// Read the marker. `Ok(None)` means nothing was ever installed.
    ///
    /// # Errors
    /// [`LauncherError::CorruptState`] when the marker exists but cannot be
    /// read or does not hold a well-formed version.
    pub async fn read_recorded_version(&self) -> Result<Option<VersionCode>> {
        let path = self.layout.version_file();
        if !self.has_recorded_version() {
            debug!("storage: no version marker at {}", path.display());
            return Ok(None);
        }
        let bytes = fs::read(&path)
            .await
            .map_err(|e| LauncherError::CorruptState {
                path: path.clone(),
                reason: format!("unreadable marker: {e}"),
            })?;
        let text = String::from_utf8_lossy(&bytes);
        VersionCode::parse(&text)
            .map(Some)
            .map_err(|err| LauncherError::CorruptState {
                path,
                reason: err.to_string(),
            })
    }

    /// Replace the marker by writing a sibling temp file and renaming it over
    /// the old one, so readers see either the old or the new version.
    pub async fn write_recorded_version(&self, version: VersionCode) -> Result<()> {
        let path = self.layout.version_file();
        let tmp = path.with_extension(MARKER_TMP_EXTENSION);
        let state_write = |source: std::io::Error| LauncherError::StateWrite {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(state_write)?;
        }
        fs::write(&tmp, version.to_string())
            .await
            .map_err(state_write)?;
        if let Err(err) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(state_write(err));
        }
        debug!("storage: recorded version {} at {}", version, path.display());
        Ok(())
    }

    pub fn entry_point_exists(&self) -> bool {
        self.layout.entry_point().is_file()
    }

    pub fn entry_point(&self) -> &Path {
        self.layout.entry_point()
    }

    pub fn has_temp_archive(&self) -> bool {
        self.layout.archive_path().exists()
    }

    /// Delete the downloaded archive. Succeeds when it is already gone.
    pub async fn remove_temp_archive(&self) -> Result<()> {
        let path = self.layout.archive_path();
        if fs::metadata(&path).await.is_err() {
            return Ok(());
        }
        fs::remove_file(&path)
            .await
            .map_err(|source| LauncherError::StateWrite { path, source })
    }

    /// Like [`Self::remove_temp_archive`] but only logs failures.
    pub async fn discard_temp_archive(&self) {
        if let Err(err) = self.remove_temp_archive().await {
            warn!("storage: failed to discard temporary archive: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_in(dir: &Path) -> LocalInstallState {
        LocalInstallState::new(InstallLayout::new(dir.join("Game"), "Game.exe"))
    }

    #[tokio::test]
    async fn missing_marker_reads_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = state_in(dir.path());
        assert!(!state.has_recorded_version());
        assert_eq!(state.read_recorded_version().await.ok(), Some(None));
    }

    #[tokio::test]
    async fn writes_then_reads_marker() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = state_in(dir.path());
        state
            .write_recorded_version(VersionCode::new(1, 4, 2))
            .await
            .expect("write marker");
        assert!(state.has_recorded_version());
        assert_eq!(
            state.read_recorded_version().await.ok(),
            Some(Some(VersionCode::new(1, 4, 2)))
        );
        let raw = std::fs::read_to_string(state.layout().version_file()).expect("read raw");
        assert_eq!(raw, "1.4.2");
        assert!(
            !state
                .layout()
                .version_file()
                .with_extension(MARKER_TMP_EXTENSION)
                .exists()
        );
    }

    #[tokio::test]
    async fn overwrites_existing_marker() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = state_in(dir.path());
        state
            .write_recorded_version(VersionCode::new(1, 0, 0))
            .await
            .expect("first write");
        state
            .write_recorded_version(VersionCode::new(1, 1, 0))
            .await
            .expect("second write");
        assert_eq!(
            state.read_recorded_version().await.ok(),
            Some(Some(VersionCode::new(1, 1, 0)))
        );
    }

    #[tokio::test]
    async fn malformed_marker_is_corrupt_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = state_in(dir.path());
        state.ensure_root().await.expect("root");
        std::fs::write(state.layout().version_file(), "1.0").expect("write");
        assert!(state.has_recorded_version());
        assert!(matches!(
            state.read_recorded_version().await,
            Err(LauncherError::CorruptState { .. })
        ));
    }

    #[tokio::test]
    async fn entry_point_is_checked_independently() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = state_in(dir.path());
        state
            .write_recorded_version(VersionCode::new(2, 0, 0))
            .await
            .expect("write marker");
        assert!(!state.entry_point_exists());
        std::fs::write(state.entry_point(), b"binary").expect("write exe");
        assert!(state.entry_point_exists());
    }

    #[tokio::test]
    async fn removes_temp_archive_when_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = state_in(dir.path());
        state.remove_temp_archive().await.expect("absent archive is fine");
        state.ensure_root().await.expect("root");
        std::fs::write(state.layout().archive_path(), b"partial").expect("write");
        assert!(state.has_temp_archive());
        state.remove_temp_archive().await.expect("remove");
        assert!(!state.has_temp_archive());
    }
}
