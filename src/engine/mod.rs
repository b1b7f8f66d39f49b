use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use crate::archive;
use crate::config::LauncherConfig;
use crate::engine::gate::LaunchDecision;
use crate::engine::models::{InstallKind, TransferProgress, UpdateSession};
use crate::engine::state::{FALLBACK_PATCH_NOTE, LauncherEvent, LauncherStatus, UserAction};
use crate::engine::version::VersionCode;
use crate::error::{LauncherError, Result};
use crate::networking::Transfer;
use crate::networking::locations::RemoteLocations;
use crate::process::Handoff;
use crate::storage::LocalInstallState;

pub mod gate;
pub mod models;
pub mod state;
pub mod version;

pub type Updates = mpsc::UnboundedSender<LauncherEvent>;

/// Owns the launcher status and drives check → download → extract → commit.
///
/// All transitions go through `&mut self`, so a single owner task serialises
/// them; observers only ever see the immutable [`LauncherEvent`]s it emits.
pub struct LauncherEngine {
    status: Option<LauncherStatus>,
    install: LocalInstallState,
    locations: RemoteLocations,
    transfer: Arc<dyn Transfer>,
    handoff: Arc<dyn Handoff>,
    strict_patch_notes: bool,
}

impl LauncherEngine {
    pub fn new(
        config: &LauncherConfig,
        transfer: Arc<dyn Transfer>,
        handoff: Arc<dyn Handoff>,
    ) -> Self {
        Self::with_parts(
            LocalInstallState::new(config.layout()),
            RemoteLocations::resolve(&config.download_link),
            transfer,
            handoff,
        )
        .strict_patch_notes(config.strict_patch_notes)
    }

    pub fn with_parts(
        install: LocalInstallState,
        locations: RemoteLocations,
        transfer: Arc<dyn Transfer>,
        handoff: Arc<dyn Handoff>,
    ) -> Self {
        Self {
            status: None,
            install,
            locations,
            transfer,
            handoff,
            strict_patch_notes: false,
        }
    }

    pub fn strict_patch_notes(mut self, strict: bool) -> Self {
        self.strict_patch_notes = strict;
        self
    }

    /// `None` until the first check has completed.
    pub fn status(&self) -> Option<LauncherStatus> {
        self.status
    }

    pub fn install(&self) -> &LocalInstallState {
        &self.install
    }

    pub async fn handle_action(&mut self, action: UserAction, updates: &Updates) {
        match action {
            UserAction::Activate => {
                info!("action: Activate");
                self.activate(updates).await;
            }
            UserAction::CheckForUpdates => {
                info!("action: CheckForUpdates");
                if let Err(err) = self.check_for_updates(updates).await {
                    warn!("action: CheckForUpdates refused: {err}");
                }
            }
            UserAction::ClickPlay => {
                info!("action: ClickPlay");
                self.request_launch(updates).await;
            }
        }
    }

    /// Start-up sequence: patch notes first, then the version check.
    pub async fn activate(&mut self, updates: &Updates) {
        self.fetch_patch_notes(updates).await;
        if let Err(err) = self.check_for_updates(updates).await {
            warn!("activate: {err}");
        }
    }

    /// Fetch the display-only patch notes. A failure shows fallback text and,
    /// unless strict mode is on, leaves the functional status alone.
    pub async fn fetch_patch_notes(&mut self, updates: &Updates) {
        match self.transfer.fetch_text(&self.locations.patch_note).await {
            Ok(text) => {
                debug!("patch notes: {} bytes", text.len());
                updates.send(LauncherEvent::PatchNotes(text)).ok();
            }
            Err(err) => {
                warn!("patch notes: fetch failed: {err}");
                updates
                    .send(LauncherEvent::PatchNotes(FALLBACK_PATCH_NOTE.into()))
                    .ok();
                if self.strict_patch_notes {
                    self.fail(&err, updates);
                }
            }
        }
    }

    /// Run one full check. Returns the resulting status; flow errors end up
    /// as [`LauncherStatus::Failed`] plus an [`LauncherEvent::Error`].
    ///
    /// # Errors
    /// [`LauncherError::FlowInProgress`] when a download is already running.
    pub async fn check_for_updates(&mut self, updates: &Updates) -> Result<LauncherStatus> {
        if let Some(status) = self.status
            && status.is_downloading()
        {
            warn!("check: refusing to start while {status:?}");
            return Err(LauncherError::FlowInProgress);
        }
        info!("check: starting update check");
        if let Err(err) = self.run_check(updates).await {
            self.install.discard_temp_archive().await;
            self.fail(&err, updates);
        }
        Ok(self.status.unwrap_or(LauncherStatus::Failed))
    }

    /// Apply the launch gate to the current status and act on its decision.
    pub async fn request_launch(&mut self, updates: &Updates) -> LaunchDecision {
        let decision = gate::request_launch(self.status, &self.install);
        match &decision {
            LaunchDecision::Launch {
                entry_point,
                working_dir,
            } => match self.handoff.launch(entry_point, working_dir) {
                Ok(()) => {
                    updates
                        .send(LauncherEvent::Launched {
                            entry_point: entry_point.clone(),
                        })
                        .ok();
                }
                Err(err) => {
                    error!("launch failed: {err}");
                    updates.send(LauncherEvent::Error(err.to_string())).ok();
                }
            },
            LaunchDecision::RetryUpdate => {
                warn!("launch: requested while failed; re-running update check");
                if let Err(err) = self.check_for_updates(updates).await {
                    warn!("launch: retry refused: {err}");
                }
            }
            LaunchDecision::NoOp => {
                debug!("launch: ignored in status {:?}", self.status);
            }
        }
        decision
    }

    async fn run_check(&mut self, updates: &Updates) -> Result<()> {
        self.install.ensure_root().await?;
        let local = match self.install.read_recorded_version().await {
            Ok(local) => local,
            Err(err) => {
                warn!("check: {err}; reinstalling from scratch");
                None
            }
        };
        if let Some(local) = local {
            updates.send(LauncherEvent::Version(local)).ok();
        }

        let remote = self.fetch_remote_version().await?;
        let kind = match local {
            None => {
                info!("check: no local install, downloading {remote}");
                InstallKind::FreshGame
            }
            Some(local) if remote.is_diff(&local) => {
                if remote < local {
                    warn!("check: remote {remote} is older than local {local}; installing it anyway");
                } else {
                    info!("check: update available {local} -> {remote}");
                }
                InstallKind::Update
            }
            Some(local) => {
                info!("check: local install {local} is up to date");
                // An archive from an aborted transfer must not block launching.
                self.install.remove_temp_archive().await?;
                self.set_status(LauncherStatus::Ready, updates);
                return Ok(());
            }
        };

        let session = UpdateSession::new(
            self.locations.clone(),
            self.install.layout().archive_path(),
            remote,
            kind,
        );
        self.install_update(session, updates).await
    }

    async fn fetch_remote_version(&self) -> Result<VersionCode> {
        let text = self.transfer.fetch_text(&self.locations.version).await?;
        let remote = VersionCode::parse(&text)?;
        debug!("check: remote version {remote}");
        Ok(remote)
    }

    async fn install_update(&mut self, mut session: UpdateSession, updates: &Updates) -> Result<()> {
        let status = match session.kind {
            InstallKind::FreshGame => LauncherStatus::DownloadingGame,
            InstallKind::Update => LauncherStatus::DownloadingUpdate,
        };
        self.set_status(status, updates);
        // A leftover archive belongs to an interrupted run and is never trusted.
        self.install.remove_temp_archive().await?;

        let received = self.download_archive(&mut session, status, updates).await?;
        info!(
            "install: downloaded {} bytes for {}, extracting",
            received, session.target
        );

        updates.send(LauncherEvent::Extracting).ok();
        let archive_path = session.archive_path.clone();
        let root = self.install.layout().root().to_path_buf();
        let staging = self.install.layout().staging_dir();
        tokio::task::spawn_blocking(move || archive::install_archive(&archive_path, &root, &staging))
            .await
            .map_err(|e| LauncherError::Extraction(format!("extraction task failed: {e}")))??;

        self.install.remove_temp_archive().await?;
        self.install.write_recorded_version(session.target).await?;
        updates.send(LauncherEvent::Version(session.target)).ok();
        self.set_status(LauncherStatus::Ready, updates);
        info!("install: {} ready", session.target);
        Ok(())
    }

    /// Stream the archive on a worker task, forwarding its progress as
    /// events until it completes.
    async fn download_archive(
        &self,
        session: &mut UpdateSession,
        status: LauncherStatus,
        updates: &Updates,
    ) -> Result<u64> {
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<TransferProgress>();
        let transfer = Arc::clone(&self.transfer);
        let location = session.locations.archive.clone();
        let dest = session.archive_path.clone();
        let mut task =
            tokio::spawn(async move { transfer.fetch_to_file(&location, &dest, progress_tx).await });

        let joined = loop {
            tokio::select! {
                biased;
                Some(progress) = progress_rx.recv() => {
                    let progress = session.record(progress);
                    updates.send(LauncherEvent::Progress { status, progress }).ok();
                }
                joined = &mut task => break joined,
            }
        };
        while let Ok(progress) = progress_rx.try_recv() {
            let progress = session.record(progress);
            updates.send(LauncherEvent::Progress { status, progress }).ok();
        }

        joined.map_err(|e| {
            LauncherError::network(&session.locations.archive, format!("transfer task failed: {e}"))
        })?
    }

    fn set_status(&mut self, status: LauncherStatus, updates: &Updates) {
        debug!("status: {:?} -> {:?}", self.status, status);
        self.status = Some(status);
        updates.send(LauncherEvent::Status(status)).ok();
    }

    fn fail(&mut self, err: &LauncherError, updates: &Updates) {
        error!("update flow failed: {err}");
        self.set_status(LauncherStatus::Failed, updates);
        updates.send(LauncherEvent::Error(err.to_string())).ok();
    }
}
