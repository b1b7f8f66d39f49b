use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info, warn};
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::engine::models::TransferProgress;
use crate::error::{LauncherError, Result};
use crate::util::{format_speed, progress_percent};

pub mod locations;

const PROGRESS_INTERVAL_SECS: f32 = 0.2;

/// A byte transfer from a remote location, either into memory or to disk.
///
/// Failures are surfaced immediately; implementations never retry.
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Fetch a small text resource.
    async fn fetch_text(&self, location: &str) -> Result<String>;

    /// Stream `location` into `dest`, publishing progress snapshots on
    /// `progress`. Returns the number of bytes written. A failed transfer may
    /// leave a partial file behind.
    async fn fetch_to_file(
        &self,
        location: &str,
        dest: &Path,
        progress: mpsc::UnboundedSender<TransferProgress>,
    ) -> Result<u64>;
}

#[derive(Clone)]
pub struct HttpTransfer {
    client: Client,
    request_timeout: Duration,
    archive_timeout: Duration,
}

impl HttpTransfer {
    pub fn new(request_timeout: Duration, archive_timeout: Duration) -> Self {
        let client = Client::builder()
            .connect_timeout(request_timeout)
            .user_agent(concat!("game-launcher/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|err| {
                warn!("network client: falling back to default HTTP client configuration ({err})");
                Client::new()
            });
        Self {
            client,
            request_timeout,
            archive_timeout,
        }
    }
}

#[async_trait]
impl Transfer for HttpTransfer {
    async fn fetch_text(&self, location: &str) -> Result<String> {
        debug!("fetch_text: GET {location}");
        let response = self
            .client
            .get(location)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| LauncherError::network(location, format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| LauncherError::network(location, format!("bad status: {e}")))?;
        response
            .text()
            .await
            .map_err(|e| LauncherError::network(location, format!("body error: {e}")))
    }

    async fn fetch_to_file(
        &self,
        location: &str,
        dest: &Path,
        progress: mpsc::UnboundedSender<TransferProgress>,
    ) -> Result<u64> {
        info!("fetch_to_file: {} -> {}", location, dest.display());
        let response = self
            .client
            .get(location)
            .timeout(self.archive_timeout)
            .send()
            .await
            .map_err(|e| LauncherError::network(location, format!("download request failed: {e}")))?
            .error_for_status()
            .map_err(|e| LauncherError::network(location, format!("download status error: {e}")))?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                LauncherError::network(location, format!("failed to create download dir: {e}"))
            })?;
        }
        let mut file = File::create(dest)
            .await
            .map_err(|e| LauncherError::network(location, format!("failed to create file: {e}")))?;

        let total = response.content_length();
        let mut stream = response.bytes_stream();
        let mut received: u64 = 0;
        let mut last_tick = Instant::now();
        let mut last_bytes = 0u64;

        let _ = progress.send(TransferProgress { received, total });

        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| LauncherError::network(location, format!("stream error: {e}")))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| LauncherError::network(location, format!("write error: {e}")))?;
            received += chunk.len() as u64;

            let since = last_tick.elapsed().as_secs_f32();
            if since > PROGRESS_INTERVAL_SECS {
                let speed = (received - last_bytes) as f32 / since;
                debug!(
                    "fetch_to_file: {} bytes of {:?} ({:.1}%, {})",
                    received,
                    total,
                    progress_percent(received, total),
                    format_speed(speed)
                );
                let _ = progress.send(TransferProgress { received, total });
                last_tick = Instant::now();
                last_bytes = received;
            }
        }

        // Final snapshot.
        let _ = progress.send(TransferProgress { received, total });

        file.flush()
            .await
            .map_err(|e| LauncherError::network(location, format!("flush error: {e}")))?;

        if let Some(total) = total
            && received < total
        {
            return Err(LauncherError::network(
                location,
                format!("download incomplete: received {received} of {total} bytes"),
            ));
        }

        info!("fetch_to_file: completed {} ({} bytes)", dest.display(), received);
        Ok(received)
    }
}
