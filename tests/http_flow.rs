//! End-to-end update flows against a mock update server.

use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use game_launcher::env::InstallLayout;
use game_launcher::networking::locations::RemoteLocations;
use game_launcher::networking::{HttpTransfer, Transfer};
use game_launcher::process::Handoff;
use game_launcher::storage::LocalInstallState;
use game_launcher::{LauncherEngine, LauncherError, LauncherEvent, LauncherStatus};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;

struct NoLaunch;

impl Handoff for NoLaunch {
    fn launch(&self, _entry_point: &Path, _working_dir: &Path) -> game_launcher::Result<()> {
        Ok(())
    }
}

fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start file");
        writer.write_all(contents).expect("write entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

fn transfer() -> Arc<HttpTransfer> {
    Arc::new(HttpTransfer::new(
        Duration::from_secs(5),
        Duration::from_secs(30),
    ))
}

fn engine_for(server: &MockServer, root: &Path) -> LauncherEngine {
    LauncherEngine::with_parts(
        LocalInstallState::new(InstallLayout::new(root, "Game.exe")),
        RemoteLocations::resolve(&format!("{}/game/", server.uri())),
        transfer(),
        Arc::new(NoLaunch),
    )
}

async fn mount_text(server: &MockServer, resource: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/game/{resource}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn fresh_install_over_http() {
    let server = MockServer::start().await;
    mount_text(&server, "PatchNote.txt", "Now with more levels").await;
    mount_text(&server, "Version.txt", "1.0.0").await;
    let archive = build_zip(&[("Game.exe", b"game"), ("data/a.bin", b"abc")]);
    Mock::given(method("GET"))
        .and(path("/game/Build.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("Game");
    let mut engine = engine_for(&server, &root);
    let (tx, mut rx) = mpsc::unbounded_channel();

    engine.activate(&tx).await;

    assert_eq!(engine.status(), Some(LauncherStatus::Ready));
    assert_eq!(
        std::fs::read_to_string(root.join("Version.txt")).expect("marker"),
        "1.0.0"
    );
    assert_eq!(std::fs::read(root.join("Game.exe")).expect("exe"), b"game");
    assert!(!root.join("Build.zip").exists());

    let mut last_progress = None;
    let mut notes = None;
    while let Ok(event) = rx.try_recv() {
        match event {
            LauncherEvent::Progress { progress, .. } => last_progress = Some(progress),
            LauncherEvent::PatchNotes(text) => notes = Some(text),
            _ => {}
        }
    }
    assert_eq!(notes.as_deref(), Some("Now with more levels"));
    let last_progress = last_progress.expect("progress reported");
    assert_eq!(last_progress.received, archive.len() as u64);
    assert_eq!(last_progress.total, Some(archive.len() as u64));
}

#[tokio::test]
async fn up_to_date_install_does_not_download() {
    let server = MockServer::start().await;
    mount_text(&server, "PatchNote.txt", "notes").await;
    mount_text(&server, "Version.txt", "1.0.0\n").await;
    Mock::given(method("GET"))
        .and(path("/game/Build.zip"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("Game");
    std::fs::create_dir_all(&root).expect("mkdir");
    std::fs::write(root.join("Version.txt"), "1.0.0").expect("marker");
    let mut engine = engine_for(&server, &root);
    let (tx, _rx) = mpsc::unbounded_channel();

    engine.activate(&tx).await;

    assert_eq!(engine.status(), Some(LauncherStatus::Ready));
}

#[tokio::test]
async fn server_error_on_archive_keeps_old_version() {
    let server = MockServer::start().await;
    mount_text(&server, "PatchNote.txt", "notes").await;
    mount_text(&server, "Version.txt", "1.1.0").await;
    Mock::given(method("GET"))
        .and(path("/game/Build.zip"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("Game");
    std::fs::create_dir_all(&root).expect("mkdir");
    std::fs::write(root.join("Version.txt"), "1.0.0").expect("marker");
    let mut engine = engine_for(&server, &root);
    let (tx, _rx) = mpsc::unbounded_channel();

    engine.activate(&tx).await;

    assert_eq!(engine.status(), Some(LauncherStatus::Failed));
    assert_eq!(
        std::fs::read_to_string(root.join("Version.txt")).expect("marker"),
        "1.0.0"
    );
    assert!(!root.join("Build.zip").exists());
}

#[tokio::test]
async fn fetch_text_maps_http_errors_to_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/game/Version.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let location = format!("{}/game/Version.txt", server.uri());
    let err = transfer()
        .fetch_text(&location)
        .await
        .expect_err("404 must fail");
    match err {
        LauncherError::Network { location: reported, .. } => assert_eq!(reported, location),
        other => panic!("expected network error, got {other:?}"),
    }
}

#[tokio::test]
async fn fetch_to_file_writes_body_and_reports_progress() {
    let server = MockServer::start().await;
    let body = vec![7u8; 64 * 1024];
    Mock::given(method("GET"))
        .and(path("/game/Build.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let dest = dir.path().join("nested").join("Build.zip");
    let (tx, mut rx) = mpsc::unbounded_channel();

    let written = transfer()
        .fetch_to_file(&format!("{}/game/Build.zip", server.uri()), &dest, tx)
        .await
        .expect("download");

    assert_eq!(written, body.len() as u64);
    assert_eq!(std::fs::read(&dest).expect("read"), body);
    let mut snapshots = Vec::new();
    while let Ok(progress) = rx.try_recv() {
        snapshots.push(progress);
    }
    assert!(snapshots.windows(2).all(|w| w[0].received <= w[1].received));
    assert_eq!(
        snapshots.last().map(|p| p.received),
        Some(body.len() as u64)
    );
}

/// Serve a single hand-written HTTP response, for framings the mock server
/// cannot produce. Returns the archive URL.
async fn serve_raw_once(response: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let _ = socket.write_all(response).await;
        let _ = socket.shutdown().await;
    });
    format!("http://{addr}/game/Build.zip")
}

#[tokio::test]
async fn truncated_body_is_a_network_error() {
    let url = serve_raw_once(
        b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nonly ten b",
    )
    .await;
    let dir = tempfile::tempdir().expect("tempdir");
    let (tx, _rx) = mpsc::unbounded_channel();

    let result = transfer()
        .fetch_to_file(&url, &dir.path().join("Build.zip"), tx)
        .await;

    assert!(
        matches!(result, Err(LauncherError::Network { ref location, .. }) if *location == url),
        "{result:?}"
    );
}

#[tokio::test]
async fn chunked_body_reports_unknown_total() {
    let url = serve_raw_once(
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n\
5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n",
    )
    .await;
    let dir = tempfile::tempdir().expect("tempdir");
    let dest = dir.path().join("Build.zip");
    let (tx, mut rx) = mpsc::unbounded_channel();

    let written = transfer()
        .fetch_to_file(&url, &dest, tx)
        .await
        .expect("chunked download");

    assert_eq!(written, 11);
    assert_eq!(std::fs::read(&dest).expect("read"), b"hello world");
    let mut snapshots = Vec::new();
    while let Ok(progress) = rx.try_recv() {
        snapshots.push(progress);
    }
    assert!(!snapshots.is_empty());
    assert!(snapshots.iter().all(|p| p.total.is_none()));
    assert_eq!(snapshots.last().map(|p| p.received), Some(11));
}
