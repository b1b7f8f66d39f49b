use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use tokio::sync::mpsc;

use game_launcher::engine::state::{EXTRACTING_LABEL, control_label};
use game_launcher::env::DEFAULT_CONFIG_FILE;
use game_launcher::networking::HttpTransfer;
use game_launcher::process::ProcessLauncher;
use game_launcher::{
    LaunchDecision, LauncherConfig, LauncherEngine, LauncherEvent, LauncherStatus, UserAction,
};

#[derive(Parser, Debug)]
#[command(
    name = "game-launcher",
    author,
    version,
    about = "Keeps a game install current with its update server, then launches it"
)]
struct Cli {
    /// Path to the JSON settings file.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Remote base location, overriding `downloadLink`.
    #[arg(long)]
    download_link: Option<String>,

    /// Entry point inside the install directory, overriding `exeName`.
    #[arg(long)]
    exe_name: Option<String>,

    /// Install directory, overriding `installDir` (default: ./Game).
    #[arg(long)]
    install_dir: Option<PathBuf>,

    /// Treat a failed patch-note fetch as an update failure.
    #[arg(long)]
    strict_patch_notes: bool,

    /// Update the install but do not start it.
    #[arg(long)]
    check_only: bool,

    /// How many times a failed update is retried before giving up.
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Print launcher version and exit.
    #[arg(long)]
    version_only: bool,
}

impl Cli {
    fn load_config(&self) -> game_launcher::Result<LauncherConfig> {
        let mut config = LauncherConfig::load(&self.config)?;
        if let Some(link) = &self.download_link {
            config.download_link = link.clone();
        }
        if let Some(exe) = &self.exe_name {
            config.exe_name = exe.clone();
        }
        if let Some(dir) = &self.install_dir {
            config.install_dir = Some(dir.clone());
        }
        config.strict_patch_notes |= self.strict_patch_notes;
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if cli.version_only {
        println!("game-launcher {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let transfer = Arc::new(HttpTransfer::new(
        config.request_timeout(),
        config.archive_timeout(),
    ));
    let mut engine = LauncherEngine::new(&config, transfer, Arc::new(ProcessLauncher::new()));

    let (tx, rx) = mpsc::unbounded_channel();
    let renderer = tokio::spawn(render_events(rx));

    engine.handle_action(UserAction::Activate, &tx).await;
    let code = if cli.check_only {
        match engine.status() {
            Some(LauncherStatus::Ready) => ExitCode::SUCCESS,
            _ => ExitCode::FAILURE,
        }
    } else {
        launch_with_retries(&mut engine, cli.retries, &tx).await
    };

    drop(tx);
    let _ = renderer.await;
    code
}

/// Press "play" until it launches, retrying a failed update at most
/// `retries` times.
async fn launch_with_retries(
    engine: &mut LauncherEngine,
    mut retries: u32,
    updates: &mpsc::UnboundedSender<LauncherEvent>,
) -> ExitCode {
    loop {
        if engine.status() == Some(LauncherStatus::Failed) {
            if retries == 0 {
                error!("update failed; giving up");
                return ExitCode::FAILURE;
            }
            retries -= 1;
            info!("retrying update ({retries} retries left)");
        }
        match engine.request_launch(updates).await {
            LaunchDecision::Launch { .. } => return ExitCode::SUCCESS,
            LaunchDecision::RetryUpdate => continue,
            LaunchDecision::NoOp => {
                error!(
                    "nothing to launch: {} is missing or not ready",
                    engine.install().entry_point().display()
                );
                return ExitCode::FAILURE;
            }
        }
    }
}

async fn render_events(mut rx: mpsc::UnboundedReceiver<LauncherEvent>) {
    let mut bar: Option<ProgressBar> = None;
    while let Some(event) = rx.recv().await {
        match event {
            LauncherEvent::PatchNotes(text) => println!("{}\n", text.trim_end()),
            LauncherEvent::Version(version) => println!("Installed version: {version}"),
            LauncherEvent::Status(status) => {
                if let Some(bar) = bar.take() {
                    bar.finish_and_clear();
                }
                let busy = if status.control_enabled() { "" } else { " ..." };
                println!("[{}]{busy}", control_label(Some(status), None));
            }
            LauncherEvent::Progress { status, progress } => {
                let bar = bar.get_or_insert_with(|| new_bar(progress.total));
                if let Some(total) = progress.total {
                    bar.set_length(total);
                }
                bar.set_position(progress.received);
                bar.set_message(control_label(Some(status), Some(&progress)));
            }
            LauncherEvent::Extracting => {
                if let Some(bar) = bar.take() {
                    bar.finish_and_clear();
                }
                println!("{EXTRACTING_LABEL}");
            }
            LauncherEvent::Launched { entry_point } => {
                println!("Launched {}", entry_point.display());
            }
            LauncherEvent::Error(message) => eprintln!("error: {message}"),
        }
    }
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
}

fn new_bar(total: Option<u64>) -> ProgressBar {
    let (bar, template) = match total {
        Some(total) => (
            ProgressBar::new(total),
            "{bar:40.cyan/blue} {msg} {binary_bytes_per_sec}",
        ),
        None => (ProgressBar::new_spinner(), "{spinner} {msg}"),
    };
    if let Ok(style) = ProgressStyle::with_template(template) {
        bar.set_style(style);
    }
    bar
}
