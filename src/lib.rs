//! Self-updating launcher: keeps a locally installed build in step with a
//! remote `Version.txt`/`Build.zip` pair and hands off to it once current.

pub mod archive;
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod networking;
pub mod process;
pub mod storage;
pub mod util;

pub use config::LauncherConfig;
pub use engine::LauncherEngine;
pub use engine::gate::LaunchDecision;
pub use engine::state::{LauncherEvent, LauncherStatus, UserAction};
pub use engine::version::VersionCode;
pub use error::{LauncherError, Result};
