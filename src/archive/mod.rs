use std::fs;
use std::io;
use std::path::Path;

use log::{debug, info, warn};
use walkdir::WalkDir;
use zip::read::ZipArchive;

use crate::error::{LauncherError, Result};
use crate::networking::locations::VERSION_SUFFIX;

/// Unpack `archive_path` over `root`, going through `staging` first so a bad
/// archive never touches the installed tree.
///
/// Existing files are overwritten; files absent from the archive are kept. A
/// `Version.txt` at the archive root is skipped: only the commit step may
/// write the version marker.
///
/// Returns the number of files installed.
pub fn install_archive(archive_path: &Path, root: &Path, staging: &Path) -> Result<usize> {
    clean_staging(staging)?;
    fs::create_dir_all(staging)
        .map_err(|e| LauncherError::Extraction(format!("failed to create staging dir: {e}")))?;

    let result = extract_zip(archive_path, staging).and_then(|_| promote(staging, root));
    if let Err(err) = clean_staging(staging) {
        warn!("archive: {err}");
    }
    let installed = result?;
    info!(
        "archive: installed {} files from {} into {}",
        installed,
        archive_path.display(),
        root.display()
    );
    Ok(installed)
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = fs::File::open(archive_path)
        .map_err(|e| LauncherError::Extraction(format!("zip open error: {e}")))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| LauncherError::Extraction(format!("zip parse error: {e}")))?;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| LauncherError::Extraction(format!("zip entry error: {e}")))?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(LauncherError::Extraction(format!(
                "zip entry escapes install root: {}",
                entry.name()
            )));
        };
        if relative == Path::new(VERSION_SUFFIX) {
            warn!("archive: skipping bundled {VERSION_SUFFIX}");
            continue;
        }
        let out_path = dest.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&out_path)
                .map_err(|e| LauncherError::Extraction(format!("zip dir create error: {e}")))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| LauncherError::Extraction(format!("zip parent dir error: {e}")))?;
        }
        let mut out_file = fs::File::create(&out_path)
            .map_err(|e| LauncherError::Extraction(format!("zip create file error: {e}")))?;
        io::copy(&mut entry, &mut out_file)
            .map_err(|e| LauncherError::Extraction(format!("zip write error: {e}")))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            restore_mode(&out_path, mode);
        }
    }
    Ok(())
}

/// Reapply the archived permission bits. Failure keeps the file but is logged,
/// since a lost executable bit makes the entry point unlaunchable.
#[cfg(unix)]
fn restore_mode(path: &Path, mode: u32) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
        Ok(()) => true,
        Err(err) => {
            warn!("archive: unable to set mode {mode:o} on {}: {err}", path.display());
            false
        }
    }
}

/// Move the staged tree over `root`, merging directories.
fn promote(staging: &Path, root: &Path) -> Result<usize> {
    let mut installed = 0;
    for entry in WalkDir::new(staging).min_depth(1) {
        let entry =
            entry.map_err(|e| LauncherError::Extraction(format!("staging walk error: {e}")))?;
        let relative = entry
            .path()
            .strip_prefix(staging)
            .map_err(|e| LauncherError::Extraction(format!("staging path error: {e}")))?;
        let target = root.join(relative);
        if entry.file_type().is_dir() {
            if target.is_file() {
                fs::remove_file(&target)
                    .map_err(|e| LauncherError::Extraction(format!("replace file error: {e}")))?;
            }
            fs::create_dir_all(&target)
                .map_err(|e| LauncherError::Extraction(format!("create dir error: {e}")))?;
            continue;
        }
        if target.is_dir() {
            fs::remove_dir_all(&target)
                .map_err(|e| LauncherError::Extraction(format!("replace dir error: {e}")))?;
        }
        if fs::rename(entry.path(), &target).is_err() {
            // Rename can fail across devices or on locked targets; copy instead.
            fs::copy(entry.path(), &target).map_err(|e| {
                LauncherError::Extraction(format!(
                    "unable to write {}: {e}",
                    target.display()
                ))
            })?;
        }
        debug!("archive: installed {}", target.display());
        installed += 1;
    }
    Ok(installed)
}

fn clean_staging(staging: &Path) -> Result<()> {
    if staging.exists() {
        fs::remove_dir_all(staging)
            .map_err(|e| LauncherError::Extraction(format!("failed to clean staging dir: {e}")))?;
    }
    Ok(())
}
