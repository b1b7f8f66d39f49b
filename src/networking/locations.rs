pub const VERSION_SUFFIX: &str = "Version.txt";
pub const PATCH_NOTE_SUFFIX: &str = "PatchNote.txt";
pub const ARCHIVE_SUFFIX: &str = "Build.zip";

/// Remote resources derived from the configured download link.
///
/// Locations are built by plain concatenation, so the base must already be a
/// valid prefix (normally ending in `/`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteLocations {
    pub version: String,
    pub patch_note: String,
    pub archive: String,
}

impl RemoteLocations {
    pub fn resolve(base: &str) -> Self {
        Self {
            version: format!("{base}{VERSION_SUFFIX}"),
            patch_note: format!("{base}{PATCH_NOTE_SUFFIX}"),
            archive: format!("{base}{ARCHIVE_SUFFIX}"),
        }
    }
}
