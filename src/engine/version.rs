use std::fmt;
use std::str::FromStr;

use crate::error::LauncherError;

/// A `major.minor.patch` triple as served in `Version.txt`.
///
/// Ordering is lexicographic over the three coordinates. Only the textual
/// form produced by [`fmt::Display`] is ever persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionCode {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl VersionCode {
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `major.minor.patch`, tolerating surrounding whitespace.
    ///
    /// # Errors
    /// Returns [`LauncherError::MalformedVersion`] unless the text holds exactly
    /// three dot-separated `u16` tokens made of ASCII digits only.
    pub fn parse(text: &str) -> Result<Self, LauncherError> {
        let malformed = || LauncherError::MalformedVersion {
            text: text.to_owned(),
        };
        let mut parts = text.trim().split('.');
        let (Some(major), Some(minor), Some(patch), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        // `u16::from_str` tolerates a leading `+`; only bare digits are valid.
        let coord = |token: &str| {
            if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            token.parse::<u16>().map_err(|_| malformed())
        };
        Ok(Self::new(coord(major)?, coord(minor)?, coord(patch)?))
    }

    /// True when any coordinate differs. Direction is irrelevant: an older
    /// remote version counts as a difference just like a newer one.
    #[must_use]
    pub fn is_diff(&self, other: &VersionCode) -> bool {
        self != other
    }
}

impl FromStr for VersionCode {
    type Err = LauncherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
