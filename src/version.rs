//! Lenient three-part component versions.
//!
//! Release tags carry versions like `1.3.0`, but installed metadata may
//! hold truncated (`1.3`) or junk segments. Comparison is strictly
//! numeric per segment, most significant first, with any missing or
//! non-numeric segment read as 0 — so `1.0` equals `1.0.0` and `2.10.0`
//! sorts above `2.9.9`.

use std::fmt;
use std::str::FromStr;

/// A component version as a `(major, minor, patch)` numeric tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentVersion {
    /// Major segment.
    pub major: u64,
    /// Minor segment.
    pub minor: u64,
    /// Patch segment.
    pub patch: u64,
}

impl ComponentVersion {
    /// The floor version, reported for components with no installed record.
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// Create a version from its three segments.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse leniently: segments beyond the third are ignored, absent or
    /// non-numeric segments become 0. Never fails.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let mut parts = s.trim().split('.');
        let mut segment = || {
            parts
                .next()
                .and_then(|p| p.parse::<u64>().ok())
                .unwrap_or(0)
        };
        Self::new(segment(), segment(), segment())
    }
}

impl fmt::Display for ComponentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ComponentVersion {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}
