//! Merge configuration

use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;

/// Size ceiling observed in production; effectively unlimited
pub const DEFAULT_MAX_TOTAL_MB: f64 = 100_000.0;

/// Pause after an oversized or failed folder
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(3);

/// Quality used when encoding the stitched JPG
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// How a folder's merge path is chosen from its candidate files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchPolicy {
    /// Count files per kind and refuse folders that mix PDFs and JPGs
    #[default]
    Census,
    /// Use the extension of the last candidate in listing order
    LastSeen,
}

impl FromStr for DispatchPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "census" => Ok(DispatchPolicy::Census),
            "last-seen" | "last" => Ok(DispatchPolicy::LastSeen),
            other => Err(Error::General(format!("Unknown dispatch policy: {}", other))),
        }
    }
}

/// Options controlling how each mergeable folder is processed
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Folders whose candidates total more than this many MB are skipped
    pub max_total_mb: f64,
    /// Pause applied after a skipped or failed folder
    pub backoff: Duration,
    /// Merge path selection
    pub dispatch: DispatchPolicy,
    /// Log the plan for each folder without touching the filesystem
    pub dry_run: bool,
    /// JPEG quality for the stitched image (1-100)
    pub jpeg_quality: u8,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_total_mb: DEFAULT_MAX_TOTAL_MB,
            backoff: DEFAULT_BACKOFF,
            dispatch: DispatchPolicy::default(),
            dry_run: false,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MergeConfig::default();
        assert_eq!(config.max_total_mb, 100_000.0);
        assert_eq!(config.backoff, Duration::from_secs(3));
        assert_eq!(config.dispatch, DispatchPolicy::Census);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_parse_dispatch_policy() {
        assert_eq!("census".parse::<DispatchPolicy>().unwrap(), DispatchPolicy::Census);
        assert_eq!("Last-Seen".parse::<DispatchPolicy>().unwrap(), DispatchPolicy::LastSeen);
        assert!("newest".parse::<DispatchPolicy>().is_err());
    }
}
