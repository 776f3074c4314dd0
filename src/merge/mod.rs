//! Per-folder merge selection: purge, scan, gate and dispatch

pub mod candidates;
pub mod selector;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};

/// Merged PDF written into every processed folder
pub const MERGED_PDF: &str = "merged.pdf";
/// Legacy merged image name, purged alongside `merged.pdf`
pub const MERGED_JPG: &str = "merged.jpg";
/// Stitched image written into image folders
pub const STITCHED_JPG: &str = "laudos_merged.jpg";
/// Temp names used while producing the outputs above
pub const MERGED_PDF_TEMP: &str = "merged_temp.pdf";
pub const STITCHED_JPG_TEMP: &str = "laudos_merged_temp.jpg";

/// Outputs deleted before a folder is merged again
pub const STALE_OUTPUTS: [&str; 2] = [MERGED_PDF, MERGED_JPG];

/// Names that are never treated as merge inputs
pub(crate) const RESERVED_NAMES: [&str; 5] = [
    MERGED_PDF,
    MERGED_JPG,
    STITCHED_JPG,
    MERGED_PDF_TEMP,
    STITCHED_JPG_TEMP,
];

// Re-export commonly used items
pub use candidates::{CandidateKind, MergeCandidateSet};
pub use selector::{FolderOutcome, FolderReport, MergeSelector, OutputAttempt, Produced};

/// Delete `merged.pdf` and `merged.jpg` from `folder`, returning what was removed
///
/// Missing files are fine. Any other failure stops the folder from being merged,
/// so a new output is never produced next to an old one that could not be removed.
pub fn purge_stale_outputs(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for name in STALE_OUTPUTS {
        let path = folder.join(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(file = %path.display(), "removed previous output");
                removed.push(path);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(Error::StaleOutput { path, source }),
        }
    }
    Ok(removed)
}
