//! Folder Merge Library
//!
//! Walks a directory tree looking for folders named `guides`, `reports` or
//! `tiss-guides` (and their Portuguese originals `guias`, `laudos`,
//! `guias - tiss`) and merges the files inside each one:
//! - PDF folders become a single `merged.pdf`
//! - JPG folders become a vertically stitched `laudos_merged.jpg` plus a
//!   `merged.pdf` with one page per image
//!
//! Previous outputs are deleted before every merge and new outputs are written
//! to a temp file and renamed into place.
//!
//! # Example
//!
//! ```no_run
//! use folder_merge::{run, MergeConfig};
//! use std::path::Path;
//!
//! let summary = run(Path::new("/data/patients"), MergeConfig::default())
//!     .expect("root is not a directory");
//! println!("{} folders merged", summary.merged);
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod merge;
pub mod output;
pub mod pdf;
pub mod raster;
pub mod walk;

use std::path::Path;

// Re-export commonly used items
pub use classify::{classify, FolderKind};
pub use config::{DispatchPolicy, MergeConfig};
pub use error::{Error, Result};
pub use merge::{FolderReport, MergeSelector};
pub use walk::{walk, FolderProcessor, WalkSummary};

/// Walk `root` with the default lopdf/JPEG backends
///
/// Fails only when `root` is not a directory; everything below it is handled
/// folder by folder and tallied in the returned summary.
pub fn run(root: &Path, config: MergeConfig) -> Result<WalkSummary> {
    if !root.exists() {
        return Err(Error::FileNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(Error::General(format!("Not a directory: {}", root.display())));
    }

    let selector = MergeSelector::new(config);
    Ok(walk(root, &selector))
}
