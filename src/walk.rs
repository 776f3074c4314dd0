//! Recursive discovery of mergeable folders

use std::path::Path;

use tracing::{debug, error, warn};
use walkdir::WalkDir;

use crate::classify::{classify, FolderKind};
use crate::error::{Error, Result};
use crate::merge::{FolderOutcome, FolderReport, MergeSelector};
use crate::pdf::DocumentMerger;
use crate::raster::ImageCodec;

/// Something that handles a mergeable folder found by [`walk`]
pub trait FolderProcessor {
    fn process_folder(&self, folder: &Path) -> Result<FolderReport>;
}

impl<M: DocumentMerger, C: ImageCodec> FolderProcessor for MergeSelector<M, C> {
    fn process_folder(&self, folder: &Path) -> Result<FolderReport> {
        MergeSelector::process_folder(self, folder)
    }
}

/// Tally of one walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Mergeable folders found
    pub targets: usize,
    /// Folders where every output was written
    pub merged: usize,
    /// Folders planned in a dry run
    pub planned: usize,
    /// Folders without candidate files
    pub empty: usize,
    /// Folders skipped for size or mixed content
    pub skipped: usize,
    /// Folders with at least one failed step
    pub failed: usize,
    /// Directories that could not be read
    pub traversal_errors: usize,
}

impl WalkSummary {
    fn record(&mut self, folder: &Path, result: Result<FolderReport>) {
        match result {
            Ok(report) => match report.outcome {
                FolderOutcome::Empty => self.empty += 1,
                FolderOutcome::Planned { .. } => self.planned += 1,
                FolderOutcome::Processed { .. } if report.is_success() => self.merged += 1,
                FolderOutcome::Processed { .. } => self.failed += 1,
            },
            // Already logged by the selector
            Err(Error::Oversize { .. } | Error::MixedFolder { .. }) => self.skipped += 1,
            Err(e) => {
                error!(folder = %folder.display(), "folder not merged: {}", e);
                self.failed += 1;
            }
        }
    }
}

/// Walk every directory below `root`, handing mergeable folders to `processor`
///
/// Directories named after a merge target are processed and not descended into;
/// every other directory is searched recursively. Entries are visited in file
/// name order and symlinks are not followed. Unreadable directories are logged
/// and skipped; nothing aborts the walk.
pub fn walk<P: FolderProcessor + ?Sized>(root: &Path, processor: &P) -> WalkSummary {
    let mut summary = WalkSummary::default();
    let mut entries = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(root).display().to_string();
                warn!(path = %path, "cannot read directory: {}", e);
                summary.traversal_errors += 1;
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if classify(&name) == FolderKind::Container {
            continue;
        }

        entries.skip_current_dir();
        debug!(folder = %entry.path().display(), "found mergeable folder");
        summary.targets += 1;
        let result = processor.process_folder(entry.path());
        summary.record(entry.path(), result);
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Records visited folders relative to the walk root
    struct Visits {
        root: PathBuf,
        seen: RefCell<Vec<String>>,
    }

    impl Visits {
        fn new(root: &Path) -> Self {
            Self {
                root: root.to_path_buf(),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl FolderProcessor for Visits {
        fn process_folder(&self, folder: &Path) -> Result<FolderReport> {
            let rel = folder.strip_prefix(&self.root).unwrap();
            self.seen
                .borrow_mut()
                .push(rel.to_string_lossy().replace('\\', "/"));
            Ok(FolderReport {
                folder: folder.to_path_buf(),
                outcome: FolderOutcome::Empty,
            })
        }
    }

    fn mkdirs(root: &Path, dirs: &[&str]) {
        for dir in dirs {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
    }

    #[test]
    fn test_targets_found_at_any_depth() {
        let tmp = TempDir::new().unwrap();
        mkdirs(
            tmp.path(),
            &[
                "guides",
                "patient-1/reports",
                "patient-1/2024/03/tiss-guides",
                "patient-2/visits/laudos",
                "patient-2/misc",
            ],
        );
        let visits = Visits::new(tmp.path());

        let summary = walk(tmp.path(), &visits);

        assert_eq!(
            *visits.seen.borrow(),
            vec![
                "guides",
                "patient-1/2024/03/tiss-guides",
                "patient-1/reports",
                "patient-2/visits/laudos",
            ]
        );
        assert_eq!(summary.targets, 4);
        assert_eq!(summary.empty, 4);
    }

    #[test]
    fn test_targets_are_not_descended() {
        let tmp = TempDir::new().unwrap();
        mkdirs(tmp.path(), &["reports/guides", "reports/archive/guides"]);
        let visits = Visits::new(tmp.path());

        walk(tmp.path(), &visits);

        assert_eq!(*visits.seen.borrow(), vec!["reports"]);
    }

    #[test]
    fn test_files_and_near_misses_are_ignored() {
        let tmp = TempDir::new().unwrap();
        mkdirs(tmp.path(), &["Guides", "report", "a/guides-old"]);
        fs::write(tmp.path().join("guides.pdf"), b"x").unwrap();
        // A file named like a target is not a folder
        fs::write(tmp.path().join("a/laudos"), b"x").unwrap();
        let visits = Visits::new(tmp.path());

        let summary = walk(tmp.path(), &visits);

        assert!(visits.seen.borrow().is_empty());
        assert_eq!(summary, WalkSummary::default());
    }

    #[test]
    fn test_root_itself_is_not_classified() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("guides");
        mkdirs(&root, &["inner/reports"]);
        let visits = Visits::new(&root);

        walk(&root, &visits);

        assert_eq!(*visits.seen.borrow(), vec!["inner/reports"]);
    }

    #[test]
    fn test_missing_root_counts_traversal_error() {
        let tmp = TempDir::new().unwrap();
        let visits = Visits::new(tmp.path());

        let summary = walk(&tmp.path().join("absent"), &visits);

        assert_eq!(summary.traversal_errors, 1);
        assert!(visits.seen.borrow().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_does_not_stop_siblings() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        mkdirs(tmp.path(), &["a/hidden/guides", "b/guides", "c/reports"]);
        let locked = tmp.path().join("a");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Privileged users can list it anyway
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }
        let visits = Visits::new(tmp.path());

        let summary = walk(tmp.path(), &visits);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(summary.traversal_errors, 1);
        assert_eq!(*visits.seen.borrow(), vec!["b/guides", "c/reports"]);
        assert_eq!(summary.targets, 2);
    }

    #[test]
    fn test_errors_are_tallied_per_folder() {
        struct Rejecting;
        impl FolderProcessor for Rejecting {
            fn process_folder(&self, folder: &Path) -> Result<FolderReport> {
                if folder.ends_with("guides") {
                    Err(Error::Oversize {
                        folder: folder.to_path_buf(),
                        total_mb: 2.0,
                        limit_mb: 1.0,
                    })
                } else {
                    Err(Error::General("boom".to_string()))
                }
            }
        }

        let tmp = TempDir::new().unwrap();
        mkdirs(tmp.path(), &["a/guides", "b/reports", "c/laudos"]);

        let summary = walk(tmp.path(), &Rejecting);

        assert_eq!(summary.targets, 3);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 2);
    }
}
