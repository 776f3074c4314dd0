//! Collecting the files of a mergeable folder

use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::RESERVED_NAMES;
use crate::config::DispatchPolicy;
use crate::error::{Error, Result};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// File kinds that take part in a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Pdf,
    Jpg,
}

impl CandidateKind {
    /// Kind of `path` by its extension; matching is case-sensitive
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(OsStr::to_str) {
            Some("pdf") => Some(CandidateKind::Pdf),
            Some("jpg") => Some(CandidateKind::Jpg),
            _ => None,
        }
    }
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateKind::Pdf => f.write_str("pdf"),
            CandidateKind::Jpg => f.write_str("jpg"),
        }
    }
}

/// The mergeable files of one folder, in listing order
#[derive(Debug, Clone)]
pub struct MergeCandidateSet {
    pub folder: PathBuf,
    pub files: Vec<PathBuf>,
    pub total_bytes: u64,
    /// Kind of the last file collected
    pub last_kind: Option<CandidateKind>,
    pub pdf_count: usize,
    pub jpg_count: usize,
}

impl MergeCandidateSet {
    fn new(folder: &Path) -> Self {
        Self {
            folder: folder.to_path_buf(),
            files: Vec::new(),
            total_bytes: 0,
            last_kind: None,
            pdf_count: 0,
            jpg_count: 0,
        }
    }

    /// List `folder` and collect every `.pdf`/`.jpg` file, sorted by file name
    ///
    /// Subdirectories and this crate's own outputs are never candidates. A file
    /// whose size cannot be read is skipped with a warning.
    pub fn scan(folder: &Path) -> Result<Self> {
        let mut entries = fs::read_dir(folder)?.collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(|entry| entry.file_name());

        let mut set = Self::new(folder);
        for entry in entries {
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                continue;
            }
            if RESERVED_NAMES.iter().any(|name| entry.file_name() == *name) {
                continue;
            }
            let Some(kind) = CandidateKind::from_path(&path) else {
                continue;
            };
            // Follows symlinks, unlike entry.metadata()
            let size = match fs::metadata(&path) {
                Ok(meta) => meta.len(),
                Err(e) => {
                    warn!(file = %path.display(), "skipping file with unreadable size: {}", e);
                    continue;
                }
            };
            set.push(path, kind, size);
        }

        debug!(
            folder = %folder.display(),
            files = set.files.len(),
            bytes = set.total_bytes,
            "scanned merge candidates"
        );
        Ok(set)
    }

    fn push(&mut self, path: PathBuf, kind: CandidateKind, size: u64) {
        match kind {
            CandidateKind::Pdf => self.pdf_count += 1,
            CandidateKind::Jpg => self.jpg_count += 1,
        }
        self.files.push(path);
        self.total_bytes += size;
        self.last_kind = Some(kind);
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Total candidate size in MB (1 MB = 1024 * 1024 bytes)
    pub fn total_mb(&self) -> f64 {
        self.total_bytes as f64 / BYTES_PER_MB
    }

    /// Pick the merge path for this folder
    pub fn dispatch_kind(&self, policy: DispatchPolicy) -> Result<CandidateKind> {
        let last = self.last_kind.ok_or(Error::NoInputs)?;
        match policy {
            DispatchPolicy::LastSeen => Ok(last),
            DispatchPolicy::Census => match (self.pdf_count, self.jpg_count) {
                (_, 0) => Ok(CandidateKind::Pdf),
                (0, _) => Ok(CandidateKind::Jpg),
                (pdfs, jpgs) => Err(Error::MixedFolder {
                    folder: self.folder.clone(),
                    pdfs,
                    jpgs,
                }),
            },
        }
    }
}
