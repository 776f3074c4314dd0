//! Deciding and running the merge for one folder

use std::path::{Path, PathBuf};
use std::thread;

use tracing::{debug, error, info, warn};

use super::candidates::{CandidateKind, MergeCandidateSet};
use super::{
    purge_stale_outputs, MERGED_PDF, MERGED_PDF_TEMP, STITCHED_JPG, STITCHED_JPG_TEMP,
};
use crate::config::MergeConfig;
use crate::error::{Error, Result};
use crate::output::write_atomically;
use crate::pdf::{DocumentMerger, LopdfMerger};
use crate::raster::{stitch_to_file, ImageCodec, JpegCodec};

/// What a successful producer wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Produced {
    Pdf { pages: usize },
    Stitched { width: u32, height: u32 },
}

/// One output of a folder and how producing it went
#[derive(Debug)]
pub struct OutputAttempt {
    pub path: PathBuf,
    pub result: Result<Produced>,
}

/// What happened to a folder that was not rejected outright
#[derive(Debug)]
pub enum FolderOutcome {
    /// No `.pdf`/`.jpg` files
    Empty,
    /// Dry run: the merge that would have happened
    Planned {
        kind: CandidateKind,
        files: Vec<PathBuf>,
        total_bytes: u64,
    },
    /// Producers ran; each attempt carries its own result
    Processed {
        kind: CandidateKind,
        attempts: Vec<OutputAttempt>,
    },
}

#[derive(Debug)]
pub struct FolderReport {
    pub folder: PathBuf,
    pub outcome: FolderOutcome,
}

impl FolderReport {
    /// True when every attempted output was written
    pub fn is_success(&self) -> bool {
        match &self.outcome {
            FolderOutcome::Processed { attempts, .. } => attempts.iter().all(|a| a.result.is_ok()),
            FolderOutcome::Empty | FolderOutcome::Planned { .. } => true,
        }
    }

    /// Paths of the outputs that were written
    pub fn produced(&self) -> Vec<&Path> {
        match &self.outcome {
            FolderOutcome::Processed { attempts, .. } => attempts
                .iter()
                .filter(|a| a.result.is_ok())
                .map(|a| a.path.as_path())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Runs the purge, scan, size gate and dispatch for mergeable folders
pub struct MergeSelector<M = LopdfMerger, C = JpegCodec> {
    config: MergeConfig,
    merger: M,
    codec: C,
}

impl MergeSelector {
    /// Selector using lopdf and the JPEG codec
    pub fn new(config: MergeConfig) -> Self {
        let codec = JpegCodec::new(config.jpeg_quality);
        Self::with_backends(config, LopdfMerger, codec)
    }
}

impl<M: DocumentMerger, C: ImageCodec> MergeSelector<M, C> {
    pub fn with_backends(config: MergeConfig, merger: M, codec: C) -> Self {
        Self {
            config,
            merger,
            codec,
        }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Purge, scan, gate and merge one folder
    ///
    /// Returns `Err` when the folder is rejected before any producer runs:
    /// stale outputs that cannot be removed, an unreadable listing, an
    /// oversized or mixed candidate set. Producer failures are reported inside
    /// the returned `FolderReport`, one per output.
    pub fn process_folder(&self, folder: &Path) -> Result<FolderReport> {
        if !self.config.dry_run {
            purge_stale_outputs(folder)?;
        }

        let candidates = MergeCandidateSet::scan(folder)?;
        if candidates.is_empty() {
            debug!(folder = %folder.display(), "no pdf or jpg files");
            return Ok(self.report(folder, FolderOutcome::Empty));
        }

        let total_mb = candidates.total_mb();
        if total_mb > self.config.max_total_mb {
            let err = Error::Oversize {
                folder: folder.to_path_buf(),
                total_mb,
                limit_mb: self.config.max_total_mb,
            };
            warn!(folder = %folder.display(), "skipping folder: {}", err);
            if !self.config.dry_run {
                self.pause();
            }
            return Err(err);
        }

        let kind = match candidates.dispatch_kind(self.config.dispatch) {
            Ok(kind) => kind,
            Err(err) => {
                warn!(folder = %folder.display(), "skipping folder: {}", err);
                return Err(err);
            }
        };

        if self.config.dry_run {
            info!(
                folder = %folder.display(),
                kind = %kind,
                files = candidates.len(),
                mb = %format!("{:.2}", total_mb),
                "would merge"
            );
            return Ok(self.report(
                folder,
                FolderOutcome::Planned {
                    kind,
                    files: candidates.files,
                    total_bytes: candidates.total_bytes,
                },
            ));
        }

        let files = &candidates.files;
        let attempts = match kind {
            CandidateKind::Pdf => vec![self.attempt(folder, MERGED_PDF_TEMP, MERGED_PDF, |temp| {
                self.merger
                    .merge_pdfs(files, temp)
                    .map(|pages| Produced::Pdf { pages })
            })],
            // Two independent producers over the same inputs
            CandidateKind::Jpg => vec![
                self.attempt(folder, STITCHED_JPG_TEMP, STITCHED_JPG, |temp| {
                    stitch_to_file(&self.codec, files, temp)
                        .map(|(width, height)| Produced::Stitched { width, height })
                }),
                self.attempt(folder, MERGED_PDF_TEMP, MERGED_PDF, |temp| {
                    self.merger
                        .import_images(files, temp)
                        .map(|pages| Produced::Pdf { pages })
                }),
            ],
        };

        if attempts.iter().any(|a| a.result.is_err()) {
            self.pause();
        }

        Ok(self.report(folder, FolderOutcome::Processed { kind, attempts }))
    }

    fn attempt<F>(&self, folder: &Path, temp_name: &str, final_name: &str, producer: F) -> OutputAttempt
    where
        F: FnOnce(&Path) -> Result<Produced>,
    {
        let path = folder.join(final_name);
        let result = write_atomically(&folder.join(temp_name), &path, producer);
        match &result {
            Ok(Produced::Pdf { pages }) => {
                info!(file = %path.display(), pages, "created merged PDF")
            }
            Ok(Produced::Stitched { width, height }) => {
                info!(file = %path.display(), width, height, "created stitched image")
            }
            Err(e) => error!(file = %path.display(), "could not create output: {}", e),
        }
        OutputAttempt { path, result }
    }

    fn report(&self, folder: &Path, outcome: FolderOutcome) -> FolderReport {
        FolderReport {
            folder: folder.to_path_buf(),
            outcome,
        }
    }

    fn pause(&self) {
        if !self.config.backoff.is_zero() {
            debug!(backoff = ?self.config.backoff, "pausing before next folder");
            thread::sleep(self.config.backoff);
        }
    }
}
