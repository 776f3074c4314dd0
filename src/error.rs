//! Error types for the folder-merge library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the folder-merge library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode/encode error
    #[error("Image error in {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// A producer was handed an empty input list
    #[error("No input files provided")]
    NoInputs,

    /// A previous output could not be removed, so the folder is left alone
    #[error("Could not remove stale output {}: {source}", .path.display())]
    StaleOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Candidate files exceed the configured size ceiling
    #[error("{} holds {total_mb:.2} MB of candidates, above the {limit_mb} MB limit", .folder.display())]
    Oversize {
        folder: PathBuf,
        total_mb: f64,
        limit_mb: f64,
    },

    /// Folder holds both PDFs and JPGs
    #[error("{} mixes {pdfs} PDF and {jpgs} JPG files", .folder.display())]
    MixedFolder {
        folder: PathBuf,
        pdfs: usize,
        jpgs: usize,
    },

    /// Renaming a temp output into place failed
    #[error("Could not publish {} as {}: {source}", .from.display(), .to.display())]
    Publish {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Error::Image {
            path: path.into(),
            source,
        }
    }
}
