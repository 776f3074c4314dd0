//! PDF production: merging PDFs and importing JPGs as pages

pub mod images;
pub mod merge;
pub mod metadata;

use std::path::{Path, PathBuf};

use crate::error::Result;

// Re-export commonly used items
pub use images::import_images;
pub use merge::{merge_pdfs, MergeOptions};
pub use metadata::{count_pages, summarize, PdfSummary};

/// Produces a single PDF from an ordered list of inputs
pub trait DocumentMerger {
    /// Concatenate the pages of `inputs` into `output`; returns the page count
    fn merge_pdfs(&self, inputs: &[PathBuf], output: &Path) -> Result<usize>;

    /// Place each image of `inputs` on its own page of `output`; returns the page count
    fn import_images(&self, inputs: &[PathBuf], output: &Path) -> Result<usize>;
}

/// `DocumentMerger` backed by lopdf
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfMerger;

impl DocumentMerger for LopdfMerger {
    fn merge_pdfs(&self, inputs: &[PathBuf], output: &Path) -> Result<usize> {
        merge_pdfs(&MergeOptions::new(inputs, output))
    }

    fn import_images(&self, inputs: &[PathBuf], output: &Path) -> Result<usize> {
        import_images(&MergeOptions::new(inputs, output))
    }
}

/// Write a PDF of `pages` empty Letter pages, each tagged with its index
#[cfg(test)]
pub(crate) fn write_blank_pdf(path: &Path, pages: usize) -> Result<()> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for i in 0..pages {
        let content = Content {
            operations: vec![Operation::new(
                "MP",
                vec![Object::Name(format!("Page{}", i).into_bytes())],
            )],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(pages as i64),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path)?;
    Ok(())
}
