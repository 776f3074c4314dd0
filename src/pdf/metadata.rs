//! PDF inspection for produced outputs

use std::path::Path;

use lopdf::{Document, Object};

use crate::error::{Error, Result};

/// Read the Count field of the root Pages dictionary
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog = doc.catalog()?;

    let pages_id = match catalog.get(b"Pages") {
        Ok(Object::Reference(id)) => *id,
        _ => return Err(Error::General("Catalog has no Pages reference".to_string())),
    };

    match doc.get_dictionary(pages_id)?.get(b"Count") {
        Ok(Object::Integer(n)) if *n >= 0 => Ok(*n as usize),
        _ => Err(Error::General("Pages has no valid Count".to_string())),
    }
}

/// Summary of a PDF file
#[derive(Debug, Clone)]
pub struct PdfSummary {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Number of pages whose resources reference an image XObject
    pub image_pages: usize,
    /// PDF header version, e.g. "1.5"
    pub version: String,
}

/// Summarize a PDF file
pub fn summarize(path: &Path) -> Result<PdfSummary> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let page_count = count_pages_from_catalog(&doc)?;
    if page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    let image_pages = doc
        .get_pages()
        .values()
        .filter(|&&page_id| page_has_image(&doc, page_id))
        .count();

    Ok(PdfSummary {
        page_count,
        image_pages,
        version: doc.version.clone(),
    })
}

fn page_has_image(doc: &Document, page_id: lopdf::ObjectId) -> bool {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return false;
    };
    let Ok(resources) = page.get(b"Resources").and_then(|r| deref_dict(doc, r)) else {
        return false;
    };
    let Ok(xobjects) = resources.get(b"XObject").and_then(|x| deref_dict(doc, x)) else {
        return false;
    };
    xobjects.iter().any(|(_, obj)| {
        let stream = match obj {
            Object::Reference(id) => doc.get_object(*id).and_then(Object::as_stream),
            other => other.as_stream(),
        };
        matches!(
            stream.map(|s| s.dict.get(b"Subtype").and_then(Object::as_name)),
            Ok(Ok(b"Image"))
        )
    })
}

fn deref_dict<'a>(doc: &'a Document, obj: &'a Object) -> lopdf::Result<&'a lopdf::Dictionary> {
    match obj {
        Object::Reference(id) => doc.get_dictionary(*id),
        other => other.as_dict(),
    }
}

/// Count the number of pages in a PDF file
///
/// This is a quick operation that reads the Count field from the Pages dictionary.
pub fn count_pages(path: &Path) -> Result<usize> {
    summarize(path).map(|summary| summary.page_count)
}
