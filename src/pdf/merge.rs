//! PDF merging functionality using lopdf

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::{Error, Result};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_PAGE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Inputs and destination for one PDF production
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Input file paths in the order they should appear
    pub input_paths: Vec<PathBuf>,
    /// Output PDF file path
    pub output_path: PathBuf,
}

impl MergeOptions {
    pub fn new(inputs: &[PathBuf], output: &Path) -> Self {
        Self {
            input_paths: inputs.to_vec(),
            output_path: output.to_path_buf(),
        }
    }

    /// Fail early on an empty list or a missing input
    pub(crate) fn validate(&self) -> Result<()> {
        if self.input_paths.is_empty() {
            return Err(Error::NoInputs);
        }
        for path in &self.input_paths {
            if !path.exists() {
                return Err(Error::FileNotFound(path.clone()));
            }
        }
        Ok(())
    }
}

/// Merge multiple PDF files into a single PDF, returning the merged page count
///
/// Based on the lopdf merge example:
/// https://github.com/J-F-Liu/lopdf/blob/main/examples/merge.rs
///
/// # Example
///
/// ```no_run
/// use folder_merge::pdf::{MergeOptions, merge_pdfs};
/// use std::path::{Path, PathBuf};
///
/// let inputs = vec![PathBuf::from("guides/a.pdf"), PathBuf::from("guides/b.pdf")];
/// let options = MergeOptions::new(&inputs, Path::new("guides/merged.pdf"));
///
/// merge_pdfs(&options).expect("Failed to merge");
/// ```
pub fn merge_pdfs(options: &MergeOptions) -> Result<usize> {
    options.validate()?;

    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for path in &options.input_paths {
        let mut doc = Document::load(path)?;
        if doc.get_pages().is_empty() {
            return Err(Error::EmptyPdf(path.clone()));
        }

        // Renumber objects in this document to avoid conflicts
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for &page_id in &pages {
            flatten_inherited_attributes(&mut doc, page_id);
        }
        debug!(file = %path.display(), pages = pages.len(), "loaded PDF");
        page_ids.extend(pages);

        // The old page tree roots and catalogs are replaced below
        objects.extend(
            doc.objects
                .into_iter()
                .filter(|(_, object)| !is_structure_node(object)),
        );
    }

    let mut merged_doc = Document::with_version("1.5");
    merged_doc.objects.extend(objects);

    // new_object_id() must not collide with the objects just added
    merged_doc.max_id = max_id - 1;

    let pages_id = merged_doc.new_object_id();
    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();

    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(page_ids.len() as i64));
    pages_object.set("Kids", Object::Array(kids));

    let catalog_id = merged_doc.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    merged_doc.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged_doc.objects.insert(pages_id, Object::Dictionary(pages_object));
    merged_doc.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in &page_ids {
        if let Ok(Object::Dictionary(dict)) = merged_doc.get_object_mut(page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    merged_doc.compress();
    merged_doc.save(&options.output_path)?;

    Ok(page_ids.len())
}

/// True for catalogs and intermediate page tree nodes
fn is_structure_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type").and_then(Object::as_name),
            Ok(b"Catalog") | Ok(b"Pages")
        ),
        _ => false,
    }
}

/// Copy attributes the page inherits from its Pages ancestors onto the page itself
///
/// Reparenting pages under a fresh Pages node would otherwise lose them.
fn flatten_inherited_attributes(doc: &mut Document, page_id: ObjectId) {
    let mut inherited: Vec<(Vec<u8>, Object)> = Vec::new();
    {
        let Ok(page) = doc.get_dictionary(page_id) else {
            return;
        };
        for key in INHERITABLE_PAGE_KEYS {
            if page.has(key) {
                continue;
            }
            let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
            // Bounded to guard against cyclic Parent chains
            for _ in 0..64 {
                let Some(parent_id) = parent else { break };
                let Ok(node) = doc.get_dictionary(parent_id) else { break };
                if let Ok(value) = node.get(key) {
                    inherited.push((key.to_vec(), value.clone()));
                    break;
                }
                parent = node.get(b"Parent").and_then(Object::as_reference).ok();
            }
        }
    }

    if inherited.is_empty() {
        return;
    }
    if let Ok(page) = doc.get_dictionary_mut(page_id) {
        for (key, value) in inherited {
            page.set(key, value);
        }
    }
}
