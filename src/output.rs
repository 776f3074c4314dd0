//! Two-phase output publishing: produce into a temp file, then rename into place

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Run `producer` against `temp_path` and publish the result as `final_path`
///
/// The rename is only attempted after the producer succeeds. When either step
/// fails the temp file is removed (best effort) and the error is returned, so a
/// failed run never leaves a half-written artifact next to the outputs.
pub fn write_atomically<T, F>(temp_path: &Path, final_path: &Path, producer: F) -> Result<T>
where
    F: FnOnce(&Path) -> Result<T>,
{
    let value = match producer(temp_path) {
        Ok(value) => value,
        Err(e) => {
            discard_temp(temp_path);
            return Err(e);
        }
    };
    debug!(temp = %temp_path.display(), "temporary output written");

    if let Err(source) = fs::rename(temp_path, final_path) {
        discard_temp(temp_path);
        return Err(Error::Publish {
            from: temp_path.to_path_buf(),
            to: final_path.to_path_buf(),
            source,
        });
    }

    Ok(value)
}

fn discard_temp(temp_path: &Path) {
    match fs::remove_file(temp_path) {
        Ok(()) => debug!(temp = %temp_path.display(), "removed temporary output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(temp = %temp_path.display(), "could not remove temporary output: {}", e),
    }
}
