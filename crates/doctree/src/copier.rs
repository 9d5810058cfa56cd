//! Content copy: stream a document's bytes into an ordinary local file.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use doctree_core::DocumentUri;
use doctree_store::DocumentProvider;

use crate::error::{BridgeError, Result};

/// Copy `document` to `dest`, creating missing parent directories and
/// truncating any existing file. There is no size limit.
///
/// Fails with [`BridgeError::Read`] when no stream can be opened and with
/// [`BridgeError::Copy`] for any fault after that. A destination this call
/// created or truncated is removed when streaming fails; one that could not
/// be opened for writing is left untouched. Both streams are closed on every
/// path. Blocks on the provider and the filesystem.
pub fn copy_to_cache<P>(
    provider: &P,
    document: &DocumentUri,
    dest: &Path,
    buffer_size: usize,
) -> Result<PathBuf>
where
    P: DocumentProvider + ?Sized,
{
    let mut input = match provider.open_input(document) {
        Ok(Some(stream)) => stream,
        Ok(None) => {
            return Err(BridgeError::Read(format!(
                "unable to open input stream for {}",
                document
            )))
        }
        Err(e) => {
            tracing::warn!("cannot open {}: {}", document, e);
            return Err(BridgeError::Read(e.to_string()));
        }
    };

    let file = match create(dest) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!("cannot create {}: {}", dest.display(), e);
            return Err(BridgeError::Copy(e.to_string()));
        }
    };

    match stream(&mut input, file, buffer_size) {
        Ok(written) => {
            tracing::debug!(document = %document, dest = %dest.display(), bytes = written, "copied document");
            Ok(dest.to_path_buf())
        }
        Err(e) => {
            tracing::warn!("copy of {} to {} failed: {}", document, dest.display(), e);
            if let Err(cleanup) = fs::remove_file(dest) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    tracing::debug!("could not remove partial {}: {}", dest.display(), cleanup);
                }
            }
            Err(BridgeError::Copy(e.to_string()))
        }
    }
}

fn create(dest: &Path) -> io::Result<File> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    File::create(dest)
}

fn stream(input: &mut impl io::Read, file: File, buffer_size: usize) -> io::Result<u64> {
    let mut output = BufWriter::with_capacity(buffer_size.max(1), file);
    let written = io::copy(input, &mut output)?;
    output.flush()?;
    Ok(written)
}
