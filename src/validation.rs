use crate::constants::{PNG_MIME_TYPE, SNIFF_LENGTH};
use crate::error::{Result, ShrinkError};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// Detect the MIME type of a file from its leading bytes.
///
/// The extension is ignored, so a PNG named `photo.jpg` still reports
/// `image/png`. Content that matches no known image signature reports
/// `application/octet-stream`.
pub fn sniff_mime(path: &Path) -> Result<&'static str> {
    let mut header = Vec::with_capacity(SNIFF_LENGTH as usize);
    File::open(path)?.take(SNIFF_LENGTH).read_to_end(&mut header)?;

    Ok(image::guess_format(&header)
        .map(|format| format.to_mime_type())
        .unwrap_or(UNKNOWN_MIME_TYPE))
}

/// Check that `path` names an existing regular file holding PNG data.
pub fn validate_candidate(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(ShrinkError::FileNotFound(path.to_path_buf()));
    }

    if !path.is_file() {
        return Err(ShrinkError::NotAFile(path.to_path_buf()));
    }

    let mime = sniff_mime(path)?;
    if mime != PNG_MIME_TYPE {
        return Err(ShrinkError::NotPng {
            path: path.to_path_buf(),
            mime: mime.to_string(),
        });
    }

    Ok(())
}

/// Keep the paths that pass [`validate_candidate`], in argument order.
///
/// Rejected paths are reported as warnings and dropped; rejection is never
/// fatal here.
pub fn collect_candidates<I>(paths: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut candidates = Vec::new();

    for path in paths {
        match validate_candidate(&path) {
            Ok(()) => {
                crate::verbose!("Accepted {:?}", path);
                candidates.push(path);
            }
            Err(e) => {
                crate::warn!("Skipping {:?}: {}", path, e);
            }
        }
    }

    candidates
}
