//! Helpers shared by the upload and download stages.

use crate::constants::{PROGRESS_SPINNER_TEMPLATE, SHRUNK_PREFIX};
use crate::error::{Result, ShrinkError};
use indicatif::{ProgressBar, ProgressStyle};
use std::ffi::OsString;
use std::path::Path;

/// Name under which the shrunk version of `path` is stored: `shrunk_<basename>`.
///
/// Built from the raw file name, so names that are not valid UTF-8 survive.
pub fn derive_output_name(path: &Path) -> Result<OsString> {
    let file_name = path
        .file_name()
        .ok_or_else(|| ShrinkError::InvalidFileName(path.to_path_buf()))?;

    let mut name = OsString::from(SHRUNK_PREFIX);
    name.push(file_name);
    Ok(name)
}

/// Spinner on standard error; hidden entirely in quiet mode.
pub fn create_progress_spinner(message: &str) -> ProgressBar {
    if crate::logger::is_quiet() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template(PROGRESS_SPINNER_TEMPLATE) {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb
}

/// Format file size in human-readable format ("1.2 MB", "512 B").
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Size reduction as a percentage; negative when the file grew.
pub fn calculate_compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    ((original_size as f64 - compressed_size as f64) / original_size as f64) * 100.0
}
