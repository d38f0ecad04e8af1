//! Trust marker check for extension artifacts.
//!
//! An artifact is admitted only if the first [`SIGNATURE_WINDOW`] characters
//! of its text contain the marker assignment
//! `PLUGIN_SIGNATURE = "IMAN_ACCOUNTING_PLUGIN_2024"` in either quote style.
//! This is a convention check, not a cryptographic signature: anyone who knows
//! the marker can produce an admissible artifact.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

/// Marker value every admissible artifact declares.
pub const SIGNATURE_MARKER: &str = "IMAN_ACCOUNTING_PLUGIN_2024";

/// Number of leading characters inspected.
pub const SIGNATURE_WINDOW: usize = 1000;

/// Returns true if `text` carries the marker within the inspected window.
pub fn verify(text: &str) -> bool {
    let end = text
        .char_indices()
        .nth(SIGNATURE_WINDOW)
        .map_or(text.len(), |(i, _)| i);
    let window = &text[..end];

    window.contains(&format!("PLUGIN_SIGNATURE = \"{SIGNATURE_MARKER}\""))
        || window.contains(&format!("PLUGIN_SIGNATURE = '{SIGNATURE_MARKER}'"))
}

/// Returns true if the file at `path` carries the marker.
///
/// Only the leading window is read and decoded. Bytes after it are never
/// inspected, so they need not be valid UTF-8.
pub fn verify_file(path: &Path) -> bool {
    match read_window(path) {
        Ok(Some(text)) => verify(&text),
        Ok(None) => {
            debug!(path = %path.display(), "Artifact window is not UTF-8 text");
            false
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Artifact unreadable for signature check");
            false
        }
    }
}

/// Reads at most [`SIGNATURE_WINDOW`] characters from the start of `path`.
/// `None` if invalid UTF-8 occurs before the window is complete.
fn read_window(path: &Path) -> io::Result<Option<String>> {
    let mut bytes = Vec::new();
    File::open(path)?
        .take(SIGNATURE_WINDOW as u64 * 4)
        .read_to_end(&mut bytes)?;

    match std::str::from_utf8(&bytes) {
        Ok(text) => Ok(Some(text.to_string())),
        Err(e) => {
            let valid = String::from_utf8_lossy(&bytes[..e.valid_up_to()]).into_owned();
            // A sequence cut off by the read limit is not an encoding error.
            let truncated = e.error_len().is_none();
            if truncated || valid.chars().count() >= SIGNATURE_WINDOW {
                Ok(Some(valid))
            } else {
                Ok(None)
            }
        }
    }
}

/// Returns the marker line in its canonical form.
pub fn marker_line() -> String {
    format!("PLUGIN_SIGNATURE = \"{SIGNATURE_MARKER}\"")
}
