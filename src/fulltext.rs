//! Extracted full-text lookup for PTAB records.

use std::fs;
use std::path::Path;

use tracing::warn;

/// Subdirectory holding extracted PDF text, one `<key>.txt` per document.
pub const PDF_IMAGE_DIR: &str = "PDF_image";

/// Read the extracted text for `key` under `base_dir`.
///
/// Returns `None` when the file is absent or unreadable — text extraction may
/// legitimately lag metadata availability, so the caller converts the record
/// without a `textdata` field instead of failing it.
pub fn resolve(base_dir: &Path, key: &str) -> Option<String> {
    let path = base_dir.join(PDF_IMAGE_DIR).join(format!("{key}.txt"));
    if !path.is_file() {
        warn!("no extracted text at {}, skipping textdata", path.display());
        return None;
    }
    match fs::read_to_string(&path) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("failed to read {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_reads_text() {
        let dir = tempdir().unwrap();
        let text_dir = dir.path().join(PDF_IMAGE_DIR);
        fs::create_dir_all(&text_dir).unwrap();
        fs::write(text_dir.join("PTAB000123.txt"), "decision text").unwrap();

        assert_eq!(
            resolve(dir.path(), "PTAB000123").as_deref(),
            Some("decision text")
        );
    }

    #[test]
    fn test_resolve_absent_is_none() {
        let dir = tempdir().unwrap();
        assert_eq!(resolve(dir.path(), "PTAB000999"), None);
    }
}
