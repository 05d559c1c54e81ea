//! Memory-mapped file access.
//!

use crate::Result;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// A memory-mapped file reader.
///
/// Exports can reach hundreds of megabytes (hit ntuples of long runs);
/// mapping them avoids a full copy before parsing.
pub struct MappedFileReader {
    mmap: Option<Mmap>,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // Zero-length files cannot be mapped on every platform.
        let mmap = if file.metadata()?.len() == 0 {
            None
        } else {
            // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
            // This is the standard safety contract for memory mapping.
            #[allow(unsafe_code)]
            let mmap = unsafe { Mmap::map(&file)? };
            Some(mmap)
        };
        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Path the reader was opened with.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Display name used in error messages.
    #[must_use]
    pub fn origin(&self) -> String {
        self.path.display().to_string()
    }

    /// Contents decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    /// Contents after the first `lines` lines.
    #[must_use]
    pub fn skip_lines(&self, lines: usize) -> &[u8] {
        skip_lines(self.as_bytes(), lines)
    }
}

/// Returns `bytes` after the first `lines` newline-terminated lines.
pub(crate) fn skip_lines(bytes: &[u8], lines: usize) -> &[u8] {
    let mut rest = bytes;
    for _ in 0..lines {
        match rest.iter().position(|&b| b == b'\n') {
            Some(pos) => rest = &rest[pos + 1..],
            None => return &[],
        }
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_mapped_reader() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"a\nb\nc\n").unwrap();
        file.flush().unwrap();

        let reader = MappedFileReader::open(file.path()).unwrap();
        assert_eq!(reader.len(), 6);
        assert_eq!(reader.skip_lines(2), b"c\n");
        assert_eq!(reader.skip_lines(5), b"");
        assert!(reader.text().starts_with("a\n"));
    }

    #[test]
    fn test_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let reader = MappedFileReader::open(file.path()).unwrap();
        assert!(reader.is_empty());
        assert_eq!(reader.as_bytes(), b"");
    }

    #[test]
    fn test_missing_file() {
        assert!(MappedFileReader::open("/nonexistent/adapt/file.csv").is_err());
    }
}
