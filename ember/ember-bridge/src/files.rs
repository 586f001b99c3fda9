//! File loading/reading with taxonomy-tagged failures.

use std::path::Path;

use render_api::{Error, Result};

/// Central file reader. Paths resolve relative to the working directory.
#[derive(Default)]
pub struct Files;

impl Files {
    pub fn new() -> Self {
        Self
    }

    /// Read the text contents of a file.
    pub fn read_text_file(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("file '{}': {e}", path.display())))
    }

    /// Read the binary contents of a file.
    pub fn read_binary_file(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let path = path.as_ref();
        std::fs::read(path).map_err(|e| Error::io(format!("file '{}': {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_report_the_io_tier() {
        let files = Files::new();
        let err = files.read_binary_file("does/not/exist.glb").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("does/not/exist.glb"));
    }
}
