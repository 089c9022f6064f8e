use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Read;
use std::path::Path;

// @module: Input and output file utilities

/// Marker accepted in place of an input path to read standard input
pub const STDIN_MARKER: &str = "-";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Read the source text from a file, or stdin for `-`
    ///
    /// Empty input is rejected here: the service requires a non-empty text.
    pub fn read_input(input: &Path) -> Result<String> {
        let text = if input.as_os_str() == STDIN_MARKER {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read standard input")?;
            buffer
        } else {
            Self::read_to_string(input)?
        };

        if text.trim().is_empty() {
            return Err(anyhow!("Input is empty: {:?}", input));
        }
        Ok(text)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;
        Ok(())
    }
}
