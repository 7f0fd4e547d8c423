//! Line source for annotation batches.
//!
//! Reads a text file, checks it against the input settings and splits it
//! into the trimmed, non-empty lines the orchestrator expects.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Configuration for reading input files.
#[derive(Debug, Clone)]
pub struct InputConfig {
    /// File extensions accepted as input (without dot).
    pub allowed_extensions: Vec<String>,
    /// Maximum file size in bytes.
    pub max_file_size: u64,
    /// Maximum number of lines to keep.
    pub max_lines: Option<usize>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: vec!["txt".to_string()],
            max_file_size: 1024 * 1024, // 1MB
            max_lines: None,
        }
    }
}

impl From<&crate::config::InputSettings> for InputConfig {
    fn from(settings: &crate::config::InputSettings) -> Self {
        Self {
            allowed_extensions: settings.allowed_extensions.clone(),
            max_file_size: settings.max_file_size,
            max_lines: settings.max_lines,
        }
    }
}

/// Byte order mark some editors put at the start of UTF-8 files.
const BOM: char = '\u{FEFF}';

/// Split text into trimmed lines, dropping empty ones.
///
/// Handles both `\n` and `\r\n` line endings. Byte order marks are
/// trimmed like whitespace.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim_matches(|c: char| c.is_whitespace() || c == BOM))
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Check that `path` is an acceptable input file.
pub fn validate_file(path: &Path, config: &InputConfig) -> Result<()> {
    if !path.exists() {
        bail!("Input file does not exist: {}", path.display());
    }

    if !path.is_file() {
        bail!("Input path is not a file: {}", path.display());
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let allowed = config
        .allowed_extensions
        .iter()
        .any(|ext| ext.trim_start_matches('.').eq_ignore_ascii_case(&extension));
    if !allowed {
        bail!(
            "Only {} files are allowed: {}",
            config
                .allowed_extensions
                .iter()
                .map(|e| format!(".{}", e.trim_start_matches('.')))
                .collect::<Vec<_>>()
                .join(", "),
            path.display()
        );
    }

    let size = fs::metadata(path)
        .with_context(|| format!("Failed to read metadata of {}", path.display()))?
        .len();
    if size > config.max_file_size {
        bail!(
            "Input file is too large ({} bytes, limit {} bytes): {}",
            size,
            config.max_file_size,
            path.display()
        );
    }

    Ok(())
}

/// Read, validate and split an input file.
pub fn read_lines(path: &Path, config: &InputConfig) -> Result<Vec<String>> {
    validate_file(path, config)?;

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} as UTF-8 text", path.display()))?;

    let mut lines = split_lines(&content);
    debug!("Read {} non-empty lines from {}", lines.len(), path.display());

    if lines.is_empty() {
        bail!("Input file contains no text: {}", path.display());
    }

    if let Some(max) = config.max_lines {
        if lines.len() > max {
            warn!("Keeping the first {} of {} lines", max, lines.len());
            lines.truncate(max);
        }
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_split_lines() {
        let lines = split_lines("George Bush was president of USA.\r\n\n   \n  second line  \nthird");
        assert_eq!(
            lines,
            vec!["George Bush was president of USA.", "second line", "third"]
        );
    }

    #[test]
    fn test_split_lines_drops_trailing_empty() {
        assert_eq!(split_lines("George Bush was president of USA.\n"), vec![
            "George Bush was president of USA."
        ]);
        assert!(split_lines("\r\n\n").is_empty());
    }

    #[test]
    fn test_split_lines_strips_byte_order_mark() {
        assert_eq!(split_lines("\u{FEFF}George Bush\n\u{FEFF}\n"), vec!["George Bush"]);
        assert!(split_lines("\u{FEFF}").is_empty());
    }

    #[test]
    fn test_read_lines_with_byte_order_mark() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "bom.txt", "\u{FEFF}Paris\nBerlin\n".as_bytes());

        let lines = read_lines(&path, &InputConfig::default()).unwrap();
        assert_eq!(lines, vec!["Paris", "Berlin"]);
    }

    #[test]
    fn test_read_lines() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "input.txt", b"one\n\ntwo\r\nthree\n");

        let lines = read_lines(&path, &InputConfig::default()).unwrap();
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_read_lines_max_lines() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "input.txt", b"one\ntwo\nthree\n");
        let config = InputConfig {
            max_lines: Some(2),
            ..InputConfig::default()
        };

        assert_eq!(read_lines(&path, &config).unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn test_rejects_wrong_extension() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "input.csv", b"a,b\n");

        let err = read_lines(&path, &InputConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Only .txt files are allowed"));
    }

    #[test]
    fn test_extension_check_ignores_case() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "INPUT.TXT", b"hello\n");
        assert!(read_lines(&path, &InputConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_missing_and_empty_files() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.txt");
        assert!(read_lines(&missing, &InputConfig::default()).is_err());

        let blank = write_file(&dir, "blank.txt", b"\n  \n");
        let err = read_lines(&blank, &InputConfig::default()).unwrap_err();
        assert!(err.to_string().contains("contains no text"));
    }

    #[test]
    fn test_rejects_large_and_binary_files() {
        let dir = TempDir::new().unwrap();
        let large = write_file(&dir, "large.txt", &[b'a'; 64]);
        let config = InputConfig {
            max_file_size: 16,
            ..InputConfig::default()
        };
        assert!(read_lines(&large, &config).is_err());

        let binary = write_file(&dir, "binary.txt", &[0xff, 0xfe, 0x00]);
        assert!(read_lines(&binary, &InputConfig::default()).is_err());
    }
}
