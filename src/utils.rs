//! Utility functions for string shortening and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Char-boundary-safe truncation for logs and descriptions
//! - File system validation for the snapshot directory

use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Keep at most `max` characters of `s`.
///
/// Works on characters, not bytes, so Hebrew text is never cut mid-codepoint.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let kept = truncate_chars(s, max);
    if kept.len() == s.len() {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", kept, s.len() - kept.len())
    }
}

/// Name of the scratch file written by [`ensure_writable_dir`].
const WRITE_CHECK_FILE: &str = ".tenders-write-check";

/// Create `dir` if needed and confirm a file can be written inside it.
#[instrument(level = "info", skip_all, fields(dir = %dir))]
pub async fn ensure_writable_dir(dir: &str) -> io::Result<()> {
    fs::create_dir_all(dir).await?;
    let check = Path::new(dir).join(WRITE_CHECK_FILE);
    fs::write(&check, b"ok").await?;
    fs::remove_file(&check).await?;
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_hebrew() {
        // two bytes per letter
        let result = truncate_for_log("דוברות", 3);
        assert_eq!(result, "דוב…(+6 bytes)");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("יחסי ציבור", 4), "יחסי");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 0), "");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("data/nested");
        let path = nested.to_str().unwrap();

        ensure_writable_dir(path).await.unwrap();
        assert!(nested.is_dir());
        assert_eq!(std::fs::read_dir(&nested).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_rejects_a_file_path() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();

        assert!(ensure_writable_dir(path).await.is_err());
    }
}
