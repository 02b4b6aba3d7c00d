//! Shared value types passed across the `Backend` trait boundary.

use std::time::SystemTime;

/// Mode a stream is opened in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpenMode {
    /// Read-only. Fails if the path does not exist.
    Read,
    /// Write-only, truncating any existing content.
    Write,
    /// Read and write against existing content, creating it if absent.
    ReadWrite,
}

impl OpenMode {
    /// Whether this mode permits reads.
    #[must_use]
    pub const fn is_readable(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    /// Whether this mode permits writes.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }

    /// Whether existing content at the target path should be discarded on open.
    #[must_use]
    pub const fn truncates(self) -> bool {
        matches!(self, Self::Write)
    }
}

/// Filters applied by [`crate::Backend::listdir`].
#[derive(Clone, Debug, Default)]
pub struct ListDirOptions {
    /// Return only directory entries.
    pub dirs_only: bool,
    /// Return only file entries.
    pub files_only: bool,
    /// Glob-style filter (`*`/`?`) applied to entry names.
    pub wildcard: Option<String>,
}

impl ListDirOptions {
    /// Checks `name` against the wildcard filter, if any is set.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match &self.wildcard {
            None => true,
            Some(pattern) => wildcard_match(pattern, name),
        }
    }
}

fn wildcard_match(pattern: &str, name: &str) -> bool {
    fn rec(pattern: &[u8], name: &[u8]) -> bool {
        match (pattern.first(), name.first()) {
            (None, None) => true,
            (Some(b'*'), _) => {
                rec(&pattern[1..], name) || (!name.is_empty() && rec(pattern, &name[1..]))
            }
            (Some(b'?'), Some(_)) => rec(&pattern[1..], &name[1..]),
            (Some(p), Some(n)) if p == n => rec(&pattern[1..], &name[1..]),
            _ => false,
        }
    }
    rec(pattern.as_bytes(), name.as_bytes())
}

/// Metadata describing one logical entry (a file or a directory) in a backend.
#[derive(Clone, Copy, Debug)]
pub struct FileInfo {
    /// Total size in bytes. Zero for directories.
    pub size: u64,
    /// Best-known creation time.
    pub created: SystemTime,
    /// Best-known modification time.
    pub modified: SystemTime,
    /// Best-known access time.
    pub accessed: SystemTime,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_mode_readable_writable() {
        assert!(OpenMode::Read.is_readable());
        assert!(!OpenMode::Read.is_writable());
        assert!(OpenMode::Write.is_writable());
        assert!(!OpenMode::Write.is_readable());
        assert!(OpenMode::ReadWrite.is_readable());
        assert!(OpenMode::ReadWrite.is_writable());
    }

    #[test]
    fn write_mode_truncates_but_readwrite_does_not() {
        assert!(OpenMode::Write.truncates());
        assert!(!OpenMode::ReadWrite.truncates());
    }

    #[test]
    fn wildcard_matches_star_and_question_mark() {
        let opts = ListDirOptions {
            wildcard: Some("*.part0".to_string()),
            ..Default::default()
        };
        assert!(opts.matches("report.txt.part0"));
        assert!(!opts.matches("report.txt.part1"));
    }

    #[test]
    fn no_wildcard_matches_everything() {
        let opts = ListDirOptions::default();
        assert!(opts.matches("anything"));
    }
}
