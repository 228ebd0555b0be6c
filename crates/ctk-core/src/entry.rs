//! # Contribution Entries
//!
//! A [`ContributionEntry`] is one skill, subagent, or MCP-server directory
//! as seen by the scanner: its kind, its name, where it lives, and which
//! files it contains. Entries are built once and never mutated; rules read
//! them and produce findings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::kind::ContributionKind;

/// One contribution directory discovered by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionEntry {
    kind: ContributionKind,
    name: String,
    root: PathBuf,
    files: BTreeMap<String, u64>,
}

impl ContributionEntry {
    /// Build an entry from its discovered files.
    ///
    /// `files` maps `/`-separated paths relative to `root` to their size in
    /// bytes.
    pub fn new(
        kind: ContributionKind,
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        files: BTreeMap<String, u64>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            root: root.into(),
            files,
        }
    }

    /// The entry's kind.
    pub fn kind(&self) -> ContributionKind {
        self.kind
    }

    /// The directory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a file with this relative path was discovered.
    pub fn has(&self, relative: &str) -> bool {
        self.files.contains_key(relative)
    }

    /// Size in bytes of a discovered file.
    pub fn size_of(&self, relative: &str) -> Option<u64> {
        self.files.get(relative).copied()
    }

    /// Absolute (root-joined) path of a file inside the entry.
    pub fn path_of(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// All discovered files with their sizes, in path order.
    pub fn files(&self) -> impl Iterator<Item = (&str, u64)> {
        self.files.iter().map(|(path, size)| (path.as_str(), *size))
    }

    /// Number of discovered files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// The entry path rendered with `/` separators, for reports.
    pub fn display_path(&self) -> String {
        self.root.to_string_lossy().replace('\\', "/")
    }
}
