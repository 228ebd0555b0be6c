//! # Directory Scanner
//!
//! Discovers contribution directories under one or more repository roots.
//!
//! For each root, and each kind in kind-table order, every non-hidden
//! subdirectory of `<root>/<parent>` is one entry. Children are visited in
//! name order so that scan order, and therefore report order, depends only
//! on the tree.
//!
//! The scan is lazy: a parent directory is listed only when the previous
//! one is exhausted, and an entry's files are walked only when the entry is
//! requested. [`DirectoryScanner::scan`] returns an independent iterator on
//! every call.
//!
//! Listing and walking are separate steps. [`Scan::next_pending`] only
//! lists parent directories; [`PendingEntry::collect`] walks one entry's
//! files. Concurrent consumers share the cheap first step and run the
//! second in parallel.

use std::collections::{BTreeMap, VecDeque};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use ctk_core::{ContributionEntry, ContributionKind, KindTable};
use walkdir::WalkDir;

use crate::error::LintError;

/// Finds contribution entries under a set of roots.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    roots: Vec<PathBuf>,
    parents: Vec<(ContributionKind, String)>,
}

impl DirectoryScanner {
    /// Create a scanner. Duplicate roots are dropped, keeping the first
    /// occurrence.
    pub fn new<I, P>(roots: I, table: &KindTable) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut seen = Vec::new();
        let mut unique = Vec::new();
        for root in roots {
            let root: PathBuf = root.into();
            let key = std::fs::canonicalize(&root).unwrap_or_else(|_| root.clone());
            if !seen.contains(&key) {
                seen.push(key);
                unique.push(root);
            }
        }
        Self {
            roots: unique,
            parents: table
                .iter()
                .map(|spec| (spec.kind, spec.parent.clone()))
                .collect(),
        }
    }

    /// The deduplicated roots, in the order given.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Check that every root is a readable directory.
    pub fn check_roots(&self) -> Result<(), LintError> {
        for root in &self.roots {
            let unreadable = |reason: String| LintError::UnreadableRoot {
                path: root.clone(),
                reason,
            };
            let metadata = std::fs::metadata(root).map_err(|e| unreadable(e.to_string()))?;
            if !metadata.is_dir() {
                return Err(unreadable("not a directory".to_string()));
            }
            std::fs::read_dir(root).map_err(|e| unreadable(e.to_string()))?;
        }
        Ok(())
    }

    /// Start a fresh scan.
    pub fn scan(&self) -> Scan {
        let parents = self
            .roots
            .iter()
            .flat_map(|root| {
                self.parents
                    .iter()
                    .map(move |(kind, parent)| (*kind, root.join(parent)))
            })
            .collect();
        Scan {
            parents,
            children: VecDeque::new(),
        }
    }
}

/// A lazy, finite stream of entries. See [`DirectoryScanner::scan`].
#[derive(Debug)]
pub struct Scan {
    parents: VecDeque<(ContributionKind, PathBuf)>,
    children: VecDeque<PendingEntry>,
}

impl Scan {
    /// The next candidate directory, without walking its files.
    pub fn next_pending(&mut self) -> Option<PendingEntry> {
        loop {
            if let Some(pending) = self.children.pop_front() {
                return Some(pending);
            }
            let (kind, parent) = self.parents.pop_front()?;
            self.children = list_children(kind, &parent);
        }
    }

    /// Candidate directories in scan order.
    pub fn pending(mut self) -> impl Iterator<Item = PendingEntry> {
        std::iter::from_fn(move || self.next_pending())
    }
}

impl Iterator for Scan {
    type Item = ContributionEntry;

    fn next(&mut self) -> Option<ContributionEntry> {
        while let Some(pending) = self.next_pending() {
            if let Some(entry) = pending.collect() {
                return Some(entry);
            }
        }
        None
    }
}

/// A listed child directory whose files have not been walked yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    kind: ContributionKind,
    name: String,
    dir: PathBuf,
}

impl PendingEntry {
    /// The directory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Walk the directory. `None` if it holds no contribution files.
    pub fn collect(self) -> Option<ContributionEntry> {
        let files = collect_files(&self.dir);
        if files.keys().all(|rel| is_hidden_path(rel)) {
            tracing::debug!(dir = %self.dir.display(), "skipping directory without contribution files");
            return None;
        }
        Some(ContributionEntry::new(self.kind, self.name, self.dir, files))
    }
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Whether the file name of a `/`-separated relative path is hidden.
fn is_hidden_path(relative: &str) -> bool {
    relative
        .rsplit('/')
        .next()
        .is_some_and(|name| name.starts_with('.'))
}

/// Non-hidden, non-symlink subdirectories of `parent`, sorted by name.
fn list_children(kind: ContributionKind, parent: &Path) -> VecDeque<PendingEntry> {
    let read = match std::fs::read_dir(parent) {
        Ok(read) => read,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(%kind, parent = %parent.display(), "no contributions of this kind");
            return VecDeque::new();
        }
        Err(e) => {
            tracing::warn!(%kind, parent = %parent.display(), error = %e, "cannot list contributions");
            return VecDeque::new();
        }
    };

    let mut children: Vec<(String, PathBuf)> = Vec::new();
    for item in read {
        let item = match item {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(parent = %parent.display(), error = %e, "failed to read directory entry");
                continue;
            }
        };
        // DirEntry::file_type does not follow symlinks.
        let is_dir = item.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir || is_hidden(&item.file_name()) {
            continue;
        }
        children.push((item.file_name().to_string_lossy().into_owned(), item.path()));
    }
    children.sort();
    tracing::debug!(%kind, parent = %parent.display(), count = children.len(), "listed contributions");
    children
        .into_iter()
        .map(|(name, dir)| PendingEntry { kind, name, dir })
        .collect()
}

/// Every regular file below `dir`, keyed by `/`-separated relative path.
fn collect_files(dir: &Path) -> BTreeMap<String, u64> {
    let mut files = BTreeMap::new();
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && is_hidden(e.file_name())));
    for item in walker {
        let item = match item {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable path");
                continue;
            }
        };
        if !item.file_type().is_file() {
            continue;
        }
        let Ok(relative) = item.path().strip_prefix(dir) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let size = match item.metadata() {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                tracing::warn!(path = %item.path().display(), error = %e, "cannot stat file");
                0
            }
        };
        files.insert(relative, size);
    }
    files
}
