//! Bookkeeping for directories under the watch root.
//!
//! Tracks which directories are registered with the OS facility and which
//! directories the watcher has seen at all. The latter lets removals of
//! directories be recognized after the path can no longer be stat'ed.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

#[derive(Debug, Default)]
pub struct DirRegistry {
    /// Directories registered with the OS watch facility.
    watched: HashSet<PathBuf>,
    /// Every directory seen under the root, watched or not.
    known: HashSet<PathBuf>,
}

impl DirRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directories to register for `dir`.
    ///
    /// Recursive mode returns `dir` and every subdirectory not yet watched.
    /// Otherwise only `dir` is returned and its immediate subdirectories are
    /// remembered as known. Unreadable entries below `dir` are logged and
    /// skipped.
    pub fn discover(&mut self, dir: &Path, recursive: bool) -> Vec<PathBuf> {
        let mut found = Vec::new();

        if recursive {
            for entry in WalkDir::new(dir).follow_links(false) {
                match entry {
                    Ok(entry) if entry.file_type().is_dir() => {
                        let path = entry.into_path();
                        self.known.insert(path.clone());
                        if !self.watched.contains(&path) {
                            found.push(path);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("[watcher] skipping unreadable entry: {e}");
                    }
                }
            }
        } else {
            self.known.insert(dir.to_path_buf());
            if !self.watched.contains(dir) {
                found.push(dir.to_path_buf());
            }
            if let Ok(entries) = std::fs::read_dir(dir) {
                for entry in entries.flatten() {
                    if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                        self.known.insert(entry.path());
                    }
                }
            }
        }

        found
    }

    /// Record a directory as registered. Returns `false` if it already was.
    pub fn mark_watched(&mut self, dir: PathBuf) -> bool {
        self.known.insert(dir.clone());
        self.watched.insert(dir)
    }

    /// Record a directory as seen without registering it.
    pub fn note(&mut self, dir: PathBuf) {
        self.known.insert(dir);
    }

    pub fn is_known(&self, path: &Path) -> bool {
        self.known.contains(path)
    }

    pub fn is_watched(&self, path: &Path) -> bool {
        self.watched.contains(path)
    }

    /// Forget `dir` and everything below it. Returns whether `dir` was known.
    pub fn forget(&mut self, dir: &Path) -> bool {
        let was_known = self.known.contains(dir);
        self.known.retain(|p| !p.starts_with(dir));
        self.watched.retain(|p| !p.starts_with(dir));
        was_known
    }

    /// Number of directories registered with the OS facility.
    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }
}
