//! Per-event filtering: debounce, directory handling, pattern matching and
//! root-relative path computation.
//!
//! The processor decides what to do with one raw event and returns a
//! [`WatchAction`]; the [`ChangeWatcher`](super::ChangeWatcher) carries it out.

use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use notify::EventKind;
use regex::Regex;

use super::debouncer::Debouncer;
use super::dir_registry::DirRegistry;
use super::error::WatchError;
use super::event::ChangeOp;
use super::WatchConfig;

/// Outcome of processing one event path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    /// Publish this root-relative, `/`-separated path.
    Publish { path: String },

    /// A directory appeared in recursive mode; register it and its subtree.
    WatchDirectory { path: PathBuf },

    /// Nothing to do.
    Ignore(IgnoreReason),
}

/// Why an event was not published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Access or unknown event kind.
    NotAChange,
    /// Path could not be made absolute.
    Unresolvable,
    /// Same path and operation seen within the debounce window.
    Debounced,
    /// Directories are never published.
    Directory,
    /// Permission or metadata change only.
    Metadata,
    /// Base name does not match the inclusion pattern.
    PatternMismatch,
    /// Path is not below the watch root.
    OutsideRoot,
}

/// Turns raw events into watch actions. Owned by the single watcher task.
#[derive(Debug)]
pub struct EventProcessor {
    root: PathBuf,
    pattern: Regex,
    recursive: bool,
    debouncer: Debouncer,
    dirs: DirRegistry,
}

impl EventProcessor {
    /// Canonicalize the root and compile the pattern.
    pub fn new(config: &WatchConfig) -> Result<Self, WatchError> {
        let root = std::fs::canonicalize(&config.root).map_err(|e| WatchError::RootUnavailable {
            path: config.root.clone(),
            reason: e.to_string(),
        })?;

        let pattern = Regex::new(&config.pattern).map_err(|e| WatchError::InvalidPattern {
            pattern: config.pattern.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            root,
            pattern,
            recursive: config.recursive,
            debouncer: Debouncer::new(config.debounce),
            dirs: DirRegistry::new(),
        })
    }

    /// Canonical watch root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn recursive(&self) -> bool {
        self.recursive
    }

    pub fn dirs(&self) -> &DirRegistry {
        &self.dirs
    }

    pub fn dirs_mut(&mut self) -> &mut DirRegistry {
        &mut self.dirs
    }

    /// Decide what to do with one path of a raw event observed at `now`.
    pub fn process(&mut self, raw: &Path, kind: &EventKind, now: Instant) -> WatchAction {
        let Some(op) = ChangeOp::from_kind(kind) else {
            return WatchAction::Ignore(IgnoreReason::NotAChange);
        };

        let path = match resolve(raw) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("[watcher] cannot resolve {}: {e}", raw.display());
                return WatchAction::Ignore(IgnoreReason::Unresolvable);
            }
        };

        if !self.debouncer.accept(&path, op, now) {
            return WatchAction::Ignore(IgnoreReason::Debounced);
        }

        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => {
                self.dirs.note(path.clone());
                if self.recursive && ChangeOp::adds_entry(kind) {
                    return WatchAction::WatchDirectory { path };
                }
                return WatchAction::Ignore(IgnoreReason::Directory);
            }
            Ok(_) => {}
            Err(_) => {
                // Gone: a directory we have seen before was removed or moved away
                if self.dirs.forget(&path) {
                    return WatchAction::Ignore(IgnoreReason::Directory);
                }
            }
        }

        if op == ChangeOp::Chmod {
            return WatchAction::Ignore(IgnoreReason::Metadata);
        }

        let matches = path
            .file_name()
            .map(|name| self.pattern.is_match(&name.to_string_lossy()))
            .unwrap_or(false);
        if !matches {
            return WatchAction::Ignore(IgnoreReason::PatternMismatch);
        }

        match self.relative_path(&path) {
            Some(path) => WatchAction::Publish { path },
            None => WatchAction::Ignore(IgnoreReason::OutsideRoot),
        }
    }

    /// Path relative to the root with `/` separators, or `None` when the
    /// path is the root itself or lies outside it.
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }

    /// Evict stale debounce records. Returns the number evicted.
    pub fn prune(&mut self, now: Instant) -> usize {
        self.debouncer.prune(now)
    }

    pub fn debounce_entries(&self) -> usize {
        self.debouncer.len()
    }
}

/// Absolute path for an event path.
///
/// The parent directory is canonicalized and the file name kept as is, so
/// removed files still resolve and symlinked files keep their own name.
fn resolve(path: &Path) -> std::io::Result<PathBuf> {
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        if let Ok(parent) = std::fs::canonicalize(parent) {
            return Ok(parent.join(name));
        }
    }
    std::path::absolute(path)
}
