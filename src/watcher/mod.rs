//! Filesystem change watcher.
//!
//! Turns raw OS notifications into a clean stream of root-relative paths and
//! publishes them to the [`Broadcaster`](crate::broadcast::Broadcaster).
//!
//! # Architecture
//!
//! ```text
//! notify::RecommendedWatcher (one watch per directory)
//!         |  callback thread, blocking_send
//!         v
//! ChangeWatcher task
//!   - EventProcessor
//!       resolve -> debounce -> directory? -> metadata? -> pattern -> relative
//!   - DirRegistry (watched and known directories)
//!         |
//!         v
//! Broadcaster::publish("sub/page.html")
//! ```

mod change_watcher;
mod debouncer;
mod dir_registry;
mod error;
mod event;
mod processor;

pub use change_watcher::{ChangeWatcher, WatchConfig};
pub use debouncer::Debouncer;
pub use dir_registry::DirRegistry;
pub use error::WatchError;
pub use event::ChangeOp;
pub use processor::{EventProcessor, IgnoreReason, WatchAction};
