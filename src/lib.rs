//! Live-reload file server.
//!
//! Watches a directory tree, filters and debounces filesystem events, and
//! pushes the relative paths of changed files to every connected WebSocket
//! client. Optionally serves the same directory as static files.

pub mod broadcast;
pub mod cli;
pub mod config;
pub mod logging;
pub mod server;
pub mod watcher;
pub mod ws;

pub use broadcast::{Broadcaster, Subscriber};
pub use config::Settings;
pub use watcher::{ChangeWatcher, WatchConfig, WatchError};
