//! Command implementations for the CLI.

pub mod init;
pub mod serve;

use std::path::Path;

use anyhow::Context;

use crate::config::Settings;

/// Load settings from `--config` when given, else from `livewatch.toml` in
/// the current directory. Only an explicitly named file must exist.
pub fn load_settings(config: Option<&Path>) -> anyhow::Result<Settings> {
    match config {
        Some(path) => {
            anyhow::ensure!(
                path.exists(),
                "configuration file not found: {}",
                path.display()
            );
            Settings::load_from(path)
                .with_context(|| format!("failed to load {}", path.display()))
        }
        None => Settings::load().context("failed to load configuration"),
    }
}
