//! Init and Config commands.

use std::path::Path;

use anyhow::Context;

use crate::config::{DEFAULT_CONFIG_FILE, Settings};

/// Run init command - create configuration file.
pub fn run_init(config: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = config.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));

    let path = Settings::init_config_file(path, force)
        .context("failed to create configuration file (use --force to overwrite)")?;

    println!("Created configuration file at: {}", path.display());
    println!("Set watch.pattern to enable change notifications.");
    Ok(())
}

/// Run config command - display current configuration.
pub fn run_config(settings: &Settings) -> anyhow::Result<()> {
    let toml_str = toml::to_string_pretty(settings).context("failed to render configuration")?;
    println!("{toml_str}");
    Ok(())
}
