//! CLI argument parsing using clap.

use clap::{
    Args, Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::config::Settings;
use crate::server::Compression;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Live-reload file server
#[derive(Parser, Debug)]
#[command(
    name = "livewatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Serve a directory and push file changes to WebSocket clients",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to a configuration file (default: ./livewatch.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration as TOML
    Config,

    /// Start the server
    Serve(ServeArgs),
}

/// Flags of `serve`. Anything given here overrides the configuration file
/// and the environment.
#[derive(Args, Debug, Default, Clone)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Directory to serve and watch
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Regex matched against changed file names; enables /_/events
    #[arg(long, value_name = "REGEX")]
    pub pattern: Option<String>,

    /// Watch subdirectories
    #[arg(long, value_name = "BOOL")]
    pub recursive: Option<bool>,

    /// Gzip static responses
    #[arg(long, value_name = "BOOL")]
    pub gzip: Option<bool>,

    /// PEM certificate; requires --tls-key
    #[arg(long, value_name = "PATH", requires = "tls_key")]
    pub tls_cert: Option<PathBuf>,

    /// PEM private key; requires --tls-cert
    #[arg(long, value_name = "PATH", requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,

    /// Default log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl ServeArgs {
    /// Layer the given flags over `settings`.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(bind) = &self.bind {
            settings.server.bind = bind.clone();
        }
        if let Some(root) = &self.root {
            settings.root = Some(root.clone());
        }
        if let Some(pattern) = &self.pattern {
            settings.watch.pattern = Some(pattern.clone());
        }
        if let Some(recursive) = self.recursive {
            settings.watch.recursive = recursive;
        }
        if let Some(gzip) = self.gzip {
            settings.server.compression = Compression::from_enabled(gzip);
        }
        if let Some(cert) = &self.tls_cert {
            settings.server.tls_cert = Some(cert.clone());
        }
        if let Some(key) = &self.tls_key {
            settings.server.tls_key = Some(key.clone());
        }
        if let Some(level) = &self.log_level {
            settings.logging.default = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_flags() {
        let cli = Cli::try_parse_from([
            "livewatch",
            "-c",
            "custom.toml",
            "serve",
            "--bind",
            "0.0.0.0:9000",
            "--root",
            "public",
            "--pattern",
            r"\.html$",
            "--recursive",
            "false",
            "--gzip",
            "false",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.bind.as_deref(), Some("0.0.0.0:9000"));
        assert_eq!(args.recursive, Some(false));
        assert_eq!(args.gzip, Some(false));
    }

    #[test]
    fn test_tls_flags_require_each_other() {
        let result = Cli::try_parse_from(["livewatch", "serve", "--tls-cert", "cert.pem"]);
        assert!(result.is_err());

        let result = Cli::try_parse_from([
            "livewatch",
            "serve",
            "--tls-cert",
            "cert.pem",
            "--tls-key",
            "key.pem",
        ]);
        assert!(result.is_ok());
    }

    #[test]
    fn test_apply_overrides_only_given_flags() {
        let mut settings = Settings::default();
        settings.watch.pattern = Some(r"\.css$".to_string());

        let args = ServeArgs {
            root: Some(PathBuf::from("site")),
            gzip: Some(false),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };
        args.apply(&mut settings);

        assert_eq!(settings.root, Some(PathBuf::from("site")));
        assert_eq!(settings.server.compression, Compression::Identity);
        assert_eq!(settings.logging.default, "debug");
        // Untouched
        assert_eq!(settings.watch.pattern.as_deref(), Some(r"\.css$"));
        assert_eq!(settings.server.bind, "127.0.0.1:8080");
        assert!(settings.watch.recursive);
    }
}
