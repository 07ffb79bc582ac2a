//! Tests for global flags.

use super::parse_cli;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::Path;

#[test]
fn cli_parse_defaults() {
    let cli = parse_cli(&["rescache", "resolve", "coai"]);
    assert!(cli.cache_dir.is_none());
    assert!(cli.config_dir.is_none());
    assert!(!cli.quiet);
}

#[test]
fn cli_parse_dirs_before_command() {
    let cli = parse_cli(&[
        "rescache",
        "--cache-dir",
        "/data/cache",
        "--config-dir",
        "/etc/rescache",
        "resolve",
        "coai",
    ]);
    assert_eq!(cli.cache_dir.as_deref(), Some(Path::new("/data/cache")));
    assert_eq!(cli.config_dir.as_deref(), Some(Path::new("/etc/rescache")));
    assert!(matches!(cli.command, CliCommand::Resolve { .. }));
}

#[test]
fn cli_parse_global_flags_after_command() {
    let cli = parse_cli(&["rescache", "import", "demo", "/tmp/x", "-q", "--cache-dir", "/c"]);
    assert!(cli.quiet);
    assert_eq!(cli.cache_dir.as_deref(), Some(Path::new("/c")));
}

#[test]
fn cli_parse_unknown_command_fails() {
    assert!(Cli::try_parse_from(&["rescache", "purge"]).is_err());
}
