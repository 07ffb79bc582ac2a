//! CLI for the rescache resource cache.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rescache_core::config::{self, ResolverConfig};
use std::path::PathBuf;

use commands::{open_resolver, run_checksum, run_import, run_locate, run_resolve, run_status};

/// Top-level CLI for rescache.
#[derive(Debug, Parser)]
#[command(name = "rescache")]
#[command(about = "rescache: fetch, verify and cache named resources", long_about = None)]
pub struct Cli {
    /// Cache root directory (overrides config.toml and the XDG default).
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory holding `<name>.json` resource descriptors.
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Do not draw the progress line on stderr.
    #[arg(long, short, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Resolve a named resource to a verified local path, downloading it on first use.
    Resolve {
        /// Resource name (descriptor `<name>.json`).
        name: String,
    },

    /// Verify a local file or directory against a descriptor and cache it.
    Import {
        /// Resource name.
        name: String,
        /// Local file or directory holding the resource.
        path: PathBuf,
    },

    /// Resolve a file id: `resources://<name>`, a URL, or a local path.
    Locate {
        file_id: String,
        /// Resource type selecting the transform (e.g. Plain, Archive).
        #[arg(long = "type", value_name = "TYPE", default_value = "Plain")]
        resource_type: String,
    },

    /// Print the digest of a file or directory (the value a descriptor's hashtag must hold).
    Checksum {
        /// Path to the file or directory.
        path: PathBuf,
    },

    /// List registered resources and whether each is cached.
    Status {
        /// Only these names (default: every descriptor).
        names: Vec<String>,
    },
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        cli.run()
    }
}

impl Cli {
    pub fn run(self) -> Result<()> {
        // Checksum is pure; no config or cache directory needed.
        if let CliCommand::Checksum { path } = &self.command {
            return run_checksum(path);
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let dirs = ResolverConfig::from_config(
            &cfg,
            self.cache_dir.as_deref(),
            self.config_dir.as_deref(),
        )?;
        let resolver = open_resolver(&dirs, &cfg, self.quiet)?;

        match self.command {
            CliCommand::Resolve { name } => run_resolve(&resolver, &name)?,
            CliCommand::Import { name, path } => run_import(&resolver, &name, &path)?,
            CliCommand::Locate {
                file_id,
                resource_type,
            } => run_locate(&resolver, &file_id, &resource_type)?,
            CliCommand::Status { names } => run_status(&resolver, &names)?,
            CliCommand::Checksum { .. } => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
