//! Command-line interface

pub mod args;
pub mod output;

use crate::backup::{BackupPlan, LEGACY_PEER_DEPS};
use crate::core::{BackupConfig, PipelineEnv};
use crate::sanitize::{sanitize_arg, sanitize_args};
use args::DependencyArgs;
use clap::{ArgAction, Parser};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{warn, Level};

/// Download npm packages with their dependencies bundled, for offline installation
#[derive(Debug, Parser, Clone)]
#[command(name = "npm-super-pack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Packages to back up (name, name@version or name@range)
    #[arg(required = true, value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// Directory the tarballs are written to
    #[arg(long = "dest", visible_aliases = ["save", "pack-destination"], value_name = "PATH")]
    pub destination: Option<PathBuf>,

    #[command(flatten)]
    pub dependencies: DependencyArgs,

    /// Install without failing on peer dependency conflicts
    #[arg(long)]
    pub legacy_peer_deps: bool,

    /// Do not run install scripts of the packages
    #[arg(long)]
    pub ignore_scripts: bool,

    /// Print the steps that would run and exit
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the package confirmation prompts
    #[arg(short, long)]
    pub yes: bool,

    /// Enable verbose logging
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Record a trace of the run (twice: also of every package)
    #[arg(long, action = ArgAction::Count)]
    pub debug: u8,

    /// Path to the npm executable
    #[arg(long, value_name = "PATH")]
    pub npm: Option<String>,

    /// Path to a YAML configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }

    /// Log level chosen by `-v` and `--debug`
    pub fn log_level(&self) -> Level {
        if self.debug >= 2 {
            Level::TRACE
        } else if self.verbose > 0 || self.debug > 0 {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }

    /// Combine the command line with the configuration file
    ///
    /// Package specs are sanitised; a spec with nothing left is dropped.
    pub fn backup_plan(&self, config: &BackupConfig) -> BackupPlan {
        let packages = self
            .packages
            .iter()
            .filter_map(|raw| {
                let spec = sanitize_arg(raw.trim()).trim().to_string();
                if spec.is_empty() {
                    warn!("Ignoring package argument with no usable characters: {:?}", raw);
                    None
                } else {
                    Some(spec)
                }
            })
            .collect();

        let mut install_flags = sanitize_args(&config.install_flags);
        for (enabled, flag) in [
            (self.legacy_peer_deps, LEGACY_PEER_DEPS),
            (self.ignore_scripts, "--ignore-scripts"),
        ] {
            if enabled && !install_flags.iter().any(|f| f == flag) {
                install_flags.push(flag.to_string());
            }
        }

        let env = PipelineEnv::new("Back up npm packages")
            .with_debug(self.debug > 0 || config.debug)
            .with_nesting_debug(self.debug > 1 || config.nesting_debug);

        BackupPlan {
            packages,
            destination: self
                .destination
                .clone()
                .unwrap_or_else(|| config.destination.clone()),
            kinds: self
                .dependencies
                .kinds()
                .unwrap_or_else(|| config.dependencies.clone()),
            install_flags,
            env,
        }
    }

    /// npm executable, command line first
    pub fn npm_path(&self, config: &BackupConfig) -> String {
        self.npm.clone().unwrap_or_else(|| config.npm_path.clone())
    }
}
