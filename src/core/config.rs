//! Backup defaults from YAML

use crate::npm::DependencyKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up under the user config directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Defaults for a backup run, loaded from YAML
///
/// Every field is optional in the file; command-line flags override what is
/// set here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Directory the tarballs and the digest are written to
    pub destination: PathBuf,

    /// Dependency kinds bundled into each tarball
    pub dependencies: Vec<DependencyKind>,

    /// npm executable
    pub npm_path: String,

    /// Timeout for a single npm invocation (in seconds)
    pub npm_timeout_secs: u64,

    /// Extra flags passed to every `npm install`
    pub install_flags: Vec<String>,

    /// Record a trace of the run
    pub debug: bool,

    /// Also record the traces of the per-package pipelines
    pub nesting_debug: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("."),
            dependencies: vec![DependencyKind::Prod],
            npm_path: "npm".to_string(),
            npm_timeout_secs: 300,
            install_flags: Vec::new(),
            debug: false,
            nesting_debug: false,
        }
    }
}

impl BackupConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document is a config with every default
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: BackupConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        config.dependencies = DependencyKind::dedup(&config.dependencies);
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.npm_timeout_secs == 0 {
            anyhow::bail!("npm_timeout_secs must be greater than 0");
        }
        if self.npm_path.trim().is_empty() {
            anyhow::bail!("npm_path must not be empty");
        }
        if self.destination.as_os_str().is_empty() {
            anyhow::bail!("destination must not be empty");
        }
        Ok(())
    }

    /// `<config dir>/npm-super-pack/config.yaml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(env!("CARGO_PKG_NAME")).join(CONFIG_FILE_NAME))
    }

    /// Load from an explicit path, or from the default path when that file exists
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file means built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(path),
                _ => Ok(Self::default()),
            },
        }
    }
}
