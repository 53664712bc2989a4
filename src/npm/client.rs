//! npm CLI subprocess client

use crate::core::ExitCodeError;
use crate::npm::{NpmError, PackageManager};
use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Client for running the npm executable as a subprocess
#[derive(Debug, Clone)]
pub struct NpmClient {
    /// Path to npm executable
    npm_path: String,

    /// Timeout for a single npm invocation in seconds
    timeout_secs: u64,
}

/// One entry of `npm pack --json` output
#[derive(Debug, Deserialize)]
struct PackedTarball {
    filename: String,
}

impl NpmClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `npm_path` - Path to npm executable (e.g., "npm", "/usr/local/bin/npm")
    /// * `timeout_secs` - Timeout for each invocation in seconds
    pub fn new(npm_path: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            npm_path: npm_path.into(),
            timeout_secs,
        }
    }

    /// Run `npm <command> <args..>` and return its stdout
    ///
    /// # Errors
    /// Returns `NpmError` if:
    /// - The npm executable cannot be spawned
    /// - npm exits with a non-zero status (carrying that status)
    /// - The command times out
    async fn run(&self, command: &str, args: Vec<OsString>) -> Result<String, NpmError> {
        debug!(command, args = ?args, "Spawning npm");

        let result = timeout(
            Duration::from_secs(self.timeout_secs),
            Command::new(&self.npm_path)
                .arg(command)
                .args(&args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| NpmError::Timeout(self.timeout_secs))?;

        let output = result.map_err(|source| NpmError::Spawn {
            program: self.npm_path.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            warn!("npm {} exited with code {}: {}", command, exit_code, stderr.trim());
            return Err(NpmError::Exit {
                command: command.to_string(),
                source: ExitCodeError::new(exit_code, stderr.trim()),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(command, "npm returned {} bytes of output", stdout.len());
        Ok(stdout)
    }
}

/// Arguments of `npm install` for one package
pub(crate) fn install_args(spec: &str, prefix: &Path, flags: &[String]) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--global-style".into(),
        "--no-save".into(),
        "--prefix".into(),
        prefix.as_os_str().to_owned(),
    ];
    args.extend(flags.iter().map(OsString::from));
    args.push(spec.into());
    args
}

/// Tarball paths listed by `npm pack --json`
pub(crate) fn parse_pack_output(stdout: &str, destination: &Path) -> Result<Vec<PathBuf>, NpmError> {
    let packed: Vec<PackedTarball> = serde_json::from_str(stdout).map_err(|e| NpmError::Output {
        command: "pack".to_string(),
        reason: e.to_string(),
    })?;
    if packed.is_empty() {
        return Err(NpmError::Output {
            command: "pack".to_string(),
            reason: "no tarball was created".to_string(),
        });
    }
    Ok(packed
        .into_iter()
        .map(|tarball| destination.join(tarball.filename))
        .collect())
}

#[async_trait]
impl PackageManager for NpmClient {
    async fn view(&self, spec: &str) -> Result<String, NpmError> {
        self.run("view", vec![spec.into()]).await
    }

    async fn install(&self, spec: &str, prefix: &Path, flags: &[String]) -> Result<(), NpmError> {
        self.run("install", install_args(spec, prefix, flags)).await?;
        Ok(())
    }

    async fn pack(&self, package_dir: &Path, destination: &Path) -> Result<Vec<PathBuf>, NpmError> {
        let args = vec![
            package_dir.as_os_str().to_owned(),
            "--pack-destination".into(),
            destination.as_os_str().to_owned(),
            "--json".into(),
        ];
        let stdout = self.run("pack", args).await?;
        parse_pack_output(&stdout, destination)
    }
}
