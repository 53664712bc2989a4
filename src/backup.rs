//! The backup run, expressed as an operation pipeline
//!
//! The payload threaded through the run is `[install_dir, tarball...]`: the
//! temporary install directory first, followed by every tarball written so far.

use crate::core::{EnvOverrides, Outcome, Payload, PipelineEnv};
use crate::execution::{Operation, OpsPipeline};
use crate::files::{make_temp_dir, move_into, remove_dir, TEMP_DIR_PREFIX};
use crate::npm::{installed_package_dir, package_name, DependencyKind, PackageJson, PackageManager};
use crate::prompt::Confirmer;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncBufRead;
use tracing::{info, warn};

/// Name of the digest written next to the tarballs
pub const DIGEST_FILE: &str = "npm-super-pack-digest.json";

/// Flag retried when an install fails on peer dependency conflicts
pub const LEGACY_PEER_DEPS: &str = "--legacy-peer-deps";

/// Directory inside the install dir that `npm pack` writes to
const PACKED_DIR: &str = "packed";

/// Everything a backup run needs to know
#[derive(Debug, Clone)]
pub struct BackupPlan {
    /// Package specs, already sanitised
    pub packages: Vec<String>,
    pub destination: PathBuf,
    pub kinds: Vec<DependencyKind>,
    pub install_flags: Vec<String>,
    /// Settings of the outer pipeline; per-package pipelines share its debug flags
    pub env: PipelineEnv,
}

/// Summary written to the destination after every package is packed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    pub packages: Vec<String>,
    pub tarballs: Vec<PathBuf>,
    pub dependencies: Vec<DependencyKind>,
    pub created_at: DateTime<Utc>,
}

/// Install directory at the head of the payload
fn install_dir(input: &Payload) -> Result<PathBuf> {
    input
        .path_at(0)
        .map(Path::to_path_buf)
        .context("Payload does not start with the install directory")
}

/// Tarball paths after the install directory
fn tarballs(input: &Payload) -> Vec<PathBuf> {
    input
        .iter()
        .skip(1)
        .filter_map(Value::as_str)
        .map(PathBuf::from)
        .collect()
}

fn install_step(manager: Arc<dyn PackageManager>, spec: String, flags: Vec<String>) -> Operation {
    Operation::new_async(move |input: Payload| {
        let manager = manager.clone();
        let spec = spec.clone();
        let flags = flags.clone();
        async move {
            let prefix = install_dir(&input)?;
            manager.install(&spec, &prefix, &flags).await?;
            Ok::<_, anyhow::Error>(input)
        }
    })
}

fn bundle_step(spec: String, kinds: Vec<DependencyKind>) -> Operation {
    Operation::new_async(move |input: Payload| {
        let spec = spec.clone();
        let kinds = kinds.clone();
        async move {
            let package_dir = installed_package_dir(&install_dir(&input)?, &spec);
            let mut manifest = PackageJson::read(&package_dir).await?;
            let bundled = manifest.bundle(&kinds);
            manifest.write(&package_dir).await?;
            info!("Bundling {} dependencies of {}", bundled.len(), package_name(&spec));
            Ok::<_, anyhow::Error>(bundled.len() as u64)
        }
    })
}

fn pack_step(manager: Arc<dyn PackageManager>, spec: String, destination: PathBuf) -> Operation {
    Operation::new_async(move |input: Payload| {
        let manager = manager.clone();
        let spec = spec.clone();
        let destination = destination.clone();
        async move {
            let prefix = install_dir(&input)?;
            let packed_dir = prefix.join(PACKED_DIR);
            tokio::fs::create_dir_all(&packed_dir)
                .await
                .with_context(|| format!("Failed to create {}", packed_dir.display()))?;

            let package_dir = installed_package_dir(&prefix, &spec);
            let mut values = input.to_vec();
            for tarball in manager.pack(&package_dir, &packed_dir).await? {
                let moved = move_into(&tarball, &destination).await?;
                info!("Packed {}", moved.display());
                values.push(Value::from(moved.to_string_lossy().into_owned()));
            }
            Ok::<_, anyhow::Error>(values)
        }
    })
}

/// The nested pipeline backing up a single package
pub fn package_pipeline(plan: &BackupPlan, manager: Arc<dyn PackageManager>, spec: &str) -> OpsPipeline {
    let name = package_name(spec);
    let env = PipelineEnv::new(format!("Back up {}", name))
        .with_debug(plan.env.use_debug)
        .with_nesting_debug(plan.env.use_nesting_debug);

    let mut relaxed_flags = plan.install_flags.clone();
    if !relaxed_flags.iter().any(|flag| flag == LEGACY_PEER_DEPS) {
        relaxed_flags.push(LEGACY_PEER_DEPS.to_string());
    }

    OpsPipeline::with_env(env)
        .pipe_with(
            install_step(manager.clone(), spec.to_string(), plan.install_flags.clone()),
            &format!("Install {}", spec),
            EnvOverrides::new().shell(true),
        )
        .fallback_with(
            install_step(manager.clone(), spec.to_string(), relaxed_flags),
            &format!("Install {} ignoring peer dependency conflicts", spec),
            EnvOverrides::new().shell(true),
        )
        .pipe_with(
            bundle_step(spec.to_string(), plan.kinds.clone()),
            &format!("Bundle dependencies of {}", name),
            EnvOverrides::new().loopback(true),
        )
        .pipe_with(
            pack_step(manager, spec.to_string(), plan.destination.clone()),
            &format!("Pack {}", name),
            EnvOverrides::new().shell(true),
        )
}

/// The whole backup run
pub fn backup_pipeline(plan: &BackupPlan, manager: Arc<dyn PackageManager>) -> OpsPipeline {
    let destination = plan.destination.clone();
    let mut pipeline = OpsPipeline::with_env(plan.env.clone())
        .pipe(
            Operation::new_async(|_input: Payload| make_temp_dir(TEMP_DIR_PREFIX)),
            "Create temporary install directory",
        )
        .pipe_with(
            Operation::new_async(move |_input: Payload| {
                let destination = destination.clone();
                async move {
                    tokio::fs::create_dir_all(&destination)
                        .await
                        .with_context(|| format!("Failed to create {}", destination.display()))
                }
            }),
            "Create backup destination directory",
            EnvOverrides::new().loopback(true),
        );

    for spec in &plan.packages {
        pipeline = pipeline.pipe(package_pipeline(plan, manager.clone(), spec), "");
    }

    let digest_path = plan.destination.join(DIGEST_FILE);
    let packages = plan.packages.clone();
    let kinds = plan.kinds.clone();
    pipeline
        .pipe_with(
            Operation::new_async(move |input: Payload| {
                let digest = Digest {
                    packages: packages.clone(),
                    tarballs: tarballs(&input),
                    dependencies: kinds.clone(),
                    created_at: Utc::now(),
                };
                let path = digest_path.clone();
                async move {
                    let mut content = serde_json::to_string_pretty(&digest)?;
                    content.push('\n');
                    tokio::fs::write(&path, content)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Wrote {}", path.display());
                    Ok::<_, anyhow::Error>(())
                }
            }),
            "Write backup digest",
            EnvOverrides::new().loopback(true),
        )
        .pipe(
            Operation::new_async(|input: Payload| async move {
                remove_dir(&install_dir(&input)?).await?;
                Ok::<_, anyhow::Error>(tarball_payload(&input))
            }),
            "Remove temporary install directory",
        )
        .fallback(
            Operation::map(|input: Payload| {
                if let Some(dir) = input.path_at(0) {
                    warn!("Leaving temporary install directory in place: {}", dir.display());
                }
                tarball_payload(&input)
            }),
            "Leave temporary install directory in place",
        )
}

/// Install directory a failed run left on disk
///
/// A failed run carries the payload of the step that failed, which starts with
/// the temporary install directory once that has been created.
pub fn leftover_install_dir(outcome: &Outcome) -> Option<PathBuf> {
    if outcome.is_success() {
        return None;
    }
    outcome
        .payload()
        .path_at(0)
        .filter(|dir| {
            dir.file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with(TEMP_DIR_PREFIX))
        })
        .filter(|dir| dir.is_dir())
        .map(Path::to_path_buf)
}

/// Payload holding only the tarball paths
fn tarball_payload(input: &Payload) -> Payload {
    input.iter().skip(1).cloned().collect()
}

/// Show `npm view` for each package and keep the ones the user confirms
///
/// A package whose view fails is dropped with a warning.
pub async fn confirm_packages<R>(
    packages: &[String],
    manager: &dyn PackageManager,
    confirmer: &Confirmer,
    input: &mut R,
) -> Result<Vec<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut confirmed = Vec::new();
    for spec in packages {
        let view = match manager.view(spec).await {
            Ok(view) => view,
            Err(e) => {
                warn!("Skipping {}: {}", spec, e);
                continue;
            }
        };
        println!("{}", crate::cli::output::separator());
        println!("{}", view.trim_end());

        let answer = confirmer
            .ask_from("Is this the right package? (Y/n): ", input)
            .await
            .context("Failed to read confirmation")?;
        if answer.is_no {
            info!("Dropping {}", spec);
        } else {
            confirmed.push(spec.clone());
        }
    }
    Ok(confirmed)
}
