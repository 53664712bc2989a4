//! File-system helpers for the install directory and the backups

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Prefix of the temporary install directories
pub const TEMP_DIR_PREFIX: &str = "tmp-install-dir-";

/// Create a uniquely named directory under the OS temp dir
pub async fn make_temp_dir(prefix: &str) -> Result<PathBuf> {
    let path = std::env::temp_dir().join(format!("{}{}", prefix, Uuid::new_v4().simple()));
    tokio::fs::create_dir_all(&path)
        .await
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    debug!("Created temporary directory {}", path.display());
    Ok(path)
}

/// Move a file into `dest_dir`, keeping its name
///
/// Falls back to copy-then-remove when a rename is not possible (another device).
pub async fn move_into(path: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .with_context(|| format!("Not a file path: {}", path.display()))?;
    let target = dest_dir.join(name);

    if tokio::fs::rename(path, &target).await.is_err() {
        tokio::fs::copy(path, &target)
            .await
            .with_context(|| format!("Failed to copy {} to {}", path.display(), target.display()))?;
        tokio::fs::remove_file(path)
            .await
            .with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    debug!("Moved {} to {}", path.display(), target.display());
    Ok(target)
}

/// Remove a directory and everything in it
pub async fn remove_dir(path: &Path) -> Result<()> {
    tokio::fs::remove_dir_all(path)
        .await
        .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    debug!("Removed {}", path.display());
    Ok(())
}
