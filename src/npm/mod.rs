//! npm package manager collaborator

pub mod client;
pub mod error;
pub mod package_json;

use crate::sanitize::sanitize_package_name;
use async_trait::async_trait;
pub use client::NpmClient;
pub use error::NpmError;
pub use package_json::{DependencyKind, PackageJson, PackageJsonError};
use std::path::{Path, PathBuf};

/// Trait for package-manager access - allows for different implementations
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Registry information for a package spec
    async fn view(&self, spec: &str) -> Result<String, NpmError>;

    /// Install a package under `prefix` so its dependencies nest inside its own directory
    async fn install(&self, spec: &str, prefix: &Path, flags: &[String]) -> Result<(), NpmError>;

    /// Pack an installed package directory, returning the tarballs created in `destination`
    async fn pack(&self, package_dir: &Path, destination: &Path) -> Result<Vec<PathBuf>, NpmError>;
}

/// Package name of a spec, without its version or range
///
/// `@scope/name@^1.0.0` becomes `@scope/name`, `left-pad@1.3.0` becomes `left-pad`.
pub fn package_name(spec: &str) -> &str {
    let search_from = usize::from(spec.starts_with('@'));
    match spec[search_from..].find('@') {
        Some(index) => &spec[..search_from + index],
        None => spec,
    }
}

/// Directory an installed package lives in under the install prefix
pub fn installed_package_dir(prefix: &Path, spec: &str) -> PathBuf {
    sanitize_package_name(package_name(spec))
        .split('/')
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .fold(prefix.join("node_modules"), |dir, part| dir.join(part))
}
