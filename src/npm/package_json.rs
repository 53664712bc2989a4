//! package.json reading and bundling

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PACKAGE_JSON: &str = "package.json";

/// Kind of dependency listed in a package.json
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Prod,
    Dev,
    Optional,
    Peer,
}

impl DependencyKind {
    /// package.json field holding this kind
    pub fn field(self) -> &'static str {
        match self {
            DependencyKind::Prod => "dependencies",
            DependencyKind::Dev => "devDependencies",
            DependencyKind::Optional => "optionalDependencies",
            DependencyKind::Peer => "peerDependencies",
        }
    }

    /// Remove repeats, keeping first-seen order
    pub fn dedup(kinds: &[DependencyKind]) -> Vec<DependencyKind> {
        let mut seen = BTreeSet::new();
        kinds.iter().copied().filter(|kind| seen.insert(*kind)).collect()
    }
}

#[derive(Debug, Error)]
pub enum PackageJsonError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// `bundleDependencies` is either a list of names or `true` for every production dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BundleList {
    All(bool),
    Names(Vec<String>),
}

/// The parts of a package.json this tool reads and edits
///
/// Fields it does not know about are kept in `extra` and written back as they were.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dev_dependencies: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub optional_dependencies: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub peer_dependencies: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_dependencies: Option<BundleList>,

    /// Legacy spelling, folded into `bundle_dependencies` by [`PackageJson::bundle`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundled_dependencies: Option<BundleList>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PackageJson {
    /// Read `<dir>/package.json`
    pub async fn read(dir: &Path) -> Result<Self, PackageJsonError> {
        let path = dir.join(PACKAGE_JSON);
        let content = tokio::fs::read_to_string(&path).await.map_err(|source| PackageJsonError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| PackageJsonError::Parse { path, source })
    }

    /// Write `<dir>/package.json`, pretty-printed with a trailing newline
    pub async fn write(&self, dir: &Path) -> Result<(), PackageJsonError> {
        let path = dir.join(PACKAGE_JSON);
        let mut content = serde_json::to_string_pretty(self).map_err(|source| PackageJsonError::Parse {
            path: path.clone(),
            source,
        })?;
        content.push('\n');
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| PackageJsonError::Write { path, source })
    }

    pub fn dependencies_of(&self, kind: DependencyKind) -> &BTreeMap<String, String> {
        match kind {
            DependencyKind::Prod => &self.dependencies,
            DependencyKind::Dev => &self.dev_dependencies,
            DependencyKind::Optional => &self.optional_dependencies,
            DependencyKind::Peer => &self.peer_dependencies,
        }
    }

    /// Names already marked for bundling, under either spelling
    pub fn bundled_names(&self) -> BTreeSet<String> {
        [&self.bundle_dependencies, &self.bundled_dependencies]
            .into_iter()
            .flatten()
            .flat_map(|list| match list {
                BundleList::All(true) => self.dependencies.keys().cloned().collect::<Vec<_>>(),
                BundleList::All(false) => Vec::new(),
                BundleList::Names(names) => names.clone(),
            })
            .collect()
    }

    /// Mark every dependency of the given kinds for bundling
    ///
    /// Returns the resulting `bundleDependencies` list.
    pub fn bundle(&mut self, kinds: &[DependencyKind]) -> Vec<String> {
        let mut names = self.bundled_names();
        for kind in kinds {
            names.extend(self.dependencies_of(*kind).keys().cloned());
        }
        let names: Vec<String> = names.into_iter().collect();

        self.bundled_dependencies = None;
        self.bundle_dependencies = Some(BundleList::Names(names.clone()));
        names
    }
}
