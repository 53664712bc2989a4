//! Dependency selection flags

use crate::npm::DependencyKind;
use clap::Args;

/// Which dependencies get bundled into each tarball
///
/// The flags mirror `npm install`'s save flags. Larger sets imply the
/// smaller ones: `-D` adds production dependencies, `-O` adds production and
/// development dependencies, `--save-peer` adds production dependencies.
#[derive(Debug, Args, Clone, Default, PartialEq, Eq)]
pub struct DependencyArgs {
    /// Bundle production dependencies (the default)
    #[arg(short = 'P', long)]
    pub save_prod: bool,

    /// Bundle development dependencies (implies -P)
    #[arg(short = 'D', long)]
    pub save_dev: bool,

    /// Bundle optional dependencies (implies -P -D)
    #[arg(short = 'O', long)]
    pub save_optional: bool,

    /// Bundle peer dependencies (implies -P)
    #[arg(long)]
    pub save_peer: bool,

    /// Only keep what the package already lists in bundleDependencies
    #[arg(short = 'B', long)]
    pub save_bundle: bool,
}

impl DependencyArgs {
    /// Whether any selection flag was given
    pub fn is_set(&self) -> bool {
        self.save_prod || self.save_dev || self.save_optional || self.save_peer || self.save_bundle
    }

    /// Dependency kinds selected on the command line, `None` when no flag was given
    pub fn kinds(&self) -> Option<Vec<DependencyKind>> {
        if !self.is_set() {
            return None;
        }

        let mut kinds = Vec::new();
        if self.save_prod || self.save_dev || self.save_optional || self.save_peer {
            kinds.push(DependencyKind::Prod);
        }
        if self.save_dev || self.save_optional {
            kinds.push(DependencyKind::Dev);
        }
        if self.save_optional {
            kinds.push(DependencyKind::Optional);
        }
        if self.save_peer {
            kinds.push(DependencyKind::Peer);
        }
        Some(kinds)
    }
}
