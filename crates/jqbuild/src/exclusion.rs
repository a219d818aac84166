use indexmap::{IndexMap, IndexSet};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::scanner::SourceTree;

/// What else happens when a module with an override entry is excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Override {
    /// Additional modules to exclude
    Simple(Vec<String>),
    /// Modules to exclude as well, plus replacement modules to pull in
    RemoveInclude {
        remove: Vec<String>,
        #[serde(default)]
        include: Vec<String>,
    },
}

impl Override {
    pub fn remove(&self) -> &[String] {
        match self {
            Self::Simple(remove) | Self::RemoveInclude { remove, .. } => remove,
        }
    }

    pub fn include(&self) -> &[String] {
        match self {
            Self::Simple(_) => &[],
            Self::RemoveInclude { include, .. } => include,
        }
    }
}

/// Static table of cross-module exclusion rules, keyed by module identifier.
///
/// Values never name their own key, and removal chains never loop back to
/// a key being expanded. `Config::validate` checks both at load time.
pub type OverrideTable = IndexMap<String, Override>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Module \"{0}\" is a minimum requirement.")]
    MinimumRequirement(String),
    #[error("Override table loops back to module \"{0}\".")]
    OverrideCycle(String),
}

/// Closed, duplicate-free exclude/include sets, in resolution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedModules {
    pub excluded: IndexSet<String>,
    pub included: IndexSet<String>,
}

#[derive(Debug)]
pub struct ExclusionResolver<'a> {
    tree: SourceTree,
    config: &'a Config,
}

impl<'a> ExclusionResolver<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            tree: SourceTree::new(&config.source_root),
            config,
        }
    }

    /// Expand the requested exclusions into everything they imply.
    ///
    /// Fails without a partial result as soon as a minimum module is hit,
    /// whether requested directly or reached through the override table.
    pub fn resolve(
        &self,
        exclude: &[String],
        include: &[String],
    ) -> Result<ResolvedModules, ResolveError> {
        let resolved = self.expand(exclude, include, &mut Vec::new())?;
        debug!(
            "Resolved {} excluded and {} included module(s)",
            resolved.excluded.len(),
            resolved.included.len()
        );
        Ok(resolved)
    }

    /// `expanding` holds the override keys on the current recursion path.
    fn expand(
        &self,
        exclude: &[String],
        include: &[String],
        expanding: &mut Vec<String>,
    ) -> Result<ResolvedModules, ResolveError> {
        let mut excluded: IndexSet<String> = exclude.iter().cloned().collect();
        let mut included: IndexSet<String> = include.iter().cloned().collect();

        // Only the request itself is walked; scanned descendants never
        // consult the override table.
        for module in exclude {
            if self.config.minimum.contains(module) {
                return Err(ResolveError::MinimumRequirement(module.clone()));
            }
            info!("-{}", module);

            // The selector aliases are swapped for the native selector
            // elsewhere and share files with it, so their dir stays.
            if !self.config.selector_modules.contains(module) {
                excluded.extend(self.tree.list_modules(module));
            }

            if let Some(additional) = self.config.overrides.get(module) {
                if !additional.include().is_empty() {
                    info!("+{}", additional.include().join(",+"));
                }
                if expanding.contains(module) {
                    return Err(ResolveError::OverrideCycle(module.clone()));
                }
                expanding.push(module.clone());
                let nested = self.expand(additional.remove(), additional.include(), expanding)?;
                expanding.pop();
                excluded.extend(nested.excluded);
                included.extend(nested.included);
            }
        }

        Ok(ResolvedModules { excluded, included })
    }
}
