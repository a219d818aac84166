use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use cow_utils::CowUtils;
use indexmap::IndexSet;
use log::{debug, error, info};
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::bundle_config::build_config;
use crate::config::Config;
use crate::engine::{BundleConfig, BundleEngine};
use crate::exclusion::{ExclusionResolver, ResolvedModules};
use crate::minify::Minifier;
use crate::rewrite::AmdName;
use crate::vcs::VersionControl;

pub const DEFAULT_DIR: &str = "dist";
pub const DEFAULT_FILENAME: &str = "jquery.js";

/// Replacement for the global export module when it is excluded: other
/// modules still reference `noConflict`.
const NO_CONFLICT_STUB: &str = "\n\njQuery.noConflict = function() {};";

/// One build request, consumed by [`BuildOrchestrator::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// AMD registration name for the export module
    pub amd: Option<AmdName>,
    pub dir: PathBuf,
    pub exclude: Vec<String>,
    pub filename: String,
    pub include: Vec<String>,
    pub slim: bool,
    /// Derived from git when absent
    pub version: Option<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            amd: None,
            dir: PathBuf::from(DEFAULT_DIR),
            exclude: Vec::new(),
            filename: DEFAULT_FILENAME.to_owned(),
            include: Vec::new(),
            slim: false,
            version: None,
        }
    }
}

/// A bundle written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltArtifact {
    pub path: PathBuf,
    pub version: String,
    pub modules: ResolvedModules,
}

/// `@DATE` value: ISO-8601 in UTC, truncated to minutes.
pub fn build_date(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%MZ").to_string()
}

/// Embed the version and build date into the compiled bundle.
pub fn stamp(compiled: &str, version: &str, date: &str) -> String {
    compiled
        .cow_replace("@VERSION", version)
        .cow_replace("@DATE", date)
        .into_owned()
}

/// Entry module definition depending on exactly `included`.
fn entry_definition(included: &IndexSet<String>) -> String {
    let dependencies = included
        .iter()
        .map(|module| format!("\t\"./{}\"", module))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("define( [\n{}\n] );", dependencies)
}

pub struct BuildOrchestrator<'a> {
    config: &'a Config,
    engine: &'a dyn BundleEngine,
    vcs: &'a dyn VersionControl,
    minifier: &'a dyn Minifier,
}

impl fmt::Debug for BuildOrchestrator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> BuildOrchestrator<'a> {
    pub fn new(
        config: &'a Config,
        engine: &'a dyn BundleEngine,
        vcs: &'a dyn VersionControl,
        minifier: &'a dyn Minifier,
    ) -> Self {
        Self {
            config,
            engine,
            vcs,
            minifier,
        }
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    fn resolve_version(&self, options: &BuildOptions) -> Result<String> {
        if let Some(version) = &options.version {
            return Ok(if options.slim {
                format!("{}+slim", version)
            } else {
                version.clone()
            });
        }

        let hash = self
            .vcs
            .short_commit_hash()
            .context("Failed to read the current commit hash")?;
        let is_clean = self
            .vcs
            .is_working_dir_clean()
            .context("Failed to check the working directory status")?;

        // "+[slim.]SHA" is build metadata in semver terms
        Ok(format!(
            "{}+{}{}{}",
            self.config.base_version,
            if options.slim { "slim." } else { "" },
            hash,
            if is_clean { "" } else { ".dirty" }
        ))
    }

    /// Modules that are excluded but must not simply vanish get replacement
    /// sources instead.
    fn apply_replacements(&self, resolved: &mut ResolvedModules, bundle_config: &mut BundleConfig) {
        if resolved.excluded.shift_remove(&self.config.global_module) {
            debug!("Replacing {} with a noConflict stub", self.config.global_module);
            bundle_config
                .raw_text
                .insert(self.config.global_module.clone(), NO_CONFLICT_STUB.to_owned());
        }

        let selector_excluded = self
            .config
            .selector_modules
            .iter()
            .any(|module| resolved.excluded.contains(module));
        if let (true, Some(selector)) = (selector_excluded, self.config.selector_modules.first()) {
            debug!(
                "Delegating {} to {}",
                selector, self.config.native_selector
            );
            bundle_config.raw_text.insert(
                selector.clone(),
                format!("define( [ \"./{}\" ] );", self.config.native_selector),
            );
        }
    }

    /// Build one bundle and minify it.
    pub fn build(&self, options: BuildOptions) -> Result<BuiltArtifact> {
        let mut version = self.resolve_version(&options)?;
        debug!("Building {} as v{}", options.filename, version);

        fs::create_dir_all(&options.dir)
            .with_context(|| format!("Failed to create output directory {:?}", options.dir))?;

        let mut exclude = options.exclude.clone();
        if options.slim {
            exclude.extend(self.config.slim_exclude.iter().cloned());
        }

        let mut resolved = ExclusionResolver::new(self.config).resolve(&exclude, &options.include)?;
        let mut bundle_config = build_config(self.config, options.amd.clone())?;

        self.apply_replacements(&mut resolved, &mut bundle_config);

        if !resolved.excluded.is_empty() {
            version.push_str(" -");
            version.push_str(&resolved.excluded.iter().cloned().collect::<Vec<_>>().join(",-"));

            // Excluding deeply would drop the entry too, since it depends on
            // every top-level module
            bundle_config.exclude_shallow = resolved.excluded.clone();
        }

        if !resolved.included.is_empty() {
            version.push_str(" +");
            version.push_str(&resolved.included.iter().cloned().collect::<Vec<_>>().join(",+"));

            bundle_config.include = resolved.included.clone();
            bundle_config
                .raw_text
                .insert(self.config.entry.clone(), entry_definition(&resolved.included));
        }

        let output_path = options.dir.join(&options.filename);
        let target = output_path.clone();
        let stamped_version = version.clone();
        bundle_config.out = Some(Box::new(move |compiled: &str| {
            let contents = stamp(compiled, &stamped_version, &build_date(Utc::now()));
            fs::write(&target, contents).with_context(|| format!("Failed to write {:?}", target))
        }));

        if let Err(err) = self.engine.optimize(&bundle_config) {
            error!("{:#}", err);
            return Err(err.context(format!("Failed to bundle {}", options.filename)));
        }

        info!(
            "[{}] {} v{} created.",
            Local::now().format("%H:%M:%S"),
            options.filename,
            version
        );

        self.minifier
            .minify(&options.dir, &options.filename)
            .with_context(|| format!("Failed to minify {}", options.filename))?;

        Ok(BuiltArtifact {
            path: output_path,
            version,
            modules: resolved,
        })
    }
}
