use anyhow::{Context, Result};
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::compare_size::{SizeReport, compare_size};
use crate::minify::minified_name;
use crate::orchestrator::{BuildOptions, BuildOrchestrator, BuiltArtifact, DEFAULT_FILENAME};

pub const SLIM_FILENAME: &str = "jquery.slim.js";

/// Outcome of building both distributions.
#[derive(Debug, Clone)]
pub struct VariantBuild {
    pub standard: BuiltArtifact,
    pub slim: BuiltArtifact,
    /// Absent when the minified files were not produced or could not be read
    pub sizes: Option<SizeReport>,
}

/// Build the standard and slim bundles concurrently into `dir`, then compare
/// the sizes of their minified versions.
///
/// Both builds share `version` when one is given. A failed size comparison
/// is only reported.
pub fn build_all(
    orchestrator: &BuildOrchestrator<'_>,
    dir: &Path,
    version: Option<String>,
) -> Result<VariantBuild> {
    let standard_options = BuildOptions {
        dir: dir.to_path_buf(),
        filename: DEFAULT_FILENAME.to_owned(),
        version: version.clone(),
        ..BuildOptions::default()
    };
    let slim_options = BuildOptions {
        dir: dir.to_path_buf(),
        filename: SLIM_FILENAME.to_owned(),
        slim: true,
        version,
        ..BuildOptions::default()
    };

    let (standard, slim) = rayon::join(
        || orchestrator.build(standard_options),
        || orchestrator.build(slim_options),
    );
    let standard = standard.context("Standard build failed")?;
    let slim = slim.context("Slim build failed")?;

    let minified: Vec<PathBuf> = [DEFAULT_FILENAME, SLIM_FILENAME]
        .iter()
        .map(|filename| dir.join(minified_name(filename)))
        .collect();

    let sizes = if minified.iter().all(|path| path.is_file()) {
        match compare_size(&minified) {
            Ok(report) => {
                info!("Sizes:\n{}", report);
                Some(report)
            }
            Err(err) => {
                warn!("Size comparison failed: {:#}", err);
                None
            }
        }
    } else {
        info!("Minified bundles missing, skipping size comparison");
        None
    };

    Ok(VariantBuild {
        standard,
        slim,
        sizes,
    })
}
