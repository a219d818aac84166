use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::Config;

/// Name of the minified sibling of a bundle: `jquery.js` -> `jquery.min.js`.
pub fn minified_name(filename: &str) -> String {
    let stem = filename.strip_suffix(".js").unwrap_or(filename);
    format!("{}.min.js", stem)
}

pub trait Minifier: Send + Sync {
    /// Minify `dir/filename` into `dir/<stem>.min.js`; returns the path written,
    /// or `None` when minification is switched off.
    fn minify(&self, dir: &Path, filename: &str) -> Result<Option<PathBuf>>;
}

/// Runs an external minifier command line.
///
/// `{input}` and `{output}` in the arguments are replaced with the bundle
/// and the minified file paths.
#[derive(Debug, Clone)]
pub struct CommandMinifier {
    program: String,
    args: Vec<String>,
}

impl CommandMinifier {
    pub fn new(argv: &[String]) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("Minifier command line is empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl Minifier for CommandMinifier {
    fn minify(&self, dir: &Path, filename: &str) -> Result<Option<PathBuf>> {
        let input = dir.join(filename);
        let output_path = dir.join(minified_name(filename));
        let input_str = input.to_string_lossy();
        let output_str = output_path.to_string_lossy();

        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input_str)
                    .replace("{output}", &output_str)
            })
            .collect();

        debug!("Minifying {:?} with {} {:?}", input, self.program, args);
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .with_context(|| format!("Failed to run minifier {:?}", self.program))?;

        if !output.status.success() {
            return Err(anyhow!(
                "Minifier {:?} failed on {:?} ({}): {}",
                self.program,
                input,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        Ok(Some(output_path))
    }
}

/// Used when no minifier is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMinifier;

impl Minifier for NoopMinifier {
    fn minify(&self, dir: &Path, filename: &str) -> Result<Option<PathBuf>> {
        warn!(
            "No minifier configured, skipping {:?}",
            dir.join(filename)
        );
        Ok(None)
    }
}

/// Minifier selected by the `minifier` setting.
pub fn from_config(config: &Config) -> Result<Box<dyn Minifier>> {
    if config.minifier.is_empty() {
        Ok(Box::new(NoopMinifier))
    } else {
        Ok(Box::new(CommandMinifier::new(&config.minifier)?))
    }
}
