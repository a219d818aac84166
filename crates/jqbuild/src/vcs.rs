use anyhow::{Context, Result, anyhow};
use log::trace;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Source control queries used to stamp development builds.
pub trait VersionControl: Send + Sync {
    fn short_commit_hash(&self) -> Result<String>;

    /// Tracked files have no uncommitted changes
    fn is_working_dir_clean(&self) -> Result<bool>;
}

/// Shells out to the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_dir: PathBuf,
}

impl GitCli {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        trace!("Running git {:?} in {:?}", args, self.repo_dir);
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .with_context(|| format!("Failed to run git {}", args.join(" ")))?;

        if !output.status.success() {
            return Err(anyhow!(
                "git {} failed ({}): {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(".")
    }
}

impl VersionControl for GitCli {
    fn short_commit_hash(&self) -> Result<String> {
        let hash = self.git(&["rev-parse", "--short", "HEAD"])?;
        Ok(hash.trim().to_owned())
    }

    fn is_working_dir_clean(&self) -> Result<bool> {
        let status = self.git(&["status", "--untracked-files=no", "--porcelain"])?;
        Ok(status.trim().is_empty())
    }
}
