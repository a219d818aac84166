use std::{
    env,
    path::{Path, PathBuf},
};

use etcetera::BaseStrategy;

const CONFIG_DIR: &str = "jqbuild";

pub const CONFIG_FILE: &str = "jqbuild.toml";

/// `jqbuild.toml` inside the per-user configuration directory
/// (`XDG_CONFIG_HOME` or `~/.config` on Unix, `AppData\Roaming` on Windows).
pub fn user_config_file() -> Option<PathBuf> {
    let strategy = etcetera::choose_base_strategy().ok()?;
    Some(strategy.config_dir().join(CONFIG_DIR).join(CONFIG_FILE))
}

#[cfg(not(windows))]
fn find_in_xdg_config_dirs(value: Option<&str>) -> Option<PathBuf> {
    let config_dirs = value.filter(|s| !s.is_empty()).unwrap_or("/etc/xdg");

    config_dirs
        .split(':')
        .take_while(|s| !s.is_empty())
        .map(|dir| Path::new(dir).join(CONFIG_DIR).join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

/// Machine-wide configuration file, if one exists.
///
/// Unix: first match in `XDG_CONFIG_DIRS` (default `/etc/xdg`), then
/// `/etc/jqbuild/jqbuild.toml`. Windows: `%SYSTEMDRIVE%\ProgramData\jqbuild\jqbuild.toml`.
pub fn system_config_file() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        let drive = env::var("SYSTEMDRIVE").ok()?;
        let candidate = Path::new(&drive)
            .join("ProgramData")
            .join(CONFIG_DIR)
            .join(CONFIG_FILE);
        candidate.is_file().then_some(candidate)
    }

    #[cfg(not(windows))]
    {
        let xdg_config_dirs = env::var("XDG_CONFIG_DIRS").ok();
        if let Some(path) = find_in_xdg_config_dirs(xdg_config_dirs.as_deref()) {
            return Some(path);
        }

        let candidate = Path::new("/etc").join(CONFIG_DIR).join(CONFIG_FILE);
        match candidate.try_exists() {
            Ok(true) => Some(candidate),
            Ok(false) => None,
            Err(err) => {
                log::warn!("Failed to query system configuration file: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    #[cfg(not(windows))]
    fn test_find_in_xdg_config_dirs() -> anyhow::Result<()> {
        let context = TempDir::new()?;
        let config_dir = context.path().join(CONFIG_DIR);
        fs::create_dir_all(&config_dir)?;
        fs::write(config_dir.join(CONFIG_FILE), "source-root = \"src\"\n")?;

        assert_eq!(find_in_xdg_config_dirs(Some("")), None);
        assert_eq!(find_in_xdg_config_dirs(Some(":")), None);

        let dirs = format!(
            "/nonexistent:{}",
            context.path().to_str().expect("path should be valid UTF-8")
        );
        assert_eq!(
            find_in_xdg_config_dirs(Some(&dirs)),
            Some(config_dir.join(CONFIG_FILE))
        );

        Ok(())
    }
}
