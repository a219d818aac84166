use log::{debug, trace};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::util::path_to_module_id;

/// Lists module identifiers found on disk below the source root.
#[derive(Debug, Clone)]
pub struct SourceTree {
    root: PathBuf,
}

impl SourceTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Recursively list every module under `subdir`.
    ///
    /// A module name without a directory of the same name simply has no
    /// sub-files, so a missing `subdir` yields an empty list.
    pub fn list_modules(&self, subdir: &str) -> Vec<String> {
        let dir = self.root.join(subdir);
        if !dir.is_dir() {
            trace!("No subtree for {:?}, nothing to expand", dir);
            return Vec::new();
        }

        let mut modules = Vec::new();
        for entry in WalkDir::new(&dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(module_id) = path_to_module_id(&self.root, entry.path()) {
                modules.push(module_id);
            }
        }

        debug!("Scanned {} module(s) under {:?}", modules.len(), subdir);
        modules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().expect("fixture path has a parent"))
            .expect("create fixture dir");
        fs::write(path, "define(function() {});\n").expect("write fixture file");
    }

    #[test]
    fn test_list_modules_recurses_with_forward_slashes() {
        let temp = TempDir::new().expect("temp dir");
        touch(temp.path(), "css/showHide.js");
        touch(temp.path(), "css/var/isHidden.js");
        touch(temp.path(), "css/adjustCSS.js");
        touch(temp.path(), "ajax.js");

        let tree = SourceTree::new(temp.path());
        assert_eq!(
            tree.list_modules("css"),
            vec!["css/adjustCSS", "css/showHide", "css/var/isHidden"]
        );
    }

    #[test]
    fn test_list_modules_missing_dir_is_empty() {
        let temp = TempDir::new().expect("temp dir");
        touch(temp.path(), "wrap.js");

        let tree = SourceTree::new(temp.path());
        assert!(tree.list_modules("wrap").is_empty());
        assert!(tree.list_modules("does/not/exist").is_empty());
    }

    #[test]
    fn test_list_modules_is_deterministic() {
        let temp = TempDir::new().expect("temp dir");
        for name in ["b.js", "a.js", "nested/c.js", "nested/deeper/d.js"] {
            touch(&temp.path().join("event"), name);
        }

        let tree = SourceTree::new(temp.path());
        assert_eq!(tree.list_modules("event"), tree.list_modules("event"));
    }
}
