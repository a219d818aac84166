use cow_utils::CowUtils;
use std::path::{Component, Path};

/// Convert a path relative to the source root into a module identifier:
/// extension stripped, components joined with `/` regardless of host separator.
pub fn module_id_from_relative(relative_path: &Path) -> Option<String> {
    let stem_path = relative_path.with_extension("");
    let parts: Vec<String> = stem_path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        return None;
    }

    Some(parts.join("/"))
}

/// Convert a file system path to a module identifier.
/// Strips the `source_root` prefix before processing.
pub fn path_to_module_id(source_root: &Path, file_path: &Path) -> Option<String> {
    let relative_path = file_path.strip_prefix(source_root).ok()?;
    module_id_from_relative(relative_path)
}

/// Resolve a dependency reference such as `./core` or `../var/arr` against the
/// identifier of the module that declares it.
///
/// Non-relative references are already root-relative identifiers and are
/// returned unchanged.
pub fn resolve_module_ref(from_module: &str, reference: &str) -> String {
    if !reference.starts_with("./") && !reference.starts_with("../") {
        return reference.to_owned();
    }

    let mut parts: Vec<&str> = from_module.split('/').collect();
    // Drop the module's own name, leaving its directory
    parts.pop();

    for segment in reference.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    parts.join("/")
}

/// Normalize line endings to LF (\n) for cross-platform consistency
/// This ensures reproducible builds regardless of the platform where bundling occurs
pub fn normalize_line_endings(content: &str) -> String {
    content
        .cow_replace("\r\n", "\n")
        .cow_replace('\r', "\n")
        .into_owned()
}
