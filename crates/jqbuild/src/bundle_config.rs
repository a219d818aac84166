use anyhow::{Context, Result, anyhow};
use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::sync::Arc;

use crate::config::Config;
use crate::engine::{BundleConfig, Wrap};
use crate::rewrite::{AmdName, Rewriter};
use crate::util::normalize_line_endings;

/// `// @CODE` and any comment lines right after it, even when indented
static CODE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x20\t]*// @CODE\n(?:[\x20\t]*//[^\n]+\n)*")
        .expect("Invalid regex pattern for @CODE marker")
});

static ESLINT_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/\*\s*eslint(?: |-).*\s*\*/\n").expect("Invalid regex pattern for eslint comment")
});

/// Split the wrapper template into the text before and after the bundled code.
pub fn split_wrapper(template: &str) -> Result<Wrap> {
    let template = normalize_line_endings(template);
    let mut parts = CODE_MARKER.splitn(&template, 2);
    let start = parts.next().unwrap_or_default();
    let end = parts
        .next()
        .ok_or_else(|| anyhow!("Wrapper template has no `// @CODE` marker"))?;

    Ok(Wrap {
        start: ESLINT_DIRECTIVE.replace(start, "").into_owned(),
        end: end.to_owned(),
    })
}

/// Bundler configuration shared by every build; the orchestrator fills in
/// raw text, inclusions, exclusions and the output hook afterwards.
pub fn build_config(config: &Config, amd: Option<AmdName>) -> Result<BundleConfig> {
    let wrapper_path = config.source_root.join(format!("{}.js", config.wrapper));
    let template = fs::read_to_string(&wrapper_path)
        .with_context(|| format!("Failed to read wrapper template {:?}", wrapper_path))?;
    let wrap = split_wrapper(&template)
        .with_context(|| format!("Invalid wrapper template {:?}", wrapper_path))?;

    let rewriter = Rewriter::new(config, amd);

    Ok(BundleConfig {
        name: config.entry.clone(),
        base_url: config.source_root.clone(),
        use_strict: true,
        optimize: false,
        find_nested_dependencies: true,
        wrap,
        raw_text: IndexMap::new(),
        include: IndexSet::new(),
        exclude_shallow: IndexSet::new(),
        on_build_write: Some(Arc::new(move |name: &str, path: &str, contents: &str| {
            rewriter.rewrite(name, path, contents)
        })),
        out: None,
    })
}
