//! Per-module source rewriting applied while the bundle is written.
//!
//! Every module arrives wrapped in an AMD `define(...)` call. The rewriter
//! strips that wrapper so modules can share one closure, turns modules living
//! in a `var` directory into plain `var` declarations, and honours the
//! exclusion comments authors put in the sources. All of it is fixed-pattern
//! text substitution on the known wrapper shapes.

use log::info;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::{Component, Path, PathBuf};

use crate::config::Config;
use crate::util::normalize_line_endings;

/// Everything from `define(` up to the first `return` of a var module
static VAR_DEFINE_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"define\([\w\W]*?return").expect("Invalid regex pattern for var module header")
});

/// Closing of a var module: the returned expression's `;` and `})`
static VAR_DEFINE_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r";?\s*\}\s*?\);?[^}\w]*$").expect("Invalid regex pattern for var module end")
});

/// Leading `define( [...], function( ... ) {` plus an optional strict mode
/// pragma. Nested `define(` calls further down are module code.
static DEFINE_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*define\([^{]*?\{\s*(?:(?:"use strict"|'use strict');?)?"#)
        .expect("Invalid regex pattern for define header")
});

static DEFINE_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\}\s*?\);?[^}\w]*$").expect("Invalid regex pattern for define end")
});

/// A trailing `return <expr>` right before the closing `});`
static TRAILING_RETURN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*return\s+[^}]+(\}\s*?\);?[^\w}]*)$")
        .expect("Invalid regex pattern for trailing return")
});

static NAMED_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*exports\.\w+\s*=\s*\w+;").expect("Invalid regex pattern for named exports")
});

static EXCLUDE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)/\*\s*ExcludeStart\s*\*/[\w\W]*?/\*\s*ExcludeEnd\s*\*/")
        .expect("Invalid regex pattern for ExcludeStart/ExcludeEnd")
});

static BUILD_EXCLUDE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)//\s*BuildExclude\n\r?[\w\W]*?\n\r?")
        .expect("Invalid regex pattern for BuildExclude")
});

/// Dependency-only definitions such as `define( [ "./a" ] );`
static EMPTY_DEFINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"define\(\s*\[[^\]]*\]\s*\)[\W\n]+$")
        .expect("Invalid regex pattern for empty definitions")
});

/// Requested AMD registration name for the export module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmdName {
    /// Register an anonymous module
    Anonymous,
    Named(String),
}

impl AmdName {
    /// An empty name asks for an anonymous registration.
    pub fn parse(value: &str) -> Self {
        if value.is_empty() {
            Self::Anonymous
        } else {
            Self::Named(value.to_owned())
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rewriter {
    source_root: PathBuf,
    var_dir: String,
    amd_module: String,
    amd_literal: Regex,
    amd: Option<AmdName>,
}

impl Rewriter {
    pub fn new(config: &Config, amd: Option<AmdName>) -> Self {
        let amd_literal = Regex::new(&format!(
            r#"(\s*)"{}"(,\s*)"#,
            regex::escape(&config.amd_default_name)
        ))
        .expect("escaped AMD name is a valid pattern");

        Self {
            source_root: config.source_root.clone(),
            var_dir: config.var_dir.clone(),
            amd_module: config.amd_module.clone(),
            amd_literal,
            amd,
        }
    }

    /// Rewrite one wrapped module into its flat, concatenable form.
    pub fn rewrite(&self, module_name: &str, module_path: &str, contents: &str) -> String {
        let contents = normalize_line_endings(contents);

        let contents = if self.is_var_module(module_path) {
            Self::convert_var_module(module_name, &contents)
        } else {
            Self::strip_definition(&contents)
        };

        match &self.amd {
            Some(amd) if module_name == self.amd_module => self.rename_amd(amd, &contents),
            _ => contents,
        }
    }

    fn is_var_module(&self, module_path: &str) -> bool {
        let path = Path::new(module_path);
        let relative = path.strip_prefix(&self.source_root).unwrap_or(path);
        relative.parent().is_some_and(|parent| {
            parent
                .components()
                .any(|c| matches!(c, Component::Normal(part) if part == self.var_dir.as_str()))
        })
    }

    fn convert_var_module(module_name: &str, contents: &str) -> String {
        let name = module_name.rsplit('/').next().unwrap_or(module_name);
        let declaration = format!("var {} =", name);
        let contents = VAR_DEFINE_START.replace(contents, regex::NoExpand(&declaration));
        VAR_DEFINE_END.replace(&contents, "").into_owned()
    }

    fn strip_definition(contents: &str) -> String {
        let mut contents = contents.to_owned();

        // Only text still starting with its wrapper is stripped
        if DEFINE_HEADER.is_match(&contents) {
            contents = TRAILING_RETURN.replace(&contents, "$1").into_owned();
            contents = NAMED_EXPORT.replace_all(&contents, "").into_owned();
            contents = DEFINE_HEADER.replace(&contents, "").into_owned();
            contents = DEFINE_END.replace(&contents, "").into_owned();
        }

        contents = EXCLUDE_BLOCK.replace_all(&contents, "").into_owned();
        contents = BUILD_EXCLUDE.replace_all(&contents, "").into_owned();
        EMPTY_DEFINE.replace(&contents, "").into_owned()
    }

    fn rename_amd(&self, amd: &AmdName, contents: &str) -> String {
        match amd {
            AmdName::Named(name) => {
                info!("Naming jQuery with AMD name: {}", name);
                self.amd_literal
                    .replace(contents, |caps: &Captures<'_>| {
                        format!("{}\"{}\"{}", &caps[1], name, &caps[2])
                    })
                    .into_owned()
            }
            AmdName::Anonymous => {
                info!("AMD name now anonymous");
                self.amd_literal.replace(contents, "").into_owned()
            }
        }
    }
}
