use anyhow::{Context, Result, anyhow};
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};
use once_cell::sync::Lazy;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::util::{normalize_line_endings, resolve_module_ref};

/// Per-module hook: `(module name, module path, contents) -> contents`
pub type BuildWriteHook = Arc<dyn Fn(&str, &str, &str) -> String + Send + Sync>;

/// Receives the final concatenated bundle
pub type OutputHook = Box<dyn Fn(&str) -> Result<()> + Send + Sync>;

static DEFINE_DEPENDENCIES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"define\(\s*(?:["'][^"']*["']\s*,\s*)?\[([^\]]*)\]"#)
        .expect("Invalid regex pattern for define dependencies")
});

static REQUIRE_DEPENDENCIES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"require\(\s*\[([^\]]*)\]").expect("Invalid regex pattern for require dependencies")
});

static STRING_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"["']([^"']+)["']"#).expect("Invalid regex pattern for string literals")
});

static STRICT_PRAGMA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"["']use strict["'];?"#).expect("Invalid regex pattern for strict pragma")
});

/// Pseudo-dependencies provided by the AMD loader itself
const LOADER_DEPENDENCIES: [&str; 3] = ["require", "exports", "module"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wrap {
    pub start: String,
    pub end: String,
}

/// Everything the bundling engine needs for one bundle.
pub struct BundleConfig {
    /// Entry module
    pub name: String,
    /// Directory module identifiers are resolved against
    pub base_url: PathBuf,
    /// Keep `"use strict"` pragmas in module sources
    pub use_strict: bool,
    /// Minification is a separate step, so this stays off for builds
    pub optimize: bool,
    /// Also trace `require([...])` calls inside module bodies
    pub find_nested_dependencies: bool,
    pub wrap: Wrap,
    /// Literal sources used instead of the files on disk
    pub raw_text: IndexMap<String, String>,
    /// Extra roots traced after the entry module
    pub include: IndexSet<String>,
    /// Modules left out of the output without dropping their dependencies
    pub exclude_shallow: IndexSet<String>,
    pub on_build_write: Option<BuildWriteHook>,
    pub out: Option<OutputHook>,
}

impl fmt::Debug for BundleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleConfig")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("use_strict", &self.use_strict)
            .field("optimize", &self.optimize)
            .field("find_nested_dependencies", &self.find_nested_dependencies)
            .field("wrap", &self.wrap)
            .field("raw_text", &self.raw_text.keys().collect::<Vec<_>>())
            .field("include", &self.include)
            .field("exclude_shallow", &self.exclude_shallow)
            .field("on_build_write", &self.on_build_write.is_some())
            .field("out", &self.out.is_some())
            .finish()
    }
}

pub trait BundleEngine: Send + Sync {
    /// Produce the bundle described by `config`, hand it to `config.out`
    /// when set, and return it.
    fn optimize(&self, config: &BundleConfig) -> Result<String>;
}

#[derive(Debug)]
struct TracedModule {
    id: String,
    path: PathBuf,
    /// None for a shallow-excluded module with no source on disk
    source: Option<String>,
}

/// Dependency graph of the modules reachable from the bundle roots.
#[derive(Debug, Default)]
struct ModuleGraph {
    graph: DiGraph<TracedModule, ()>,
    node_indices: HashMap<String, NodeIndex>,
}

impl ModuleGraph {
    fn trace(config: &BundleConfig) -> Result<(Self, Vec<NodeIndex>)> {
        let mut module_graph = Self::default();
        let mut roots = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for root in std::iter::once(&config.name).chain(config.include.iter()) {
            let (index, is_new) = module_graph.load(config, root, None)?;
            roots.push(index);
            if is_new {
                pending.push(root.clone());
            }
        }

        while let Some(id) = pending.pop() {
            let from = module_graph.node_indices[&id];
            let dependencies = match &module_graph.graph[from].source {
                Some(source) => dependencies_of(&id, source, config.find_nested_dependencies),
                None => Vec::new(),
            };
            trace!("{} depends on {:?}", id, dependencies);

            for dependency in dependencies {
                let (to, is_new) = module_graph.load(config, &dependency, Some(&id))?;
                if !module_graph.graph.contains_edge(from, to) {
                    module_graph.graph.add_edge(from, to, ());
                }
                if is_new {
                    pending.push(dependency);
                }
            }
        }

        Ok((module_graph, roots))
    }

    /// Add `id` to the graph unless it is already there.
    fn load(
        &mut self,
        config: &BundleConfig,
        id: &str,
        required_by: Option<&str>,
    ) -> Result<(NodeIndex, bool)> {
        if let Some(&index) = self.node_indices.get(id) {
            return Ok((index, false));
        }

        let path = module_path(&config.base_url, id);
        let source = if let Some(raw) = config.raw_text.get(id) {
            Some(raw.clone())
        } else if path.is_file() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read module {:?}", path))?;
            Some(normalize_line_endings(&content))
        } else if config.exclude_shallow.contains(id) {
            None
        } else {
            return Err(match required_by {
                Some(parent) => anyhow!(
                    "Module \"{}\" required by \"{}\" not found at {:?}",
                    id,
                    parent,
                    path
                ),
                None => anyhow!("Module \"{}\" not found at {:?}", id, path),
            });
        };

        let index = self.graph.add_node(TracedModule {
            id: id.to_owned(),
            path,
            source,
        });
        self.node_indices.insert(id.to_owned(), index);
        Ok((index, true))
    }

    /// Dependencies first, in declaration order, each module once.
    fn emit_order(&self, roots: &[NodeIndex]) -> Vec<NodeIndex> {
        if is_cyclic_directed(&self.graph) {
            debug!("Module graph contains cycles; each module is still emitted once");
        }

        let mut order = Vec::with_capacity(self.graph.node_count());
        let Some(&first) = roots.first() else {
            return order;
        };

        let mut dfs = DfsPostOrder::new(&self.graph, first);
        for &root in roots {
            if dfs.finished.contains(root.index()) {
                continue;
            }
            dfs.move_to(root);
            while let Some(index) = dfs.next(&self.graph) {
                order.push(index);
            }
        }
        order
    }
}

fn module_path(base_url: &Path, id: &str) -> PathBuf {
    base_url.join(format!("{}.js", id))
}

/// Dependencies declared by a module, resolved to root-relative identifiers.
fn dependencies_of(id: &str, source: &str, nested: bool) -> Vec<String> {
    let mut lists: Vec<&str> = Vec::new();
    if let Some(captures) = DEFINE_DEPENDENCIES.captures(source) {
        lists.push(captures.get(1).map_or("", |m| m.as_str()));
    }
    if nested {
        lists.extend(
            REQUIRE_DEPENDENCIES
                .captures_iter(source)
                .filter_map(|captures| captures.get(1).map(|m| m.as_str())),
        );
    }

    let mut dependencies = IndexSet::new();
    for list in lists {
        for literal in STRING_LITERAL.captures_iter(list) {
            let reference = &literal[1];
            if LOADER_DEPENDENCIES.contains(&reference) {
                continue;
            }
            dependencies.insert(resolve_module_ref(id, reference));
        }
    }
    dependencies.into_iter().collect()
}

/// Join module sections with newlines.
///
/// Var modules end in a bare expression, so a `;` goes in front of any
/// section that would otherwise continue it as a call or an index.
fn concatenate(sections: &[String]) -> String {
    let mut joined = String::new();
    for (position, section) in sections.iter().enumerate() {
        if position > 0 {
            if needs_terminator(&joined, section) {
                joined.push(';');
            }
            joined.push('\n');
        }
        joined.push_str(section);
    }
    joined
}

fn needs_terminator(previous: &str, next: &str) -> bool {
    let continues = next.trim_start().starts_with(['(', '[', '`']);
    let open = previous
        .trim_end()
        .chars()
        .last()
        .is_some_and(|last| last != ';');
    continues && open
}

/// Built-in engine for `define([...])` module trees.
#[derive(Debug, Default, Clone, Copy)]
pub struct AmdEngine;

impl BundleEngine for AmdEngine {
    fn optimize(&self, config: &BundleConfig) -> Result<String> {
        debug!("Bundling from entry {:?} with {:?}", config.name, config);

        let (module_graph, roots) = ModuleGraph::trace(config)?;
        let order = module_graph.emit_order(&roots);

        let mut sections = Vec::with_capacity(order.len());
        for index in order {
            let module = &module_graph.graph[index];
            if config.exclude_shallow.contains(&module.id) {
                trace!("Skipping shallow-excluded module {}", module.id);
                continue;
            }
            let Some(source) = &module.source else {
                continue;
            };

            let source = if config.use_strict {
                source.clone()
            } else {
                STRICT_PRAGMA.replace_all(source, "").into_owned()
            };

            let path = module.path.to_string_lossy().replace('\\', "/");
            let written = match &config.on_build_write {
                Some(hook) => hook(&module.id, &path, &source),
                None => source,
            };
            debug!("Writing module {}", module.id);
            sections.push(written);
        }

        let bundle = format!(
            "{}{}{}",
            config.wrap.start,
            concatenate(&sections),
            config.wrap.end
        );

        if let Some(out) = &config.out {
            out(&bundle)?;
        }
        Ok(bundle)
    }
}
