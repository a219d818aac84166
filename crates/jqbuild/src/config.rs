use anyhow::{Context, Result, anyhow};
use indexmap::IndexSet;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::combine::Combine;
use crate::dirs::{CONFIG_FILE, system_config_file, user_config_file};
use crate::exclusion::{Override, OverrideTable};

/// Build settings shared by every build of one process run.
///
/// Loaded once at start-up and handed by reference to the resolver, the
/// config builder and the orchestrator; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Directory holding the AMD modules
    pub source_root: PathBuf,

    /// Entry module that depends on everything included by default
    pub entry: String,

    /// Template module providing the bundle prologue and epilogue
    pub wrapper: String,

    /// Semantic version the build metadata is appended to
    pub base_version: String,

    /// Directory name marking single-value modules
    pub var_dir: String,

    /// Module whose AMD registration name can be rewritten
    pub amd_module: String,

    /// Name registered by `amd_module` when left untouched
    pub amd_default_name: String,

    /// Module replaced by a no-op `noConflict` when excluded
    pub global_module: String,

    /// Selector module plus its legacy alias
    pub selector_modules: Vec<String>,

    /// Module the selector delegates to once excluded
    pub native_selector: String,

    /// Modules that can never be excluded
    pub minimum: IndexSet<String>,

    /// Extra exclusions applied to slim builds
    pub slim_exclude: Vec<String>,

    /// Minifier command line; `{input}` and `{output}` are substituted.
    /// Empty disables minification.
    pub minifier: Vec<String>,

    /// Cross-module exclusion rules
    pub overrides: OverrideTable,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

fn default_overrides() -> OverrideTable {
    [
        (
            "ajax",
            Override::Simple(strings(&[
                "manipulation/_evalUrl",
                "deprecated/ajax-event-alias",
            ])),
        ),
        ("callbacks", Override::Simple(strings(&["deferred"]))),
        (
            "css",
            Override::Simple(strings(&["effects", "dimensions", "offset"])),
        ),
        ("css/showHide", Override::Simple(strings(&["effects"]))),
        (
            "deferred",
            Override::RemoveInclude {
                remove: strings(&["ajax", "effects", "queue", "core/ready"]),
                include: strings(&["core/ready-no-deferred"]),
            },
        ),
        (
            "event",
            Override::Simple(strings(&[
                "deprecated/ajax-event-alias",
                "deprecated/event",
            ])),
        ),
        (
            "selector",
            Override::Simple(strings(&[
                "css/hiddenVisibleSelectors",
                "effects/animatedSelector",
            ])),
        ),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_owned(), value))
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("src"),
            entry: "jquery".to_owned(),
            wrapper: "wrapper".to_owned(),
            base_version: "4.0.0-pre".to_owned(),
            var_dir: "var".to_owned(),
            amd_module: "exports/amd".to_owned(),
            amd_default_name: "jquery".to_owned(),
            global_module: "exports/global".to_owned(),
            selector_modules: strings(&["selector", "sizzle"]),
            native_selector: "selector-native".to_owned(),
            minimum: ["core".to_owned()].into_iter().collect(),
            slim_exclude: strings(&["ajax", "callbacks", "deferred", "effects", "queue"]),
            minifier: strings(&[
                "terser",
                "{input}",
                "--compress",
                "--mangle",
                "--comments",
                "/^!/",
                "--output",
                "{output}",
            ]),
            overrides: default_overrides(),
        }
    }
}

/// One configuration layer as written in a `jqbuild.toml`.
///
/// Keys a file leaves out stay `None`, so layering can tell "not set" apart
/// from "set to the default".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigFile {
    pub source_root: Option<PathBuf>,
    pub entry: Option<String>,
    pub wrapper: Option<String>,
    pub base_version: Option<String>,
    pub var_dir: Option<String>,
    pub amd_module: Option<String>,
    pub amd_default_name: Option<String>,
    pub global_module: Option<String>,
    pub selector_modules: Option<Vec<String>>,
    pub native_selector: Option<String>,
    pub minimum: Option<IndexSet<String>>,
    pub slim_exclude: Option<Vec<String>>,
    pub minifier: Option<Vec<String>>,
    pub overrides: Option<OverrideTable>,
}

impl Combine for ConfigFile {
    fn combine(self, other: Self) -> Self {
        Self {
            source_root: self.source_root.combine(other.source_root),
            entry: self.entry.combine(other.entry),
            wrapper: self.wrapper.combine(other.wrapper),
            base_version: self.base_version.combine(other.base_version),
            var_dir: self.var_dir.combine(other.var_dir),
            amd_module: self.amd_module.combine(other.amd_module),
            amd_default_name: self.amd_default_name.combine(other.amd_default_name),
            global_module: self.global_module.combine(other.global_module),
            selector_modules: self.selector_modules.combine(other.selector_modules),
            native_selector: self.native_selector.combine(other.native_selector),
            minimum: self.minimum.combine(other.minimum),
            slim_exclude: self.slim_exclude.combine(other.slim_exclude),
            minifier: self.minifier.combine(other.minifier),
            overrides: self.overrides.combine(other.overrides),
        }
    }
}

impl ConfigFile {
    /// Load a single config file from a path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Fill every unset key from the built-in defaults. Override entries are
    /// merged into the default table per key.
    pub fn into_config(self) -> Config {
        let default = Config::default();
        let mut overrides = default.overrides;
        if let Some(table) = self.overrides {
            overrides.extend(table);
        }

        Config {
            source_root: self.source_root.unwrap_or(default.source_root),
            entry: self.entry.unwrap_or(default.entry),
            wrapper: self.wrapper.unwrap_or(default.wrapper),
            base_version: self.base_version.unwrap_or(default.base_version),
            var_dir: self.var_dir.unwrap_or(default.var_dir),
            amd_module: self.amd_module.unwrap_or(default.amd_module),
            amd_default_name: self.amd_default_name.unwrap_or(default.amd_default_name),
            global_module: self.global_module.unwrap_or(default.global_module),
            selector_modules: self.selector_modules.unwrap_or(default.selector_modules),
            native_selector: self.native_selector.unwrap_or(default.native_selector),
            minimum: self.minimum.unwrap_or(default.minimum),
            slim_exclude: self.slim_exclude.unwrap_or(default.slim_exclude),
            minifier: self.minifier.unwrap_or(default.minifier),
            overrides,
        }
    }
}

/// Configuration values from environment variables with JQBUILD_ prefix
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub source_root: Option<PathBuf>,
    pub base_version: Option<String>,
    pub minifier: Option<Vec<String>>,
    pub slim_exclude: Option<Vec<String>>,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

impl EnvConfig {
    /// Load configuration from environment variables with JQBUILD_ prefix
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(root) = env::var("JQBUILD_SOURCE_ROOT") {
            if !root.trim().is_empty() {
                config.source_root = Some(PathBuf::from(root.trim()));
            }
        }

        if let Ok(version) = env::var("JQBUILD_BASE_VERSION") {
            if !version.trim().is_empty() {
                config.base_version = Some(version.trim().to_owned());
            }
        }

        // An empty JQBUILD_MINIFIER switches minification off
        if let Ok(minifier) = env::var("JQBUILD_MINIFIER") {
            config.minifier = Some(split_list(&minifier));
        }

        if let Ok(slim_exclude) = env::var("JQBUILD_SLIM_EXCLUDE") {
            config.slim_exclude = Some(split_list(&slim_exclude));
        }

        config
    }

    /// Layer the environment on top of the file layers
    pub fn apply_to(self, layers: ConfigFile) -> ConfigFile {
        ConfigFile {
            source_root: self.source_root.combine(layers.source_root),
            base_version: self.base_version.combine(layers.base_version),
            minifier: self.minifier.combine(layers.minifier),
            slim_exclude: self.slim_exclude.combine(layers.slim_exclude),
            ..layers
        }
    }
}

fn override_node<'a>(
    graph: &mut DiGraph<&'a str, ()>,
    node_indices: &mut HashMap<&'a str, NodeIndex>,
    module: &'a str,
) -> NodeIndex {
    *node_indices
        .entry(module)
        .or_insert_with(|| graph.add_node(module))
}

impl Config {
    /// Reject override tables that would make resolution recurse forever:
    /// entries listing their own key, and removal chains that loop back.
    pub fn validate(&self) -> Result<()> {
        if self.entry.is_empty() {
            return Err(anyhow!("Entry module name must not be empty"));
        }

        for (module, additional) in &self.overrides {
            if additional.remove().contains(module) || additional.include().contains(module) {
                return Err(anyhow!(
                    "Override entry for \"{}\" must not reference itself",
                    module
                ));
            }
        }

        // Only removals recurse; inclusions are collected as they are
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut node_indices: HashMap<&str, NodeIndex> = HashMap::new();
        for (module, additional) in &self.overrides {
            let from = override_node(&mut graph, &mut node_indices, module);
            for removed in additional.remove() {
                let to = override_node(&mut graph, &mut node_indices, removed);
                graph.add_edge(from, to, ());
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            return Err(anyhow!(
                "Override table has a cycle through \"{}\"",
                graph[cycle.node_id()]
            ));
        }
        Ok(())
    }

    /// Load a single config file from a path, defaults filling the rest
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(ConfigFile::load(path)?.into_config())
    }

    fn try_load_and_combine<P: AsRef<Path>>(
        layers: &mut ConfigFile,
        path: P,
        context: &str,
    ) -> Result<()> {
        if path.as_ref().exists() {
            log::debug!("Loading {} from: {:?}", context, path.as_ref());
            let loaded = ConfigFile::load(&path)
                .with_context(|| format!("Failed to load {} from {:?}", context, path.as_ref()))?;
            *layers = loaded.combine(layers.clone());
        }
        Ok(())
    }

    /// Load configuration with hierarchical precedence:
    /// 1. CLI-provided config path (highest precedence)
    /// 2. Environment variables (JQBUILD_*)
    /// 3. Project config (jqbuild.toml in current directory)
    /// 4. User config (~/.config/jqbuild/jqbuild.toml)
    /// 5. System config (/etc/jqbuild/jqbuild.toml or equivalent)
    /// 6. Default values (lowest precedence)
    pub fn load(cli_config_path: Option<&Path>) -> Result<Self> {
        let mut layers = ConfigFile::default();

        if let Some(system_config_path) = system_config_file() {
            Self::try_load_and_combine(&mut layers, &system_config_path, "system config")?;
        }

        if let Some(user_config_path) = user_config_file() {
            Self::try_load_and_combine(&mut layers, &user_config_path, "user config")?;
        }

        Self::try_load_and_combine(&mut layers, PathBuf::from(CONFIG_FILE), "project config")?;

        layers = EnvConfig::from_env().apply_to(layers);

        if let Some(cli_config_path) = cli_config_path {
            // An explicitly named file has to exist
            let loaded = ConfigFile::load(cli_config_path)
                .with_context(|| format!("Failed to load CLI config from {:?}", cli_config_path))?;
            layers = loaded.combine(layers);
        }

        let config = layers.into_config();
        config
            .validate()
            .context("Invalid configuration after merging all layers")?;

        Ok(config)
    }
}
