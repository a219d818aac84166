use criterion::{Criterion, criterion_group, criterion_main};
use jqbuild::config::Config;
use jqbuild::engine::AmdEngine;
use jqbuild::exclusion::ExclusionResolver;
use jqbuild::minify::NoopMinifier;
use jqbuild::orchestrator::{BuildOptions, BuildOrchestrator};
use jqbuild::rewrite::Rewriter;
use jqbuild::vcs::VersionControl;
use std::fs;
use std::hint::black_box;
use std::path::Path;
use tempfile::TempDir;

struct PinnedCommit;

impl VersionControl for PinnedCommit {
    fn short_commit_hash(&self) -> anyhow::Result<String> {
        Ok("0000000".to_owned())
    }

    fn is_working_dir_clean(&self) -> anyhow::Result<bool> {
        Ok(true)
    }
}

const MODULES: [&str; 8] = [
    "core",
    "ajax",
    "ajax/xhr",
    "ajax/script",
    "css",
    "css/showHide",
    "effects",
    "effects/Tween",
];

/// Create a small jQuery-shaped source tree for benchmarking
fn create_test_tree(src: &Path) -> std::io::Result<()> {
    fs::create_dir_all(src.join("var"))?;
    fs::write(
        src.join("wrapper.js"),
        "( function( window ) {\n\t// @CODE\n\treturn jQuery;\n} )( window );\n",
    )?;
    fs::write(
        src.join("var/arr.js"),
        "define( function() {\n\t\"use strict\";\n\treturn [];\n} );\n",
    )?;

    let entry_deps = MODULES
        .iter()
        .map(|module| format!("\t\"./{}\"", module))
        .collect::<Vec<_>>()
        .join(",\n");
    fs::write(
        src.join("jquery.js"),
        format!(
            "define( [\n{}\n], function( jQuery ) {{\n\"use strict\";\nreturn jQuery;\n}} );\n",
            entry_deps
        ),
    )?;

    for module in MODULES {
        let path = src.join(format!("{}.js", module));
        fs::create_dir_all(path.parent().expect("module has a parent"))?;
        let depth = module.matches('/').count();
        let prefix = if depth == 0 { "./".to_owned() } else { "../".repeat(depth) };
        fs::write(
            path,
            format!(
                "define( [\n\t\"{prefix}var/arr\"\n], function( arr ) {{\n\n\"use strict\";\n\n/* ExcludeStart */\nwindow.debug = true;\n/* ExcludeEnd */\narr.push( \"{module}\" );\n\nreturn arr;\n}} );\n"
            ),
        )?;
    }
    Ok(())
}

fn config_for(src: &Path) -> Config {
    Config {
        source_root: src.to_path_buf(),
        minifier: Vec::new(),
        ..Config::default()
    }
}

/// Benchmark exclusion resolution against the override table
fn benchmark_resolution(c: &mut Criterion) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let src = temp_dir.path().join("src");
    create_test_tree(&src).expect("Failed to create test tree");
    let config = config_for(&src);
    let resolver = ExclusionResolver::new(&config);
    let exclude: Vec<String> = ["ajax", "css", "deferred"]
        .iter()
        .map(|s| (*s).to_owned())
        .collect();

    c.bench_function("resolve_exclusions", |b| {
        b.iter(|| {
            resolver
                .resolve(black_box(&exclude), &[])
                .expect("Resolution should succeed")
        });
    });
}

/// Benchmark per-module rewriting
fn benchmark_rewrite(c: &mut Criterion) {
    let rewriter = Rewriter::new(&Config::default(), None);
    let module = "define( [\n\t\"./core\",\n\t\"./var/arr\"\n], function( jQuery, arr ) {\n\n\"use strict\";\n\n/* ExcludeStart */\nwindow.debug = true;\n/* ExcludeEnd */\njQuery.fn.size = function() {\n\treturn this.length;\n};\n\nreturn jQuery;\n} );\n";
    let var_module = "define( function() {\n\t\"use strict\";\n\n\treturn [];\n} );\n";

    c.bench_function("rewrite_module", |b| {
        b.iter(|| {
            rewriter.rewrite(black_box("size"), "src/size.js", black_box(module));
            rewriter.rewrite(black_box("var/arr"), "src/var/arr.js", black_box(var_module));
        });
    });
}

/// Benchmark the full build of one bundle
fn benchmark_build(c: &mut Criterion) {
    c.bench_function("build_bundle", |b| {
        b.iter_with_setup(
            || {
                let temp_dir = TempDir::new().expect("Failed to create temp dir");
                let src = temp_dir.path().join("src");
                create_test_tree(&src).expect("Failed to create test tree");
                let config = config_for(&src);
                (temp_dir, config)
            },
            |(temp_dir, config)| {
                let orchestrator =
                    BuildOrchestrator::new(&config, &AmdEngine, &PinnedCommit, &NoopMinifier);
                orchestrator
                    .build(black_box(BuildOptions {
                        dir: temp_dir.path().join("dist"),
                        exclude: vec!["ajax".to_owned()],
                        ..BuildOptions::default()
                    }))
                    .expect("Build should succeed");

                // Keep temp_dir alive until benchmark completes
                drop(temp_dir);
            },
        );
    });
}

criterion_group!(
    benches,
    benchmark_resolution,
    benchmark_rewrite,
    benchmark_build
);
criterion_main!(benches);
