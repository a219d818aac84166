use clap::Parser;
use env_logger::Env;
use log::{debug, info};
use std::path::PathBuf;

use jqbuild::config::Config;
use jqbuild::engine::AmdEngine;
use jqbuild::minify;
use jqbuild::orchestrator::{BuildOptions, BuildOrchestrator, DEFAULT_DIR, DEFAULT_FILENAME};
use jqbuild::rewrite::AmdName;
use jqbuild::variants::build_all;
use jqbuild::vcs::GitCli;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Modules to exclude (repeatable or comma separated)
    #[arg(short, long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Modules to include instead of the entry module's full list
    #[arg(short, long, value_delimiter = ',')]
    include: Vec<String>,

    /// Output file name
    #[arg(short, long, default_value = DEFAULT_FILENAME)]
    filename: String,

    /// Output directory
    #[arg(short, long, default_value = DEFAULT_DIR)]
    dir: PathBuf,

    /// Build the slim variant
    #[arg(short, long)]
    slim: bool,

    /// AMD name to register; pass without a value for an anonymous module
    #[arg(long, value_name = "NAME", num_args = 0..=1, default_missing_value = "")]
    amd: Option<String>,

    /// Use this version instead of one derived from git
    #[arg(long, value_name = "VERSION")]
    set_version: Option<String>,

    /// Build both the standard and the slim bundles and compare their sizes
    #[arg(long, conflicts_with_all = ["exclude", "include", "filename", "slim", "amd"])]
    all: bool,

    /// Increase verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        // Completion notices and resolved exclusions are shown by default
        0 => "warn,jqbuild=info",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    debug!(
        "Verbosity level: {} (log level: {})",
        cli.verbose, log_level
    );

    let config = Config::load(cli.config.as_deref())?;
    debug!("Configuration: {:?}", config);

    let engine = AmdEngine;
    let vcs = GitCli::default();
    let minifier = minify::from_config(&config)?;
    let orchestrator = BuildOrchestrator::new(&config, &engine, &vcs, &*minifier);

    if cli.all {
        let built = build_all(&orchestrator, &cli.dir, cli.set_version)?;
        info!(
            "Built {:?} and {:?}",
            built.standard.path, built.slim.path
        );
        return Ok(());
    }

    let options = BuildOptions {
        amd: cli.amd.as_deref().map(AmdName::parse),
        dir: cli.dir,
        exclude: cli.exclude,
        filename: cli.filename,
        include: cli.include,
        slim: cli.slim,
        version: cli.set_version,
    };
    debug!("Build options: {:?}", options);

    let built = orchestrator.build(options)?;
    debug!("Bundle written to {:?}", built.path);

    Ok(())
}
