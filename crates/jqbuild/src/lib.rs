pub mod bundle_config;
pub mod combine;
pub mod compare_size;
pub mod config;
pub mod dirs;
pub mod engine;
pub mod exclusion;
pub mod minify;
pub mod orchestrator;
pub mod rewrite;
pub mod scanner;
pub mod util;
pub mod variants;
pub mod vcs;

pub use config::Config;
pub use engine::{AmdEngine, BundleEngine};
pub use exclusion::{ExclusionResolver, ResolveError};
pub use orchestrator::{BuildOptions, BuildOrchestrator};
