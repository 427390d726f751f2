//! recall CLI library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (demo, query, config)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{
    init_logging, load_settings, read_samples, run_demo, run_query, show_config, DEMO_QUERY,
    DEMO_SAMPLES,
};
