pub mod analysis;
pub mod cli;
pub mod columns;
pub mod config;
pub mod ingest;
pub mod io_utils;
pub mod session;
pub mod table;
pub mod transport;
pub mod upload;
pub mod validate;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("feedback_ingest", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Validate(args) => validate::execute_validate(&args),
        Commands::Filter(args) => validate::execute_filter(&args),
        Commands::Upload(args) => upload::execute(&args),
        Commands::Columns(args) => columns::execute(&args),
    }
}
