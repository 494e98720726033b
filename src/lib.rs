pub mod aggregate;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod data;
pub mod dataset;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod facets;
pub mod filter;
pub mod io_utils;
pub mod normalize;
pub mod report;
pub mod schema;
pub mod stats;
pub mod table;
pub mod worker;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

pub use crate::{
    config::EngineConfig,
    dataset::{Dataset, DatasetView},
    engine::PreparedDataset,
    error::{EngineError, EngineResult},
    filter::{FilterCriterion, FilterPipeline},
    schema::Role,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("moldshop_report", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Probe(args) => report::probe(&args),
        Commands::Filter(args) => report::filter(&args),
        Commands::Group(args) => report::group(&args),
        Commands::Summary(args) => report::summary(&args),
        Commands::Timeline(args) => report::timeline(&args),
        Commands::Options(args) => report::options(&args),
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
