pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod parser;
pub mod row;
pub mod service;
pub mod store;

pub use engine::{AggregationResult, aggregate, aggregate_per_group};
pub use row::{Dataset, Row};

pub fn run() -> Result<(), error::CliError> {
    cli::run()
}
