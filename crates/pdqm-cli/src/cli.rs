use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pdqm")]
#[command(about = "PDQm patient search: compile FHIR-style queries and run them")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./pdqm.toml when present)
    #[arg(short, long, global = true, env = "PDQM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a search and print the result set as JSON
    Search(SearchArgs),
    /// Print the count and page queries a search would run
    Compile(CompileArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args)]
pub struct SearchArgs {
    /// Query string, e.g. "family=smi,smy&gender=male&_count=2"
    pub query: String,
    /// Search the built-in demo directory instead of PostgreSQL
    #[arg(long, conflicts_with = "data")]
    pub memory: bool,
    /// Search patients loaded from a JSON array file instead of PostgreSQL
    #[arg(long)]
    pub data: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct CompileArgs {
    /// Query string, e.g. "birthdate=ge1980&identifier=sys|123"
    pub query: String,
}
