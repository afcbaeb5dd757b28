mod cli;
mod config;
mod observability;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use pdqm_db_memory::InMemoryDirectory;
use pdqm_db_postgres::{PostgresDirectory, create_pool, mask_password};
use pdqm_search::{
    Page, PatientRecord, QueryParameters, ResultSet, SearchEngine, SearchExecutor,
    parse_query_string,
};
use serde_json::json;
use tracing::info;

use cli::{Cli, Commands, CompileArgs, SearchArgs};
use config::AppConfig;
use output::{print_error, print_json, print_warning};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::loader::load_config(cli.config.as_deref()).map_err(anyhow::Error::msg)?;
    let level = cli.log_level.as_deref().unwrap_or(cfg.logging.level.as_str());
    observability::init_tracing_with_level(level);

    match &cli.command {
        Commands::Search(args) => search(&cfg, args).await?,
        Commands::Compile(args) => compile(&cfg, args)?,
        Commands::Config => {
            let mut shown = cfg.clone();
            shown.postgres.url = mask_password(&shown.postgres.url);
            print!("{}", toml::to_string_pretty(&shown)?);
        }
    }

    Ok(())
}

async fn search(cfg: &AppConfig, args: &SearchArgs) -> Result<()> {
    let engine = SearchEngine::new(cfg.search.clone())?;
    let params = parse_query_string(&args.query);

    let result = if args.memory {
        info!("searching the demo directory");
        run_search(&engine, &pdqm_db_memory::demo_directory(), &params).await?
    } else if let Some(path) = &args.data {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let directory = InMemoryDirectory::from_json(&json)
            .with_context(|| format!("parsing {}", path.display()))?;
        info!(path = %path.display(), patients = directory.len(), "searching loaded patients");
        run_search(&engine, &directory, &params).await?
    } else {
        let pool = create_pool(&cfg.postgres)
            .await
            .context("connecting to the patient directory")?;
        run_search(&engine, &PostgresDirectory::new(pool), &params).await?
    };

    for warning in &result.warnings {
        print_warning(&warning.to_string());
    }
    print_json(&result)
}

async fn run_search<E>(
    engine: &SearchEngine,
    executor: &E,
    params: &QueryParameters,
) -> Result<ResultSet<PatientRecord>>
where
    E: SearchExecutor<Row = PatientRecord>,
{
    Ok(engine.search_params(executor, params).await?)
}

fn compile(cfg: &AppConfig, args: &CompileArgs) -> Result<()> {
    let engine = SearchEngine::new(cfg.search.clone())?;
    let params = parse_query_string(&args.query);
    let page = Page::from_params(&params, engine.settings())?;

    let compiled = engine.compile(&params)?;
    for warning in &compiled.warnings {
        print_warning(&warning.to_string());
    }
    let rendered = engine.render(&compiled.predicate, page)?;

    print_json(&json!({
        "conditions": compiled.predicate.atom_count(),
        "count": {
            "sql": rendered.count.sql,
            "params": rendered.count.params,
        },
        "page": {
            "sql": rendered.page.sql,
            "params": rendered.page.params,
            "window": rendered.page.window,
        },
    }))
}
