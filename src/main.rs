mod cli;
mod config;
mod convert;
mod doctype;
mod error;
mod fulltext;
mod ledger;
mod normalize;
mod pipeline;
mod solr;
mod split;
mod xml;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Batch runs narrate through the log; use RUST_LOG=debug for more detail
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            doc_type,
            dates,
            skip_split,
            skip_solr,
            solr_url,
            files_root,
        } => {
            cli::commands::run::run(doc_type, dates, skip_split, skip_solr, solr_url, files_root)
                .await?;
        }
        Commands::Init { force } => {
            cli::commands::init::run(force).await?;
        }
    }

    Ok(())
}
