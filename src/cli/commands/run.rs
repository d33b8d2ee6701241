use anyhow::{Context, Result};
use console::{style, Emoji};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

use crate::config::Config;
use crate::doctype::DocType;
use crate::pipeline::{BatchSummary, Pipeline, PipelineOptions};
use crate::solr::SolrClient;

static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
static PAPER: Emoji<'_, '_> = Emoji("📄 ", "");
static SATELLITE: Emoji<'_, '_> = Emoji("📡 ", "");
static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");
static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");

#[allow(clippy::too_many_arguments)]
pub async fn run(
    doc_type: DocType,
    dates: Vec<String>,
    skip_split: bool,
    skip_solr: bool,
    solr_url: Option<String>,
    files_root: Option<PathBuf>,
) -> Result<()> {
    let started = Instant::now();

    println!();
    println!(
        "{}",
        style(" patsolr - Patent Index Loader ").bold().reverse()
    );
    println!();

    // Load configuration, then apply command-line overrides
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(url) = solr_url {
        config.solr_url = url.trim_end_matches('/').to_string();
    }
    if let Some(root) = files_root {
        config.files_root = root;
    }

    println!("{}Document type: {}", PAPER, style(doc_type).cyan().bold());
    if dates.is_empty() {
        println!("{}Dates: {}", PAPER, style("all").cyan());
    } else {
        println!("{}Dates: {}", PAPER, style(dates.join(", ")).cyan());
    }
    println!(
        "{}Files root: {}",
        PAPER,
        style(config.files_root.display()).cyan()
    );
    if skip_solr {
        println!("{}Solr stage: {}", SATELLITE, style("skipped").yellow());
    } else {
        println!(
            "{}Solr: {} (core: {})",
            SATELLITE,
            style(&config.solr_url).cyan(),
            style(config.core(doc_type)).cyan()
        );
    }
    if skip_split {
        println!("{}Split stage: {}", PAPER, style("skipped").yellow());
    }
    println!();

    info!("[JOB START] ----------------");
    info!(
        "doc_type={} dates={} skip_split={} skip_solr={}",
        doc_type,
        if dates.is_empty() { "all".to_string() } else { dates.join(",") },
        skip_split,
        skip_solr
    );

    let solr = SolrClient::new(&config.solr_url, Duration::from_secs(config.timeout_seconds))?;
    let pipeline = Pipeline::new(
        config,
        PipelineOptions {
            doc_type,
            dates,
            skip_split,
            skip_solr,
        },
        solr,
    );

    // Discover source files
    print!("{}Scanning for source files... ", LOOKING_GLASS);
    let sources = pipeline
        .discover()
        .context("Failed to enumerate input files")?;
    println!("{}", style(format!("found {}", sources.len())).green().bold());

    if sources.is_empty() {
        println!();
        println!("{}", style("No source files found for this scope").yellow());
        info!("[JOB END] ----------------");
        return Ok(());
    }

    // Process each file in sequence
    let pb = ProgressBar::new(sources.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{}{{spinner:.green}} [{{elapsed_precise}}] {{bar:40.cyan/blue}} {{pos}}/{{len}} {{msg}}",
                PAPER
            ))
            .unwrap()
            .progress_chars("━━╸━"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    let mut summary = BatchSummary::default();
    for source in &sources {
        let filename = source.file_name().unwrap_or_default().to_string_lossy();
        pb.set_message(format!("{}", style(filename).dim()));
        pipeline.process_file(source, &mut summary).await;
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!("[JOB END] ----------------");

    // Batch summary
    println!("{}Batch summary:", SPARKLE);
    println!(
        "  {} Files processed: {}",
        style("•").cyan(),
        style(summary.files).green().bold()
    );
    println!(
        "  {} Units split: {}",
        style("•").cyan(),
        style(summary.units_split).green().bold()
    );
    println!(
        "  {} Records converted: {}",
        style("•").cyan(),
        style(summary.converted).green().bold()
    );
    println!(
        "  {} Records submitted: {}",
        style("•").cyan(),
        style(summary.submitted).green().bold()
    );
    println!(
        "  {} Skipped (already done): {}",
        style("•").cyan(),
        style(summary.skipped).yellow()
    );
    if summary.failed > 0 {
        println!(
            "  {} Failed: {}",
            style("•").cyan(),
            style(summary.failed).red().bold()
        );
        println!();
        println!(
            "{}Some items failed; see the log for details. Failed documents are retried on the next run.",
            WARN
        );
    }

    println!();
    println!(
        "{}Done in {}",
        CHECK,
        style(HumanDuration(started.elapsed())).green().bold()
    );

    Ok(())
}
