pub mod commands;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::doctype::DocType;

#[derive(Parser)]
#[command(name = "patsolr")]
#[command(author = "Commerce Data Service")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Split, normalize, and index USPTO patent XML into Solr", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the batch pipeline for one document type
    #[command(long_about = "Run the batch pipeline for one document type.\n\n\
        Sources are discovered under <files-root>/<DOCTYPE>/<dateToken>/*.xml.\n\
        Grants and publications arrive as concatenated master files that are\n\
        split into per-document units first; PTAB batch files skip the split\n\
        stage. Every stage is idempotent: existing units, existing JSON\n\
        output, and documents already recorded in a directory's\n\
        solrcomplete.txt ledger are skipped, so re-running after a partial\n\
        failure only does the remaining work.")]
    Run {
        /// Document type to process (g = grants, p = publications, pt = PTAB)
        #[arg(short = 't', long = "doc-type", env = "PATSOLR_DOC_TYPE")]
        doc_type: DocType,

        /// Process only specific date(s): YYYY for g/p, YYYYMMDD for pt
        #[arg(short, long, num_args = 0.., value_parser = parse_date_filter)]
        dates: Vec<String>,

        /// Skip the split stage and reuse units from a previous run
        #[arg(long, default_value = "false")]
        skip_split: bool,

        /// Skip Solr submission
        #[arg(long, default_value = "false")]
        skip_solr: bool,

        /// Override the configured Solr base URL
        #[arg(long, env = "PATSOLR_SOLR_URL")]
        solr_url: Option<String>,

        /// Override the configured files root directory
        #[arg(long, env = "PATSOLR_FILES_ROOT")]
        files_root: Option<PathBuf>,
    },

    /// Write a starter configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long, default_value = "false")]
        force: bool,
    },
}

/// Accept `YYYY` or `YYYYMMDD` date filters, the two granularities the input
/// tree is organized by.
fn parse_date_filter(s: &str) -> Result<String, String> {
    let is_year = s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit());
    let is_day = NaiveDate::parse_from_str(s, "%Y%m%d").is_ok();
    if is_year || is_day {
        Ok(s.to_string())
    } else {
        Err(format!("not a valid date: '{s}' (expected YYYY or YYYYMMDD)"))
    }
}
