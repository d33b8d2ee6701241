//! Batch driver: discovery and per-file orchestration of split, convert,
//! and submit.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{error, info};
use walkdir::WalkDir;

use crate::config::Config;
use crate::convert;
use crate::doctype::DocType;
use crate::error::{PipelineError, Result};
use crate::ledger::Ledger;
use crate::solr::SolrClient;
use crate::split;

/// What to run and over which scope.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub doc_type: DocType,
    /// Date filters: `YYYY` for grants/pubs, `YYYYMMDD` for PTAB. A full
    /// `YYYYMMDD` passed for grants/pubs is collapsed to its year.
    pub dates: Vec<String>,
    pub skip_split: bool,
    pub skip_solr: bool,
}

/// Typed per-run totals, printed at job end instead of living only in logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchSummary {
    /// Source files processed.
    pub files: usize,
    /// Document units written by the split stage this run.
    pub units_split: usize,
    /// Records normalized and written to JSON this run.
    pub converted: usize,
    /// Records confirmed indexed this run.
    pub submitted: usize,
    /// Work avoided by idempotence: existing units, existing JSON, and
    /// ledger-complete records.
    pub skipped: usize,
    /// File-, record-, and submission-level failures.
    pub failed: usize,
}

pub struct Pipeline {
    config: Config,
    options: PipelineOptions,
    solr: SolrClient,
}

impl Pipeline {
    pub fn new(config: Config, options: PipelineOptions, solr: SolrClient) -> Self {
        Self {
            config,
            options,
            solr,
        }
    }

    /// Discover candidate source files for the requested scope, in sorted
    /// order. Failure to enumerate the input tree at all is the one fatal
    /// error of the batch.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let root = self.config.files_root.join(self.options.doc_type.dir_name());
        if !root.is_dir() {
            return Err(PipelineError::io(
                &root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "input directory not found"),
            ));
        }

        let mut sources = Vec::new();
        if self.options.dates.is_empty() {
            // files/<DOCTYPE>/<dateToken>/*.xml — exactly two levels down, so
            // previously split units (one level deeper) are never rediscovered.
            for entry in WalkDir::new(&root)
                .min_depth(2)
                .max_depth(2)
                .sort_by_file_name()
            {
                let entry = entry.map_err(|e| {
                    PipelineError::io(&root, e.into_io_error().unwrap_or_else(|| {
                        std::io::Error::other("walk error")
                    }))
                })?;
                if entry.file_type().is_file() && has_xml_extension(entry.path()) {
                    sources.push(entry.into_path());
                }
            }
        } else {
            for date in &self.options.dates {
                for dir in self.date_dirs(&root, date)? {
                    let entries =
                        fs::read_dir(&dir).map_err(|e| PipelineError::io(&dir, e))?;
                    for entry in entries {
                        let entry = entry.map_err(|e| PipelineError::io(&dir, e))?;
                        let path = entry.path();
                        if path.is_file() && has_xml_extension(&path) {
                            sources.push(path);
                        }
                    }
                }
            }
            sources.sort();
        }
        Ok(sources)
    }

    /// Input directories matching one date filter.
    fn date_dirs(&self, root: &Path, date: &str) -> Result<Vec<PathBuf>> {
        match self.options.doc_type {
            DocType::Grants | DocType::Pubs => {
                // Grants/pubs directories are plain years; a full YYYYMMDD
                // collapses to its year.
                let year = if date.len() >= 4 { &date[..4] } else { date };
                let dir = root.join(year);
                if dir.is_dir() {
                    Ok(vec![dir])
                } else {
                    info!("no input directory for {}", dir.display());
                    Ok(Vec::new())
                }
            }
            DocType::Ptab => {
                // PTAB drops arrive in PTAB_<date>-style directories.
                let mut dirs = Vec::new();
                let entries = fs::read_dir(root).map_err(|e| PipelineError::io(root, e))?;
                for entry in entries {
                    let entry = entry.map_err(|e| PipelineError::io(root, e))?;
                    let path = entry.path();
                    let name = entry.file_name();
                    let name = name.to_string_lossy();
                    if path.is_dir() && name.ends_with(date) {
                        dirs.push(path);
                    }
                }
                dirs.sort();
                if dirs.is_empty() {
                    info!("no PTAB input directory matching {date}");
                }
                Ok(dirs)
            }
        }
    }

    /// Run one source file through split, convert, and submit. Failures are
    /// logged and counted; the batch always moves on to the next file.
    pub async fn process_file(&self, source: &Path, summary: &mut BatchSummary) {
        info!("processing file: {}", source.display());
        summary.files += 1;

        if self.options.doc_type.needs_split() {
            self.process_master_file(source, summary).await;
        } else {
            self.process_ptab_file(source, summary).await;
        }
    }

    async fn process_master_file(&self, source: &Path, summary: &mut BatchSummary) {
        let unit_dir = split::unit_dir(source);

        let unit_keys: Vec<String> = if self.options.skip_split {
            info!("skipping split stage for {}", source.display());
            match existing_units(&unit_dir) {
                Ok(keys) => keys,
                Err(e) => {
                    error!("{e}");
                    summary.failed += 1;
                    return;
                }
            }
        } else {
            match split::split(source, &unit_dir) {
                Ok(report) => {
                    summary.units_split += report.written.len();
                    summary.skipped += report.existing.len();
                    report.keys().map(str::to_string).collect()
                }
                Err(e) => {
                    error!("split failed for {}: {e}", source.display());
                    summary.failed += 1;
                    return;
                }
            }
        };

        let mut convertible = Vec::with_capacity(unit_keys.len());
        for key in &unit_keys {
            let unit_path = unit_dir.join(key);
            match convert::convert(&unit_path, self.options.doc_type) {
                Ok(report) => {
                    if report.already_existed {
                        summary.skipped += 1;
                    } else {
                        summary.converted += report.records_converted;
                        summary.failed += report.records_dropped;
                    }
                    convertible.push(report.json_path);
                }
                Err(e) => {
                    error!("conversion failed for {}: {e}", unit_path.display());
                    summary.failed += 1;
                }
            }
        }

        if self.options.skip_solr {
            info!("skipping Solr stage for {}", source.display());
            return;
        }

        let mut ledger = match Ledger::open(&unit_dir) {
            Ok(ledger) => ledger,
            Err(e) => {
                error!("{e}");
                summary.failed += 1;
                return;
            }
        };
        for json_path in convertible {
            self.submit_file(&json_path, &mut ledger, summary).await;
        }
    }

    async fn process_ptab_file(&self, source: &Path, summary: &mut BatchSummary) {
        let json_path = match convert::convert(source, DocType::Ptab) {
            Ok(report) => {
                if report.already_existed {
                    summary.skipped += 1;
                } else {
                    summary.converted += report.records_converted;
                    summary.failed += report.records_dropped;
                }
                report.json_path
            }
            Err(e) => {
                error!("conversion failed for {}: {e}", source.display());
                summary.failed += 1;
                return;
            }
        };

        if self.options.skip_solr {
            info!("skipping Solr stage for {}", source.display());
            return;
        }

        let record_dir = source.parent().unwrap_or_else(|| Path::new("."));
        let mut ledger = match Ledger::open(record_dir) {
            Ok(ledger) => ledger,
            Err(e) => {
                error!("{e}");
                summary.failed += 1;
                return;
            }
        };
        self.submit_file(&json_path, &mut ledger, summary).await;
    }

    /// Submit every unsubmitted record of one converted JSON file,
    /// ledger-gated per document key.
    async fn submit_file(&self, json_path: &Path, ledger: &mut Ledger, summary: &mut BatchSummary) {
        let records = match load_submission_records(json_path, self.options.doc_type) {
            Ok(records) => records,
            Err(e) => {
                error!("{e}");
                summary.failed += 1;
                return;
            }
        };

        let core = self.config.core(self.options.doc_type);
        for (key, record) in records {
            match ledger.is_complete(&key) {
                Ok(true) => {
                    info!("document {key} already processed by Solr");
                    summary.skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    error!("{e}");
                    summary.failed += 1;
                    continue;
                }
            }

            info!("sending document {key} to Solr");
            match self.solr.submit(core, &key, &record).await {
                Ok(outcome) if outcome.is_success() => match ledger.mark_complete(&key) {
                    Ok(()) => {
                        summary.submitted += 1;
                        info!("Solr update for document {key} complete");
                    }
                    Err(e) => {
                        error!("{e}");
                        summary.failed += 1;
                    }
                },
                Ok(outcome) => {
                    error!("Solr error for doc {key}: {}", outcome.detail());
                    summary.failed += 1;
                }
                Err(e) => {
                    error!("{e}");
                    summary.failed += 1;
                }
            }
        }
    }
}

/// Unit files already present in a split-output directory, for
/// `--skip-split` runs.
fn existing_units(unit_dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(unit_dir).map_err(|e| PipelineError::io(unit_dir, e))?;
    let mut keys = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::io(unit_dir, e))?;
        let path = entry.path();
        if path.is_file() && has_xml_extension(&path) {
            keys.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    keys.sort();
    Ok(keys)
}

fn has_xml_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xml"))
}

/// Extract `(document key, submission body)` pairs from a converted JSON
/// file. The body is the record subtree, not the whole tree.
fn load_submission_records(json_path: &Path, doc_type: DocType) -> Result<Vec<(String, Value)>> {
    let content = fs::read_to_string(json_path).map_err(|e| PipelineError::io(json_path, e))?;
    let tree: Value = serde_json::from_str(&content)
        .map_err(|e| PipelineError::parse(json_path, e.to_string()))?;

    match doc_type {
        DocType::Grants | DocType::Pubs => {
            let record = tree.get(doc_type.record_tag()).cloned().ok_or_else(|| {
                PipelineError::parse(
                    json_path,
                    format!("missing element <{}>", doc_type.record_tag()),
                )
            })?;
            let key = record
                .pointer(&format!(
                    "/{}/publication-reference/document-id/appid",
                    doc_type.bib_tag()
                ))
                .and_then(Value::as_str)
                .ok_or_else(|| PipelineError::MissingField {
                    field: "appid".to_string(),
                })?
                .to_string();
            Ok(vec![(key, record)])
        }
        DocType::Ptab => {
            let slot = tree
                .pointer("/main/DATA_RECORD")
                .cloned()
                .ok_or_else(|| PipelineError::parse(json_path, "missing main/DATA_RECORD"))?;
            let records = match slot {
                Value::Array(records) => records,
                record @ Value::Object(_) => vec![record],
                _ => Vec::new(),
            };
            let mut out = Vec::with_capacity(records.len());
            for record in records {
                let key = record
                    .get("DOCUMENT_IMAGE_ID")
                    .and_then(Value::as_str)
                    .ok_or_else(|| PipelineError::MissingField {
                        field: "DOCUMENT_IMAGE_ID".to_string(),
                    })?
                    .to_string();
                out.push((key, record));
            }
            Ok(out)
        }
    }
}
