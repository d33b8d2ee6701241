//! Stream splitter for concatenated patent XML.
//!
//! Master files from the bulk-data feed are many complete XML documents
//! concatenated back to back, each starting with its own XML declaration.
//! The splitter walks the source line by line — sources run to multiple
//! gigabytes, so the whole file is never held in memory — and writes each
//! document to its own file in the output directory, keyed by the filename
//! the document carries in its opening tag. Units that already exist on disk
//! are skipped, so re-running a split writes zero new bytes.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

/// Per-source outcome of a split run.
#[derive(Debug, Default)]
pub struct SplitReport {
    /// Keys written by this run, in stream order.
    pub written: Vec<String>,
    /// Keys skipped because the unit file already existed.
    pub existing: Vec<String>,
}

impl SplitReport {
    /// All unit keys found in the source, written or not, in stream order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.written
            .iter()
            .chain(self.existing.iter())
            .map(String::as_str)
    }

    pub fn total(&self) -> usize {
        self.written.len() + self.existing.len()
    }
}

/// Splitter position within the current buffered document.
enum SplitState {
    /// No record opening tag seen yet for the current unit.
    AwaitingBoundary,
    /// Inside a grant/publication record; key taken from its `file` attribute.
    InGrantDoc { key: String },
    /// Inside a `sequence-cwu` record; key assembled from `doc-number` and
    /// `date` child elements, both required.
    InSequenceDoc {
        doc_number: Option<String>,
        date: Option<String>,
    },
}

fn file_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"file="(.*?)""#).expect("valid regex"))
}

fn doc_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<doc-number>(.*?)</doc-number>").expect("valid regex"))
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<date>(.*?)</date>").expect("valid regex"))
}

/// Split `source` into per-document unit files under `output_dir`.
///
/// The output directory is created (with parents) before any writes. An I/O
/// failure aborts the whole split for this source; re-running afterwards is
/// safe because every unit already written is skipped by existence.
pub fn split(source: &Path, output_dir: &Path) -> Result<SplitReport> {
    fs::create_dir_all(output_dir).map_err(|e| PipelineError::io(output_dir, e))?;

    let file = File::open(source).map_err(|e| PipelineError::io(source, e))?;
    let mut reader = BufReader::new(file);

    let mut report = SplitReport::default();
    let mut buffer: Vec<String> = Vec::new();
    let mut state = SplitState::AwaitingBoundary;
    let mut line = String::new();

    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .map_err(|e| PipelineError::io(source, e))?;
        if read == 0 {
            break;
        }

        let trimmed = line.trim_start();
        if trimmed.starts_with("<?xml") {
            // Declaration closes the previous unit and opens the next.
            flush_unit(source, output_dir, &mut buffer, &state, &mut report)?;
            state = SplitState::AwaitingBoundary;
            buffer.push(line.clone());
        } else if trimmed.starts_with("<us-patent-grant")
            || trimmed.starts_with("<us-patent-application-publication")
        {
            if let Some(captures) = file_attr_re().captures(trimmed) {
                state = SplitState::InGrantDoc {
                    key: captures[1].to_string(),
                };
            }
            buffer.push(line.clone());
        } else if trimmed.starts_with("<sequence-cwu") {
            state = SplitState::InSequenceDoc {
                doc_number: None,
                date: None,
            };
            buffer.push(line.clone());
        } else {
            if let SplitState::InSequenceDoc {
                ref mut doc_number,
                ref mut date,
            } = state
            {
                if doc_number.is_none() {
                    if let Some(captures) = doc_number_re().captures(trimmed) {
                        *doc_number = Some(captures[1].to_string());
                    }
                } else if date.is_none() {
                    if let Some(captures) = date_re().captures(trimmed) {
                        *date = Some(captures[1].to_string());
                    }
                }
            }
            buffer.push(line.clone());
        }
    }

    // End of stream is an implicit boundary for the final unit.
    flush_unit(source, output_dir, &mut buffer, &state, &mut report)?;

    info!(
        "split {}: {} written, {} already present",
        source.display(),
        report.written.len(),
        report.existing.len()
    );
    Ok(report)
}

/// Write the buffered unit to `<output_dir>/<key>`, or skip it if that file
/// already exists. An empty buffer (start of stream) is a no-op.
fn flush_unit(
    source: &Path,
    output_dir: &Path,
    buffer: &mut Vec<String>,
    state: &SplitState,
    report: &mut SplitReport,
) -> Result<()> {
    if buffer.is_empty() {
        return Ok(());
    }

    let key = unit_key(source, state)?;
    let target = output_dir.join(&key);
    if target.exists() {
        debug!("unit {} already exists, skipping", target.display());
        report.existing.push(key);
    } else {
        let file = File::create(&target).map_err(|e| PipelineError::io(&target, e))?;
        let mut writer = BufWriter::new(file);
        for line in buffer.iter() {
            writer
                .write_all(line.as_bytes())
                .map_err(|e| PipelineError::io(&target, e))?;
        }
        writer.flush().map_err(|e| PipelineError::io(&target, e))?;
        report.written.push(key);
    }

    buffer.clear();
    Ok(())
}

fn unit_key(source: &Path, state: &SplitState) -> Result<String> {
    match state {
        SplitState::InGrantDoc { key } => Ok(key.clone()),
        SplitState::InSequenceDoc {
            doc_number: Some(doc_number),
            date: Some(date),
        } => Ok(format!("{doc_number}-{date}-sequence.xml")),
        SplitState::InSequenceDoc { doc_number, date } => {
            let mut missing = Vec::new();
            if doc_number.is_none() {
                missing.push("doc-number");
            }
            if date.is_none() {
                missing.push("date");
            }
            Err(PipelineError::IncompleteDocumentKey {
                path: source.to_path_buf(),
                detail: format!("sequence record missing {}", missing.join(" and ")),
            })
        }
        SplitState::AwaitingBoundary => Err(PipelineError::NoDocumentKey {
            path: source.to_path_buf(),
        }),
    }
}

/// Directory that holds the split units for a master file: the source path
/// with its extension stripped.
pub fn unit_dir(source: &Path) -> PathBuf {
    source.with_extension("")
}
